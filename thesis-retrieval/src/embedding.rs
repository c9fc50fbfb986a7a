//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::{Result, RetrievalError};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. Failures (timeouts, network errors, malformed payloads) are
/// reported as [`RetrievalError::EmbeddingError`]. The default
/// [`embed`](EmbeddingProvider::embed) implementation delegates to
/// [`embed_batch`](EmbeddingProvider::embed_batch) with a single input.
///
/// # Example
///
/// ```rust,ignore
/// use thesis_retrieval::EmbeddingProvider;
///
/// let provider = HashEmbeddingProvider::new(256)?;
/// let embedding = provider.embed("ethical implications of AI bias").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding vectors for a batch of text inputs, one per input.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text]).await?;
        embeddings.into_iter().next().ok_or_else(|| RetrievalError::EmbeddingError {
            provider: self.name().to_string(),
            message: "provider returned no embedding".to_string(),
        })
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// A short name used in logs and error messages.
    fn name(&self) -> &str {
        "embedding"
    }
}
