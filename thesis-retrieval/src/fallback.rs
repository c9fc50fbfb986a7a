//! Single-factor retrieval used when the multi-factor pipeline fails.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::chunk::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, RetrievalError};
use crate::similarity::cosine_similarity;
use crate::store::ChunkStore;

/// A chunk returned by a [`FallbackRetriever`].
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackHit {
    pub chunk: Chunk,
    /// Similarity reported by the retriever, if it reports one.
    pub score: Option<f64>,
}

/// A simpler retrieval path the orchestrator degrades to.
///
/// Hits are returned best first.
#[async_trait]
pub trait FallbackRetriever: Send + Sync {
    /// Retrieve at most `limit` chunks of `project_id` for `query`.
    async fn search(&self, project_id: &str, query: &str, limit: usize)
    -> Result<Vec<FallbackHit>>;

    /// A short name used in logs and error messages.
    fn name(&self) -> &str {
        "fallback"
    }
}

/// Semantic-only retrieval: cosine similarity between the query and each
/// embedded chunk of the project.
///
/// Chunks without an embedding are skipped. Use an embedding provider that is
/// independent of the primary one when the fallback should survive a primary
/// provider outage; since stored vectors then usually come from a different
/// model, enable [`with_chunk_reembedding`](Self::with_chunk_reembedding).
pub struct SemanticFallback {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    chunk_store: Arc<dyn ChunkStore>,
    reembed_chunks: bool,
}

impl SemanticFallback {
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        chunk_store: Arc<dyn ChunkStore>,
    ) -> Self {
        Self { embedding_provider, chunk_store, reembed_chunks: false }
    }

    /// Embed chunk text with this fallback's own provider whenever a chunk
    /// has no stored vector or one of a different size than the query's.
    ///
    /// Only worthwhile with a cheap local provider such as
    /// [`HashEmbeddingProvider`](crate::HashEmbeddingProvider).
    pub fn with_chunk_reembedding(mut self) -> Self {
        self.reembed_chunks = true;
        self
    }

    fn fallback_error(&self, message: String) -> RetrievalError {
        RetrievalError::FallbackError { retriever: self.name().to_string(), message }
    }

    async fn reembed(&self, chunks: &mut [Chunk], dimensions: usize) -> Result<()> {
        let stale: Vec<usize> = chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.embedding.as_ref().is_none_or(|e| e.len() != dimensions))
            .map(|(i, _)| i)
            .collect();
        if stale.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = stale.iter().map(|&i| chunks[i].text.as_str()).collect();
        let embeddings = self
            .embedding_provider
            .embed_batch(&texts)
            .await
            .map_err(|e| self.fallback_error(format!("chunk embedding failed: {e}")))?;
        if embeddings.len() != stale.len() {
            return Err(self.fallback_error(format!(
                "expected {} chunk embeddings, received {}",
                stale.len(),
                embeddings.len()
            )));
        }

        for (&i, embedding) in stale.iter().zip(embeddings) {
            chunks[i].embedding = Some(embedding);
        }
        debug!(reembedded = stale.len(), "re-embedded chunks for fallback search");
        Ok(())
    }
}

#[async_trait]
impl FallbackRetriever for SemanticFallback {
    async fn search(
        &self,
        project_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FallbackHit>> {
        let query_embedding = self
            .embedding_provider
            .embed(query)
            .await
            .map_err(|e| self.fallback_error(format!("query embedding failed: {e}")))?;
        let mut chunks = self
            .chunk_store
            .chunks_for_project(project_id)
            .await
            .map_err(|e| self.fallback_error(format!("loading chunks failed: {e}")))?;
        if self.reembed_chunks {
            self.reembed(&mut chunks, query_embedding.len()).await?;
        }

        let mut hits: Vec<FallbackHit> = chunks
            .into_iter()
            .filter_map(|chunk| {
                let score = cosine_similarity(&query_embedding, chunk.embedding.as_deref()?);
                Some(FallbackHit { chunk, score: Some(score) })
            })
            .collect();

        hits.sort_by(|a, b| b.score.unwrap_or(0.0).total_cmp(&a.score.unwrap_or(0.0)));
        hits.truncate(limit);
        debug!(project_id, hits = hits.len(), "semantic fallback search complete");
        Ok(hits)
    }

    fn name(&self) -> &str {
        "semantic"
    }
}
