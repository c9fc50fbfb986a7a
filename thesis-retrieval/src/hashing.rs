//! Deterministic feature-hashing embeddings.
//!
//! [`HashEmbeddingProvider`] maps each lower-cased word to a signed bucket of
//! a fixed-size vector and L2-normalises the result. Texts sharing vocabulary
//! land close together, which is enough for offline use and tests without an
//! API key.

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{Result, RetrievalError};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// An [`EmbeddingProvider`] that needs no network access.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    /// Create a provider producing vectors of `dimensions` components.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::ConfigError`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RetrievalError::ConfigError(
                "hash embedding dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(Self { dimensions })
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut emb = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
        {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            emb[bucket] += sign;
        }

        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        emb
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |acc, b| (acc ^ u64::from(*b)).wrapping_mul(FNV_PRIME))
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "Hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;

    #[tokio::test]
    async fn embeddings_are_deterministic_and_normalised() {
        let provider = HashEmbeddingProvider::new(64).unwrap();
        let a = provider.embed("Algorithmic bias in hiring").await.unwrap();
        let b = provider.embed("algorithmic BIAS in hiring").await.unwrap();

        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn shared_vocabulary_is_more_similar() {
        let provider = HashEmbeddingProvider::new(256).unwrap();
        let query = provider.embed("ethical implications of AI bias").await.unwrap();
        let close = provider.embed("the ethical implications of bias in AI").await.unwrap();
        let far = provider.embed("soil nitrogen levels in wheat fields").await.unwrap();

        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[tokio::test]
    async fn empty_text_yields_zero_vector() {
        let provider = HashEmbeddingProvider::new(8).unwrap();
        let emb = provider.embed("").await.unwrap();
        assert!(emb.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn zero_dimensions_rejected() {
        assert!(matches!(HashEmbeddingProvider::new(0), Err(RetrievalError::ConfigError(_))));
    }
}
