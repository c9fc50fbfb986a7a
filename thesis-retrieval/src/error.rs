//! Error types for the `thesis-retrieval` crate.

use thiserror::Error;

/// Errors that can occur while retrieving evidence.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The embedding provider rejected the request or returned a malformed response.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding service could not be reached in time: connection
    /// failures, timeouts, rate limiting and 5xx responses.
    #[error("Embedding service unavailable ({provider}): {message}")]
    ProviderUnavailable {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The chunk store could not produce the candidate pool.
    #[error("Chunk store error ({backend}): {message}")]
    ChunkStoreError {
        /// The chunk store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The single-factor fallback retriever failed.
    #[error("Fallback error ({retriever}): {message}")]
    FallbackError {
        /// The fallback retriever that produced the error.
        retriever: String,
        /// A description of the failure.
        message: String,
    },

    /// The caller supplied a malformed [`RetrievalContext`](crate::RetrievalContext).
    #[error("Invalid retrieval context: {0}")]
    InvalidContext(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the retrieval pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RetrievalError {
    /// Whether the orchestrator may recover from this error through the fallback path.
    ///
    /// Contract violations are surfaced to the caller; everything else degrades.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidContext(_) | Self::ConfigError(_))
    }

    /// A stable label for the error class, logged as the `cause` of a degradation.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmbeddingError { .. } => "embedding",
            Self::ProviderUnavailable { .. } => "provider_unavailable",
            Self::ChunkStoreError { .. } => "chunk_store",
            Self::FallbackError { .. } => "fallback",
            Self::InvalidContext(_) => "invalid_context",
            Self::ConfigError(_) => "config",
            Self::PipelineError(_) => "pipeline",
        }
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_violations_are_not_recoverable() {
        assert!(!RetrievalError::InvalidContext("q".into()).is_recoverable());
        assert!(!RetrievalError::ConfigError("c".into()).is_recoverable());
        assert!(RetrievalError::PipelineError("p".into()).is_recoverable());
    }

    #[test]
    fn unavailable_provider_is_recoverable_and_labelled() {
        let err = RetrievalError::ProviderUnavailable {
            provider: "OpenAI".into(),
            message: "timed out".into(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.kind(), "provider_unavailable");
        assert_eq!(err.to_string(), "Embedding service unavailable (OpenAI): timed out");
    }
}
