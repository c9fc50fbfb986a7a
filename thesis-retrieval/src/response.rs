//! The shape handed back to drafting services.

use serde::{Deserialize, Serialize};

use crate::chunk::ScoredChunk;
use crate::scoring::ChunkScore;

/// Result of one retrieval call.
///
/// `chunks` are ordered by final score and are what drafting services ground
/// on. `enhanced_scores` covers every candidate, for debugging only: its first
/// `total_retrieved` entries line up with `chunks`, the rest are the
/// candidates selection left out, in rank order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResponse {
    pub chunks: Vec<ScoredChunk>,
    pub query: String,
    pub total_retrieved: usize,
    pub enhanced_scores: Vec<ChunkScore>,
}

impl RetrievalResponse {
    /// A response carrying no evidence.
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            chunks: Vec::new(),
            query: query.into(),
            total_retrieved: 0,
            enhanced_scores: Vec::new(),
        }
    }

    /// Whether no evidence was retrieved.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
