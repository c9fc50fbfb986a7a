//! Data types for evidence chunks and their retrieval results.

use serde::{Deserialize, Serialize};

/// An inclusive page range within the chunk's source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageRange {
    /// First page covered by the chunk.
    pub start: u32,
    /// Last page covered by the chunk.
    pub end: u32,
}

/// Lightweight structural metadata captured at ingestion time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Section heading the chunk was extracted under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    /// Pages of the source the chunk spans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_range: Option<PageRange>,
}

/// An immutable fragment of ingested source text used as evidence.
///
/// Chunk IDs are conventionally `{source}_{position}`; the selection stage
/// groups chunks by the segment before the first underscore.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The ID of the source the chunk was extracted from.
    pub source_id: String,
    /// The ID of the owning project.
    pub project_id: String,
    /// Ordinal position of the chunk within its source.
    pub position: u32,
    /// The text content of the chunk. Never empty.
    pub text: String,
    /// Number of tokens in `text`, as counted at ingestion.
    pub token_count: usize,
    /// Embedding computed at ingestion time, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Optional heading and page metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChunkMetadata>,
}

impl Chunk {
    /// Create a chunk with no embedding and no metadata.
    ///
    /// The token count is approximated by whitespace-separated words.
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        project_id: impl Into<String>,
        position: u32,
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let token_count = text.split_whitespace().count();
        Self {
            id: id.into(),
            source_id: source_id.into(),
            project_id: project_id.into(),
            position,
            text,
            token_count,
            embedding: None,
            metadata: None,
        }
    }

    /// Attach an embedding.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Attach a section heading.
    pub fn with_heading(mut self, heading: impl Into<String>) -> Self {
        self.metadata.get_or_insert_with(ChunkMetadata::default).heading = Some(heading.into());
        self
    }

    /// Attach a page range.
    pub fn with_page_range(mut self, start: u32, end: u32) -> Self {
        self.metadata.get_or_insert_with(ChunkMetadata::default).page_range =
            Some(PageRange { start, end });
        self
    }

    /// The section heading, if the chunk carries one.
    pub fn heading(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.heading.as_deref())
    }

    /// The page range, if the chunk carries one.
    pub fn page_range(&self) -> Option<PageRange> {
        self.metadata.as_ref().and_then(|m| m.page_range)
    }
}

/// A selected [`Chunk`] paired with its final score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// The selected chunk.
    #[serde(flatten)]
    pub chunk: Chunk,
    /// The final score after selection adjustments (higher is more relevant).
    pub score: f64,
}
