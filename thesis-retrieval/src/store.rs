//! Chunk store trait for loading a project's candidate pool.

use async_trait::async_trait;

use crate::chunk::Chunk;
use crate::error::Result;

/// A read-only source of ingested chunks.
///
/// The engine never writes through this trait; ingestion happens elsewhere.
///
/// # Example
///
/// ```rust,ignore
/// use thesis_retrieval::{ChunkStore, InMemoryChunkStore};
///
/// let store = InMemoryChunkStore::new();
/// store.insert_many(chunks).await;
/// let pool = store.chunks_for_project("thesis-42").await?;
/// ```
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Return every chunk belonging to `project_id`, in a stable order.
    ///
    /// An unknown project yields an empty `Vec`, not an error.
    async fn chunks_for_project(&self, project_id: &str) -> Result<Vec<Chunk>>;
}
