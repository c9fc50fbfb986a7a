//! In-memory chunk store.
//!
//! This module provides [`InMemoryChunkStore`], a chunk store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It is suitable for
//! development, testing, and the command-line tool.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::chunk::Chunk;
use crate::error::{Result, RetrievalError};
use crate::store::ChunkStore;

/// An in-memory [`ChunkStore`].
///
/// Chunks are grouped by project and kept in insertion order. Inserting a
/// chunk whose ID already exists in the project replaces it in place.
#[derive(Debug, Default)]
pub struct InMemoryChunkStore {
    projects: RwLock<HashMap<String, Vec<Chunk>>>,
}

impl InMemoryChunkStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load chunks from a JSON file containing an array of chunks.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::ChunkStoreError`] if the file cannot be read
    /// or parsed, or if any chunk has empty text.
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| store_error(format!(
            "failed to read '{}': {e}",
            path.display()
        )))?;
        let chunks: Vec<Chunk> = serde_json::from_str(&raw).map_err(|e| {
            store_error(format!("failed to parse '{}': {e}", path.display()))
        })?;

        let store = Self::new();
        let count = chunks.len();
        store.insert_many(chunks).await?;
        info!(path = %path.display(), chunk_count = count, "loaded chunks");
        Ok(store)
    }

    /// Insert a single chunk.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::ChunkStoreError`] if the chunk text is empty.
    pub async fn insert(&self, chunk: Chunk) -> Result<()> {
        self.insert_many([chunk]).await
    }

    /// Insert several chunks, grouping them by project.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::ChunkStoreError`] if any chunk text is empty.
    /// Nothing is inserted in that case.
    pub async fn insert_many(&self, chunks: impl IntoIterator<Item = Chunk>) -> Result<()> {
        let chunks: Vec<Chunk> = chunks.into_iter().collect();
        if let Some(empty) = chunks.iter().find(|c| c.text.trim().is_empty()) {
            return Err(store_error(format!("chunk '{}' has empty text", empty.id)));
        }

        let mut projects = self.projects.write().await;
        for chunk in chunks {
            let pool = projects.entry(chunk.project_id.clone()).or_default();
            match pool.iter_mut().find(|c| c.id == chunk.id) {
                Some(existing) => *existing = chunk,
                None => pool.push(chunk),
            }
        }
        Ok(())
    }

    /// Remove a project and all of its chunks.
    pub async fn remove_project(&self, project_id: &str) {
        self.projects.write().await.remove(project_id);
    }

    /// Total number of chunks across all projects.
    pub async fn len(&self) -> usize {
        self.projects.read().await.values().map(Vec::len).sum()
    }

    /// Whether the store holds no chunks.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn store_error(message: String) -> RetrievalError {
    RetrievalError::ChunkStoreError { backend: "InMemory".to_string(), message }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn chunks_for_project(&self, project_id: &str) -> Result<Vec<Chunk>> {
        let projects = self.projects.read().await;
        Ok(projects.get(project_id).cloned().unwrap_or_default())
    }
}
