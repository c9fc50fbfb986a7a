//! Tests for the in-memory chunk store.

use std::io::Write;

use thesis_retrieval::{Chunk, ChunkStore, InMemoryChunkStore, RetrievalError};

#[tokio::test]
async fn groups_by_project_and_preserves_insertion_order() {
    let store = InMemoryChunkStore::new();
    store
        .insert_many([
            Chunk::new("b_0", "b", "p1", 0, "second source"),
            Chunk::new("a_0", "a", "p1", 0, "first source"),
            Chunk::new("c_0", "c", "p2", 0, "other project"),
        ])
        .await
        .unwrap();

    let pool = store.chunks_for_project("p1").await.unwrap();
    let ids: Vec<_> = pool.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["b_0", "a_0"]);
    assert_eq!(store.len().await, 3);
}

#[tokio::test]
async fn unknown_project_is_empty_not_error() {
    let store = InMemoryChunkStore::new();
    assert!(store.chunks_for_project("missing").await.unwrap().is_empty());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn reinserting_an_id_replaces_in_place() {
    let store = InMemoryChunkStore::new();
    store.insert(Chunk::new("a_0", "a", "p1", 0, "old")).await.unwrap();
    store.insert(Chunk::new("a_1", "a", "p1", 1, "next")).await.unwrap();
    store.insert(Chunk::new("a_0", "a", "p1", 0, "new")).await.unwrap();

    let pool = store.chunks_for_project("p1").await.unwrap();
    assert_eq!(pool.len(), 2);
    assert_eq!(pool[0].text, "new");
}

#[tokio::test]
async fn empty_text_is_rejected_atomically() {
    let store = InMemoryChunkStore::new();
    let result = store
        .insert_many([Chunk::new("a_0", "a", "p1", 0, "fine"), Chunk::new("a_1", "a", "p1", 1, " ")])
        .await;

    assert!(matches!(result, Err(RetrievalError::ChunkStoreError { .. })));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn remove_project_drops_its_chunks() {
    let store = InMemoryChunkStore::new();
    store.insert(Chunk::new("a_0", "a", "p1", 0, "text")).await.unwrap();
    store.remove_project("p1").await;
    assert!(store.chunks_for_project("p1").await.unwrap().is_empty());
}

#[tokio::test]
async fn loads_chunks_from_json() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[
            {{
                "id": "smith2021_0",
                "sourceId": "smith2021",
                "projectId": "thesis",
                "position": 0,
                "text": "However, the 2019 audit found measurable bias.",
                "tokenCount": 8,
                "embedding": [0.1, 0.2],
                "metadata": {{ "heading": "2.1 Audits", "pageRange": {{ "start": 3, "end": 4 }} }}
            }},
            {{
                "id": "lee2020_0",
                "sourceId": "lee2020",
                "projectId": "thesis",
                "position": 0,
                "text": "Definitions of fairness vary.",
                "tokenCount": 4
            }}
        ]"#
    )
    .unwrap();

    let store = InMemoryChunkStore::from_json_file(file.path()).await.unwrap();
    let pool = store.chunks_for_project("thesis").await.unwrap();

    assert_eq!(pool.len(), 2);
    assert_eq!(pool[0].heading(), Some("2.1 Audits"));
    assert_eq!(pool[0].embedding.as_deref(), Some(&[0.1f32, 0.2][..]));
    assert!(pool[1].embedding.is_none());
    assert!(pool[1].metadata.is_none());
}

#[tokio::test]
async fn malformed_json_is_store_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();
    assert!(matches!(
        InMemoryChunkStore::from_json_file(file.path()).await,
        Err(RetrievalError::ChunkStoreError { .. })
    ));
}
