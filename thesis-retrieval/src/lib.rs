//! # thesis-retrieval
//!
//! Multi-factor evidence retrieval for thesis drafting.
//!
//! Given a query and the chunks ingested for a project, the engine scores
//! every chunk on five factors (semantic similarity, recency, source
//! reliability, contextual relevance, diversity), selects a bounded and
//! source-diverse subset, and hands it to drafting services as grounding
//! evidence. When the pipeline fails it degrades to a single-factor
//! [`FallbackRetriever`] and, failing that, to an empty response.
//!
//! ## Overview
//!
//! - [`RetrievalOrchestrator`]: sequences the pipeline and owns the fallback path
//! - [`ScoringEngine`] / [`scoring`]: per-chunk factor scores and evidentiary role
//! - [`selection`]: per-source penalty and sole-representative bonus
//! - [`intent`]: advisory query-intent classification
//! - [`EmbeddingProvider`] and [`ChunkStore`]: injected collaborators
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `openai` | [`openai::OpenAIEmbeddingProvider`] |
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use thesis_retrieval::*;
//!
//! let store = Arc::new(InMemoryChunkStore::from_json_file("chunks.json").await?);
//! let embedder = Arc::new(OpenAIEmbeddingProvider::from_env()?);
//! // The fallback must not share the primary provider's failure modes.
//! let local = Arc::new(HashEmbeddingProvider::new(256)?);
//! let orchestrator = RetrievalOrchestrator::builder()
//!     .embedding_provider(embedder)
//!     .chunk_store(store.clone())
//!     .fallback(Arc::new(SemanticFallback::new(local, store).with_chunk_reembedding()))
//!     .build()?;
//!
//! let context = RetrievalContext::new("How does AI bias affect hiring?", "thesis-42")
//!     .with_context_type(DraftingContext::SectionDrafting)
//!     .with_section_objective("examine the ethical implications of AI bias");
//! let response = orchestrator.perform_enhanced_retrieval(&context, 10).await?;
//! ```

pub mod chunk;
pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod fallback;
pub mod hashing;
pub mod inmemory;
pub mod intent;
pub mod orchestrator;
pub mod response;
pub mod scoring;
pub mod selection;
pub mod similarity;
pub mod store;
pub mod text;

#[cfg(feature = "openai")]
pub mod openai;

pub use chunk::{Chunk, ChunkMetadata, PageRange, ScoredChunk};
pub use config::{RetrievalConfig, RetrievalConfigBuilder, SelectionConfig};
pub use context::{DateRange, DraftingContext, RetrievalContext, RetrievalFilters};
pub use embedding::EmbeddingProvider;
pub use error::{Result, RetrievalError};
pub use fallback::{FallbackHit, FallbackRetriever, SemanticFallback};
pub use hashing::HashEmbeddingProvider;
pub use inmemory::InMemoryChunkStore;
pub use intent::{IntentClassification, QueryIntent, RetrievalPosture};
pub use orchestrator::{RetrievalOrchestrator, RetrievalOrchestratorBuilder};
pub use response::RetrievalResponse;
pub use scoring::{
    ChunkScore, DEFAULT_WEIGHTS, EvidenceRole, FactorScores, ScoringEngine, ScoringWeights,
};
pub use similarity::cosine_similarity;
pub use store::ChunkStore;

#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
