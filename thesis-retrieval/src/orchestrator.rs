//! Retrieval orchestrator.
//!
//! The [`RetrievalOrchestrator`] runs the multi-factor pipeline
//! (load pool → embed query → score → select) and degrades to a
//! [`FallbackRetriever`] when any stage fails. Apart from malformed
//! contexts it always produces a response, possibly an empty one.
//!
//! # Example
//!
//! ```rust,ignore
//! use thesis_retrieval::{RetrievalOrchestrator, RetrievalConfig, RetrievalContext};
//!
//! let store = Arc::new(store);
//! let fallback = SemanticFallback::new(local_embedder, store.clone()).with_chunk_reembedding();
//! let orchestrator = RetrievalOrchestrator::builder()
//!     .config(RetrievalConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .chunk_store(store)
//!     .fallback(Arc::new(fallback))
//!     .build()?;
//!
//! let context = RetrievalContext::new("ethical implications of AI bias", "thesis-42");
//! let response = orchestrator.perform_enhanced_retrieval(&context, 10).await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::chunk::{Chunk, ScoredChunk};
use crate::config::RetrievalConfig;
use crate::context::RetrievalContext;
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, RetrievalError};
use crate::fallback::{FallbackHit, FallbackRetriever};
use crate::intent;
use crate::response::RetrievalResponse;
use crate::scoring::{ChunkScore, EvidenceRole, FactorScores, ScoringEngine};
use crate::selection;
use crate::store::ChunkStore;

/// Neutral value for every factor the fallback path cannot measure.
const FALLBACK_NEUTRAL: f64 = 0.5;

/// Similarity estimate for the hit at `rank` when the fallback reports no score.
pub fn rank_estimate(rank: usize) -> f64 {
    (1.0 - 0.1 * rank as f64).max(0.1)
}

/// The retrieval orchestrator.
///
/// Holds no per-request state, so one instance can serve concurrent calls.
/// Construct one via [`RetrievalOrchestrator::builder()`].
pub struct RetrievalOrchestrator {
    config: RetrievalConfig,
    scoring: ScoringEngine,
    chunk_store: Arc<dyn ChunkStore>,
    fallback: Option<Arc<dyn FallbackRetriever>>,
}

impl RetrievalOrchestrator {
    /// Create a new [`RetrievalOrchestratorBuilder`].
    pub fn builder() -> RetrievalOrchestratorBuilder {
        RetrievalOrchestratorBuilder::default()
    }

    /// Return a reference to the orchestrator configuration.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Retrieve with the configured default `max_chunks`.
    ///
    /// # Errors
    ///
    /// See [`perform_enhanced_retrieval`](Self::perform_enhanced_retrieval).
    pub async fn retrieve(&self, context: &RetrievalContext) -> Result<RetrievalResponse> {
        self.perform_enhanced_retrieval(context, self.config.max_chunks).await
    }

    /// Select up to `max_chunks` chunks of evidence for `context`.
    ///
    /// Failures of the store, the embedding provider, scoring or selection are
    /// logged and answered from the fallback retriever. If that also fails, or
    /// none is configured, an empty response is returned.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidContext`] if the context fails
    /// validation. No I/O happens in that case.
    #[instrument(
        name = "retrieval.perform",
        skip_all,
        fields(project_id = %context.project_id, max_chunks = max_chunks)
    )]
    pub async fn perform_enhanced_retrieval(
        &self,
        context: &RetrievalContext,
        max_chunks: usize,
    ) -> Result<RetrievalResponse> {
        context.validate()?;

        match self.run_pipeline(context, max_chunks).await {
            Ok(response) => Ok(response),
            Err(e) if e.is_recoverable() => {
                warn!(
                    degraded = true,
                    cause = e.kind(),
                    error = %e,
                    "enhanced retrieval failed, using fallback"
                );
                Ok(self.fallback_response(context, max_chunks).await)
            }
            Err(e) => Err(e),
        }
    }

    async fn run_pipeline(
        &self,
        context: &RetrievalContext,
        max_chunks: usize,
    ) -> Result<RetrievalResponse> {
        // 1. Advisory intent, logged only
        let classification = intent::classify(&context.query);
        info!(
            intent = classification.intent.as_str(),
            confidence = classification.confidence,
            posture = ?classification.posture,
            "classified query intent"
        );

        // 2. Load the candidate pool
        let mut pool =
            self.chunk_store.chunks_for_project(&context.project_id).await.map_err(|e| {
                error!(project_id = %context.project_id, error = %e, "failed to load chunks");
                e
            })?;
        let excluded = context.excluded_chunk_ids();
        if !excluded.is_empty() {
            pool.retain(|c| !excluded.contains(&c.id));
        }
        if pool.is_empty() {
            info!(project_id = %context.project_id, "no candidate chunks");
            return Ok(RetrievalResponse::empty(&context.query));
        }

        // 3. Embed the query and score every candidate
        let weights = context.weights.unwrap_or(self.config.weights);
        let scores = self.scoring.score(context, &pool, &weights).await?;

        // 4. Diversity-aware selection
        let selected = selection::select(&scores, max_chunks, &self.config.selection);

        // 5. Attach final scores to the chunk records
        let chunks = attach_chunks(&pool, &selected)?;

        info!(candidates = pool.len(), selected = chunks.len(), "retrieval completed");

        Ok(RetrievalResponse {
            total_retrieved: chunks.len(),
            chunks,
            query: context.query.clone(),
            enhanced_scores: with_unselected(selected, &scores),
        })
    }

    async fn fallback_response(
        &self,
        context: &RetrievalContext,
        max_chunks: usize,
    ) -> RetrievalResponse {
        let Some(fallback) = &self.fallback else {
            warn!(degraded = true, "no fallback retriever configured, returning empty response");
            return RetrievalResponse::empty(&context.query);
        };

        match fallback.search(&context.project_id, &context.query, max_chunks).await {
            Ok(hits) => {
                let response = wrap_fallback_hits(&context.query, hits);
                warn!(
                    degraded = true,
                    retriever = fallback.name(),
                    selected = response.total_retrieved,
                    "served retrieval from fallback"
                );
                response
            }
            Err(e) => {
                error!(
                    degraded = true,
                    retriever = fallback.name(),
                    error = %e,
                    "fallback retrieval failed, returning empty response"
                );
                RetrievalResponse::empty(&context.query)
            }
        }
    }
}

fn attach_chunks(pool: &[Chunk], selected: &[ChunkScore]) -> Result<Vec<ScoredChunk>> {
    let by_id: HashMap<&str, &Chunk> = pool.iter().map(|c| (c.id.as_str(), c)).collect();
    selected
        .iter()
        .map(|score| {
            let chunk = by_id.get(score.chunk_id.as_str()).ok_or_else(|| {
                RetrievalError::PipelineError(format!(
                    "selected chunk '{}' is not in the candidate pool",
                    score.chunk_id
                ))
            })?;
            Ok(ScoredChunk { chunk: (*chunk).clone(), score: score.total_score })
        })
        .collect()
}

/// Every candidate's score: the adjusted selection in final order, followed by
/// the candidates that did not make the cut, unadjusted and in rank order.
///
/// Selection admits a prefix of the ranked `scores`, so the remainder starts
/// at `selected.len()`.
fn with_unselected(mut selected: Vec<ChunkScore>, scores: &[ChunkScore]) -> Vec<ChunkScore> {
    selected.extend(scores.iter().skip(selected.len()).cloned());
    selected
}

/// Wrap fallback hits in the regular response shape.
///
/// Similarity is the reported score or [`rank_estimate`]; every other factor
/// is neutral and every chunk is supporting evidence.
pub fn wrap_fallback_hits(query: &str, hits: Vec<FallbackHit>) -> RetrievalResponse {
    let mut chunks = Vec::with_capacity(hits.len());
    let mut enhanced_scores = Vec::with_capacity(hits.len());

    for (rank, hit) in hits.into_iter().enumerate() {
        let similarity = hit.score.unwrap_or_else(|| rank_estimate(rank));
        enhanced_scores.push(ChunkScore {
            chunk_id: hit.chunk.id.clone(),
            factors: FactorScores {
                semantic_similarity: similarity,
                recency: FALLBACK_NEUTRAL,
                source_reliability: FALLBACK_NEUTRAL,
                contextual_relevance: FALLBACK_NEUTRAL,
                diversity_bonus: FALLBACK_NEUTRAL,
            },
            total_score: similarity,
            role: EvidenceRole::Supporting,
            explanation: format!("fallback retrieval on semantic similarity only ({similarity:.2})"),
        });
        chunks.push(ScoredChunk { chunk: hit.chunk, score: similarity });
    }

    RetrievalResponse {
        total_retrieved: chunks.len(),
        chunks,
        query: query.to_string(),
        enhanced_scores,
    }
}

/// Builder for constructing a [`RetrievalOrchestrator`].
///
/// `embedding_provider` and `chunk_store` are required; `config` defaults to
/// [`RetrievalConfig::default()`] and `fallback` is optional.
#[derive(Default)]
pub struct RetrievalOrchestratorBuilder {
    config: Option<RetrievalConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chunk_store: Option<Arc<dyn ChunkStore>>,
    fallback: Option<Arc<dyn FallbackRetriever>>,
}

impl RetrievalOrchestratorBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: RetrievalConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider used for the query vector.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the chunk store.
    pub fn chunk_store(mut self, store: Arc<dyn ChunkStore>) -> Self {
        self.chunk_store = Some(store);
        self
    }

    /// Set the retriever used when the multi-factor pipeline fails.
    pub fn fallback(mut self, fallback: Arc<dyn FallbackRetriever>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Build the [`RetrievalOrchestrator`].
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::ConfigError`] if a required collaborator is
    /// missing or the configuration fails validation.
    pub fn build(self) -> Result<RetrievalOrchestrator> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RetrievalError::ConfigError("embedding_provider is required".to_string()))?;
        let chunk_store = self
            .chunk_store
            .ok_or_else(|| RetrievalError::ConfigError("chunk_store is required".to_string()))?;

        let scoring = ScoringEngine::new(embedding_provider)
            .with_missing_embedding_similarity(config.missing_embedding_similarity);

        Ok(RetrievalOrchestrator { config, scoring, chunk_store, fallback: self.fallback })
    }
}
