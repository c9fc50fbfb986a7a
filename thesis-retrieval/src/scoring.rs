//! Multi-factor relevance scoring.
//!
//! Each candidate chunk receives five independent factor scores:
//!
//! - semantic similarity: cosine similarity to the query embedding
//! - recency: neutral placeholder, reserved for date-based decay
//! - source reliability: structural metadata (heading, numbered section, pages)
//! - contextual relevance: keyword overlap with the section title and objective
//! - diversity bonus: zero here, assigned by [`selection`](crate::selection)
//!
//! The total is the weighted sum of the factors under the active
//! [`ScoringWeights`]. Weights are applied as given, never renormalised.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::chunk::Chunk;
use crate::context::{DraftingContext, RetrievalContext};
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, RetrievalError};
use crate::similarity::cosine_similarity;
use crate::text;

/// Similarity assigned to chunks ingested without an embedding.
pub const MISSING_EMBEDDING_SIMILARITY: f64 = 0.1;

/// Recency score used while chunks carry no temporal metadata.
pub const NEUTRAL_RECENCY: f64 = 0.5;

const RELIABILITY_BASELINE: f64 = 0.5;
const CONTEXTUAL_BASELINE: f64 = 0.5;
const STRUCTURE_BONUS: f64 = 0.1;
const OBJECTIVE_OVERLAP_WEIGHT: f64 = 0.3;
const TITLE_OVERLAP_WEIGHT: f64 = 0.2;
const TASK_MARKER_BONUS: f64 = 0.1;

/// Weights for the five scoring factors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoringWeights {
    pub semantic_similarity: f64,
    pub recency: f64,
    pub source_reliability: f64,
    pub contextual_relevance: f64,
    pub diversity_bonus: f64,
}

/// The process-wide default weights. They sum to exactly 1.0.
pub const DEFAULT_WEIGHTS: ScoringWeights = ScoringWeights {
    semantic_similarity: 0.40,
    recency: 0.15,
    source_reliability: 0.20,
    contextual_relevance: 0.20,
    diversity_bonus: 0.05,
};

impl Default for ScoringWeights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

impl ScoringWeights {
    /// Sum of all five weights. Overrides are not required to total 1.0.
    pub fn sum(&self) -> f64 {
        self.semantic_similarity
            + self.recency
            + self.source_reliability
            + self.contextual_relevance
            + self.diversity_bonus
    }

    /// Weighted sum of the given factor scores.
    pub fn combine(&self, factors: &FactorScores) -> f64 {
        self.semantic_similarity * factors.semantic_similarity
            + self.recency * factors.recency
            + self.source_reliability * factors.source_reliability
            + self.contextual_relevance * factors.contextual_relevance
            + self.diversity_bonus * factors.diversity_bonus
    }
}

/// The five independent factor scores of a chunk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FactorScores {
    pub semantic_similarity: f64,
    pub recency: f64,
    pub source_reliability: f64,
    pub contextual_relevance: f64,
    pub diversity_bonus: f64,
}

/// How a chunk functions as evidence relative to the query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceRole {
    /// Directly answers the query in the section's context.
    Primary,
    /// Background or corroborating material.
    Supporting,
    /// Well-structured source that diverges from the query, useful as counterpoint.
    Contrasting,
}

impl EvidenceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Supporting => "supporting",
            Self::Contrasting => "contrasting",
        }
    }
}

/// Per-request score record for one chunk. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChunkScore {
    pub chunk_id: String,
    #[serde(flatten)]
    pub factors: FactorScores,
    pub total_score: f64,
    pub role: EvidenceRole,
    pub explanation: String,
}

/// Keywords of the section title and objective, extracted once per request.
#[derive(Debug, Clone, Default)]
pub struct SectionKeywords {
    objective: Option<Vec<String>>,
    title: Option<Vec<String>>,
}

impl SectionKeywords {
    /// Extract keywords from the context's section title and objective.
    pub fn from_context(context: &RetrievalContext) -> Self {
        Self {
            objective: context.section_objective.as_deref().map(text::extract_keywords),
            title: context.section_title.as_deref().map(text::extract_keywords),
        }
    }

    fn is_empty(&self) -> bool {
        self.objective.is_none() && self.title.is_none()
    }
}

/// Semantic similarity of a chunk to the query embedding.
///
/// Chunks without an embedding get `missing_baseline` so they are downranked
/// rather than excluded.
pub fn semantic_similarity(query_embedding: &[f32], chunk: &Chunk, missing_baseline: f64) -> f64 {
    match &chunk.embedding {
        Some(embedding) => cosine_similarity(query_embedding, embedding),
        None => missing_baseline,
    }
}

/// Recency of a chunk.
///
/// Chunks carry no publication date yet, so every chunk is neutral. The slot
/// exists so date-based decay can be added without changing the score shape.
pub fn recency(_chunk: &Chunk) -> f64 {
    NEUTRAL_RECENCY
}

/// Reliability inferred from the chunk's structural metadata.
pub fn source_reliability(chunk: &Chunk) -> f64 {
    let mut score = RELIABILITY_BASELINE;
    if let Some(heading) = chunk.heading().filter(|h| !h.trim().is_empty()) {
        score += STRUCTURE_BONUS;
        if text::is_numbered_section(heading) {
            score += STRUCTURE_BONUS;
        }
    }
    if chunk.page_range().is_some() {
        score += STRUCTURE_BONUS;
    }
    score.min(1.0)
}

/// Relevance of a chunk to the section being drafted.
pub fn contextual_relevance(
    chunk: &Chunk,
    section: &SectionKeywords,
    context_type: Option<DraftingContext>,
) -> f64 {
    let mut score = CONTEXTUAL_BASELINE;

    if !section.is_empty() {
        let chunk_keywords = text::extract_keywords(&chunk.text);
        if let Some(objective) = &section.objective {
            score += OBJECTIVE_OVERLAP_WEIGHT * text::overlap_ratio(objective, &chunk_keywords);
        }
        if let Some(title) = &section.title {
            score += TITLE_OVERLAP_WEIGHT * text::overlap_ratio(title, &chunk_keywords);
        }
    }

    match context_type {
        Some(DraftingContext::SectionDrafting) if text::has_argumentative_markers(&chunk.text) => {
            score += TASK_MARKER_BONUS;
        }
        Some(DraftingContext::ParagraphRewrite) if text::has_precision_terminology(&chunk.text) => {
            score += TASK_MARKER_BONUS;
        }
        _ => {}
    }

    score.min(1.0)
}

/// Classify the evidentiary role from the factor scores.
pub fn classify_role(factors: &FactorScores) -> EvidenceRole {
    if factors.semantic_similarity > 0.7 && factors.contextual_relevance > 0.6 {
        EvidenceRole::Primary
    } else if factors.source_reliability > 0.8 && factors.semantic_similarity < 0.5 {
        EvidenceRole::Contrasting
    } else {
        EvidenceRole::Supporting
    }
}

fn tier(value: f64, high: f64, moderate: f64) -> &'static str {
    if value > high {
        "high"
    } else if value > moderate {
        "moderate"
    } else {
        "low"
    }
}

/// Human-readable summary of the factor tiers and role.
pub fn explain(factors: &FactorScores, role: EvidenceRole) -> String {
    let recency = if factors.recency > 0.6 {
        "recent"
    } else if factors.recency < 0.4 {
        "dated"
    } else {
        "neutral"
    };
    format!(
        "{} semantic similarity ({:.2}), {} recency, {} source reliability ({:.2}), {} contextual relevance ({:.2}); {} evidence",
        tier(factors.semantic_similarity, 0.7, 0.4),
        factors.semantic_similarity,
        recency,
        tier(factors.source_reliability, 0.8, 0.6),
        factors.source_reliability,
        tier(factors.contextual_relevance, 0.6, 0.5),
        factors.contextual_relevance,
        role.as_str(),
    )
}

/// Score a single chunk.
pub fn score_chunk(
    chunk: &Chunk,
    query_embedding: &[f32],
    section: &SectionKeywords,
    context_type: Option<DraftingContext>,
    weights: &ScoringWeights,
    missing_embedding_similarity: f64,
) -> ChunkScore {
    let factors = FactorScores {
        semantic_similarity: semantic_similarity(
            query_embedding,
            chunk,
            missing_embedding_similarity,
        ),
        recency: recency(chunk),
        source_reliability: source_reliability(chunk),
        contextual_relevance: contextual_relevance(chunk, section, context_type),
        diversity_bonus: 0.0,
    };
    let role = classify_role(&factors);

    ChunkScore {
        chunk_id: chunk.id.clone(),
        factors,
        total_score: weights.combine(&factors),
        role,
        explanation: explain(&factors, role),
    }
}

/// Score every chunk and sort descending by total.
///
/// The sort is stable: chunks with equal totals keep their candidate-pool order.
pub fn score_chunks(
    chunks: &[Chunk],
    query_embedding: &[f32],
    context: &RetrievalContext,
    weights: &ScoringWeights,
    missing_embedding_similarity: f64,
) -> Vec<ChunkScore> {
    let section = SectionKeywords::from_context(context);
    let mut scores: Vec<ChunkScore> = chunks
        .iter()
        .map(|chunk| {
            score_chunk(
                chunk,
                query_embedding,
                &section,
                context.context_type,
                weights,
                missing_embedding_similarity,
            )
        })
        .collect();

    sort_descending(&mut scores);
    scores
}

/// Stable descending sort by total score.
pub(crate) fn sort_descending(scores: &mut [ChunkScore]) {
    scores.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
}

/// Embeds the query and scores a candidate pool.
#[derive(Clone)]
pub struct ScoringEngine {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    missing_embedding_similarity: f64,
}

impl ScoringEngine {
    /// Create a scoring engine using `embedding_provider` for the query vector.
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedding_provider, missing_embedding_similarity: MISSING_EMBEDDING_SIMILARITY }
    }

    /// Override the similarity assigned to chunks without an embedding.
    pub fn with_missing_embedding_similarity(mut self, similarity: f64) -> Self {
        self.missing_embedding_similarity = similarity;
        self
    }

    /// Embed the query and score `chunks`, sorted descending by total.
    ///
    /// An empty pool returns an empty result without calling the provider.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::EmbeddingError`] if the query embedding fails
    /// or comes back empty.
    pub async fn score(
        &self,
        context: &RetrievalContext,
        chunks: &[Chunk],
        weights: &ScoringWeights,
    ) -> Result<Vec<ChunkScore>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let provider = self.embedding_provider.name();
        let query_embedding = self.embedding_provider.embed(&context.query).await.map_err(|e| {
            error!(provider, error = %e, "query embedding failed");
            match e {
                RetrievalError::EmbeddingError { .. }
                | RetrievalError::ProviderUnavailable { .. } => e,
                other => RetrievalError::EmbeddingError {
                    provider: provider.to_string(),
                    message: other.to_string(),
                },
            }
        })?;

        if query_embedding.is_empty() {
            error!(provider, "query embedding is empty");
            return Err(RetrievalError::EmbeddingError {
                provider: provider.to_string(),
                message: "provider returned an empty query embedding".to_string(),
            });
        }

        let scores = score_chunks(
            chunks,
            &query_embedding,
            context,
            weights,
            self.missing_embedding_similarity,
        );
        debug!(
            candidates = scores.len(),
            top_score = scores.first().map(|s| s.total_score),
            "scored candidate pool"
        );
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factors(semantic: f64, reliability: f64, contextual: f64) -> FactorScores {
        FactorScores {
            semantic_similarity: semantic,
            recency: NEUTRAL_RECENCY,
            source_reliability: reliability,
            contextual_relevance: contextual,
            diversity_bonus: 0.0,
        }
    }

    #[test]
    fn default_weights_sum_to_one() {
        assert!((DEFAULT_WEIGHTS.sum() - 1.0).abs() < 1e-12);
        assert_eq!(ScoringWeights::default(), DEFAULT_WEIGHTS);
    }

    #[test]
    fn missing_embedding_gets_baseline() {
        let chunk = Chunk::new("a_0", "a", "p", 0, "text");
        assert_eq!(semantic_similarity(&[1.0, 0.0], &chunk, MISSING_EMBEDDING_SIMILARITY), 0.1);
    }

    #[test]
    fn mismatched_dimensions_floor_to_zero() {
        let chunk = Chunk::new("a_0", "a", "p", 0, "text").with_embedding(vec![1.0, 0.0, 0.0]);
        assert_eq!(semantic_similarity(&[1.0, 0.0], &chunk, MISSING_EMBEDDING_SIMILARITY), 0.0);
    }

    #[test]
    fn reliability_rewards_structure() {
        let plain = Chunk::new("a_0", "a", "p", 0, "text");
        let headed = plain.clone().with_heading("Background");
        let numbered = plain.clone().with_heading("2.3 Background");
        let full = numbered.clone().with_page_range(3, 4);

        assert!((source_reliability(&plain) - 0.5).abs() < 1e-12);
        assert!((source_reliability(&headed) - 0.6).abs() < 1e-12);
        assert!((source_reliability(&numbered) - 0.7).abs() < 1e-12);
        assert!((source_reliability(&full) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn blank_heading_earns_no_structure_bonus() {
        let plain = Chunk::new("a_0", "a", "p", 0, "text");
        assert!((source_reliability(&plain.clone().with_heading("")) - 0.5).abs() < 1e-12);
        assert!((source_reliability(&plain.with_heading("   ")) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn contextual_relevance_is_neutral_without_section() {
        let chunk = Chunk::new("a_0", "a", "p", 0, "ethical implications AI bias");
        let score = contextual_relevance(&chunk, &SectionKeywords::default(), None);
        assert_eq!(score, 0.5);
    }

    #[test]
    fn contextual_relevance_rewards_objective_overlap() {
        let ctx = RetrievalContext::new("bias", "p")
            .with_section_objective("examine the ethical implications of AI bias");
        let section = SectionKeywords::from_context(&ctx);
        let chunk = Chunk::new("a_0", "a", "p", 0, "ethical implications AI bias");

        let score = contextual_relevance(&chunk, &section, None);
        // 3 of 4 objective keywords shared.
        assert!((score - (0.5 + 0.3 * 0.75)).abs() < 1e-12);
    }

    #[test]
    fn task_markers_add_bonus_for_matching_context() {
        let chunk = Chunk::new("a_0", "a", "p", 0, "However, the 2019 survey disagrees.");
        let section = SectionKeywords::default();

        let drafting = contextual_relevance(&chunk, &section, Some(DraftingContext::SectionDrafting));
        let rewrite = contextual_relevance(&chunk, &section, Some(DraftingContext::ParagraphRewrite));
        let research = contextual_relevance(&chunk, &section, Some(DraftingContext::ResearchQuery));

        assert!((drafting - 0.6).abs() < 1e-12);
        assert!((rewrite - 0.6).abs() < 1e-12);
        assert_eq!(research, 0.5);
    }

    #[test]
    fn contextual_relevance_is_capped() {
        let ctx = RetrievalContext::new("q", "p")
            .with_section_title("therefore ethical bias")
            .with_section_objective("therefore ethical bias");
        let section = SectionKeywords::from_context(&ctx);
        let chunk = Chunk::new("a_0", "a", "p", 0, "Therefore ethical bias");

        let score = contextual_relevance(&chunk, &section, Some(DraftingContext::SectionDrafting));
        assert_eq!(score, 1.0);
    }

    #[test]
    fn role_classification() {
        assert_eq!(classify_role(&factors(0.8, 0.5, 0.7)), EvidenceRole::Primary);
        assert_eq!(classify_role(&factors(0.4, 0.9, 0.5)), EvidenceRole::Contrasting);
        assert_eq!(classify_role(&factors(0.8, 0.9, 0.5)), EvidenceRole::Supporting);
        assert_eq!(classify_role(&factors(0.6, 0.5, 0.5)), EvidenceRole::Supporting);
        // Primary wins even when the contrasting condition would hold on reliability.
        assert_eq!(classify_role(&factors(0.9, 0.9, 0.9)), EvidenceRole::Primary);
    }

    #[test]
    fn explanation_names_tiers_and_role() {
        let f = factors(0.8, 0.9, 0.7);
        let text = explain(&f, classify_role(&f));
        assert!(text.starts_with("high semantic similarity (0.80)"));
        assert!(text.contains("neutral recency"));
        assert!(text.contains("high source reliability"));
        assert!(text.ends_with("primary evidence"));
    }

    #[test]
    fn score_chunks_sorts_stably() {
        let chunks = vec![
            Chunk::new("a_0", "a", "p", 0, "first"),
            Chunk::new("b_0", "b", "p", 0, "second").with_embedding(vec![1.0, 0.0]),
            Chunk::new("c_0", "c", "p", 0, "third"),
        ];
        let ctx = RetrievalContext::new("q", "p");
        let scores = score_chunks(&chunks, &[1.0, 0.0], &ctx, &DEFAULT_WEIGHTS, 0.1);

        let ids: Vec<_> = scores.iter().map(|s| s.chunk_id.as_str()).collect();
        assert_eq!(ids, ["b_0", "a_0", "c_0"]);
        assert!(scores.iter().all(|s| s.factors.diversity_bonus == 0.0));
    }

    #[test]
    fn chunk_score_serializes_flat() {
        let f = factors(0.8, 0.5, 0.5);
        let score = ChunkScore {
            chunk_id: "a_0".into(),
            factors: f,
            total_score: DEFAULT_WEIGHTS.combine(&f),
            role: EvidenceRole::Supporting,
            explanation: String::new(),
        };
        let value = serde_json::to_value(&score).unwrap();
        assert_eq!(value["chunkId"], "a_0");
        assert_eq!(value["semanticSimilarity"], 0.8);
        assert_eq!(value["role"], "supporting");
    }
}
