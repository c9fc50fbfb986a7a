//! Diversity-aware selection of scored chunks.
//!
//! Chunks are admitted in rank order. Every chunk beyond the per-source
//! allowance is still admitted, but its total is multiplied by the penalty at
//! admission; admission order itself is never reshuffled. After the pass,
//! chunks that are the only selection from their source receive a fixed bonus,
//! and the selection is re-sorted by the adjusted totals.

use std::collections::HashMap;

use tracing::debug;

use crate::config::SelectionConfig;
use crate::scoring::{ChunkScore, sort_descending};

/// Bucket for chunk IDs that carry no `{source}_` prefix.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Derive the source key of a chunk from its ID: the segment before the first `_`.
pub fn source_key(chunk_id: &str) -> &str {
    chunk_id.split_once('_').map(|(source, _)| source).unwrap_or(UNKNOWN_SOURCE)
}

/// Select at most `max_chunks` of the rank-descending `scores`.
///
/// `scores` must already be sorted descending by total, as returned by
/// [`score_chunks`](crate::scoring::score_chunks).
pub fn select(
    scores: &[ChunkScore],
    max_chunks: usize,
    config: &SelectionConfig,
) -> Vec<ChunkScore> {
    let mut per_source: HashMap<&str, usize> = HashMap::new();
    let mut selected: Vec<ChunkScore> = Vec::with_capacity(max_chunks.min(scores.len()));

    for score in scores.iter().take(max_chunks) {
        let count = per_source.entry(source_key(&score.chunk_id)).or_insert(0);
        let mut admitted = score.clone();
        if *count >= config.same_source_allowance {
            admitted.total_score *= config.same_source_penalty;
        }
        *count += 1;
        selected.push(admitted);
    }

    let mut bonused = 0usize;
    for score in &mut selected {
        if per_source.get(source_key(&score.chunk_id)) == Some(&1) {
            score.factors.diversity_bonus += config.single_source_bonus;
            score.total_score += config.single_source_bonus;
            bonused += 1;
        }
    }

    sort_descending(&mut selected);
    debug!(
        selected = selected.len(),
        sources = per_source.len(),
        single_source_bonuses = bonused,
        "selection complete"
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{EvidenceRole, FactorScores};

    fn score(id: &str, total: f64) -> ChunkScore {
        ChunkScore {
            chunk_id: id.to_string(),
            factors: FactorScores {
                semantic_similarity: total,
                recency: 0.5,
                source_reliability: 0.5,
                contextual_relevance: 0.5,
                diversity_bonus: 0.0,
            },
            total_score: total,
            role: EvidenceRole::Supporting,
            explanation: String::new(),
        }
    }

    fn total_of<'a>(selected: &'a [ChunkScore], id: &str) -> &'a ChunkScore {
        selected.iter().find(|s| s.chunk_id == id).unwrap()
    }

    #[test]
    fn source_key_uses_first_segment() {
        assert_eq!(source_key("paper_3"), "paper");
        assert_eq!(source_key("paper_v2_3"), "paper");
        assert_eq!(source_key("standalone"), UNKNOWN_SOURCE);
        assert_eq!(source_key("_3"), "");
    }

    #[test]
    fn third_chunk_from_same_source_is_penalised() {
        let scores =
            vec![score("a_0", 0.9), score("a_1", 0.8), score("a_2", 0.7), score("a_3", 0.6)];
        let selected = select(&scores, 10, &SelectionConfig::default());

        assert!((total_of(&selected, "a_0").total_score - 0.9).abs() < 1e-12);
        assert!((total_of(&selected, "a_1").total_score - 0.8).abs() < 1e-12);
        assert!((total_of(&selected, "a_2").total_score - 0.7 * 0.8).abs() < 1e-12);
        assert!((total_of(&selected, "a_3").total_score - 0.6 * 0.8).abs() < 1e-12);
        assert!(selected.iter().all(|s| s.factors.diversity_bonus == 0.0));
    }

    #[test]
    fn sole_representative_gets_bonus() {
        let scores = vec![score("a_0", 0.9), score("a_1", 0.8), score("b_0", 0.5)];
        let selected = select(&scores, 10, &SelectionConfig::default());

        let b = total_of(&selected, "b_0");
        assert!((b.total_score - 0.55).abs() < 1e-12);
        assert!((b.factors.diversity_bonus - 0.05).abs() < 1e-12);
        assert_eq!(total_of(&selected, "a_0").factors.diversity_bonus, 0.0);
    }

    #[test]
    fn admission_follows_rank_order_not_diversity() {
        // The saturated source keeps its third slot even though c_0 is from a new source.
        let scores = vec![score("a_0", 0.9), score("a_1", 0.85), score("a_2", 0.8), score("c_0", 0.1)];
        let selected = select(&scores, 3, &SelectionConfig::default());

        let ids: Vec<_> = selected.iter().map(|s| s.chunk_id.as_str()).collect();
        assert_eq!(ids, ["a_0", "a_1", "a_2"]);
        assert!((selected[2].total_score - 0.64).abs() < 1e-12);
    }

    #[test]
    fn selection_is_resorted_after_adjustments() {
        // a_2 is penalised below b_0, which is also boosted.
        let scores = vec![score("a_0", 0.9), score("a_1", 0.8), score("a_2", 0.7), score("b_0", 0.6)];
        let selected = select(&scores, 10, &SelectionConfig::default());

        let ids: Vec<_> = selected.iter().map(|s| s.chunk_id.as_str()).collect();
        assert_eq!(ids, ["a_0", "a_1", "b_0", "a_2"]);
    }

    #[test]
    fn ids_without_separator_share_unknown_bucket() {
        let scores = vec![score("x", 0.9), score("y", 0.8), score("z", 0.7)];
        let selected = select(&scores, 10, &SelectionConfig::default());

        assert!((total_of(&selected, "z").total_score - 0.7 * 0.8).abs() < 1e-12);
        assert!(selected.iter().all(|s| s.factors.diversity_bonus == 0.0));
    }

    #[test]
    fn limit_bounds_selection_and_zero_selects_nothing() {
        let scores = vec![score("a_0", 0.9), score("b_0", 0.8), score("c_0", 0.7)];
        assert_eq!(select(&scores, 2, &SelectionConfig::default()).len(), 2);
        assert!(select(&scores, 0, &SelectionConfig::default()).is_empty());
        assert!(select(&[], 5, &SelectionConfig::default()).is_empty());
    }
}
