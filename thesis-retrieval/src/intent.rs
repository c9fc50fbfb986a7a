//! Advisory query-intent classification.
//!
//! The classifier counts regex pattern matches per intent. Its output is
//! logged alongside each retrieval but does not change scoring weights.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// What the query is asking for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    Factual,
    Analytical,
    Comparative,
    Definitional,
}

impl QueryIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Factual => "factual",
            Self::Analytical => "analytical",
            Self::Comparative => "comparative",
            Self::Definitional => "definitional",
        }
    }

    /// The retrieval posture suggested for this intent.
    pub fn posture(&self) -> RetrievalPosture {
        match self {
            Self::Comparative => RetrievalPosture::Diverse,
            Self::Definitional => RetrievalPosture::Focused,
            Self::Factual | Self::Analytical => RetrievalPosture::Broad,
        }
    }
}

/// Suggested shape of the evidence set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalPosture {
    /// Wide coverage of the topic.
    Broad,
    /// Few, tightly matching chunks.
    Focused,
    /// Evidence spread across many sources.
    Diverse,
}

/// Result of classifying a query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IntentClassification {
    pub intent: QueryIntent,
    /// `min(1, matched patterns / 2)` for the chosen intent.
    pub confidence: f64,
    pub posture: RetrievalPosture,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).expect("intent regex is valid")).collect()
}

static FACTUAL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)^\s*(?:what|who|when|where|which)\b",
        r"(?i)\bhow (?:many|much|often|long)\b",
        r"(?i)\b(?:is|are|was|were) there\b",
        r"(?i)\b(?:list|name|identify)\b",
    ])
});

static ANALYTICAL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\bwhy\b",
        r"(?i)\bhow (?:does|do|did|can|could)\b",
        r"(?i)\b(?:analy[sz]e|analysis|evaluate|assess|examine|explain)\b",
        r"(?i)\b(?:impact|effect|influence|cause|consequence)s?\b",
    ])
});

static COMPARATIVE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(?:compare|comparison|comparing)\b",
        r"(?i)\b(?:versus|vs\.?)(?:\s|$)",
        r"(?i)\bdifference(?:s)? between\b",
        r"(?i)\b(?:similarit(?:y|ies)|contrast|differ)\b",
    ])
});

static DEFINITIONAL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(?:define|definition)\b",
        r"(?i)\bmeaning of\b",
        r"(?i)\bwhat (?:does|do) .+ mean\b",
        r"(?i)\b(?:what is meant by|refers? to|concept of)\b",
    ])
});

fn count_matches(patterns: &[Regex], query: &str) -> usize {
    patterns.iter().filter(|re| re.is_match(query)).count()
}

/// Classify the intent of `query`.
///
/// The intent with the most matching patterns wins. Ties and queries with no
/// matches fall back to [`QueryIntent::Analytical`]. Confidence is always
/// derived from the leading match count, so a tie still reports the evidence
/// that was found.
pub fn classify(query: &str) -> IntentClassification {
    let counts = [
        (QueryIntent::Factual, count_matches(&FACTUAL, query)),
        (QueryIntent::Analytical, count_matches(&ANALYTICAL, query)),
        (QueryIntent::Comparative, count_matches(&COMPARATIVE, query)),
        (QueryIntent::Definitional, count_matches(&DEFINITIONAL, query)),
    ];

    let best = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let leaders: Vec<QueryIntent> =
        counts.iter().filter(|(_, n)| *n == best).map(|(intent, _)| *intent).collect();

    let intent = match leaders.as_slice() {
        [only] if best > 0 => *only,
        _ => QueryIntent::Analytical,
    };

    IntentClassification {
        intent,
        confidence: (best as f64 / 2.0).min(1.0),
        posture: intent.posture(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn what_is_question_is_factual() {
        let c = classify("What is machine learning?");
        assert_eq!(c.intent, QueryIntent::Factual);
        assert!(c.confidence >= 0.5);
        assert_eq!(c.posture, RetrievalPosture::Broad);
    }

    #[test]
    fn comparison_is_diverse() {
        let c = classify("Compare supervised versus unsupervised learning");
        assert_eq!(c.intent, QueryIntent::Comparative);
        assert_eq!(c.confidence, 1.0);
        assert_eq!(c.posture, RetrievalPosture::Diverse);
    }

    #[test]
    fn definition_is_focused() {
        let c = classify("Give a definition of epistemic injustice");
        assert_eq!(c.intent, QueryIntent::Definitional);
        assert_eq!(c.confidence, 0.5);
        assert_eq!(c.posture, RetrievalPosture::Focused);
    }

    #[test]
    fn analytical_question() {
        let c = classify("Why does the impact of automation vary by sector?");
        assert_eq!(c.intent, QueryIntent::Analytical);
        assert_eq!(c.confidence, 1.0);
    }

    #[test]
    fn no_match_defaults_to_analytical_with_zero_confidence() {
        let c = classify("algorithmic fairness in lending");
        assert_eq!(c.intent, QueryIntent::Analytical);
        assert_eq!(c.confidence, 0.0);
        assert_eq!(c.posture, RetrievalPosture::Broad);
    }

    #[test]
    fn tie_defaults_to_analytical() {
        // One factual pattern ("which") and one comparative pattern ("contrast").
        let c = classify("Which contrast matters");
        assert_eq!(c.intent, QueryIntent::Analytical);
        assert_eq!(c.confidence, 0.5);
        assert_eq!(c.posture, RetrievalPosture::Broad);
    }
}
