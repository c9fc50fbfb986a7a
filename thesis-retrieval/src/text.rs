//! Text heuristics used by the contextual-relevance and reliability factors.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum number of keywords kept per text.
pub const MAX_KEYWORDS: usize = 10;

const STOPWORDS: &[&str] = &[
    "that", "this", "with", "from", "have", "been", "were", "they", "their", "there", "these",
    "those", "which", "what", "when", "where", "will", "would", "could", "should", "about",
    "into", "than", "then", "also", "such", "more", "most", "some", "only", "other", "over",
];

static NUMBERED_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+(?:\.\d+)*\.?(?:\s|$)").expect("numbered section regex is valid")
});

static ARGUMENTATIVE_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:therefore|however|moreover|furthermore|consequently|nevertheless|thus|hence|in contrast|on the other hand|evidence suggests|research shows|studies (?:show|indicate|suggest)|this suggests)\b",
    )
    .expect("argumentative marker regex is valid")
});

static PRECISION_TERMINOLOGY: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Multi-word proper nouns, e.g. "Transformer Architecture", "New York".
        r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)+\b",
        // Four-digit years.
        r"\b(?:1[5-9]|20)\d{2}\b",
        // Statistical significance notation.
        r"\bp\s*[<=>≤]\s*0?\.\d+",
        // Named quantitative terms.
        r"(?i)\b(?:percent(?:age)?|coefficient|correlation|regression|variance|standard deviation|confidence interval|sample size|median|odds ratio|effect size)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("precision terminology regex is valid"))
    .collect()
});

/// Extract up to [`MAX_KEYWORDS`] distinct keywords, in order of first appearance.
///
/// Keywords are lower-cased alphanumeric tokens longer than three characters
/// that are not stopwords.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| t.chars().count() > 3) {
        let token = token.to_lowercase();
        if STOPWORDS.contains(&token.as_str()) || keywords.contains(&token) {
            continue;
        }
        keywords.push(token);
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
    }
    keywords
}

/// Shared keywords divided by the size of the larger set. Zero if either is empty.
pub fn overlap_ratio(a: &[String], b: &[String]) -> f64 {
    let larger = a.len().max(b.len());
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.iter().filter(|k| b.contains(k)).count();
    shared as f64 / larger as f64
}

/// Whether a heading looks like a numbered section ("1.", "2.3 Methods").
pub fn is_numbered_section(heading: &str) -> bool {
    NUMBERED_SECTION.is_match(heading)
}

/// Whether the text contains an argumentative discourse marker.
pub fn has_argumentative_markers(text: &str) -> bool {
    ARGUMENTATIVE_MARKERS.is_match(text)
}

/// Whether the text contains precise terminology: proper nouns, years,
/// significance notation or named quantitative terms.
pub fn has_precision_terminology(text: &str) -> bool {
    PRECISION_TERMINOLOGY.iter().any(|re| re.is_match(text))
}
