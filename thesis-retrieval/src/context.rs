//! The retrieval input envelope.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};
use crate::scoring::ScoringWeights;

/// The writing task the evidence is being gathered for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DraftingContext {
    /// Drafting a whole thesis section.
    SectionDrafting,
    /// Rewriting a single paragraph.
    ParagraphRewrite,
    /// Free-form research question.
    ResearchQuery,
}

impl DraftingContext {
    /// The wire name of this context, e.g. `section_drafting`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SectionDrafting => "section_drafting",
            Self::ParagraphRewrite => "paragraph_rewrite",
            Self::ResearchQuery => "research_query",
        }
    }
}

impl std::str::FromStr for DraftingContext {
    type Err = RetrievalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "section_drafting" => Ok(Self::SectionDrafting),
            "paragraph_rewrite" => Ok(Self::ParagraphRewrite),
            "research_query" => Ok(Self::ResearchQuery),
            other => Err(RetrievalError::InvalidContext(format!("unknown context type '{other}'"))),
        }
    }
}

/// Inclusive publication-date bounds, as ISO-8601 dates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    /// Earliest accepted date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// Latest accepted date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Optional candidate filters.
///
/// Only `exclude_chunk_ids` narrows the candidate pool. The remaining fields
/// are carried through the contract but have no counterpart on [`Chunk`](crate::Chunk),
/// so they are neutral.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalFilters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_chunk_ids: Vec<String>,
}

/// Everything the engine needs to know about one retrieval request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalContext {
    /// The natural-language query.
    pub query: String,
    /// The project whose chunks form the candidate pool.
    pub project_id: String,
    /// The drafting task, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_type: Option<DraftingContext>,
    /// Title of the section being drafted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    /// Stated objective of the section being drafted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_objective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<RetrievalFilters>,
    /// Per-request weight override. Not normalised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<ScoringWeights>,
}

impl RetrievalContext {
    /// Create a context for `query` over the chunks of `project_id`.
    pub fn new(query: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self { query: query.into(), project_id: project_id.into(), ..Default::default() }
    }

    /// Set the drafting task.
    pub fn with_context_type(mut self, context_type: DraftingContext) -> Self {
        self.context_type = Some(context_type);
        self
    }

    /// Set the section title.
    pub fn with_section_title(mut self, title: impl Into<String>) -> Self {
        self.section_title = Some(title.into());
        self
    }

    /// Set the section objective.
    pub fn with_section_objective(mut self, objective: impl Into<String>) -> Self {
        self.section_objective = Some(objective.into());
        self
    }

    /// Set the candidate filters.
    pub fn with_filters(mut self, filters: RetrievalFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Override the scoring weights for this request.
    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Chunk IDs the caller asked to leave out.
    pub fn excluded_chunk_ids(&self) -> &[String] {
        self.filters.as_ref().map(|f| f.exclude_chunk_ids.as_slice()).unwrap_or(&[])
    }

    /// Check the caller contract.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidContext`] if:
    /// - `project_id` is empty
    /// - `query` is blank
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(RetrievalError::InvalidContext("project_id is required".to_string()));
        }
        if self.query.trim().is_empty() {
            return Err(RetrievalError::InvalidContext("query must not be blank".to_string()));
        }
        Ok(())
    }
}
