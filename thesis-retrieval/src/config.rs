//! Configuration for the retrieval engine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};
use crate::scoring::{MISSING_EMBEDDING_SIMILARITY, ScoringWeights};

/// Parameters of the diversity-aware selection pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelectionConfig {
    /// Chunks per source admitted before the penalty applies.
    pub same_source_allowance: usize,
    /// Multiplier applied to each chunk admitted beyond the allowance.
    pub same_source_penalty: f64,
    /// Bonus for a chunk that is the only one selected from its source.
    pub single_source_bonus: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { same_source_allowance: 2, same_source_penalty: 0.8, single_source_bonus: 0.05 }
    }
}

/// Configuration parameters for the retrieval engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum number of chunks returned when the caller does not say otherwise.
    pub max_chunks: usize,
    /// Weights used when the request carries no override.
    pub weights: ScoringWeights,
    pub selection: SelectionConfig,
    /// Similarity assigned to chunks without an embedding.
    pub missing_embedding_similarity: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_chunks: 10,
            weights: ScoringWeights::default(),
            selection: SelectionConfig::default(),
            missing_embedding_similarity: MISSING_EMBEDDING_SIMILARITY,
        }
    }
}

impl RetrievalConfig {
    /// Create a new builder for constructing a [`RetrievalConfig`].
    pub fn builder() -> RetrievalConfigBuilder {
        RetrievalConfigBuilder::default()
    }

    /// Load and validate a configuration from a JSON file.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::ConfigError`] if the file cannot be read or
    /// parsed, or if the values fail validation.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RetrievalError::ConfigError(format!("failed to read '{}': {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            RetrievalError::ConfigError(format!("failed to parse '{}': {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate parameter ranges.
    ///
    /// Weights are deliberately not checked: overrides need not sum to 1.0.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::ConfigError`] if:
    /// - `max_chunks == 0`
    /// - `same_source_penalty` is outside `(0, 1]`
    /// - `single_source_bonus` is negative
    /// - `missing_embedding_similarity` is outside `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        if self.max_chunks == 0 {
            return Err(RetrievalError::ConfigError(
                "max_chunks must be greater than zero".to_string(),
            ));
        }
        let penalty = self.selection.same_source_penalty;
        if !(penalty > 0.0 && penalty <= 1.0) {
            return Err(RetrievalError::ConfigError(format!(
                "same_source_penalty ({penalty}) must be in (0, 1]"
            )));
        }
        if self.selection.single_source_bonus < 0.0 {
            return Err(RetrievalError::ConfigError(format!(
                "single_source_bonus ({}) must not be negative",
                self.selection.single_source_bonus
            )));
        }
        if !(0.0..=1.0).contains(&self.missing_embedding_similarity) {
            return Err(RetrievalError::ConfigError(format!(
                "missing_embedding_similarity ({}) must be in [0, 1]",
                self.missing_embedding_similarity
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RetrievalConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetrievalConfigBuilder {
    config: RetrievalConfig,
}

impl RetrievalConfigBuilder {
    /// Set the default number of chunks to select.
    pub fn max_chunks(mut self, max_chunks: usize) -> Self {
        self.config.max_chunks = max_chunks;
        self
    }

    /// Set the default scoring weights.
    pub fn weights(mut self, weights: ScoringWeights) -> Self {
        self.config.weights = weights;
        self
    }

    /// Set how many chunks per source are admitted before the penalty applies.
    pub fn same_source_allowance(mut self, allowance: usize) -> Self {
        self.config.selection.same_source_allowance = allowance;
        self
    }

    /// Set the multiplier applied beyond the per-source allowance.
    pub fn same_source_penalty(mut self, penalty: f64) -> Self {
        self.config.selection.same_source_penalty = penalty;
        self
    }

    /// Set the bonus for sole representatives of a source.
    pub fn single_source_bonus(mut self, bonus: f64) -> Self {
        self.config.selection.single_source_bonus = bonus;
        self
    }

    /// Set the similarity assigned to chunks without an embedding.
    pub fn missing_embedding_similarity(mut self, similarity: f64) -> Self {
        self.config.missing_embedding_similarity = similarity;
        self
    }

    /// Build the [`RetrievalConfig`], validating parameter ranges.
    ///
    /// # Errors
    ///
    /// See [`RetrievalConfig::validate`].
    pub fn build(self) -> Result<RetrievalConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
