//! Configuration for the answer pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the answer pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Number of top documents to retrieve per query.
    pub top_k: usize,
    /// Number of independent answer candidates to generate per request.
    /// A value of 1 disables scoring and selection.
    pub candidate_count: usize,
    /// Maximum length in characters of the assembled context passed to
    /// answer generation. Longer contexts are truncated, not rejected.
    pub max_context_chars: usize,
    /// Inclusive bounds for candidate quality scores. Scores outside this
    /// range are treated as scoring failures for that candidate.
    pub score_range: (f64, f64),
    /// Bound on the wall-clock duration of a single external call.
    pub request_timeout: Duration,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            candidate_count: 1,
            max_context_chars: 6000,
            score_range: (0.0, 1.0),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the number of top documents to retrieve per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the number of answer candidates generated per request.
    pub fn candidate_count(mut self, n: usize) -> Self {
        self.config.candidate_count = n;
        self
    }

    /// Set the maximum assembled context length in characters.
    pub fn max_context_chars(mut self, chars: usize) -> Self {
        self.config.max_context_chars = chars;
        self
    }

    /// Set the inclusive bounds for candidate quality scores.
    pub fn score_range(mut self, min: f64, max: f64) -> Self {
        self.config.score_range = (min, max);
        self
    }

    /// Set the bound on the duration of a single external call.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `top_k == 0` or `candidate_count == 0`
    /// - `max_context_chars == 0`
    /// - `score_range` is empty or not finite
    /// - `request_timeout` is zero
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if config.candidate_count == 0 {
            return Err(RagError::Config("candidate_count must be at least 1".to_string()));
        }
        if config.max_context_chars == 0 {
            return Err(RagError::Config(
                "max_context_chars must be greater than zero".to_string(),
            ));
        }
        let (min, max) = config.score_range;
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(RagError::Config(format!(
                "score_range [{min}, {max}] must be a non-empty finite interval"
            )));
        }
        if config.request_timeout.is_zero() {
            return Err(RagError::Config("request_timeout must be non-zero".to_string()));
        }
        Ok(config)
    }
}
