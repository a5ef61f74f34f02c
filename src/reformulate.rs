//! Query reformulation: rewriting a user question into a search query.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::completion::{CompletionModel, CompletionRequest};
use crate::error::{RagError, Result};

const REFORMULATE_SYSTEM: &str = "Rewrite the user's question as a search query that maximizes \
retrieval recall and precision over a technical document corpus. Respond with a JSON object: \
{\"search_query\": \"...\"}.";

/// Input fields for a reformulation call.
#[derive(Debug, Clone, Serialize)]
pub struct ReformulateRequest<'a> {
    /// The user's question, verbatim.
    pub question: &'a str,
}

/// Output fields expected from a reformulation call.
#[derive(Debug, Clone, Deserialize)]
pub struct ReformulateResponse {
    /// The rewritten query to run against the embedding index.
    pub search_query: String,
}

/// Rewrites user questions into retrieval-friendly search queries.
///
/// One completion call per question. Callers that can tolerate degraded
/// retrieval may fall back to the raw question when reformulation fails;
/// that fallback is the caller's policy, not this component's.
pub struct QueryReformulator {
    model: Arc<dyn CompletionModel>,
}

impl QueryReformulator {
    /// Create a reformulator backed by the given completion model.
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    /// Rewrite a question into a search query.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] if the completion call fails or the
    /// response does not contain a non-empty `search_query` field.
    pub async fn reformulate(&self, question: &str) -> Result<String> {
        let user = serde_json::to_string(&ReformulateRequest { question })
            .map_err(|e| RagError::Generation(format!("failed to encode request: {e}")))?;
        let response = self
            .model
            .complete(CompletionRequest { system: REFORMULATE_SYSTEM.to_string(), user })
            .await?;

        let parsed: ReformulateResponse = serde_json::from_str(&response.text).map_err(|e| {
            RagError::Generation(format!("reformulation output failed schema validation: {e}"))
        })?;
        if parsed.search_query.trim().is_empty() {
            return Err(RagError::Generation("reformulation produced an empty query".to_string()));
        }
        debug!(model = self.model.name(), search_query = %parsed.search_query, "reformulated query");
        Ok(parsed.search_query)
    }
}
