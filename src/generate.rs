//! Answer generation over a retrieved context.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::completion::{CompletionModel, CompletionRequest};
use crate::error::{RagError, Result};

const GENERATE_SYSTEM: &str = "Answer the question using the provided context. Think step by \
step. Respond with a JSON object: {\"reasoning\": \"...\", \"answer\": \"...\"}.";

/// One generated answer attempt: a reasoning trace plus the answer itself.
///
/// Ephemeral — held only for the duration of one request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    /// Step-by-step reasoning behind the answer.
    pub reasoning: String,
    /// The final answer string.
    pub answer: String,
}

/// Input fields for a generation call.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest<'a> {
    /// Retrieved document texts, concatenated in retrieval order.
    pub context: &'a str,
    /// The user's question.
    pub question: &'a str,
}

/// Output fields expected from a generation call; mirrors [`Candidate`].
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    /// Step-by-step reasoning behind the answer.
    pub reasoning: String,
    /// The final answer string.
    pub answer: String,
}

/// Produces (reasoning, answer) candidates for a question/context pair.
///
/// Performs no internal retry; retry and fan-out policy belong to the
/// orchestration layer.
pub struct AnswerGenerator {
    model: Arc<dyn CompletionModel>,
}

impl AnswerGenerator {
    /// Create a generator backed by the given completion model.
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    /// Generate one candidate answer for the question over the context.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] if the completion call fails or the
    /// response does not match the expected schema.
    pub async fn generate(&self, question: &str, context: &str) -> Result<Candidate> {
        let user = serde_json::to_string(&GenerateRequest { context, question })
            .map_err(|e| RagError::Generation(format!("failed to encode request: {e}")))?;
        let response = self
            .model
            .complete(CompletionRequest { system: GENERATE_SYSTEM.to_string(), user })
            .await?;

        let parsed: GenerateResponse = serde_json::from_str(&response.text).map_err(|e| {
            RagError::Generation(format!("generation output failed schema validation: {e}"))
        })?;
        debug!(model = self.model.name(), answer_chars = parsed.answer.len(), "generated candidate");
        Ok(Candidate { reasoning: parsed.reasoning, answer: parsed.answer })
    }
}
