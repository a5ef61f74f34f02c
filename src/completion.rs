//! Completion model trait — the boundary to the external LLM service.
//!
//! Every pipeline stage that issues a completion call receives its
//! `Arc<dyn CompletionModel>` at construction; no component reads an
//! ambient global model.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A single completion request: a system instruction plus a user message.
///
/// Stage modules serialize their typed input fields into the user message
/// and expect the response text to parse into their typed output struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Instruction describing the task and the expected output schema.
    pub system: String,
    /// The stage's input fields, rendered as a JSON object.
    pub user: String,
}

/// The raw text produced by the completion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    /// Model output, expected to be a JSON object matching the stage schema.
    pub text: String,
}

/// A language model invoked for query reformulation, answer generation,
/// and candidate scoring.
///
/// Treated as a pure function over (model, request): it may fail, it may be
/// slow, and its output must be validated against the expected schema
/// before use.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Identifier of the underlying model (e.g. `gpt-4o-mini`).
    fn name(&self) -> &str;

    /// Run one completion call.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] on transport or service failure.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

/// A [`CompletionModel`] wrapper that bounds the wall-clock duration of
/// each call.
///
/// A timed-out call fails with [`RagError::Generation`], identical in
/// treatment to any other external-service failure at that stage.
pub struct TimedCompletion {
    inner: Arc<dyn CompletionModel>,
    timeout: Duration,
}

impl TimedCompletion {
    /// Wrap a completion model with a per-call timeout.
    pub fn new(inner: Arc<dyn CompletionModel>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl CompletionModel for TimedCompletion {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        tokio::time::timeout(self.timeout, self.inner.complete(request)).await.map_err(|_| {
            RagError::Generation(format!(
                "completion call to '{}' exceeded {:?}",
                self.inner.name(),
                self.timeout
            ))
        })?
    }
}
