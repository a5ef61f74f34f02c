//! Mock embedding and completion backends for tests and examples.

use std::collections::VecDeque;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::completion::{CompletionModel, CompletionRequest, CompletionResponse};
use crate::embedding::Embedder;
use crate::error::{RagError, Result};

/// A deterministic, offline [`Embedder`] using token-hash bag-of-words
/// vectors.
///
/// Each whitespace-and-punctuation-separated token is lowercased and hashed
/// into one of `dimensions` buckets; the vector counts bucket hits. Texts
/// sharing more tokens therefore score higher cosine similarity, which is
/// enough to exercise retrieval behavior without a real embedding service.
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    /// Create a mock embedder producing vectors of the given dimension.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimensions;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// An [`Embedder`] that always fails, for exercising degraded retrieval.
pub struct FailingEmbedder {
    dimensions: usize,
}

impl FailingEmbedder {
    /// Create a failing embedder reporting the given dimension.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::Embedding {
            provider: "mock".to_string(),
            message: "simulated embedding failure".to_string(),
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// A scripted [`CompletionModel`] that replays queued responses in order.
///
/// Each call pops the next entry: `Ok` text is returned as the completion
/// output, `Err` text becomes a [`RagError::Generation`]. An exhausted
/// queue is also a failure, so tests catch unexpected extra calls.
pub struct MockCompletionModel {
    responses: Mutex<VecDeque<std::result::Result<String, String>>>,
}

impl MockCompletionModel {
    /// Create a model with an empty script.
    pub fn new() -> Self {
        Self { responses: Mutex::new(VecDeque::new()) }
    }

    /// Create a model that replays the given successful responses.
    pub fn with_responses(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let model = Self::new();
        for response in responses {
            model.push_text(response);
        }
        model
    }

    /// Queue a successful completion output.
    pub fn push_text(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
    }

    /// Queue a simulated service failure.
    pub fn push_error(&self, message: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Err(message.into()));
    }
}

impl Default for MockCompletionModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionModel for MockCompletionModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(CompletionResponse { text }),
            Some(Err(message)) => Err(RagError::Generation(message)),
            None => Err(RagError::Generation("mock response queue exhausted".to_string())),
        }
    }
}
