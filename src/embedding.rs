//! Embedder trait for generating vector embeddings from text.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A provider that generates fixed-dimension vector embeddings from text.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. The default [`embed_batch`](Embedder::embed_batch)
/// implementation calls [`embed`](Embedder::embed) sequentially; backends
/// that support native batching should override it.
///
/// Embedders cache nothing at this layer; caching, if desired, belongs to
/// the caller.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding vector for a single text input.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] on transport or quota failure.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// The default implementation calls [`embed`](Embedder::embed)
    /// sequentially for each input. Override this method if the backend
    /// supports native batch embedding for better throughput.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

/// An [`Embedder`] wrapper that bounds the wall-clock duration of each call.
///
/// A timed-out call is reported as an [`RagError::Embedding`], the same as
/// any other failure of the underlying provider.
pub struct TimedEmbedder {
    inner: Arc<dyn Embedder>,
    timeout: Duration,
}

impl TimedEmbedder {
    /// Wrap an embedder with a per-call timeout.
    pub fn new(inner: Arc<dyn Embedder>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl Embedder for TimedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        tokio::time::timeout(self.timeout, self.inner.embed(text)).await.map_err(|_| {
            RagError::Embedding {
                provider: "timeout".to_string(),
                message: format!("embedding call exceeded {:?}", self.timeout),
            }
        })?
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        tokio::time::timeout(self.timeout, self.inner.embed_batch(texts)).await.map_err(|_| {
            RagError::Embedding {
                provider: "timeout".to_string(),
                message: format!("batch embedding call exceeded {:?}", self.timeout),
            }
        })?
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}
