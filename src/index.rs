//! In-memory embedding index with cosine-similarity search.
//!
//! The [`EmbeddingIndex`] embeds every corpus document once at build time
//! into a `len x dimensions` matrix and answers top-k nearest-neighbor
//! queries against it. After [`build`](EmbeddingIndex::build) completes the
//! index is read-only and safe to share across concurrent requests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::corpus::{Corpus, Document};
use crate::embedding::Embedder;
use crate::error::{RagError, Result};

/// A retrieved [`Document`] paired with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// The retrieved document.
    pub document: Document,
    /// Cosine similarity to the query embedding (higher is more similar).
    pub score: f32,
}

/// Corpus embeddings, present only after a successful build.
struct IndexData {
    corpus: Arc<Corpus>,
    vectors: Vec<Vec<f32>>,
}

/// An embedding index over a corpus.
///
/// Construct with [`new`](EmbeddingIndex::new), then call
/// [`build`](EmbeddingIndex::build) exactly once before searching.
pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    data: Option<IndexData>,
}

impl EmbeddingIndex {
    /// Create an unbuilt index backed by the given embedder.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder, data: None }
    }

    /// Embed every document in the corpus, building the search matrix.
    ///
    /// Each document is embedded exactly once, in id order. Rebuilding
    /// replaces any previous matrix.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if the embedding service fails or
    /// returns a vector whose length differs from
    /// [`Embedder::dimensions`].
    pub async fn build(&mut self, corpus: Arc<Corpus>) -> Result<()> {
        let texts: Vec<&str> = corpus.iter().map(|d| d.text.as_str()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != corpus.len() {
            return Err(RagError::Embedding {
                provider: "index".to_string(),
                message: format!(
                    "embedding service returned {} vectors for {} documents",
                    vectors.len(),
                    corpus.len()
                ),
            });
        }
        for (doc, vector) in corpus.iter().zip(&vectors) {
            self.check_dimensions(&format!("document {}", doc.id), vector)?;
        }
        info!(
            document_count = corpus.len(),
            dimensions = self.embedder.dimensions(),
            "built embedding index"
        );
        self.data = Some(IndexData { corpus, vectors });
        Ok(())
    }

    /// Embed a query string using the index's embedder.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] on service failure or dimension
    /// mismatch.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.embedder.embed(text).await?;
        self.check_dimensions("query", &vector)?;
        Ok(vector)
    }

    /// Return the `k` documents most similar to the query embedding.
    ///
    /// Results are ordered by descending cosine similarity; equal scores
    /// are ordered by ascending document id so repeated searches are
    /// deterministic. If `k` exceeds the corpus size, every document is
    /// returned. An empty corpus yields an empty result, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotReady`] if the index has not been built.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<RetrievedDocument>> {
        let data = self.data.as_ref().ok_or(RagError::NotReady)?;

        let mut scored: Vec<RetrievedDocument> = data
            .corpus
            .iter()
            .zip(&data.vectors)
            .map(|(document, vector)| RetrievedDocument {
                document: document.clone(),
                score: cosine_similarity(vector, query_embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document.id.cmp(&b.document.id))
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// Number of indexed documents, or `None` before build.
    pub fn len(&self) -> Option<usize> {
        self.data.as_ref().map(|d| d.corpus.len())
    }

    /// Dimensionality of the index's embeddings.
    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    fn check_dimensions(&self, what: &str, vector: &[f32]) -> Result<()> {
        let expected = self.embedder.dimensions();
        if vector.len() != expected {
            return Err(RagError::Embedding {
                provider: "index".to_string(),
                message: format!(
                    "{what} embedding has {} dimensions, expected {expected}",
                    vector.len()
                ),
            });
        }
        Ok(())
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
