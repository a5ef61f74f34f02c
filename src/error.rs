//! Error types for the `ragpipe` crate.

use thiserror::Error;

/// Errors that can occur in the retrieval-augmented answer pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// The corpus source was unreadable or yielded zero usable documents.
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// An error occurred calling the embedding service.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during query reformulation or answer generation.
    #[error("Generation error: {0}")]
    Generation(String),

    /// A candidate's quality score was missing, unparsable, or out of range.
    #[error("Scoring error: {0}")]
    Scoring(String),

    /// The embedding index was searched before it was built.
    #[error("index not built: call build() before search()")]
    NotReady,

    /// A document index was outside the bounds of the corpus.
    #[error("document index {index} out of range for corpus of length {len}")]
    OutOfRange {
        /// The requested document index.
        index: usize,
        /// The corpus length at the time of the request.
        len: usize,
    },

    /// Every candidate generation or scoring attempt failed; no usable
    /// output exists for the request.
    #[error("no usable candidates survived generation and scoring")]
    NoCandidates,

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;
