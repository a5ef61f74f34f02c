//! # ragpipe
//!
//! A retrieval-augmented answer pipeline with multi-candidate selection.
//!
//! ## Overview
//!
//! One request flows through four stages:
//!
//! 1. **Reformulate** — rewrite the question into a retrieval-friendly
//!    search query (optional; falls back to the raw question on failure).
//! 2. **Retrieve** — top-k cosine-similarity search over a corpus embedded
//!    once at startup ([`EmbeddingIndex`]).
//! 3. **Generate** — produce a (reasoning, answer) [`Candidate`] from the
//!    question and the retrieved context.
//! 4. **Select** — in multi-candidate mode, fan out N independent
//!    generation attempts, score each with an auxiliary evaluation call,
//!    and keep the best ([`CandidatePool`]).
//!
//! External embedding and completion services sit behind the [`Embedder`]
//! and [`CompletionModel`] traits; every component receives its service
//! handle at construction. The `openai` feature provides real backends;
//! the [`mock`] module provides deterministic offline ones.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragpipe::{Corpus, EmbeddingIndex, RagConfig, RagPipeline};
//! use ragpipe::mock::{MockCompletionModel, MockEmbedder};
//!
//! let corpus = Arc::new(Corpus::load("corpus.jsonl", 6000)?);
//! let mut index = EmbeddingIndex::new(Arc::new(MockEmbedder::new(512)));
//! index.build(Arc::clone(&corpus)).await?;
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::builder().top_k(3).candidate_count(3).build()?)
//!     .index(Arc::new(index))
//!     .generation_model(Arc::new(MockCompletionModel::new()))
//!     .scoring_model(Arc::new(MockCompletionModel::new()))
//!     .build()?;
//!
//! let answer = pipeline.answer("What is the capital of France?").await?;
//! println!("{}", answer.answer);
//! ```

pub mod completion;
pub mod config;
pub mod consensus;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod index;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod reformulate;

pub use completion::{CompletionModel, CompletionRequest, CompletionResponse, TimedCompletion};
pub use config::{RagConfig, RagConfigBuilder};
pub use consensus::{CandidatePool, ScoredCandidate, select_best};
pub use corpus::{Corpus, Document, MAX_DOCUMENT_CHARS};
pub use embedding::{Embedder, TimedEmbedder};
pub use error::{RagError, Result};
pub use generate::{AnswerGenerator, Candidate};
pub use index::{EmbeddingIndex, RetrievedDocument};
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatModel, OpenAIEmbedder};
pub use pipeline::{Query, RagAnswer, RagPipeline, RagPipelineBuilder};
pub use reformulate::QueryReformulator;
