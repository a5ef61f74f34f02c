//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] runs one request through four sequential stages:
//! reformulate the question, retrieve the top-k documents, generate one or
//! more candidate answers, and (in multi-candidate mode) score and select
//! the best candidate. There is no shared mutable state across requests;
//! the pipeline borrows itself immutably throughout and can serve
//! concurrent requests over the shared index.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::completion::{CompletionModel, TimedCompletion};
use crate::config::RagConfig;
use crate::consensus::CandidatePool;
use crate::corpus::truncate_chars;
use crate::error::{RagError, Result};
use crate::generate::AnswerGenerator;
use crate::index::{EmbeddingIndex, RetrievedDocument};
use crate::reformulate::QueryReformulator;

/// A per-request query, raw and (when reformulation succeeded) rewritten.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Query {
    /// The question as the caller supplied it.
    pub raw_text: String,
    /// The rewritten search query, absent when reformulation was skipped
    /// or fell back.
    pub reformulated_text: Option<String>,
}

impl Query {
    /// The text to run against the embedding index: the reformulated query
    /// when present, otherwise the raw question.
    pub fn search_text(&self) -> &str {
        self.reformulated_text.as_deref().unwrap_or(&self.raw_text)
    }
}

/// The outcome of one answer request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    /// The query actually used for retrieval.
    pub query: Query,
    /// Retrieved documents in descending similarity order.
    pub documents: Vec<RetrievedDocument>,
    /// Reasoning trace of the selected candidate.
    pub reasoning: String,
    /// Answer of the selected candidate.
    pub answer: String,
    /// Quality score of the selected candidate; present only in
    /// multi-candidate mode.
    pub score: Option<f64>,
}

impl RagAnswer {
    /// The search query that produced [`documents`](RagAnswer::documents).
    pub fn search_query(&self) -> &str {
        self.query.search_text()
    }
}

/// The RAG pipeline orchestrator.
///
/// Construct one via [`RagPipeline::builder()`]. The index must already be
/// built; the pipeline never mutates it.
pub struct RagPipeline {
    config: RagConfig,
    index: Arc<EmbeddingIndex>,
    reformulator: Option<QueryReformulator>,
    generator: Arc<AnswerGenerator>,
    pool: Option<CandidatePool>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Answer a question: reformulate, retrieve, generate, and in
    /// multi-candidate mode score and select.
    ///
    /// Reformulation failure degrades to the raw question; retrieval
    /// failure degrades to an empty context. Both are logged, never fatal.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotReady`] if the index was never built,
    /// [`RagError::Generation`] if single-candidate generation fails, and
    /// [`RagError::NoCandidates`] if multi-candidate generation or scoring
    /// leaves the pool empty.
    pub async fn answer(&self, question: &str) -> Result<RagAnswer> {
        // Stage 1: reformulate, falling back to the raw question.
        let query = self.reformulate(question).await;

        // Stage 2: retrieve, falling back to an empty context.
        let documents = self.retrieve(query.search_text()).await?;

        // Stage 3: assemble context in retrieval order, bounded in size.
        let context = build_context(&documents, self.config.max_context_chars);

        // Stage 4: generate, and select among candidates when configured.
        let (reasoning, answer, score) = match &self.pool {
            Some(pool) => {
                let best = pool.best_of(question, &context, self.config.candidate_count).await?;
                (best.candidate.reasoning, best.candidate.answer, Some(best.score))
            }
            None => {
                let candidate = self.generator.generate(question, &context).await?;
                (candidate.reasoning, candidate.answer, None)
            }
        };

        info!(
            retrieved = documents.len(),
            scored = score.is_some(),
            "answered question"
        );
        Ok(RagAnswer { query, documents, reasoning, answer, score })
    }

    async fn reformulate(&self, question: &str) -> Query {
        let reformulated_text = match &self.reformulator {
            Some(reformulator) => match reformulator.reformulate(question).await {
                Ok(search_query) => Some(search_query),
                Err(e) => {
                    warn!(error = %e, "reformulation failed; falling back to raw question");
                    None
                }
            },
            None => None,
        };
        Query { raw_text: question.to_string(), reformulated_text }
    }

    /// Embed the search query and run top-k search. An embedding-service
    /// failure degrades to an empty result; an unbuilt index propagates.
    async fn retrieve(&self, search_text: &str) -> Result<Vec<RetrievedDocument>> {
        match self.index.embed_query(search_text).await {
            Ok(query_embedding) => self.index.search(&query_embedding, self.config.top_k),
            Err(e) => {
                warn!(error = %e, "retrieval failed; proceeding with empty context");
                Ok(Vec::new())
            }
        }
    }
}

/// Concatenate retrieved document texts in retrieval order, truncated to
/// `max_chars` characters.
fn build_context(documents: &[RetrievedDocument], max_chars: usize) -> String {
    let joined = documents
        .iter()
        .map(|d| d.document.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_chars(&joined, max_chars)
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `index`, and `generation_model` are required; the
/// reformulation and scoring models are optional. A scoring model is
/// required once `candidate_count > 1`.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    index: Option<Arc<EmbeddingIndex>>,
    reformulation_model: Option<Arc<dyn CompletionModel>>,
    generation_model: Option<Arc<dyn CompletionModel>>,
    scoring_model: Option<Arc<dyn CompletionModel>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the (already built) embedding index.
    ///
    /// The index's embedder is outside the pipeline's reach; to bound
    /// query-embedding calls, wrap the embedder in
    /// [`TimedEmbedder`](crate::embedding::TimedEmbedder) before
    /// constructing the index.
    pub fn index(mut self, index: Arc<EmbeddingIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set an optional model for query reformulation. Without one the raw
    /// question is used as the search query.
    pub fn reformulation_model(mut self, model: Arc<dyn CompletionModel>) -> Self {
        self.reformulation_model = Some(model);
        self
    }

    /// Set the model used for answer generation.
    pub fn generation_model(mut self, model: Arc<dyn CompletionModel>) -> Self {
        self.generation_model = Some(model);
        self
    }

    /// Set the model used for candidate scoring. Required when
    /// `candidate_count > 1`.
    pub fn scoring_model(mut self, model: Arc<dyn CompletionModel>) -> Self {
        self.scoring_model = Some(model);
        self
    }

    /// Build the [`RagPipeline`], validating that all required parts are
    /// present.
    ///
    /// Every completion model is wrapped in a [`TimedCompletion`] bounded
    /// by the configured `request_timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing, or if
    /// `candidate_count > 1` without a scoring model.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::Config("config is required".to_string()))?;
        let index = self.index.ok_or_else(|| RagError::Config("index is required".to_string()))?;
        let generation_model = self
            .generation_model
            .ok_or_else(|| RagError::Config("generation_model is required".to_string()))?;

        let timeout = config.request_timeout;
        let timed = |model: Arc<dyn CompletionModel>| -> Arc<dyn CompletionModel> {
            Arc::new(TimedCompletion::new(model, timeout))
        };

        let generator = Arc::new(AnswerGenerator::new(timed(generation_model)));
        let reformulator =
            self.reformulation_model.map(|model| QueryReformulator::new(timed(model)));

        let pool = if config.candidate_count > 1 {
            let scorer = self.scoring_model.ok_or_else(|| {
                RagError::Config(
                    "scoring_model is required when candidate_count > 1".to_string(),
                )
            })?;
            Some(CandidatePool::new(Arc::clone(&generator), timed(scorer), config.score_range))
        } else {
            None
        };

        Ok(RagPipeline { config, index, reformulator, generator, pool })
    }
}
