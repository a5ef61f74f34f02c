//! Best-of-N candidate selection (self-consistency).
//!
//! The [`CandidatePool`] fans out N independent generation attempts, scores
//! each surviving candidate with an auxiliary evaluation call, and selects
//! the highest-scoring one. Individual attempt failures shrink the pool;
//! only an empty pool is fatal.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::completion::{CompletionModel, CompletionRequest};
use crate::error::{RagError, Result};
use crate::generate::{AnswerGenerator, Candidate};

const SCORE_SYSTEM: &str = "Evaluate how well the candidate's reasoning and answer address the \
question. Respond with a JSON object: {\"score\": <number>} where the score falls within the \
stated range, higher meaning better.";

/// A candidate paired with its quality score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// The generated candidate.
    pub candidate: Candidate,
    /// Quality score within the pool's configured range.
    pub score: f64,
}

/// Input fields for a scoring call.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreRequest<'a> {
    /// The original question.
    pub question: &'a str,
    /// The candidate's reasoning trace.
    pub reasoning: &'a str,
    /// The candidate's answer.
    pub answer: &'a str,
    /// Inclusive score bounds the evaluator must stay within.
    pub score_range: (f64, f64),
}

/// Output fields expected from a scoring call.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreResponse {
    /// The numeric quality score.
    pub score: f64,
}

/// Generates, scores, and selects among answer candidates.
pub struct CandidatePool {
    generator: Arc<AnswerGenerator>,
    scorer: Arc<dyn CompletionModel>,
    score_range: (f64, f64),
}

impl CandidatePool {
    /// Create a pool from a generator, a scoring model, and the inclusive
    /// score bounds the evaluator is held to.
    pub fn new(
        generator: Arc<AnswerGenerator>,
        scorer: Arc<dyn CompletionModel>,
        score_range: (f64, f64),
    ) -> Self {
        Self { generator, scorer, score_range }
    }

    /// Run `n` independent generation attempts and return the survivors in
    /// generation order.
    ///
    /// The attempts are mutually independent and dispatched concurrently;
    /// results are reassembled by dispatch index, so the returned order is
    /// the generation order regardless of completion order. A failed
    /// attempt is dropped and logged, not fatal.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NoCandidates`] if every attempt fails.
    pub async fn generate_candidates(
        &self,
        question: &str,
        context: &str,
        n: usize,
    ) -> Result<Vec<Candidate>> {
        let attempts = (0..n).map(|_| self.generator.generate(question, context));
        let results = join_all(attempts).await;

        let mut candidates = Vec::with_capacity(n);
        for (attempt, result) in results.into_iter().enumerate() {
            match result {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => warn!(attempt, error = %e, "candidate generation attempt failed"),
            }
        }
        if candidates.is_empty() {
            return Err(RagError::NoCandidates);
        }
        info!(requested = n, survived = candidates.len(), "generated candidate pool");
        Ok(candidates)
    }

    /// Score one candidate's reasoning and answer against the question.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Scoring`] if the evaluation call fails, the
    /// response does not match the expected schema, or the score falls
    /// outside the configured range.
    pub async fn score(&self, question: &str, candidate: &Candidate) -> Result<f64> {
        let request = ScoreRequest {
            question,
            reasoning: &candidate.reasoning,
            answer: &candidate.answer,
            score_range: self.score_range,
        };
        let user = serde_json::to_string(&request)
            .map_err(|e| RagError::Scoring(format!("failed to encode request: {e}")))?;
        let response = self
            .scorer
            .complete(CompletionRequest { system: SCORE_SYSTEM.to_string(), user })
            .await
            .map_err(|e| RagError::Scoring(format!("evaluation call failed: {e}")))?;

        let parsed: ScoreResponse = serde_json::from_str(&response.text)
            .map_err(|e| RagError::Scoring(format!("score output failed schema validation: {e}")))?;

        let (min, max) = self.score_range;
        if !parsed.score.is_finite() || parsed.score < min || parsed.score > max {
            return Err(RagError::Scoring(format!(
                "score {} outside range [{min}, {max}]",
                parsed.score
            )));
        }
        Ok(parsed.score)
    }

    /// Score every candidate concurrently, dropping the ones that cannot
    /// be scored.
    ///
    /// Generation order is preserved among the survivors.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NoCandidates`] if no candidate receives a valid
    /// score.
    pub async fn score_all(
        &self,
        question: &str,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<ScoredCandidate>> {
        let scores = join_all(candidates.iter().map(|c| self.score(question, c))).await;

        let mut scored = Vec::with_capacity(candidates.len());
        for (position, (candidate, result)) in candidates.into_iter().zip(scores).enumerate() {
            match result {
                Ok(score) => scored.push(ScoredCandidate { candidate, score }),
                Err(e) => warn!(position, error = %e, "dropping unscorable candidate"),
            }
        }
        if scored.is_empty() {
            return Err(RagError::NoCandidates);
        }
        Ok(scored)
    }

    /// Generate `n` candidates, score them, and return the best one.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NoCandidates`] if generation or scoring leaves
    /// the pool empty.
    pub async fn best_of(
        &self,
        question: &str,
        context: &str,
        n: usize,
    ) -> Result<ScoredCandidate> {
        let candidates = self.generate_candidates(question, context, n).await?;
        let scored = self.score_all(question, candidates).await?;
        select_best(scored)
    }
}

/// Return the candidate with the maximum score.
///
/// Among equal top scores the earliest-generated candidate wins; the input
/// order is the generation order, so selection is deterministic.
///
/// # Errors
///
/// Returns [`RagError::NoCandidates`] if `scored` is empty.
pub fn select_best(scored: Vec<ScoredCandidate>) -> Result<ScoredCandidate> {
    let mut best: Option<ScoredCandidate> = None;
    for entry in scored {
        match &best {
            Some(current) if entry.score <= current.score => {}
            _ => best = Some(entry),
        }
    }
    best.ok_or(RagError::NoCandidates)
}
