//! Candidate pool tests: fan-out degradation, score validation, and
//! best-candidate selection.

use std::sync::Arc;

use ragpipe::consensus::{CandidatePool, ScoredCandidate, select_best};
use ragpipe::error::RagError;
use ragpipe::generate::{AnswerGenerator, Candidate};
use ragpipe::mock::MockCompletionModel;

fn candidate(answer: &str) -> Candidate {
    Candidate { reasoning: format!("because {answer}"), answer: answer.to_string() }
}

fn candidate_json(answer: &str) -> String {
    format!("{{\"reasoning\": \"because {answer}\", \"answer\": \"{answer}\"}}")
}

fn pool(generation: MockCompletionModel, scoring: MockCompletionModel) -> CandidatePool {
    let generator = Arc::new(AnswerGenerator::new(Arc::new(generation)));
    CandidatePool::new(generator, Arc::new(scoring), (0.0, 1.0))
}

#[test]
fn select_best_prefers_earliest_of_tied_maxima() {
    let scored = vec![
        ScoredCandidate { candidate: candidate("A"), score: 0.4 },
        ScoredCandidate { candidate: candidate("B"), score: 0.9 },
        ScoredCandidate { candidate: candidate("C"), score: 0.9 },
    ];
    let best = select_best(scored).unwrap();
    assert_eq!(best.candidate.answer, "B");
    assert_eq!(best.score, 0.9);
}

#[test]
fn select_best_of_empty_is_no_candidates() {
    let err = select_best(Vec::new()).unwrap_err();
    assert!(matches!(err, RagError::NoCandidates));
}

#[tokio::test]
async fn one_failed_attempt_shrinks_the_pool() {
    let generation = MockCompletionModel::new();
    generation.push_text(candidate_json("first"));
    generation.push_error("simulated outage");
    generation.push_text(candidate_json("third"));

    let pool = pool(generation, MockCompletionModel::new());
    let candidates = pool.generate_candidates("q", "ctx", 3).await.unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].answer, "first");
    assert_eq!(candidates[1].answer, "third");
}

#[tokio::test]
async fn all_attempts_failing_is_no_candidates() {
    let generation = MockCompletionModel::new();
    for _ in 0..3 {
        generation.push_error("simulated outage");
    }
    let pool = pool(generation, MockCompletionModel::new());
    let err = pool.generate_candidates("q", "ctx", 3).await.unwrap_err();
    assert!(matches!(err, RagError::NoCandidates));
}

#[tokio::test]
async fn invalid_generation_schema_is_dropped() {
    let generation = MockCompletionModel::new();
    generation.push_text("not a json object");
    generation.push_text(candidate_json("ok"));

    let pool = pool(generation, MockCompletionModel::new());
    let candidates = pool.generate_candidates("q", "ctx", 2).await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].answer, "ok");
}

#[tokio::test]
async fn score_within_range_is_accepted() {
    let scoring = MockCompletionModel::with_responses(["{\"score\": 0.75}"]);
    let pool = pool(MockCompletionModel::new(), scoring);
    let score = pool.score("q", &candidate("A")).await.unwrap();
    assert_eq!(score, 0.75);
}

#[tokio::test]
async fn out_of_range_score_is_scoring_error() {
    let scoring = MockCompletionModel::with_responses(["{\"score\": 1.5}"]);
    let pool = pool(MockCompletionModel::new(), scoring);
    let err = pool.score("q", &candidate("A")).await.unwrap_err();
    assert!(matches!(err, RagError::Scoring(_)));
}

#[tokio::test]
async fn unparsable_score_is_scoring_error() {
    let scoring = MockCompletionModel::with_responses(["{\"score\": \"good\"}"]);
    let pool = pool(MockCompletionModel::new(), scoring);
    let err = pool.score("q", &candidate("A")).await.unwrap_err();
    assert!(matches!(err, RagError::Scoring(_)));
}

#[tokio::test]
async fn unscorable_candidates_are_dropped_in_generation_order() {
    let scoring = MockCompletionModel::new();
    scoring.push_text("{\"score\": 0.2}");
    scoring.push_text("{\"score\": 9.0}"); // out of range, dropped
    scoring.push_text("{\"score\": 0.8}");

    let pool = pool(MockCompletionModel::new(), scoring);
    let candidates = vec![candidate("A"), candidate("B"), candidate("C")];
    let scored = pool.score_all("q", candidates).await.unwrap();
    let answers: Vec<&str> = scored.iter().map(|s| s.candidate.answer.as_str()).collect();
    assert_eq!(answers, vec!["A", "C"]);
}

#[tokio::test]
async fn pool_emptied_by_scoring_is_no_candidates() {
    let scoring = MockCompletionModel::with_responses(["{\"score\": -1.0}"]);
    let pool = pool(MockCompletionModel::new(), scoring);
    let err = pool.score_all("q", vec![candidate("A")]).await.unwrap_err();
    assert!(matches!(err, RagError::NoCandidates));
}

#[tokio::test]
async fn best_of_selects_highest_scored_candidate() {
    let generation = MockCompletionModel::new();
    generation.push_text(candidate_json("A"));
    generation.push_text(candidate_json("B"));
    generation.push_text(candidate_json("C"));

    let scoring = MockCompletionModel::new();
    scoring.push_text("{\"score\": 0.4}");
    scoring.push_text("{\"score\": 0.9}");
    scoring.push_text("{\"score\": 0.2}");

    let pool = pool(generation, scoring);
    let best = pool.best_of("q", "ctx", 3).await.unwrap();
    assert_eq!(best.candidate.answer, "B");
    assert_eq!(best.score, 0.9);
}
