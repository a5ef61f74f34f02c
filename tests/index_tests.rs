//! Embedding index tests: top-k bounds, ordering, tie-breaking, and
//! build-before-search enforcement.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;
use ragpipe::corpus::Corpus;
use ragpipe::embedding::Embedder;
use ragpipe::error::{RagError, Result};
use ragpipe::index::EmbeddingIndex;
use ragpipe::mock::{FailingEmbedder, MockEmbedder};

/// A test embedder that returns a fixed vector per exact text.
struct StaticEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    dimensions: usize,
}

impl StaticEmbedder {
    fn new(dimensions: usize, entries: impl IntoIterator<Item = (String, Vec<f32>)>) -> Self {
        Self { vectors: entries.into_iter().collect(), dimensions }
    }
}

#[async_trait]
impl Embedder for StaticEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.vectors.get(text).cloned().ok_or_else(|| RagError::Embedding {
            provider: "static".to_string(),
            message: format!("no vector registered for '{text}'"),
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

async fn build_index(vectors: Vec<Vec<f32>>, dimensions: usize) -> EmbeddingIndex {
    let texts: Vec<String> = (0..vectors.len()).map(|i| format!("doc {i}")).collect();
    let corpus = Arc::new(Corpus::from_texts(texts.clone()));
    let embedder = StaticEmbedder::new(dimensions, texts.into_iter().zip(vectors));
    let mut index = EmbeddingIndex::new(Arc::new(embedder));
    index.build(corpus).await.unwrap();
    index
}

#[tokio::test]
async fn search_before_build_is_not_ready() {
    let index = EmbeddingIndex::new(Arc::new(MockEmbedder::new(8)));
    let err = index.search(&[0.0; 8], 3).unwrap_err();
    assert!(matches!(err, RagError::NotReady));
}

#[tokio::test]
async fn k_larger_than_corpus_returns_all_documents() {
    let index = build_index(vec![vec![1.0, 0.0], vec![0.0, 1.0]], 2).await;
    let results = index.search(&[1.0, 0.0], 10).unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn empty_corpus_search_is_empty_not_error() {
    let corpus = Arc::new(Corpus::from_texts(Vec::<String>::new()));
    let mut index = EmbeddingIndex::new(Arc::new(MockEmbedder::new(8)));
    index.build(corpus).await.unwrap();
    let results = index.search(&[0.5; 8], 3).unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn equal_scores_order_by_ascending_id_across_repeated_calls() {
    // Three identical document vectors: all tie against any query.
    let index = build_index(vec![vec![1.0, 1.0]; 3], 2).await;
    for _ in 0..5 {
        let ids: Vec<usize> =
            index.search(&[0.3, 0.7], 3).unwrap().iter().map(|r| r.document.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}

#[tokio::test]
async fn most_similar_document_ranks_first() {
    let index = build_index(
        vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
        2,
    )
    .await;
    let results = index.search(&[1.0, 0.0], 3).unwrap();
    assert_eq!(results[0].document.id, 0);
    assert!(results[0].score > results[1].score);
}

#[tokio::test]
async fn dimension_mismatch_is_embedding_error() {
    // Embedder claims 3 dims but produces 2.
    let corpus = Arc::new(Corpus::from_texts(["doc 0"]));
    let embedder =
        StaticEmbedder::new(3, [("doc 0".to_string(), vec![1.0, 0.0])]);
    let mut index = EmbeddingIndex::new(Arc::new(embedder));
    let err = index.build(corpus).await.unwrap_err();
    assert!(matches!(err, RagError::Embedding { .. }));
}

/// Misbehaving provider that silently drops the last vector of a batch.
struct ShortBatchEmbedder;

#[async_trait]
impl Embedder for ShortBatchEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0]).collect())
    }

    fn dimensions(&self) -> usize {
        2
    }
}

#[tokio::test]
async fn short_embedding_batch_fails_the_build() {
    let corpus = Arc::new(Corpus::from_texts(["doc 0", "doc 1"]));
    let mut index = EmbeddingIndex::new(Arc::new(ShortBatchEmbedder));
    let err = index.build(corpus).await.unwrap_err();
    assert!(matches!(err, RagError::Embedding { .. }));
}

#[tokio::test]
async fn embedding_service_failure_fails_the_build() {
    let corpus = Arc::new(Corpus::from_texts(["doc 0"]));
    let mut index = EmbeddingIndex::new(Arc::new(FailingEmbedder::new(8)));
    let err = index.build(corpus).await.unwrap_err();
    assert!(matches!(err, RagError::Embedding { .. }));
}

#[tokio::test]
async fn re_embedding_same_text_is_stable() {
    let embedder = MockEmbedder::new(64);
    let a = embedder.embed("the quick brown fox").await.unwrap();
    let b = embedder.embed("the quick brown fox").await.unwrap();
    assert_eq!(a.len(), 64);
    assert_eq!(a, b);
}

#[tokio::test]
async fn distinct_texts_occupy_distinct_index_rows() {
    let corpus = Arc::new(Corpus::from_texts(["apples and oranges", "ships and shoes"]));
    let mut index = EmbeddingIndex::new(Arc::new(MockEmbedder::new(64)));
    index.build(corpus).await.unwrap();
    let ids: HashSet<usize> =
        index.search(&[0.1; 64], 2).unwrap().iter().map(|r| r.document.id).collect();
    assert_eq!(ids, HashSet::from([0, 1]));
}

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero embedding", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-8 {
            return None;
        }
        for val in &mut v {
            *val /= norm;
        }
        Some(v)
    })
}

mod prop_search_contract {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// For any corpus and any k, search returns exactly min(k, len)
        /// results, ordered by non-increasing score, with no duplicate
        /// document ids.
        #[test]
        fn top_k_bounded_ordered_and_unique(
            vectors in proptest::collection::vec(arb_normalized_embedding(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, len) = rt.block_on(async {
                let len = vectors.len();
                let index = build_index(vectors, DIM).await;
                (index.search(&query, k).unwrap(), len)
            });

            prop_assert_eq!(results.len(), k.min(len));

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }

            let ids: HashSet<usize> = results.iter().map(|r| r.document.id).collect();
            prop_assert_eq!(ids.len(), results.len(), "duplicate document ids in result");
        }
    }
}
