//! End-to-end query path: embed, retrieve, rerank.

use std::path::Path;

use tracing::warn;

use crate::error::SearchError;
use crate::models::SearchCandidate;
use crate::services::embedding::Embedder;
use crate::services::reranker::{CrossEncoder, rerank};
use crate::services::vector_store::VectorStore;

/// Run a semantic search against the index at `index_path`.
///
/// 1. Open the store and compare its recorded embedding model against
///    the active embedder; a mismatch is a diagnostic warning only.
/// 2. Embed the query (batch of one) and pull the `initial_k` nearest
///    candidates by cosine distance.
/// 3. Close the store, then rerank the candidates down to `top_k`.
///
/// An empty result is valid. There are no retries; any failure
/// propagates to the caller. The store handle is released on every
/// exit path.
pub fn search(
    query: &str,
    index_path: &Path,
    embedder: &dyn Embedder,
    reranker: &dyn CrossEncoder,
    top_k: usize,
    initial_k: usize,
) -> Result<Vec<SearchCandidate>, SearchError> {
    let initial_k = initial_k.max(top_k);

    let mut store = VectorStore::open(index_path)?;
    let retrieved = retrieve(query, &store, embedder, initial_k);
    let close_result = store.close();

    let candidates = retrieved?;
    close_result?;

    rerank(reranker, query, candidates, top_k).map_err(SearchError::Model)
}

fn retrieve(
    query: &str,
    store: &VectorStore,
    embedder: &dyn Embedder,
    initial_k: usize,
) -> Result<Vec<SearchCandidate>, SearchError> {
    if let Some(stored) = store.get_model_name()?
        && let Some(message) = model_mismatch_warning(&stored, embedder.model_name())
    {
        warn!("{message}");
    }

    let query_embedding = embedder
        .embed(std::slice::from_ref(&query.to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| {
            SearchError::Model(crate::error::ModelError::InferenceError(
                "embedder returned no vector for query".to_string(),
            ))
        })?;

    store
        .search(&query_embedding, initial_k)
        .map_err(SearchError::Store)
}

/// Warning text when the index was built with a different embedding
/// model than the one answering the query. None when they match.
/// Cross-model vector comparison is mathematically meaningless, but
/// the search proceeds; the caller judges the results.
fn model_mismatch_warning(stored: &str, current: &str) -> Option<String> {
    if stored == current {
        return None;
    }
    Some(format!(
        "index was built with embedding model '{stored}' but the current model is '{current}'; \
         results may be unreliable"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;

    /// Maps each known text to a fixed unit direction.
    struct FakeEmbedder;

    impl Embedder for FakeEmbedder {
        fn model_name(&self) -> &str {
            "fake-embedding-model"
        }

        fn dimension(&self) -> usize {
            4
        }

        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
            Ok(texts
                .iter()
                .map(|t| match t.as_str() {
                    "alpha" => vec![1.0, 0.0, 0.0, 0.0],
                    "beta" => vec![0.0, 1.0, 0.0, 0.0],
                    _ => vec![0.8, 0.6, 0.0, 0.0],
                })
                .collect())
        }
    }

    /// Prefers longer passages.
    struct FakeScorer;

    impl CrossEncoder for FakeScorer {
        fn model_name(&self) -> &str {
            "fake-cross-encoder"
        }

        fn score_pairs(&self, _query: &str, texts: &[String]) -> Result<Vec<f32>, ModelError> {
            Ok(texts.iter().map(|t| t.len() as f32).collect())
        }
    }

    fn seeded_index(model_name: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        let mut store = VectorStore::open(&path).unwrap();
        store.create_tables(model_name).unwrap();
        store.insert("a.md", 0, "alpha", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        store.insert("a.md", 1, "beta", &[0.0, 1.0, 0.0, 0.0]).unwrap();
        store.close().unwrap();
        (dir, path)
    }

    #[test]
    fn test_search_returns_reranked_results() {
        let (_dir, path) = seeded_index("fake-embedding-model");

        let results = search("query", &path, &FakeEmbedder, &FakeScorer, 1, 20).unwrap();
        assert_eq!(results.len(), 1);
        // Both passages are five characters; the tie keeps the
        // retrieval order, so the nearest passage wins.
        assert_eq!(results[0].text, "alpha");
        let score = results[0].rerank_score.unwrap();
        assert!(score.is_finite());
    }

    #[test]
    fn test_search_empty_store_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        let mut store = VectorStore::open(&path).unwrap();
        store.create_tables("fake-embedding-model").unwrap();
        store.close().unwrap();

        let results = search("query", &path, &FakeEmbedder, &FakeScorer, 5, 20).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_initial_k_covers_top_k() {
        let (_dir, path) = seeded_index("fake-embedding-model");
        // initial_k below top_k is raised to cover it.
        let results = search("query", &path, &FakeEmbedder, &FakeScorer, 2, 1).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_mismatch_warning_contains_stored_name() {
        let message = model_mismatch_warning("old-model", "new-model").unwrap();
        assert!(message.contains("old-model"));
        assert!(message.contains("new-model"));
    }

    #[test]
    fn test_no_warning_when_models_match() {
        assert!(model_mismatch_warning("same", "same").is_none());
    }

    #[test]
    fn test_search_proceeds_despite_model_mismatch() {
        let (_dir, path) = seeded_index("some-other-model");
        let results = search("query", &path, &FakeEmbedder, &FakeScorer, 5, 20).unwrap();
        assert_eq!(results.len(), 2);
    }
}
