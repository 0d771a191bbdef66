//! Search result types.

/// A candidate returned by the vector store, optionally refined by
/// the reranker. Transient; never persisted.
#[derive(Debug, Clone)]
pub struct SearchCandidate {
    /// Row id shared by the passage and its embedding.
    pub id: i64,
    /// Store-reported cosine distance from the query vector.
    pub distance: f32,
    /// Filename of the originating document.
    pub source_file: String,
    /// Pre-filter position of the passage in its document.
    pub chunk_index: usize,
    /// Passage text.
    pub text: String,
    /// Cross-encoder relevance score, set by the reranker.
    /// Higher is more relevant.
    pub rerank_score: Option<f32>,
}
