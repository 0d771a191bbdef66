mod chunk;
mod config;
mod search;

pub use chunk::Chunk;
pub use config::{
    Config, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL, DEFAULT_RERANKER_MODEL,
    EmbeddingConfig, RerankerConfig, SearchConfig,
};
pub use search::SearchCandidate;
