//! Error types for the Markdown semantic search CLI.

use std::path::PathBuf;

use thiserror::Error;

/// Errors related to splitting a document into passages.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid document path: {0}")]
    InvalidPath(PathBuf),
}

/// Errors related to loading and running local inference models.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model not found: {0}")]
    NotFound(String),

    #[error("failed to load model: {0}")]
    LoadError(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),

    #[error("inference error: {0}")]
    InferenceError(String),
}

/// Errors related to the SQLite vector store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store is closed")]
    Closed,

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Errors related to fetching documents from a source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("missing required environment variable: {0}")]
    MissingCredential(&'static str),

    #[error("invalid fetch config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Confluence API error: {0}")]
    Api(String),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("path error: {0}")]
    Path(String),
}

/// Errors related to building an index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("no Markdown files found")]
    NoFilesFound,

    #[error("chunking error: {0}")]
    Chunk(#[from] ChunkError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors related to running a search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
