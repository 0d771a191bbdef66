use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_EMBEDDING_MODEL: &str = "pkshatech/GLuCoSE-base-ja-v2";
pub const DEFAULT_RERANKER_MODEL: &str = "hotchpotch/japanese-reranker-cross-encoder-large-v1";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub reranker: RerankerConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mdsearch").join("config.toml"))
    }

    /// Load the config file if present, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            return Ok(config);
        }
        Ok(Self::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Name of the embedding model, recorded in every index this
    /// process writes and checked at query time.
    #[serde(default = "default_embedding_model")]
    pub model_name: String,

    /// Directory holding `model.onnx` and `tokenizer.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<PathBuf>,

    #[serde(default = "default_dimension")]
    pub dimension: usize,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl EmbeddingConfig {
    pub fn resolved_model_dir(&self) -> Result<PathBuf, ConfigError> {
        resolve_model_dir(self.model_dir.as_ref(), "embedding")
    }
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_dimension() -> usize {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_max_tokens() -> usize {
    512
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_embedding_model(),
            model_dir: None,
            dimension: default_dimension(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    #[serde(default = "default_reranker_model")]
    pub model_name: String,

    /// Directory holding `model.onnx` and `tokenizer.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<PathBuf>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl RerankerConfig {
    pub fn resolved_model_dir(&self) -> Result<PathBuf, ConfigError> {
        resolve_model_dir(self.model_dir.as_ref(), "reranker")
    }
}

fn default_reranker_model() -> String {
    DEFAULT_RERANKER_MODEL.to_string()
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            model_name: default_reranker_model(),
            model_dir: None,
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of results returned after reranking.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Number of coarse candidates pulled from the store before
    /// reranking. Must cover `top_k`.
    #[serde(default = "default_initial_k")]
    pub initial_k: usize,
}

fn default_top_k() -> usize {
    5
}

fn default_initial_k() -> usize {
    20
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            initial_k: default_initial_k(),
        }
    }
}

fn resolve_model_dir(configured: Option<&PathBuf>, kind: &str) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = configured {
        return Ok(dir.clone());
    }
    dirs::data_dir()
        .map(|p| p.join("mdsearch").join("models").join(kind))
        .ok_or_else(|| ConfigError::Path("could not determine data directory".to_string()))
}
