//! Document ingestion and semantic search over local Markdown sets.
//!
//! The pipeline: fetch documents to a local directory, split them into
//! heading-delimited passages, embed each passage with a local ONNX
//! model, and store the vectors in a SQLite index. Queries embed the
//! query text, pull nearest candidates by cosine distance, and rerank
//! them with a cross-encoder.

pub mod cli;
pub mod error;
pub mod models;
pub mod services;
pub mod sources;
pub mod utils;
