mod chunker;
mod embedding;
mod indexer;
mod reranker;
mod search;
mod vector_store;

pub use chunker::chunk_markdown;
pub use embedding::{Embedder, OnnxEmbedder};
pub use indexer::{IndexReport, build_index, discover_markdown_files};
pub use reranker::{CrossEncoder, OnnxCrossEncoder, rerank};
pub use search::search;
pub use vector_store::{
    DEFAULT_INDEX_FILE, VectorStore, cosine_distance, decode_embedding, encode_embedding,
};
