use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::format_search_results;
use crate::models::Config;
use crate::services::{DEFAULT_INDEX_FILE, OnnxCrossEncoder, OnnxEmbedder, search};

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(required = true, help = "Search query text")]
    pub query: String,

    #[arg(long, default_value = DEFAULT_INDEX_FILE, help = "Index file to search")]
    pub db: PathBuf,

    #[arg(long, short = 'n', help = "Maximum number of results to return")]
    pub top_k: Option<usize>,
}

pub fn handle_search(args: SearchArgs, verbose: bool) -> Result<()> {
    let query = args.query.trim();
    if query.is_empty() {
        anyhow::bail!("search query cannot be empty");
    }
    if !args.db.is_file() {
        anyhow::bail!("index file {} does not exist", args.db.display());
    }

    let config = Config::load()?;
    let top_k = args.top_k.unwrap_or(config.search.top_k);
    if top_k == 0 {
        anyhow::bail!("top-k must be at least 1");
    }

    let embedding_dir = config.embedding.resolved_model_dir()?;
    let embedder = OnnxEmbedder::load(&config.embedding, &embedding_dir).with_context(|| {
        format!(
            "failed to load embedding model from {}",
            embedding_dir.display()
        )
    })?;

    let reranker_dir = config.reranker.resolved_model_dir()?;
    let reranker = OnnxCrossEncoder::load(&config.reranker, &reranker_dir).with_context(|| {
        format!(
            "failed to load reranker model from {}",
            reranker_dir.display()
        )
    })?;

    let start = Instant::now();
    let results = search(
        query,
        &args.db,
        &embedder,
        &reranker,
        top_k,
        config.search.initial_k,
    )?;

    if verbose {
        eprintln!(
            "Found {} results in {}ms",
            results.len(),
            start.elapsed().as_millis()
        );
    }

    if results.is_empty() {
        println!("No results found for: {query}");
        return Ok(());
    }
    print!("{}", format_search_results(&results));

    Ok(())
}
