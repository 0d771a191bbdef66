use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::format_index_report;
use crate::models::Config;
use crate::services::{DEFAULT_INDEX_FILE, OnnxEmbedder, build_index};

#[derive(Debug, Args)]
pub struct IndexArgs {
    #[arg(help = "Directory of Markdown files to index")]
    pub docs_dir: PathBuf,

    #[arg(long, short = 'o', default_value = DEFAULT_INDEX_FILE, help = "Index file to write")]
    pub out: PathBuf,
}

pub fn handle_index(args: IndexArgs, verbose: bool) -> Result<()> {
    if !args.docs_dir.is_dir() {
        anyhow::bail!("{} is not a directory", args.docs_dir.display());
    }

    let config = Config::load()?;
    let model_dir = config.embedding.resolved_model_dir()?;
    let embedder = OnnxEmbedder::load(&config.embedding, &model_dir)
        .with_context(|| format!("failed to load embedding model from {}", model_dir.display()))?;

    let start = Instant::now();
    let report = build_index(&args.docs_dir, &args.out, &embedder)?;

    if verbose {
        eprintln!("Indexing took {}ms", start.elapsed().as_millis());
    }
    print!("{}", format_index_report(&report));

    Ok(())
}
