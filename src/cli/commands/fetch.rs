use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::sources::{ConfluenceFetcher, Fetcher, LocalFetcher, load_confluence_config};

#[derive(Debug, Subcommand)]
pub enum FetchCommand {
    /// Fetch pages from a Confluence instance
    Confluence(ConfluenceArgs),

    /// Copy Markdown files from a local directory
    Markdown(MarkdownArgs),
}

#[derive(Debug, Args)]
pub struct ConfluenceArgs {
    #[arg(long, short = 'c', help = "Path to the JSON fetch plan")]
    pub config: PathBuf,

    #[arg(long, short = 'o', default_value = "docs", help = "Output directory")]
    pub out: PathBuf,
}

#[derive(Debug, Args)]
pub struct MarkdownArgs {
    #[arg(help = "Directory to copy Markdown files from")]
    pub dir: PathBuf,

    #[arg(long, short = 'o', default_value = "docs", help = "Output directory")]
    pub out: PathBuf,
}

pub fn handle_fetch(command: FetchCommand, verbose: bool) -> Result<()> {
    let (saved, out) = match command {
        FetchCommand::Confluence(args) => {
            let plan = load_confluence_config(&args.config)
                .with_context(|| format!("failed to load {}", args.config.display()))?;
            let fetcher = ConfluenceFetcher::from_env(plan)?;
            (fetcher.fetch(&args.out)?, args.out)
        }
        FetchCommand::Markdown(args) => {
            if !args.dir.is_dir() {
                anyhow::bail!("{} is not a directory", args.dir.display());
            }
            let fetcher = LocalFetcher::new(&args.dir);
            (fetcher.fetch(&args.out)?, args.out)
        }
    };

    if verbose {
        for path in &saved {
            eprintln!("  {}", path.display());
        }
    }
    println!("Fetched {} documents into {}", saved.len(), out.display());

    Ok(())
}
