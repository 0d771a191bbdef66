//! Command-line interface.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

/// Semantic search over local Markdown document sets.
#[derive(Debug, Parser)]
#[command(name = "mdsearch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch documents from a source into a local directory
    #[command(subcommand)]
    Fetch(commands::FetchCommand),

    /// Build a search index from a directory of Markdown files
    Index(commands::IndexArgs),

    /// Search an index
    Search(commands::SearchArgs),
}
