//! Document sources.
//!
//! A source produces local Markdown files for the indexer; the core
//! pipeline is indifferent to where they came from.

mod confluence;
mod local;

pub use confluence::{ConfluenceConfig, ConfluenceFetcher, PageConfig, load_confluence_config};
pub use local::LocalFetcher;

use std::path::{Path, PathBuf};

use crate::error::FetchError;

/// Produce a list of local Markdown files under `out_dir`.
pub trait Fetcher {
    fn fetch(&self, out_dir: &Path) -> Result<Vec<PathBuf>, FetchError>;
}
