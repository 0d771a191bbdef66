//! Local directory source: copies Markdown files into the output
//! directory, preserving relative paths.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::FetchError;
use crate::sources::Fetcher;

pub struct LocalFetcher {
    source_dir: PathBuf,
}

impl LocalFetcher {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
        }
    }
}

impl Fetcher for LocalFetcher {
    fn fetch(&self, out_dir: &Path) -> Result<Vec<PathBuf>, FetchError> {
        fs::create_dir_all(out_dir)?;

        let mut saved = Vec::new();
        for entry in WalkDir::new(&self.source_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let is_markdown = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
            if !is_markdown {
                continue;
            }

            let Ok(relative) = path.strip_prefix(&self.source_dir) else {
                continue;
            };
            let dest = out_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
            saved.push(dest);
        }

        Ok(saved)
    }
}
