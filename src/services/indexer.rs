//! Index building: document discovery, chunking, embedding, insertion.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::IndexError;
use crate::services::chunker::chunk_markdown;
use crate::services::embedding::Embedder;
use crate::services::vector_store::VectorStore;

/// Counts reported after a successful ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexReport {
    pub documents: usize,
    pub passages: usize,
}

/// All Markdown files under `root`, recursive, lexicographically
/// sorted for deterministic ingestion order.
pub fn discover_markdown_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
        })
        .collect();
    files.sort();
    files
}

/// Build (or extend) the index at `index_path` from every Markdown
/// document under `docs_dir`.
///
/// Each passage is embedded individually and inserted with its
/// document filename and pre-filter section index. A document that
/// cannot be read aborts the whole run; ingestion is re-runnable from
/// the source directory, so no partial-skip recovery is attempted.
pub fn build_index(
    docs_dir: &Path,
    index_path: &Path,
    embedder: &dyn Embedder,
) -> Result<IndexReport, IndexError> {
    let files = discover_markdown_files(docs_dir);
    if files.is_empty() {
        return Err(IndexError::NoFilesFound);
    }

    let mut store = VectorStore::open(index_path)?;
    let result = ingest_files(&files, &mut store, embedder);
    let close_result = store.close();

    let report = result?;
    close_result?;
    Ok(report)
}

fn ingest_files(
    files: &[PathBuf],
    store: &mut VectorStore,
    embedder: &dyn Embedder,
) -> Result<IndexReport, IndexError> {
    store.create_tables(embedder.model_name())?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut passages = 0;
    for file in files {
        if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
            pb.set_message(name.to_string());
        }

        let chunks = chunk_markdown(file)?;
        debug!("{}: {} passages", file.display(), chunks.len());

        for chunk in &chunks {
            let embedding = embedder
                .embed(std::slice::from_ref(&chunk.text))?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    crate::error::ModelError::InferenceError(
                        "embedder returned no vector".to_string(),
                    )
                })?;
            store.insert(
                &chunk.source_file,
                chunk.chunk_index,
                &chunk.text,
                &embedding,
            )?;
            passages += 1;
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(IndexReport {
        documents: files.len(),
        passages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use std::fs;

    /// Deterministic embedder: direction derived from text length.
    struct FakeEmbedder {
        name: String,
    }

    impl FakeEmbedder {
        fn new() -> Self {
            Self {
                name: "fake-embedding-model".to_string(),
            }
        }
    }

    impl Embedder for FakeEmbedder {
        fn model_name(&self) -> &str {
            &self.name
        }

        fn dimension(&self) -> usize {
            4
        }

        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let angle = (t.len() % 7) as f32 * 0.3;
                    vec![angle.cos(), angle.sin(), 0.0, 0.0]
                })
                .collect())
        }
    }

    #[test]
    fn test_discover_is_sorted_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.md"), "# B\ntext\n").unwrap();
        fs::write(dir.path().join("a.md"), "# A\ntext\n").unwrap();
        fs::write(dir.path().join("sub/c.md"), "# C\ntext\n").unwrap();
        fs::write(dir.path().join("ignored.txt"), "not markdown").unwrap();

        let files = discover_markdown_files(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.md", "b.md", "sub/c.md"]);
    }

    #[test]
    fn test_empty_directory_is_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let err = build_index(dir.path(), &out.path().join("index.db"), &FakeEmbedder::new())
            .unwrap_err();
        assert!(matches!(err, IndexError::NoFilesFound));
    }

    #[test]
    fn test_build_index_counts_and_metadata() {
        let docs = tempfile::tempdir().unwrap();
        fs::write(docs.path().join("a.md"), "# One\nalpha\n\n# Two\nbeta\n").unwrap();
        fs::write(docs.path().join("b.md"), "# Only\ngamma\n").unwrap();

        let out = tempfile::tempdir().unwrap();
        let index_path = out.path().join("index.db");
        let report = build_index(docs.path(), &index_path, &FakeEmbedder::new()).unwrap();

        assert_eq!(report.documents, 2);
        assert_eq!(report.passages, 3);

        let store = VectorStore::open(&index_path).unwrap();
        assert_eq!(
            store.get_model_name().unwrap(),
            Some("fake-embedding-model".to_string())
        );
        let all = store.search(&[1.0, 0.0, 0.0, 0.0], 10).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_whitespace_section_leaves_index_gap() {
        let docs = tempfile::tempdir().unwrap();
        fs::write(
            docs.path().join("doc.md"),
            "# One\nfirst section\n\n# Two\n   \n\n# Three\nthird section\n",
        )
        .unwrap();

        let out = tempfile::tempdir().unwrap();
        let index_path = out.path().join("index.db");
        let report = build_index(docs.path(), &index_path, &FakeEmbedder::new()).unwrap();
        assert_eq!(report.passages, 2);

        let store = VectorStore::open(&index_path).unwrap();
        let mut rows = store.search(&[1.0, 0.0, 0.0, 0.0], 10).unwrap();
        rows.sort_by_key(|c| c.chunk_index);
        assert_eq!(
            rows.iter().map(|c| c.chunk_index).collect::<Vec<_>>(),
            vec![0, 2]
        );
    }
}
