//! Single-file SQLite vector store.
//!
//! Three co-located structures share one row id per passage: the
//! `chunks` table, the `embeddings` table (little-endian packed f32
//! BLOBs), and a key/value `metadata` table recording which embedding
//! model produced the stored vectors. Nearest-neighbor search scans
//! the stored vectors and orders by cosine distance.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::StoreError;
use crate::models::SearchCandidate;

/// Default index filename.
pub const DEFAULT_INDEX_FILE: &str = "index.db";

/// Exclusive handle on one index file. Not safe for concurrent use;
/// one ingestion run or one search owns the store for its duration.
pub struct VectorStore {
    conn: Option<Connection>,
}

impl VectorStore {
    /// Open (or create) the index file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn: Some(conn) })
    }

    /// Idempotent schema creation. Records `model_name` in the
    /// metadata table, overwriting any previous value.
    pub fn create_tables(&self, model_name: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_file TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS embeddings (
                chunk_id INTEGER PRIMARY KEY REFERENCES chunks(id),
                embedding BLOB NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES ('model_name', ?1)",
            params![model_name],
        )?;
        Ok(())
    }

    /// Stored embedding model name, or None for a store whose schema
    /// has not been created yet.
    pub fn get_model_name(&self) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        if !table_exists(conn, "metadata")? {
            return Ok(None);
        }
        let name = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'model_name'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    /// Append one passage and its embedding under a shared, newly
    /// generated id. Both writes commit as one transaction. The
    /// embedding dimension must match any previously stored vector.
    pub fn insert(
        &mut self,
        source_file: &str,
        chunk_index: usize,
        text: &str,
        embedding: &[f32],
    ) -> Result<i64, StoreError> {
        if let Some(expected) = self.stored_dimension()?
            && expected != embedding.len()
        {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }

        let conn = self.conn()?;
        let blob = encode_embedding(embedding);

        conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| {
            conn.execute(
                "INSERT INTO chunks (source_file, chunk_index, text) VALUES (?1, ?2, ?3)",
                params![source_file, chunk_index as i64, text],
            )?;
            let id = conn.last_insert_rowid();
            conn.execute(
                "INSERT INTO embeddings (chunk_id, embedding) VALUES (?1, ?2)",
                params![id, blob],
            )?;
            Ok(id)
        })();

        if result.is_ok() {
            conn.execute("COMMIT", [])?;
        } else {
            let _ = conn.execute("ROLLBACK", []);
        }
        result
    }

    /// Up to `top_k` stored passages nearest to `query_embedding`,
    /// ascending by cosine distance, joined back to their content.
    pub fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchCandidate>, StoreError> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT c.id, c.source_file, c.chunk_index, c.text, e.embedding
             FROM chunks c
             INNER JOIN embeddings e ON e.chunk_id = c.id",
        )?;

        let mut candidates = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let source_file: String = row.get(1)?;
                let chunk_index: i64 = row.get(2)?;
                let text: String = row.get(3)?;
                let blob: Vec<u8> = row.get(4)?;
                Ok((id, source_file, chunk_index, text, blob))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(id, source_file, chunk_index, text, blob)| {
                let stored = decode_embedding(&blob);
                SearchCandidate {
                    id,
                    distance: cosine_distance(query_embedding, &stored),
                    source_file,
                    chunk_index: chunk_index as usize,
                    text,
                    rerank_score: None,
                }
            })
            .collect::<Vec<_>>();

        candidates.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(top_k);

        Ok(candidates)
    }

    /// Release the underlying connection. Any later operation on this
    /// store, including a second close, fails with `StoreError::Closed`.
    pub fn close(&mut self) -> Result<(), StoreError> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| StoreError::Sqlite(e)),
            None => Err(StoreError::Closed),
        }
    }

    fn conn(&self) -> Result<&Connection, StoreError> {
        self.conn.as_ref().ok_or(StoreError::Closed)
    }

    /// Dimension of previously stored vectors, if any.
    fn stored_dimension(&self) -> Result<Option<usize>, StoreError> {
        let conn = self.conn()?;
        if !table_exists(conn, "embeddings")? {
            return Ok(None);
        }
        let bytes: Option<i64> = conn
            .query_row("SELECT length(embedding) FROM embeddings LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(bytes.map(|b| b as usize / 4))
    }
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool, StoreError> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Pack an f32 vector as little-endian bytes. Exact round-trip with
/// [`decode_embedding`] for finite values.
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a little-endian f32 blob.
pub fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine distance: `1 - cos(a, b)`. Zero for identical directions,
/// up to 2 for opposite ones. For the unit vectors the embedder
/// produces this orders identically to squared L2 distance.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    1.0 - dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp_store() -> (tempfile::TempDir, VectorStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(&dir.path().join("index.db")).unwrap();
        (dir, store)
    }

    /// Unit vector in the plane of the first two axes.
    fn unit(angle: f32, dim: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[0] = angle.cos();
        v[1] = angle.sin();
        v
    }

    #[test]
    fn test_embedding_roundtrip_exact() {
        let original = vec![
            1.0f32,
            -2.5,
            0.0,
            f32::MIN_POSITIVE,
            f32::MAX,
            1.0e-40, // subnormal
            -0.0,
        ];
        let restored = decode_embedding(&encode_embedding(&original));
        assert_eq!(original.len(), restored.len());
        for (a, b) in original.iter().zip(restored.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_get_model_name_before_schema() {
        let (_dir, store) = open_temp_store();
        assert_eq!(store.get_model_name().unwrap(), None);
    }

    #[test]
    fn test_create_tables_records_model_name() {
        let (_dir, store) = open_temp_store();
        store.create_tables("model-a").unwrap();
        assert_eq!(store.get_model_name().unwrap(), Some("model-a".to_string()));

        // Idempotent, and the metadata value follows the last call.
        store.create_tables("model-b").unwrap();
        assert_eq!(store.get_model_name().unwrap(), Some("model-b".to_string()));
    }

    #[test]
    fn test_insert_and_search_joins_content() {
        let (_dir, mut store) = open_temp_store();
        store.create_tables("m").unwrap();
        store.insert("a.md", 0, "alpha", &unit(0.0, 4)).unwrap();
        store.insert("a.md", 2, "beta", &unit(1.0, 4)).unwrap();

        let results = store.search(&unit(0.0, 4), 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "alpha");
        assert_eq!(results[0].source_file, "a.md");
        assert_eq!(results[0].chunk_index, 0);
        assert!(results[0].distance < 1e-6);
        assert_eq!(results[1].text, "beta");
        assert_eq!(results[1].chunk_index, 2);
        assert!(results[1].distance > results[0].distance);
    }

    #[test]
    fn test_search_caps_at_top_k_ascending() {
        let (_dir, mut store) = open_temp_store();
        store.create_tables("m").unwrap();
        for i in 0..10 {
            let v = unit(0.1 * (i + 1) as f32, 4);
            store.insert("doc.md", i, &format!("passage {i}"), &v).unwrap();
        }

        let results = store.search(&unit(0.0, 4), 3).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].distance <= results[1].distance);
        assert!(results[1].distance <= results[2].distance);
        assert_eq!(results[0].text, "passage 0");
    }

    #[test]
    fn test_search_fewer_rows_than_top_k() {
        let (_dir, mut store) = open_temp_store();
        store.create_tables("m").unwrap();
        store.insert("doc.md", 0, "only", &unit(0.0, 4)).unwrap();

        let results = store.search(&unit(0.5, 4), 5).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_search_empty_store() {
        let (_dir, store) = open_temp_store();
        store.create_tables("m").unwrap();
        let results = store.search(&unit(0.0, 4), 5).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let (_dir, mut store) = open_temp_store();
        store.create_tables("m").unwrap();
        store.insert("doc.md", 0, "a", &unit(0.0, 4)).unwrap();

        let err = store.insert("doc.md", 1, "b", &unit(0.0, 8)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch {
                expected: 4,
                actual: 8
            }
        ));
    }

    #[test]
    fn test_operations_after_close_fail() {
        let (_dir, mut store) = open_temp_store();
        store.create_tables("m").unwrap();
        store.close().unwrap();

        assert!(matches!(store.get_model_name(), Err(StoreError::Closed)));
        assert!(matches!(
            store.insert("doc.md", 0, "x", &unit(0.0, 4)),
            Err(StoreError::Closed)
        ));
        assert!(matches!(store.search(&unit(0.0, 4), 1), Err(StoreError::Closed)));
        assert!(matches!(store.close(), Err(StoreError::Closed)));
    }

    #[test]
    fn test_index_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");

        let mut store = VectorStore::open(&path).unwrap();
        store.create_tables("m").unwrap();
        store.insert("doc.md", 0, "persisted", &unit(0.2, 4)).unwrap();
        store.close().unwrap();

        let store = VectorStore::open(&path).unwrap();
        assert_eq!(store.get_model_name().unwrap(), Some("m".to_string()));
        let results = store.search(&unit(0.2, 4), 1).unwrap();
        assert_eq!(results[0].text, "persisted");
    }

    #[test]
    fn test_cosine_distance_basics() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_distance(&a, &a).abs() < 1e-6);
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-6);
        let neg = vec![-1.0, 0.0];
        assert!((cosine_distance(&a, &neg) - 2.0).abs() < 1e-6);
    }
}
