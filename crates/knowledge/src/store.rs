//! Durable storage for the vector index.
//!
//! The SQLite store keeps one file, `index.sqlite`, inside the index
//! directory: an `entries` table with the chunks and their embeddings
//! (little-endian f32 blobs) and a `metadata` key/value table. A build is
//! written to a temporary file and renamed over the old one, so readers
//! never observe a half-written index.

use crate::config::INDEX_FILE_NAME;
use crate::types::{Chunk, IndexMetadata, IndexStats};
use crate::vector_index::{IndexEntry, VectorIndex};
use cardio_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Arc;

const SCHEMA_VERSION: &str = "1";

/// Persistence seam for the knowledge engine.
#[async_trait::async_trait]
pub trait IndexStore: Send + Sync {
    /// Whether a persisted index is present.
    async fn exists(&self) -> bool;

    /// Load the persisted index and its metadata.
    async fn load(&self) -> AppResult<(VectorIndex, IndexMetadata)>;

    /// Replace the persisted index.
    async fn persist(&self, index: Arc<VectorIndex>, metadata: IndexMetadata) -> AppResult<()>;
}

/// SQLite-backed index store.
#[derive(Debug, Clone)]
pub struct SqliteIndexStore {
    index_dir: PathBuf,
}

impl SqliteIndexStore {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.index_dir.join(INDEX_FILE_NAME)
    }

    /// Write the index, replacing any previous file.
    pub fn persist_sync(&self, index: &VectorIndex, metadata: &IndexMetadata) -> AppResult<()> {
        std::fs::create_dir_all(&self.index_dir).map_err(|e| {
            AppError::Storage(format!(
                "Failed to create index directory {:?}: {}",
                self.index_dir, e
            ))
        })?;

        let db_path = self.db_path();
        let tmp_path = db_path.with_extension("sqlite.tmp");
        if tmp_path.exists() {
            std::fs::remove_file(&tmp_path)?;
        }

        {
            let mut conn = Connection::open(&tmp_path).map_err(storage_err("open index"))?;
            create_schema(&conn)?;

            let tx = conn.transaction().map_err(storage_err("start transaction"))?;
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO entries (position, sequence_index, overlap, text, embedding)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                    )
                    .map_err(storage_err("prepare insert"))?;

                for (position, entry) in index.entries().iter().enumerate() {
                    stmt.execute(params![
                        position as i64,
                        entry.chunk.sequence_index as i64,
                        entry.chunk.overlap_with_previous as i64,
                        entry.chunk.text,
                        embedding_to_bytes(&entry.embedding),
                    ])
                    .map_err(storage_err("insert entry"))?;
                }

                let mut meta = tx
                    .prepare("INSERT INTO metadata (key, value) VALUES (?1, ?2)")
                    .map_err(storage_err("prepare metadata insert"))?;
                for (key, value) in metadata_pairs(metadata) {
                    meta.execute(params![key, value])
                        .map_err(storage_err("insert metadata"))?;
                }
            }
            tx.commit().map_err(storage_err("commit index"))?;
        }

        std::fs::rename(&tmp_path, &db_path)?;

        tracing::info!(
            "Persisted {} chunks to {:?}",
            index.documents_count(),
            db_path
        );
        Ok(())
    }

    /// Read and validate the persisted index.
    pub fn load_sync(&self) -> AppResult<(VectorIndex, IndexMetadata)> {
        let conn = self.open_existing()?;
        let metadata = read_metadata(&conn)?;

        let mut stmt = conn
            .prepare(
                "SELECT sequence_index, overlap, text, embedding FROM entries ORDER BY position",
            )
            .map_err(corrupt_err("prepare entry query"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })
            .map_err(corrupt_err("query entries"))?;

        let mut entries = Vec::new();
        for row in rows {
            let (sequence_index, overlap, text, blob) = row.map_err(corrupt_err("read entry"))?;
            entries.push(IndexEntry {
                chunk: Chunk {
                    text,
                    sequence_index: sequence_index as usize,
                    overlap_with_previous: overlap as usize,
                },
                embedding: bytes_to_embedding(&blob)?,
            });
        }

        if entries.len() != metadata.documents_count {
            return Err(AppError::IndexCorrupt(format!(
                "Index holds {} entries but metadata records {}",
                entries.len(),
                metadata.documents_count
            )));
        }

        let index = VectorIndex::from_entries(metadata.dimensions, entries)?;

        tracing::debug!(
            "Loaded {} chunks from {:?}",
            index.documents_count(),
            self.db_path()
        );
        Ok((index, metadata))
    }

    /// Metadata and file size, without loading vectors.
    ///
    /// Returns `None` when no index has been persisted.
    pub fn read_stats(&self) -> AppResult<Option<IndexStats>> {
        let db_path = self.db_path();
        if !db_path.exists() {
            return Ok(None);
        }

        let conn = self.open_existing()?;
        let metadata = read_metadata(&conn)?;
        let db_size_bytes = std::fs::metadata(&db_path)?.len();

        Ok(Some(IndexStats {
            metadata,
            db_size_bytes,
        }))
    }

    fn open_existing(&self) -> AppResult<Connection> {
        let db_path = self.db_path();
        Connection::open_with_flags(&db_path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| AppError::IndexCorrupt(format!("Failed to open {:?}: {}", db_path, e)))
    }
}

#[async_trait::async_trait]
impl IndexStore for SqliteIndexStore {
    async fn exists(&self) -> bool {
        self.db_path().is_file()
    }

    async fn load(&self) -> AppResult<(VectorIndex, IndexMetadata)> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.load_sync())
            .await
            .map_err(|e| AppError::Storage(format!("Index load task failed: {}", e)))?
    }

    async fn persist(&self, index: Arc<VectorIndex>, metadata: IndexMetadata) -> AppResult<()> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.persist_sync(&index, &metadata))
            .await
            .map_err(|e| AppError::Storage(format!("Index persist task failed: {}", e)))?
    }
}

fn create_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE entries (
            position INTEGER PRIMARY KEY,
            sequence_index INTEGER NOT NULL,
            overlap INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL
        );

        CREATE TABLE metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )
    .map_err(storage_err("create tables"))
}

fn metadata_pairs(metadata: &IndexMetadata) -> Vec<(&'static str, String)> {
    vec![
        ("schema_version", SCHEMA_VERSION.to_string()),
        ("provider", metadata.provider.clone()),
        ("model", metadata.model.clone()),
        ("dimensions", metadata.dimensions.to_string()),
        ("chunk_size", metadata.chunk_size.to_string()),
        ("chunk_overlap", metadata.chunk_overlap.to_string()),
        ("separator", metadata.separator.clone()),
        ("corpus_sha256", metadata.corpus_sha256.clone()),
        ("documents_count", metadata.documents_count.to_string()),
        ("built_at", metadata.built_at.to_rfc3339()),
    ]
}

fn read_metadata(conn: &Connection) -> AppResult<IndexMetadata> {
    let get = |key: &str| -> AppResult<String> {
        conn.query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(corrupt_err("read metadata"))?
        .ok_or_else(|| AppError::IndexCorrupt(format!("Missing metadata key '{}'", key)))
    };
    let parse = |key: &str| -> AppResult<usize> {
        let value = get(key)?;
        value.parse().map_err(|_| {
            AppError::IndexCorrupt(format!("Metadata '{}' is not a number: {}", key, value))
        })
    };

    let version = get("schema_version")?;
    if version != SCHEMA_VERSION {
        return Err(AppError::IndexCorrupt(format!(
            "Unsupported index schema version {}",
            version
        )));
    }

    let built_at = get("built_at")?;
    let built_at = DateTime::parse_from_rfc3339(&built_at)
        .map_err(|e| AppError::IndexCorrupt(format!("Invalid built_at '{}': {}", built_at, e)))?
        .with_timezone(&Utc);

    Ok(IndexMetadata {
        provider: get("provider")?,
        model: get("model")?,
        dimensions: parse("dimensions")?,
        chunk_size: parse("chunk_size")?,
        chunk_overlap: parse("chunk_overlap")?,
        separator: get("separator")?,
        corpus_sha256: get("corpus_sha256")?,
        documents_count: parse("documents_count")?,
        built_at,
    })
}

fn storage_err(action: &'static str) -> impl Fn(rusqlite::Error) -> AppError {
    move |e| AppError::Storage(format!("Failed to {}: {}", action, e))
}

fn corrupt_err(action: &'static str) -> impl Fn(rusqlite::Error) -> AppError {
    move |e| AppError::IndexCorrupt(format!("Failed to {}: {}", action, e))
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::IndexCorrupt(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
