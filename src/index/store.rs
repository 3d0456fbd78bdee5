//! Persisted document indexes.
//!
//! Each index lives in its own persist directory as a single SQLite file.
//! Loading failures are classified so that only missing, corrupt or stale
//! indexes trigger a rebuild; permission and I/O problems are surfaced.

use super::{Node, VectorIndex};
use crate::document::{load_documents, Chunker};
use crate::embedding::Embedder;
use crate::error::{ChartQaError, IndexLoadError, Result};
use rusqlite::{params, Connection, ErrorCode, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// File name of the index inside a persist directory.
pub const INDEX_FILE: &str = "index.db";

/// Bumped whenever the on-disk layout changes.
pub const FORMAT_VERSION: u32 = 1;

const SCHEMA: &str = r#"
CREATE TABLE meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE nodes (
    id TEXT PRIMARY KEY,
    source TEXT NOT NULL,
    page INTEGER NOT NULL,
    chunk_order INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL
);
"#;

/// Loads persisted indexes, rebuilding them from source documents when needed.
pub struct DocumentIndexStore {
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
}

impl DocumentIndexStore {
    pub fn new(embedder: Arc<dyn Embedder>, chunker: Chunker) -> Self {
        Self { embedder, chunker }
    }

    /// Load the index in `persist_dir`, or build it from `source_files`.
    ///
    /// After a successful return `persist_dir` holds an index that a later
    /// call can load without any source files.
    #[instrument(skip(self, source_files), fields(persist_dir = %persist_dir.display()))]
    pub async fn open_or_build(
        &self,
        name: &str,
        persist_dir: &Path,
        source_files: &[PathBuf],
    ) -> Result<VectorIndex> {
        match load_index(persist_dir, self.embedder.model(), self.embedder.dimensions()) {
            Ok(mut index) => {
                info!("Loaded {} index ({} nodes)", name, index.len());
                index.name = name.to_string();
                Ok(index)
            }
            Err(e) if e.is_recoverable() => {
                if source_files.is_empty() {
                    return Err(IndexLoadError::NoSources {
                        name: name.to_string(),
                        cause: Box::new(e),
                    }
                    .into());
                }
                warn!("Rebuilding {} index: {}", name, e);
                self.rebuild(name, persist_dir, source_files).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Build an index from source documents and persist it, replacing any
    /// existing index in `persist_dir`.
    #[instrument(skip(self, source_files), fields(persist_dir = %persist_dir.display()))]
    pub async fn rebuild(
        &self,
        name: &str,
        persist_dir: &Path,
        source_files: &[PathBuf],
    ) -> Result<VectorIndex> {
        let documents = load_documents(source_files)?;
        let chunks = self.chunker.chunk(&documents);
        info!(
            "Building {} index from {} page(s), {} chunk(s)",
            name,
            documents.len(),
            chunks.len()
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(ChartQaError::Embedding(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let nodes = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| Node {
                id: Uuid::new_v4(),
                source: chunk.source.display().to_string(),
                page: chunk.page,
                chunk_order: chunk.order,
                content: chunk.content,
                embedding,
            })
            .collect();

        let index = VectorIndex {
            name: name.to_string(),
            embedding_model: self.embedder.model().to_string(),
            dimensions: self.embedder.dimensions(),
            nodes,
        };

        persist_index(&index, persist_dir)?;
        info!("Persisted {} index to {}", name, persist_dir.display());
        Ok(index)
    }
}

/// Write an index to `persist_dir/index.db`.
///
/// The database is written to a temporary file in the same directory and
/// renamed into place, so readers never see a half-written index.
pub fn persist_index(index: &VectorIndex, persist_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(persist_dir)?;

    let tmp = tempfile::Builder::new()
        .prefix(".index-")
        .suffix(".db")
        .tempfile_in(persist_dir)?;

    {
        let mut conn = Connection::open(tmp.path())?;
        conn.execute_batch(SCHEMA)?;

        let tx = conn.transaction()?;
        {
            let mut meta = tx.prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")?;
            meta.execute(params!["format_version", FORMAT_VERSION.to_string()])?;
            meta.execute(params!["name", index.name])?;
            meta.execute(params!["embedding_model", index.embedding_model])?;
            meta.execute(params!["dimensions", index.dimensions.to_string()])?;

            let mut insert = tx.prepare(
                "INSERT INTO nodes (id, source, page, chunk_order, content, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for node in &index.nodes {
                insert.execute(params![
                    node.id.to_string(),
                    node.source,
                    node.page,
                    node.chunk_order,
                    node.content,
                    embedding_to_bytes(&node.embedding),
                ])?;
            }
        }
        tx.commit()?;
    }

    tmp.persist(persist_dir.join(INDEX_FILE))
        .map_err(|e| ChartQaError::Io(e.error))?;
    Ok(())
}

/// Read the index persisted in `persist_dir`.
///
/// The stored embedding model and dimensions must match the expected ones,
/// otherwise query embeddings would not be comparable with the nodes.
pub fn load_index(
    persist_dir: &Path,
    expected_model: &str,
    expected_dimensions: usize,
) -> std::result::Result<VectorIndex, IndexLoadError> {
    let dir_meta = std::fs::metadata(persist_dir).map_err(|e| classify_io(e, persist_dir))?;
    if !dir_meta.is_dir() {
        return Err(IndexLoadError::Corrupt {
            path: persist_dir.to_path_buf(),
            reason: "persist path is not a directory".to_string(),
        });
    }

    let db_path = persist_dir.join(INDEX_FILE);
    // Opening for read surfaces permission problems before SQLite does
    std::fs::File::open(&db_path).map_err(|e| classify_io(e, &db_path))?;

    let conn = Connection::open_with_flags(
        &db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| classify_sqlite(e, &db_path))?;

    let read_meta = |key: &str| -> std::result::Result<String, IndexLoadError> {
        conn.query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| row.get(0))
            .map_err(|e| classify_sqlite(e, &db_path))
    };

    let version = read_meta("format_version")?;
    if version != FORMAT_VERSION.to_string() {
        return Err(IndexLoadError::SchemaMismatch {
            expected: FORMAT_VERSION,
            found: version,
        });
    }

    let name = read_meta("name")?;
    let embedding_model = read_meta("embedding_model")?;
    let dimensions: usize = read_meta("dimensions")?
        .parse()
        .map_err(|_| corrupt(&db_path, "dimensions is not a number"))?;

    if embedding_model != expected_model || dimensions != expected_dimensions {
        return Err(IndexLoadError::EmbeddingMismatch {
            expected: format!("{} ({}d)", expected_model, expected_dimensions),
            found: format!("{} ({}d)", embedding_model, dimensions),
        });
    }

    let mut stmt = conn
        .prepare(
            "SELECT id, source, page, chunk_order, content, embedding
             FROM nodes ORDER BY rowid",
        )
        .map_err(|e| classify_sqlite(e, &db_path))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Vec<u8>>(5)?,
            ))
        })
        .map_err(|e| classify_sqlite(e, &db_path))?;

    let mut nodes = Vec::new();
    for row in rows {
        let (id, source, page, chunk_order, content, embedding) =
            row.map_err(|e| classify_sqlite(e, &db_path))?;

        let id = Uuid::parse_str(&id).map_err(|_| corrupt(&db_path, "invalid node id"))?;
        let embedding = bytes_to_embedding(&embedding)
            .filter(|v| v.len() == dimensions)
            .ok_or_else(|| corrupt(&db_path, "embedding has wrong length"))?;

        nodes.push(Node {
            id,
            source,
            page,
            chunk_order,
            content,
            embedding,
        });
    }

    Ok(VectorIndex {
        name,
        embedding_model,
        dimensions,
        nodes,
    })
}

fn corrupt(path: &Path, reason: &str) -> IndexLoadError {
    IndexLoadError::Corrupt {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn classify_io(err: std::io::Error, path: &Path) -> IndexLoadError {
    match err.kind() {
        std::io::ErrorKind::NotFound => IndexLoadError::Missing(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => IndexLoadError::PermissionDenied(path.to_path_buf()),
        _ => IndexLoadError::Io(err),
    }
}

fn classify_sqlite(err: rusqlite::Error, path: &Path) -> IndexLoadError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) => match e.code {
            ErrorCode::PermissionDenied => {
                IndexLoadError::PermissionDenied(path.to_path_buf())
            }
            // Says nothing about the file contents
            ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::SystemIoFailure
            | ErrorCode::CannotOpen
            | ErrorCode::DiskFull
            | ErrorCode::OutOfMemory
            | ErrorCode::FileLockingProtocolFailed => IndexLoadError::Unavailable {
                path: path.to_path_buf(),
                reason: err.to_string(),
            },
            _ => corrupt(path, &err.to_string()),
        },
        _ => corrupt(path, &err.to_string()),
    }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}
