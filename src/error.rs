//! Error types for chartqa.

use std::path::PathBuf;
use thiserror::Error;

/// Library-level error type for chartqa operations.
#[derive(Error, Debug)]
pub enum ChartQaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Index load failed: {0}")]
    IndexLoad(#[from] IndexLoadError),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Why a persisted index could not be loaded.
///
/// Only some of these justify rebuilding from the source documents; see
/// [`IndexLoadError::is_recoverable`].
#[derive(Error, Debug)]
pub enum IndexLoadError {
    #[error("no persisted index at {0}")]
    Missing(PathBuf),

    #[error("persisted index at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("persisted index format version {found}, expected {expected}")]
    SchemaMismatch { expected: u32, found: String },

    #[error("persisted index was embedded with {found}, configured embedder is {expected}")]
    EmbeddingMismatch { expected: String, found: String },

    #[error("permission denied reading {0}")]
    PermissionDenied(PathBuf),

    #[error("persisted index at {path} is unavailable: {reason}")]
    Unavailable { path: PathBuf, reason: String },

    #[error("cannot rebuild {name}: no source files configured ({cause})")]
    NoSources {
        name: String,
        cause: Box<IndexLoadError>,
    },

    #[error("IO error reading persisted index: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexLoadError {
    /// Whether the index should be rebuilt from source rather than failing.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IndexLoadError::Missing(_)
                | IndexLoadError::Corrupt { .. }
                | IndexLoadError::SchemaMismatch { .. }
                | IndexLoadError::EmbeddingMismatch { .. }
        )
    }
}

/// Result type alias for chartqa operations.
pub type Result<T> = std::result::Result<T, ChartQaError>;
