//! Error types for migrasync-store.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from artifact log operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Error reported by SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Table names are interpolated into SQL and must be plain identifiers.
    #[error("invalid table name '{0}'")]
    InvalidTable(String),
}
