//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Table does not exist in the backend.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// User-defined type does not exist in the backend.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// Table exists but its schema was never registered with this backend.
    #[error("table not provisioned: {0}")]
    NotProvisioned(String),

    /// A primary-key column has no value in the row being written.
    #[error("missing key column '{column}' for table '{table}'")]
    MissingKey { table: String, column: String },

    /// Invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Backend-specific failure (lock poisoning, worker crash, driver error).
    #[error("backend error: {0}")]
    Backend(String),
}
