//! Error types for the schema model.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while loading or resolving schemas.
#[derive(Debug, Error)]
pub enum ModelError {
    /// IO error reading a schema file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema file is not valid JSON or has the wrong shape.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A table group references a table the schema set does not define.
    #[error("table group '{group}' references unknown table '{table}'")]
    UnknownTable { group: String, table: String },

    /// Two schema objects share a name.
    #[error("duplicate schema object: {0}")]
    DuplicateName(String),

    /// A table or UDT definition is inconsistent.
    #[error("invalid schema for '{name}': {reason}")]
    InvalidSchema { name: String, reason: String },
}
