//! Error types for the storage layer.

use thiserror::Error;

/// Result type alias using LoaderError.
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Primary error type for storage operations.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Table does not exist: {0}")]
    TableMissing(String),

    #[error("Invalid table definition for '{table}': {message}")]
    InvalidTable { table: String, message: String },

    #[error("Row {row} of '{table}' has {found} values, expected {expected}")]
    ArityMismatch {
        table: String,
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),
}
