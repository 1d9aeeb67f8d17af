//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store cannot accept writes right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record names a column the table does not have.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The blocking worker running a query failed.
    #[error("blocking task failed: {0}")]
    Join(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
