//! Error types for the echo server.

use echostats_store::StoreError;
use thiserror::Error;

/// Errors that can occur while running echostats.
#[derive(Debug, Error)]
pub enum EchoError {
    /// Socket or file I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The logging subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),

    /// A background task panicked or was aborted.
    #[error("background task failed: {0}")]
    Task(String),
}

/// Result type for echo server operations.
pub type Result<T> = std::result::Result<T, EchoError>;
