//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
///
/// Per-recipient send failures never show up here: they are recorded as
/// delivery log entries. An `Error` returned from a tick means a store was
/// unusable and the whole tick was abandoned.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A referenced record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored value could not be decoded.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A worker task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Task(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
