//! Error taxonomy for the resolution and merge engine.
//!
//! Only [`Error::InvalidInput`] ever reaches a caller from the core
//! operations. Source failures are recovered locally and surface as
//! [`Warning`](crate::models::Warning)s in the outcome envelope. The
//! driver variants are what adapters bubble up with `?` before the fan-out
//! folds them into [`Error::AdapterUnavailable`].

use thiserror::Error;

use crate::models::SourceKind;

/// Result type for reentry-harness operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A required argument was empty or malformed. Never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// One backing store could not be reached, timed out, or rejected the
    /// query.
    #[error("{kind} source unavailable: {reason}")]
    AdapterUnavailable { kind: SourceKind, reason: String },

    /// Configuration loading or validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}
