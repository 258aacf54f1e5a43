//! Error types for strata-restore operations.

use std::io;
use thiserror::Error;

/// The error type for strata-restore operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred while reading a description file.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed as JSON but does not have the expected shape.
    #[error("Invalid restore format: {0}")]
    InvalidFormat(String),
}

/// A specialized Result type for strata-restore operations.
pub type Result<T> = std::result::Result<T, Error>;
