//! Error types for strata operations.
//!
//! Nothing in this crate retries. Lower-level failures are logged with the
//! project or manifest they concern and then surfaced unchanged through
//! [`Error`]; presenting them to a user is the caller's job.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The error type for strata operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The architecture, a layer, or the analysis settings failed a required-field check.
    ///
    /// Raised before any graph work starts.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The resolution tool failed for a manifest, or its output could not be read.
    #[error("Resolution failed for '{}': {reason}", manifest.display())]
    Resolution {
        /// The manifest or project the tool was working on.
        manifest: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A stateful job was used while busy or after it was disposed.
    #[error("Invalid state: {0}")]
    State(String),

    /// The operation observed a cancellation request and stopped.
    #[error("Operation cancelled")]
    Cancelled,

    /// A graph cache file could not be read or written.
    #[error("Graph cache error: {0}")]
    Cache(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Build a resolution error for `manifest`.
    pub fn resolution(manifest: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            manifest: manifest.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for [`Error::Cancelled`].
    ///
    /// Cancellation is not a failure; callers usually want to report it differently.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A specialized Result type for strata operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_error_names_the_manifest() {
        let error = Error::resolution("/repo/App.sln", "exit status 1");

        let display = error.to_string();
        assert!(display.contains("/repo/App.sln"));
        assert!(display.contains("exit status 1"));
    }

    #[test]
    fn only_cancelled_reports_cancellation() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::State("busy".to_string()).is_cancelled());
    }
}
