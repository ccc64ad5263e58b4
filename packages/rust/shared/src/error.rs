//! Error types for lexhound.
//!
//! Library crates use [`LexhoundError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Pipeline *outcomes* (a URL failing validation, a page not being a law
//! page) are not errors — they are [`crate::types::Reason`] codes carried in
//! result records. Errors are reserved for environment faults: unreadable
//! files, malformed data files, a broken ledger database, and so on.

use std::path::PathBuf;

/// Top-level error type for all lexhound operations.
#[derive(Debug, thiserror::Error)]
pub enum LexhoundError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error outside the reason-code taxonomy.
    #[error("network error: {0}")]
    Network(String),

    /// HTML, URL, or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Attempt-ledger database error.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad jurisdiction code, malformed data file).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LexhoundError>;

impl LexhoundError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = LexhoundError::config("missing data directory");
        assert_eq!(err.to_string(), "config error: missing data directory");

        let err = LexhoundError::validation("jurisdiction code 'A1B' not recognized");
        assert!(err.to_string().contains("A1B"));
    }
}
