/// Structured error types for vgenie-core.
///
/// The server and CLI fold these into their own error types; library
/// consumers get structured, composable errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for vgenie-core operations
#[derive(Error, Debug)]
pub enum GenieError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Input field failed validation
    #[error("{field}: {reason}")]
    Validation { field: String, reason: String },

    /// Configuration file could not be read or parsed
    #[error("Configuration error in {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },

    /// Report could not be rendered
    #[error("Failed to render report: {reason}")]
    Report { reason: String },
}

/// Result type alias for vgenie-core operations
pub type Result<T> = std::result::Result<T, GenieError>;

impl GenieError {
    /// Create a validation error for a named field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a config error
    pub fn config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a report error
    pub fn report(reason: impl Into<String>) -> Self {
        Self::Report {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GenieError::validation("annual_revenue", "must be a finite number");
        assert_eq!(err.to_string(), "annual_revenue: must be a finite number");

        let err = GenieError::config("/tmp/vgenie.toml", "invalid TOML");
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("/tmp/vgenie.toml"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: GenieError = io_err.into();

        assert!(matches!(err, GenieError::Io { .. }));
    }
}
