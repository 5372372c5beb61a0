//! Errors raised while assembling a mapping stack.

use std::path::PathBuf;

use thiserror::Error;

use crate::interchange::MappingError;

/// Errors that abort a stack run.
#[derive(Debug, Error)]
pub enum StackError {
    /// A source or intermediary table could not be decoded.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// IO error while reading sources or persisting artifacts.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A source anchored to the intermediary namespace names identifiers
    /// that do not follow the intermediary naming convention.
    #[error("Found unexpected {kind} mappings: [{}]", .names.join(", "))]
    Consistency { kind: &'static str, names: Vec<String> },

    /// The intermediary table is required but cannot be obtained or read.
    #[error("Intermediary mappings for {version} unavailable: {reason}")]
    MissingIntermediary { version: String, reason: String },

    /// A source's format cannot be determined from its content.
    #[error("Cannot determine the mapping format of {}", .path.display())]
    UnknownFormat { path: PathBuf },

    /// The provenance record is unreadable.
    #[error("Corrupt stack history {}: {message}", .path.display())]
    History { path: PathBuf, message: String },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A file that must exist before a run does not.
    #[error("Missing required file {}", .0.display())]
    MissingPrecondition(PathBuf),
}

impl StackError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn missing_intermediary(version: &str, reason: impl ToString) -> Self {
        Self::MissingIntermediary {
            version: version.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn history(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::History {
            path: path.into(),
            message: message.into(),
        }
    }
}
