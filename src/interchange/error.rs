//! Error types for mapping interchange operations.

use thiserror::Error;

/// Errors that can occur while reading or writing mapping tables.
#[derive(Debug, Error)]
pub enum MappingError {
    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed record, unknown record marker or bad header.
    #[error("Format error at line {line}: {message}")]
    Format { line: usize, message: String },

    /// A requested namespace is not among the header's columns.
    #[error("Missing namespace {namespace:?} (available: {available:?})")]
    MissingNamespace {
        namespace: String,
        available: Vec<String>,
    },

    /// ZIP archive error (for jar-wrapped tables).
    #[error("Archive error: {0}")]
    Archive(String),

    /// Unsupported feature or format variant.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl MappingError {
    /// Create a format error for a (1-based) line.
    pub fn format(line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: message.into(),
        }
    }

    /// Create a format error for a problem with the header line.
    pub fn header(message: impl Into<String>) -> Self {
        Self::format(1, message)
    }

    /// Create an archive error.
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive(message.into())
    }

    /// Create a missing namespace error.
    pub fn missing_namespace<S: AsRef<str>>(namespace: &str, available: &[S]) -> Self {
        Self::MissingNamespace {
            namespace: namespace.to_string(),
            available: available.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    /// Returns true for errors caused by the content of the input.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::Format { .. } | Self::MissingNamespace { .. })
    }
}
