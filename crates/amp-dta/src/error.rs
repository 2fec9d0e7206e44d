//! Error types for data tree operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading or writing data trees.
#[derive(Debug, Error)]
pub enum DtaError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Text form could not be parsed.
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// Binary form is truncated, has an unknown preamble or an unknown node type.
    #[error("malformed binary data: {message}")]
    MalformedFormat { message: String },

    /// Binary version number outside the supported set.
    #[error("unsupported binary version {version}")]
    UnsupportedVersion { version: u32 },

    /// A list has more children than the binary header can count.
    #[error("list with {len} children exceeds the binary limit of {limit}")]
    ListTooLong { len: usize, limit: usize },

    /// A string has characters the document's string encoding cannot hold.
    #[error("string {value:?} cannot be written as Latin-1")]
    Unencodable { value: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for data tree operations.
pub type Result<T> = std::result::Result<T, DtaError>;

impl DtaError {
    /// Create a Syntax error.
    pub fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a MalformedFormat error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedFormat {
            message: message.into(),
        }
    }
}
