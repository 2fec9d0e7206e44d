//! Error types for archive operations.

use std::path::PathBuf;
use thiserror::Error;

use amp_dta::DtaError;

/// Errors that can occur when packing or unpacking archives.
#[derive(Debug, Error)]
pub enum ArkError {
    /// Source directory or header file does not exist.
    #[error("not found: {path}")]
    NotFound { path: PathBuf },

    /// Header path does not end in `.hdr`.
    #[error("header must have a .hdr extension: {path}")]
    InvalidHeaderPath { path: PathBuf },

    /// Header contents cannot be decoded.
    #[error("invalid archive header: {message}")]
    InvalidHeader { message: String },

    /// Entry sizes and offsets are 32-bit.
    #[error("file size of {size} bytes is above the 4 GiB limit: {path}")]
    UnsupportedFileSize { path: PathBuf, size: u64 },

    /// A config file could not be compiled.
    #[error("failed to compile {path}: {source}")]
    Compile {
        path: PathBuf,
        #[source]
        source: DtaError,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, ArkError>;

impl ArkError {
    /// Create an InvalidHeader error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Map a missing-file I/O error to `NotFound` for `path`.
    pub(crate) fn from_io(err: std::io::Error, path: &std::path::Path) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io(err)
        }
    }
}
