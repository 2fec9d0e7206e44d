//! Error types for song and tweak operations.

use std::fmt::Write as _;
use std::path::PathBuf;
use thiserror::Error;

use amp_dta::DtaError;

/// Errors that can occur while editing game data.
#[derive(Debug, Error)]
pub enum SongError {
    /// A required file or directory does not exist.
    #[error("not found: {path}")]
    NotFound { path: PathBuf },

    /// Input is not in the expected form.
    #[error("invalid format: {message}")]
    InvalidFormat { message: String },

    /// One or more companion assets are missing.
    #[error("song {song} is missing {}", list_paths(missing))]
    Validation { song: String, missing: Vec<PathBuf> },

    /// A config tree lacks a node the operation needs.
    #[error("{}: node '{node}' not found", file.display())]
    MalformedConfig { file: PathBuf, node: String },

    /// No tempo terminator in the scanned window.
    #[error("tempo marker not found near the end of the track")]
    PatchNotFound,

    /// A song folder with the same name already exists.
    #[error("song {song} already exists")]
    AlreadyExists { song: String },

    /// Refusing to remove a built-in song.
    #[error("refusing to remove built-in song {song} without force")]
    ProtectedSong { song: String },

    /// Song metadata has no usable `bpm`.
    #[error("song {song} has no usable bpm")]
    MissingTempo { song: String },

    /// No tweak is registered under the verb.
    #[error("unknown tweak: {verb}")]
    UnknownTweak { verb: String },

    /// Neither platform directory exists under the game root.
    #[error("cannot determine the platform of {}", path.display())]
    UnsupportedPlatform { path: PathBuf },

    /// Saved state needed to undo a tweak is missing.
    #[error("saved defaults not found: {}", path.display())]
    MissingSnapshot { path: PathBuf },

    /// Data tree error.
    #[error(transparent)]
    Dta(DtaError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for song operations.
pub type Result<T> = std::result::Result<T, SongError>;

impl From<DtaError> for SongError {
    fn from(err: DtaError) -> Self {
        match err {
            DtaError::FileNotFound { path } => Self::NotFound { path },
            other => Self::Dta(other),
        }
    }
}

impl SongError {
    /// Create an InvalidFormat error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create a MalformedConfig error.
    pub fn malformed_config(file: impl Into<PathBuf>, node: impl Into<String>) -> Self {
        Self::MalformedConfig {
            file: file.into(),
            node: node.into(),
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

fn list_paths(paths: &[PathBuf]) -> String {
    let mut out = String::new();
    for (index, path) in paths.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}", path.display());
    }
    out
}
