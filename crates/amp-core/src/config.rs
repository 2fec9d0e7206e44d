//! Load, edit and write back a config tree in its original encoding.

use std::path::{Path, PathBuf};

use tracing::debug;

use amp_dta::{DataList, DtaDocument, read_dta, write_dta};

use crate::error::{Result, SongError};

/// A tree file loaded for editing.
///
/// Saving keeps the representation it was read from: binary files stay
/// binary with the same version and obfuscation, text stays text.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    document: DtaDocument,
}

impl ConfigFile {
    /// Load a tree file.
    pub fn load(path: &Path) -> Result<Self> {
        let document = read_dta(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    /// File this tree was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn root(&self) -> &DataList {
        &self.document.root
    }

    pub fn root_mut(&mut self) -> &mut DataList {
        &mut self.document.root
    }

    #[must_use]
    pub fn document(&self) -> &DtaDocument {
        &self.document
    }

    /// Follow `path` from the root, failing with `MalformedConfig`.
    pub fn require(&self, path: &[&str]) -> Result<&DataList> {
        self.document
            .root
            .find_path(path)
            .ok_or_else(|| SongError::malformed_config(&self.path, path.join("/")))
    }

    /// Mutable variant of [`require`](Self::require).
    pub fn require_mut(&mut self, path: &[&str]) -> Result<&mut DataList> {
        let file = &self.path;
        self.document
            .root
            .find_path_mut(path)
            .ok_or_else(|| SongError::malformed_config(file, path.join("/")))
    }

    /// Write the tree back to its file.
    pub fn save(&self) -> Result<()> {
        write_dta(&self.path, &self.document)?;
        debug!(path = %self.path.display(), "rebuilt config");
        Ok(())
    }
}
