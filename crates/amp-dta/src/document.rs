//! Tree documents: a root list plus the encoding it was read from.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::binary::{
    DtbVersion, DtbWriteOptions, StringEncoding, looks_binary, parse_binary, serialize_binary,
};
use crate::error::{DtaError, Result};
use crate::node::DataList;
use crate::text::{parse_text, parse_text_bytes, serialize_text};

/// Representation a document was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFormat {
    /// `.dta` text.
    #[default]
    Text,
    /// `.dtb` binary.
    Binary,
}

/// Root list with its codec metadata.
///
/// Text documents report version 3 and no obfuscation, which is what they
/// are compiled to by default.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DtaDocument {
    pub root: DataList,
    pub version: DtbVersion,
    pub obfuscated: bool,
    pub encoding: StringEncoding,
    pub source: SourceFormat,
}

impl DtaDocument {
    /// Wrap a root list as a text document.
    #[must_use]
    pub fn new(root: DataList) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    /// Parse the text form.
    pub fn parse_text(source: &str) -> Result<Self> {
        parse_text(source).map(Self::new)
    }

    /// Parse the binary form.
    pub fn parse_binary(data: &[u8]) -> Result<Self> {
        parse_binary(data)
    }

    /// Parse either form, deciding from the leading bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.first() == Some(&crate::binary::BINARY_MAGIC) {
            return parse_binary(data);
        }
        if looks_binary(data)
            && let Ok(document) = parse_binary(data)
        {
            return Ok(document);
        }
        parse_text_bytes(data).map(Self::new)
    }

    /// Serialize to text.
    #[must_use]
    pub fn to_text(&self) -> String {
        serialize_text(&self.root)
    }

    /// Serialize to binary with explicit options.
    pub fn to_binary(&self, options: DtbWriteOptions) -> Result<Vec<u8>> {
        serialize_binary(&self.root, options)
    }

    /// Binary options matching this document's version, obfuscation and
    /// string encoding.
    #[must_use]
    pub fn write_options(&self) -> DtbWriteOptions {
        DtbWriteOptions::new()
            .with_version(self.version)
            .with_obfuscation(self.obfuscated)
            .with_encoding(self.encoding)
    }

    /// Serialize in the representation the document was read from.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self.source {
            SourceFormat::Text => Ok(self.to_text().into_bytes()),
            SourceFormat::Binary => self.to_binary(self.write_options()),
        }
    }
}

/// Read a tree document from a file in either form.
pub fn read_dta(path: &Path) -> Result<DtaDocument> {
    let data = fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DtaError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            DtaError::Io(e)
        }
    })?;
    let document = DtaDocument::from_bytes(&data)?;
    debug!(
        path = %path.display(),
        source = ?document.source,
        version = %document.version,
        obfuscated = document.obfuscated,
        "read data tree"
    );
    Ok(document)
}

/// Write a tree document in its own representation.
pub fn write_dta(path: &Path, document: &DtaDocument) -> Result<()> {
    fs::write(path, document.to_bytes()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn from_bytes_detects_text() {
        let doc = DtaDocument::from_bytes(b"(bpm 128)").expect("text");
        assert_eq!(doc.source, SourceFormat::Text);
        assert_eq!(doc.version, DtbVersion::V3);
        assert!(!doc.obfuscated);
    }

    #[test]
    fn to_bytes_keeps_representation() {
        let mut doc = DtaDocument::parse_text("(bpm 128)").expect("text");
        doc.source = SourceFormat::Binary;
        doc.version = DtbVersion::V1;
        doc.obfuscated = true;
        let bytes = doc.to_bytes().expect("bytes");
        let back = DtaDocument::from_bytes(&bytes).expect("binary");
        assert_eq!(back, doc);
    }

    #[test]
    fn read_dta_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_dta(&dir.path().join("missing.dta")).expect_err("missing");
        assert!(matches!(err, DtaError::FileNotFound { .. }));

        let path = dir.path().join("song.dta");
        let doc = DtaDocument::new(DataList::new().with(DataList::named("bpm").with(Node::int(1))));
        write_dta(&path, &doc).expect("write");
        assert_eq!(read_dta(&path).expect("read"), doc);
    }
}
