//! Binary tree writer.

use super::{
    BINARY_MAGIC, DtbVersion, TAG_ARRAY, TAG_AUTORUN, TAG_COMMAND, TAG_DEFINE, TAG_ELSE,
    TAG_ENDIF, TAG_FLOAT, TAG_IFDEF, TAG_IFNDEF, TAG_INCLUDE, TAG_INT, TAG_MERGE, TAG_PROPERTY,
    TAG_STRING, TAG_SYMBOL, TAG_UNDEF, TAG_UNHANDLED, TAG_VARIABLE, StringEncoding,
};
use crate::crypt::{DEFAULT_SEED, obfuscate};
use crate::error::{DtaError, Result};
use crate::node::{Atom, DataList, ListKind, Node};

/// Options for writing binary trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DtbWriteOptions {
    /// List header layout (default: v3).
    pub version: DtbVersion,
    /// Whether to obfuscate the output (default: false).
    pub obfuscate: bool,
    /// String byte encoding (default: UTF-8).
    pub encoding: StringEncoding,
}

impl DtbWriteOptions {
    /// Create writer options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header layout.
    #[must_use]
    pub fn with_version(mut self, version: DtbVersion) -> Self {
        self.version = version;
        self
    }

    /// Enable or disable obfuscation.
    #[must_use]
    pub fn with_obfuscation(mut self, enable: bool) -> Self {
        self.obfuscate = enable;
        self
    }

    /// Set the string encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: StringEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Serialize a root list to the binary form.
///
/// Nested list headers take each list's `line` and `id`; the root line slot
/// always holds the version number. Obfuscation uses a fixed seed.
///
/// # Errors
///
/// Returns [`DtaError::ListTooLong`] when a list has more children than a
/// `u16` count can hold, and [`DtaError::Unencodable`] when a string does not
/// fit the requested encoding.
pub fn serialize_binary(root: &DataList, options: DtbWriteOptions) -> Result<Vec<u8>> {
    let mut writer = BinaryWriter {
        out: vec![BINARY_MAGIC],
        version: options.version,
        encoding: options.encoding,
    };
    writer.write_list(root, options.version.number())?;
    Ok(if options.obfuscate {
        obfuscate(DEFAULT_SEED, &writer.out)
    } else {
        writer.out
    })
}

struct BinaryWriter {
    out: Vec<u8>,
    version: DtbVersion,
    encoding: StringEncoding,
}

impl BinaryWriter {
    fn u16(&mut self, value: u16) {
        self.out.extend_from_slice(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.out.extend_from_slice(&value.to_le_bytes());
    }

    fn string(&mut self, tag: u32, value: &str) -> Result<()> {
        let bytes = self
            .encoding
            .encode(value)
            .ok_or_else(|| DtaError::Unencodable {
                value: value.to_string(),
            })?;
        self.u32(tag);
        self.u32(bytes.len() as u32);
        self.out.extend_from_slice(&bytes);
        Ok(())
    }

    /// Tag followed by an empty payload word.
    fn marker(&mut self, tag: u32) {
        self.u32(tag);
        self.u32(0);
    }

    fn write_list(&mut self, list: &DataList, line: u32) -> Result<()> {
        let count = u16::try_from(list.children.len()).map_err(|_| DtaError::ListTooLong {
            len: list.children.len(),
            limit: usize::from(u16::MAX),
        })?;
        match self.version {
            DtbVersion::V1 => {
                self.u16(count);
                self.u32(line);
            }
            DtbVersion::V2 => {
                self.u16(count);
                self.u32(line);
                self.u16(list.id);
            }
            DtbVersion::V3 => {
                self.u32(line);
                self.u16(count);
                self.u16(list.id);
            }
        }
        for child in &list.children {
            self.write_node(child)?;
        }
        Ok(())
    }

    fn write_node(&mut self, node: &Node) -> Result<()> {
        match node {
            Node::List(list) => {
                self.u32(match list.kind {
                    ListKind::Array => TAG_ARRAY,
                    ListKind::Command => TAG_COMMAND,
                    ListKind::Property => TAG_PROPERTY,
                });
                self.write_list(list, list.line)?;
            }
            Node::Symbol(name) => self.string(TAG_SYMBOL, name)?,
            Node::Atom(atom) => match atom {
                Atom::Int(value) => {
                    self.u32(TAG_INT);
                    self.out.extend_from_slice(&value.to_le_bytes());
                }
                Atom::Float(value) => {
                    self.u32(TAG_FLOAT);
                    self.out.extend_from_slice(&value.to_le_bytes());
                }
                Atom::String(value) => self.string(TAG_STRING, value)?,
                Atom::Variable(name) => self.string(TAG_VARIABLE, name)?,
                Atom::Include(path) => self.string(TAG_INCLUDE, path)?,
                Atom::Merge(path) => self.string(TAG_MERGE, path)?,
                Atom::Define(name) => self.string(TAG_DEFINE, name)?,
                Atom::IfDef(name) => self.string(TAG_IFDEF, name)?,
                Atom::IfNDef(name) => self.string(TAG_IFNDEF, name)?,
                Atom::Undef(name) => self.string(TAG_UNDEF, name)?,
                Atom::Else => self.marker(TAG_ELSE),
                Atom::EndIf => self.marker(TAG_ENDIF),
                Atom::Autorun => self.marker(TAG_AUTORUN),
                Atom::Unhandled => self.marker(TAG_UNHANDLED),
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::parse_binary;

    fn sample() -> DataList {
        DataList::new()
            .with(DataList::named("title").with(Node::string("Wetware")))
            .with(
                DataList::named("tracks")
                    .with(DataList::named("drum").with(DataList::new().with(Node::int(0)))),
            )
    }

    #[test]
    fn root_line_slot_holds_version() {
        let v1 = serialize_binary(&sample(), DtbWriteOptions::new().with_version(DtbVersion::V1))
            .expect("v1");
        assert_eq!(&v1[..7], &[0x01, 2, 0, 1, 0, 0, 0]);
        let v3 = serialize_binary(&sample(), DtbWriteOptions::new()).expect("v3");
        assert_eq!(&v3[..9], &[0x01, 3, 0, 0, 0, 2, 0, 0, 0]);
    }

    #[test]
    fn obfuscated_output_is_detected() {
        let options = DtbWriteOptions::new()
            .with_version(DtbVersion::V2)
            .with_obfuscation(true);
        let bytes = serialize_binary(&sample(), options).expect("write");
        assert_ne!(bytes[0], BINARY_MAGIC);
        let doc = parse_binary(&bytes).expect("read");
        assert!(doc.obfuscated);
        assert_eq!(doc.version, DtbVersion::V2);
        assert_eq!(doc.root, sample());
    }

    #[test]
    fn rejects_oversized_lists() {
        let mut list = DataList::new();
        list.children = vec![Node::int(0); usize::from(u16::MAX) + 1];
        let err = serialize_binary(&list, DtbWriteOptions::new()).expect_err("too long");
        assert!(matches!(err, DtaError::ListTooLong { .. }));
    }

    #[test]
    fn latin1_rejects_wide_characters() {
        let list = DataList::new().with(Node::string("Caf\u{e9} \u{2014} Bar"));
        let options = DtbWriteOptions::new().with_encoding(StringEncoding::Latin1);
        let err = serialize_binary(&list, options).expect_err("wide");
        assert!(matches!(err, DtaError::Unencodable { .. }));

        let list = DataList::new().with(Node::string("Caf\u{e9}"));
        let bytes = serialize_binary(&list, options).expect("narrow");
        assert_eq!(&bytes[bytes.len() - 4..], b"Caf\xe9");
    }

    #[test]
    fn nested_headers_use_list_metadata() {
        let mut nested = DataList::named("b");
        nested.line = 7;
        nested.id = 3;
        let root = DataList::new().with(nested);
        let v3 = serialize_binary(&root, DtbWriteOptions::new()).expect("v3");
        // magic, root header, nested tag, then line u32, count u16, id u16
        assert_eq!(&v3[13..21], &[7, 0, 0, 0, 1, 0, 3, 0]);
    }
}

