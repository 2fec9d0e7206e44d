//! Binary tree reader.

use tracing::trace;

use super::{
    BINARY_MAGIC, DtbVersion, TAG_ARRAY, TAG_AUTORUN, TAG_COMMAND, TAG_DEFINE, TAG_ELSE,
    TAG_ENDIF, TAG_FLOAT, TAG_IFDEF, TAG_IFNDEF, TAG_INCLUDE, TAG_INT, TAG_MERGE, TAG_PROPERTY,
    TAG_STRING, TAG_SYMBOL, TAG_UNDEF, TAG_UNHANDLED, TAG_VARIABLE, StringEncoding,
    first_obfuscated_byte,
};
use crate::crypt::deobfuscate;
use crate::document::{DtaDocument, SourceFormat};
use crate::error::{DtaError, Result};
use crate::node::{Atom, DataList, ListKind, Node};

/// Nesting depth past which input is rejected.
const MAX_DEPTH: usize = 256;

/// Parse a binary tree, detecting obfuscation and header layout.
///
/// # Errors
///
/// Returns [`DtaError::MalformedFormat`] when no layout decodes the whole
/// stream.
pub fn parse_binary(data: &[u8]) -> Result<DtaDocument> {
    let plain_error = match data.first() {
        None => return Err(DtaError::malformed("empty input")),
        Some(&BINARY_MAGIC) => match parse_plain(data) {
            Ok(decoded) => return Ok(document(decoded, false)),
            Err(err) => Some(err),
        },
        Some(_) => None,
    };

    if first_obfuscated_byte(data) == Some(BINARY_MAGIC) {
        let plain = deobfuscate(data).unwrap_or_default();
        return parse_plain(&plain).map(|decoded| document(decoded, true));
    }

    Err(plain_error.unwrap_or_else(|| DtaError::malformed("unrecognized binary preamble")))
}

struct Decoded {
    root: DataList,
    version: DtbVersion,
    encoding: StringEncoding,
}

fn document(decoded: Decoded, obfuscated: bool) -> DtaDocument {
    DtaDocument {
        root: decoded.root,
        version: decoded.version,
        obfuscated,
        encoding: decoded.encoding,
        source: SourceFormat::Binary,
    }
}

/// Parse a plain stream starting with the magic byte.
///
/// Layouts whose root line slot holds their own version number are tried
/// first; the first layout that consumes the whole stream wins.
fn parse_plain(data: &[u8]) -> Result<Decoded> {
    let body = data
        .get(1..)
        .ok_or_else(|| DtaError::malformed("missing root list"))?;
    let slot_matches = |version: DtbVersion| {
        let offset = version.line_offset();
        body.get(offset..offset + 4)
            .and_then(|bytes| bytes.try_into().ok())
            .map(u32::from_le_bytes)
            == Some(version.number())
    };
    let ordered = DtbVersion::ALL
        .into_iter()
        .filter(|v| slot_matches(*v))
        .chain(DtbVersion::ALL.into_iter().filter(|v| !slot_matches(*v)));

    let mut last_error = None;
    for version in ordered {
        match decode_layout(body, version, StringEncoding::Utf8) {
            Ok((root, false)) => {
                return Ok(Decoded {
                    root,
                    version,
                    encoding: StringEncoding::Utf8,
                });
            }
            // Same bytes, same structure: the Latin-1 pass cannot fail.
            Ok((_, true)) => {
                let (root, _) = decode_layout(body, version, StringEncoding::Latin1)?;
                trace!(%version, "strings decoded as Latin-1");
                return Ok(Decoded {
                    root,
                    version,
                    encoding: StringEncoding::Latin1,
                });
            }
            Err(err) => last_error = Some(err),
        }
    }
    Err(last_error.unwrap_or_else(|| DtaError::malformed("unrecognized binary preamble")))
}

/// Decode the whole body with one layout. The flag reports strings that
/// were not valid in `encoding`.
fn decode_layout(
    body: &[u8],
    version: DtbVersion,
    encoding: StringEncoding,
) -> Result<(DataList, bool)> {
    let mut reader = ByteReader::new(body, version, encoding);
    let root = reader.read_list(ListKind::Array, 0)?;
    if reader.remaining() != 0 {
        return Err(DtaError::malformed(format!(
            "{} trailing bytes after root list",
            reader.remaining()
        )));
    }
    trace!(%version, children = root.len(), "decoded binary tree");
    Ok((root, reader.misencoded))
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    version: DtbVersion,
    encoding: StringEncoding,
    misencoded: bool,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8], version: DtbVersion, encoding: StringEncoding) -> Self {
        Self {
            data,
            pos: 0,
            version,
            encoding,
            misencoded: false,
        }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self
            .data
            .get(self.pos..self.pos + N)
            .and_then(|slice| <[u8; N]>::try_from(slice).ok())
            .ok_or_else(|| {
                DtaError::malformed(format!("unexpected end of data at offset {}", self.pos))
            })?;
        self.pos += N;
        Ok(bytes)
    }

    fn u16(&mut self) -> Result<u16> {
        self.take::<2>().map(u16::from_le_bytes)
    }

    fn u32(&mut self) -> Result<u32> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    fn i32(&mut self) -> Result<i32> {
        self.take::<4>().map(i32::from_le_bytes)
    }

    fn f32(&mut self) -> Result<f32> {
        self.take::<4>().map(f32::from_le_bytes)
    }

    /// Length-prefixed text. Bytes invalid in the reader's encoding are read
    /// as Latin-1 and flagged.
    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let bytes = self
            .data
            .get(self.pos..self.pos.saturating_add(len))
            .ok_or_else(|| {
                DtaError::malformed(format!(
                    "string of {len} bytes overruns data at offset {}",
                    self.pos
                ))
            })?;
        self.pos += len;
        Ok(match self.encoding.decode(bytes) {
            Some(text) => text,
            None => {
                self.misencoded = true;
                bytes.iter().map(|b| char::from(*b)).collect()
            }
        })
    }

    /// List header and children.
    fn read_list(&mut self, kind: ListKind, depth: usize) -> Result<DataList> {
        if depth > MAX_DEPTH {
            return Err(DtaError::malformed("lists nested too deeply"));
        }
        let (count, line, id) = match self.version {
            DtbVersion::V1 => {
                let count = self.u16()?;
                (count, self.u32()?, 0)
            }
            DtbVersion::V2 => {
                let count = self.u16()?;
                let line = self.u32()?;
                (count, line, self.u16()?)
            }
            DtbVersion::V3 => {
                let line = self.u32()?;
                let count = self.u16()?;
                (count, line, self.u16()?)
            }
        };
        let mut list = DataList::with_kind(kind);
        list.line = line;
        list.id = id;
        list.children.reserve(usize::from(count).min(self.remaining() / 4));
        for _ in 0..count {
            list.children.push(self.read_node(depth)?);
        }
        Ok(list)
    }

    fn read_node(&mut self, depth: usize) -> Result<Node> {
        let offset = self.pos;
        let tag = self.u32()?;
        let node = match tag {
            TAG_INT => Node::int(self.i32()?),
            TAG_FLOAT => Node::float(self.f32()?),
            TAG_VARIABLE => Node::Atom(Atom::Variable(self.string()?)),
            TAG_SYMBOL => Node::Symbol(self.string()?),
            TAG_UNHANDLED => {
                self.u32()?;
                Node::Atom(Atom::Unhandled)
            }
            TAG_IFDEF => Node::Atom(Atom::IfDef(self.string()?)),
            TAG_ELSE => {
                self.u32()?;
                Node::Atom(Atom::Else)
            }
            TAG_ENDIF => {
                self.u32()?;
                Node::Atom(Atom::EndIf)
            }
            TAG_ARRAY => Node::List(self.read_list(ListKind::Array, depth + 1)?),
            TAG_COMMAND => Node::List(self.read_list(ListKind::Command, depth + 1)?),
            TAG_PROPERTY => Node::List(self.read_list(ListKind::Property, depth + 1)?),
            TAG_STRING => Node::string(self.string()?),
            TAG_DEFINE => Node::Atom(Atom::Define(self.string()?)),
            TAG_INCLUDE => Node::Atom(Atom::Include(self.string()?)),
            TAG_MERGE => Node::Atom(Atom::Merge(self.string()?)),
            TAG_IFNDEF => Node::Atom(Atom::IfNDef(self.string()?)),
            TAG_AUTORUN => {
                self.u32()?;
                Node::Atom(Atom::Autorun)
            }
            TAG_UNDEF => Node::Atom(Atom::Undef(self.string()?)),
            other => {
                return Err(DtaError::malformed(format!(
                    "unknown node type 0x{other:02X} at offset {offset}"
                )));
            }
        };
        Ok(node)
    }
}
