//! Binary (`.dtb`) form of data trees.
//!
//! A plain stream starts with the byte `0x01` followed by the root list
//! header and its children. Every child is a little-endian `u32` type tag
//! and a payload. Three list header layouts exist:
//!
//! | Version | List header                         |
//! |---------|-------------------------------------|
//! | 1       | `count u16, line u32`               |
//! | 2       | `count u16, line u32, id u16`       |
//! | 3       | `line u32, count u16, id u16`       |
//!
//! The root header's line slot carries the version number. Nested lists
//! carry the source line and an id, which are kept on [`crate::DataList`]
//! and written back as read. An obfuscated stream is a four-byte seed
//! followed by the plain stream XORed with the keystream from
//! [`crate::crypt`].
//!
//! Strings are UTF-8. A stream holding any string that is not valid UTF-8
//! is read entirely as Latin-1 and written back the same way.

mod reader;
mod writer;

use std::fmt;

use crate::error::{DtaError, Result};

pub use reader::parse_binary;
pub use writer::{DtbWriteOptions, serialize_binary};

pub(crate) const TAG_INT: u32 = 0x00;
pub(crate) const TAG_FLOAT: u32 = 0x01;
pub(crate) const TAG_VARIABLE: u32 = 0x02;
pub(crate) const TAG_SYMBOL: u32 = 0x05;
pub(crate) const TAG_UNHANDLED: u32 = 0x06;
pub(crate) const TAG_IFDEF: u32 = 0x07;
pub(crate) const TAG_ELSE: u32 = 0x08;
pub(crate) const TAG_ENDIF: u32 = 0x09;
pub(crate) const TAG_ARRAY: u32 = 0x10;
pub(crate) const TAG_COMMAND: u32 = 0x11;
pub(crate) const TAG_STRING: u32 = 0x12;
pub(crate) const TAG_PROPERTY: u32 = 0x13;
pub(crate) const TAG_DEFINE: u32 = 0x20;
pub(crate) const TAG_INCLUDE: u32 = 0x21;
pub(crate) const TAG_MERGE: u32 = 0x22;
pub(crate) const TAG_IFNDEF: u32 = 0x23;
pub(crate) const TAG_AUTORUN: u32 = 0x24;
pub(crate) const TAG_UNDEF: u32 = 0x25;

/// First byte of every plain binary stream.
pub const BINARY_MAGIC: u8 = 0x01;

/// Binary list header layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DtbVersion {
    /// `count u16, line u32`
    V1,
    /// `count u16, line u32, id u16`
    V2,
    /// `line u32, count u16, id u16`
    #[default]
    V3,
}

impl DtbVersion {
    /// All versions, in detection order.
    pub const ALL: [DtbVersion; 3] = [DtbVersion::V1, DtbVersion::V2, DtbVersion::V3];

    /// Numeric version.
    #[must_use]
    pub const fn number(self) -> u32 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }

    /// Byte offset of the line slot within a list header.
    pub(crate) const fn line_offset(self) -> usize {
        match self {
            Self::V1 | Self::V2 => 2,
            Self::V3 => 0,
        }
    }
}

impl TryFrom<u32> for DtbVersion {
    type Error = DtaError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            version => Err(DtaError::UnsupportedVersion { version }),
        }
    }
}

impl fmt::Display for DtbVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

/// Byte encoding of strings inside a binary tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StringEncoding {
    #[default]
    Utf8,
    /// One byte per character, `U+0000..=U+00FF`.
    Latin1,
}

impl StringEncoding {
    /// Decode string bytes. Latin-1 never fails.
    pub(crate) fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            Self::Latin1 => Some(bytes.iter().map(|b| char::from(*b)).collect()),
        }
    }

    /// Encode a string, or `None` when a character has no byte in this encoding.
    pub(crate) fn encode(self, value: &str) -> Option<Vec<u8>> {
        match self {
            Self::Utf8 => Some(value.as_bytes().to_vec()),
            Self::Latin1 => value.chars().map(|c| u8::try_from(c).ok()).collect(),
        }
    }
}

/// Whether `data` looks like a binary tree, plain or obfuscated.
#[must_use]
pub fn looks_binary(data: &[u8]) -> bool {
    match data.first() {
        Some(&BINARY_MAGIC) => true,
        Some(_) => first_obfuscated_byte(data) == Some(BINARY_MAGIC),
        None => false,
    }
}

/// Decode only the first byte after an obfuscation seed.
pub(crate) fn first_obfuscated_byte(data: &[u8]) -> Option<u8> {
    let (seed, body) = data.split_first_chunk::<4>()?;
    let first = *body.first()?;
    let key = crate::crypt::crypt_round(u32::from_le_bytes(*seed) as i32);
    Some(first ^ key as u8)
}
