//! Archive header (`.hdr`) codec.
//!
//! | Field       | Encoding                                             |
//! |-------------|------------------------------------------------------|
//! | marker      | `u32`, platform extra word or signed marker          |
//! | xor         | `u8`, applied to every body byte                     |
//! | body        | keystream-obfuscated with the platform archive key   |
//!
//! The body holds the version, the extra word, the part table and the entry
//! table. Strings are a `u32` length followed by UTF-8 bytes.

use std::fs;
use std::path::Path;

use amp_dta::crypt::apply_keystream_with_xor;
use amp_model::Platform;

use crate::error::{ArkError, Result};

/// Header format version written and accepted.
pub const ARCHIVE_VERSION: u32 = 9;

/// Byte XORed into every header body byte.
pub const HEADER_XOR: u8 = 0xFF;

/// One part file holding concatenated entry payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePart {
    /// File name relative to the header's directory.
    pub file_name: String,
    /// Total payload bytes.
    pub size: u32,
}

/// Location of one logical file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub file_name: String,
    /// Forward-slash separated; empty at the archive root.
    pub dir_path: String,
    pub part: u32,
    pub offset: u32,
    pub size: u32,
    pub inflated_size: u32,
    pub extra: u32,
}

impl ArchiveEntry {
    /// Logical path, `dir_path/file_name`.
    #[must_use]
    pub fn full_path(&self) -> String {
        if self.dir_path.is_empty() {
            self.file_name.clone()
        } else {
            format!("{}/{}", self.dir_path, self.file_name)
        }
    }

    /// Bytes this entry accounts for in progress reports.
    #[must_use]
    pub fn weight(&self) -> u64 {
        u64::from(self.size.max(self.inflated_size))
    }
}

/// Decoded archive index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub platform: Platform,
    pub version: u32,
    pub parts: Vec<ArchivePart>,
    pub entries: Vec<ArchiveEntry>,
}

impl Archive {
    /// Empty archive for `platform`.
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            version: ARCHIVE_VERSION,
            parts: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Find an entry by logical path.
    #[must_use]
    pub fn entry(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|entry| entry.full_path() == path)
    }

    /// Encode the header, marker included.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut body = Vec::new();
        put_u32(&mut body, self.version);
        put_u32(&mut body, self.platform.extra());
        put_u32(&mut body, self.parts.len() as u32);
        for part in &self.parts {
            put_u32(&mut body, part.size);
            put_string(&mut body, &part.file_name);
        }
        put_u32(&mut body, self.entries.len() as u32);
        for entry in &self.entries {
            put_string(&mut body, &entry.file_name);
            put_string(&mut body, &entry.dir_path);
            put_u32(&mut body, entry.part);
            put_u32(&mut body, entry.offset);
            put_u32(&mut body, entry.size);
            put_u32(&mut body, entry.inflated_size);
            put_u32(&mut body, entry.extra);
        }
        apply_keystream_with_xor(self.platform.archive_key(), &mut body, HEADER_XOR);

        let marker = self
            .platform
            .signed_marker()
            .unwrap_or(self.platform.extra());
        let mut out = Vec::with_capacity(body.len() + 5);
        out.extend_from_slice(&marker.to_le_bytes());
        out.push(HEADER_XOR);
        out.extend_from_slice(&body);
        out
    }

    /// Decode a header, resolving the platform from its marker.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let (marker, rest) = data
            .split_first_chunk::<4>()
            .ok_or_else(|| ArkError::invalid_header("header is shorter than its marker"))?;
        let marker = u32::from_le_bytes(*marker);
        let platform = Platform::from_header_marker(marker).ok_or_else(|| {
            ArkError::invalid_header(format!("unknown platform marker 0x{marker:08X}"))
        })?;
        let (&xor, body) = rest
            .split_first()
            .ok_or_else(|| ArkError::invalid_header("missing xor byte"))?;
        let mut body = body.to_vec();
        apply_keystream_with_xor(platform.archive_key(), &mut body, xor);

        let mut cursor = Cursor { data: &body, pos: 0 };
        let version = cursor.u32()?;
        if version != ARCHIVE_VERSION {
            return Err(ArkError::invalid_header(format!(
                "unsupported archive version {version}"
            )));
        }
        cursor.u32()?;

        let part_count = cursor.u32()?;
        let mut parts = Vec::new();
        for _ in 0..part_count {
            let size = cursor.u32()?;
            let file_name = cursor.string()?;
            parts.push(ArchivePart { file_name, size });
        }

        let entry_count = cursor.u32()?;
        let mut entries = Vec::new();
        for _ in 0..entry_count {
            let entry = ArchiveEntry {
                file_name: cursor.string()?,
                dir_path: cursor.string()?,
                part: cursor.u32()?,
                offset: cursor.u32()?,
                size: cursor.u32()?,
                inflated_size: cursor.u32()?,
                extra: cursor.u32()?,
            };
            if entry.part as usize >= parts.len() {
                return Err(ArkError::invalid_header(format!(
                    "entry {} refers to missing part {}",
                    entry.full_path(),
                    entry.part
                )));
            }
            entries.push(entry);
        }

        Ok(Self {
            platform,
            version,
            parts,
            entries,
        })
    }
}

/// Read and decode a header file.
pub fn read_header(path: &Path) -> Result<Archive> {
    let data = fs::read(path).map_err(|e| ArkError::from_io(e, path))?;
    Archive::from_bytes(&data)
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_string(out: &mut Vec<u8>, value: &str) {
    put_u32(out, value.len() as u32);
    out.extend_from_slice(value.as_bytes());
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn bytes(&mut self, len: usize) -> Result<&[u8]> {
        let slice = self
            .data
            .get(self.pos..self.pos.saturating_add(len))
            .ok_or_else(|| ArkError::invalid_header(format!("truncated at offset {}", self.pos)))?;
        self.pos += len;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let bytes = self.bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ArkError::invalid_header("entry name is not valid UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(platform: Platform) -> Archive {
        let mut archive = Archive::new(platform);
        archive.parts.push(ArchivePart {
            file_name: "main_ps4_0.ark".to_string(),
            size: 12,
        });
        archive.entries.push(ArchiveEntry {
            file_name: "tut0.mogg".to_string(),
            dir_path: "ps4/songs/tut0".to_string(),
            part: 0,
            offset: 0,
            size: 12,
            inflated_size: 12,
            extra: platform.extra(),
        });
        archive
    }

    #[test]
    fn header_round_trips_for_each_platform() {
        for platform in Platform::ALL {
            let archive = sample(platform);
            let bytes = archive.to_bytes();
            assert_eq!(bytes[4], HEADER_XOR);
            assert_eq!(Archive::from_bytes(&bytes).expect("decode"), archive);
        }
    }

    #[test]
    fn ps4_header_carries_signed_marker() {
        let bytes = sample(Platform::Ps4).to_bytes();
        assert_eq!(&bytes[..4], &0x6F30_3F55u32.to_le_bytes());
        let bytes = sample(Platform::Ps3).to_bytes();
        assert_eq!(&bytes[..4], &Platform::Ps3.extra().to_le_bytes());
    }

    #[test]
    fn body_is_obfuscated() {
        let bytes = sample(Platform::Ps3).to_bytes();
        let needle = b"tut0.mogg";
        assert!(!bytes.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn rejects_unknown_marker_and_truncation() {
        let err = Archive::from_bytes(&[0, 0, 0, 0, 0xFF]).expect_err("marker");
        assert!(matches!(err, ArkError::InvalidHeader { .. }));

        let bytes = sample(Platform::Ps3).to_bytes();
        let err = Archive::from_bytes(&bytes[..bytes.len() - 3]).expect_err("truncated");
        assert!(matches!(err, ArkError::InvalidHeader { .. }));
    }

    #[test]
    fn full_path_joins_directory() {
        let archive = sample(Platform::Ps3);
        assert_eq!(archive.entries[0].full_path(), "ps4/songs/tut0/tut0.mogg");
        assert!(archive.entry("ps4/songs/tut0/tut0.mogg").is_some());

        let mut root = archive.entries[0].clone();
        root.dir_path.clear();
        assert_eq!(root.full_path(), "tut0.mogg");
    }
}
