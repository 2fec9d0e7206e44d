//! Console targets and their format constants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Archive header marker written over the first four bytes of a PS3 header
/// by the official tooling.
pub const PS3_SIGNED_MARKER: u32 = 0xC64E_ED30;

/// Archive header marker that the PS4 loader requires.
pub const PS4_SIGNED_MARKER: u32 = 0x6F30_3F55;

/// Hardware target of an unpacked game or archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// PlayStation 3.
    Ps3,
    /// PlayStation 4.
    Ps4,
}

impl Platform {
    /// All supported platforms, in detection order.
    pub const ALL: [Platform; 2] = [Platform::Ps3, Platform::Ps4];

    /// Lowercase directory and suffix name (`ps3`, `ps4`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ps3 => "ps3",
            Self::Ps4 => "ps4",
        }
    }

    /// Seed of the keystream that obfuscates archive headers.
    #[must_use]
    pub const fn archive_key(self) -> u32 {
        match self {
            Self::Ps3 => 0xC64E_ED30,
            Self::Ps4 => 0x90CF_C0AB,
        }
    }

    /// Platform "extra" word stored in the header and in every entry.
    #[must_use]
    pub const fn extra(self) -> u32 {
        match self {
            Self::Ps3 => 0x7D40_1F60,
            Self::Ps4 => 0xDDB6_82F0,
        }
    }

    /// Marker written over the header's leading four bytes after commit.
    ///
    /// Only PS4 requires it; PS3 keeps the extra word.
    #[must_use]
    pub const fn signed_marker(self) -> Option<u32> {
        match self {
            Self::Ps3 => None,
            Self::Ps4 => Some(PS4_SIGNED_MARKER),
        }
    }

    /// Resolve a platform from the leading four bytes of an archive header.
    #[must_use]
    pub fn from_header_marker(marker: u32) -> Option<Self> {
        match marker {
            m if m == Self::Ps3.extra() || m == PS3_SIGNED_MARKER => Some(Self::Ps3),
            m if m == Self::Ps4.extra() || m == PS4_SIGNED_MARKER => Some(Self::Ps4),
            _ => None,
        }
    }

    /// Eight-byte little-endian sequence that precedes the tempo field in a
    /// compiled MIDI track.
    #[must_use]
    pub const fn midi_terminator(self) -> u64 {
        match self {
            Self::Ps3 => 0xCDAB_CDAB_CDAB_CDAB,
            Self::Ps4 => 0x01AB_CDAB_CDAB_CDAB,
        }
    }

    /// Suffix appended to a compiled data file name (`_dta_ps3`).
    #[must_use]
    pub fn dta_suffix(self) -> String {
        format!("_dta_{}", self.as_str())
    }

    /// Suffix appended to platform-specific asset names (`_ps3`).
    #[must_use]
    pub fn asset_suffix(self) -> String {
        format!("_{}", self.as_str())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ps3" => Ok(Self::Ps3),
            "ps4" => Ok(Self::Ps4),
            _ => Err(format!("Unknown platform: {s}")),
        }
    }
}
