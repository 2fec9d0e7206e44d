//! Typed views over symbolic values found in song metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a song becomes playable in the campaign.
///
/// Song metadata stores the raw symbol (`unlock_requirement_boss`, ...);
/// this enum is the typed projection of that symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnlockRequirement {
    /// No requirement recorded.
    #[default]
    None,
    /// Unlocked by beating a boss.
    Boss,
    /// Unlocked after a number of plays.
    PlayCount,
    /// Unlocked by completing world 1.
    World1,
    /// Unlocked by completing world 2.
    World2,
    /// Unlocked by completing world 3.
    World3,
    /// Bonus song.
    Bonus,
    /// A symbol this crate does not recognize.
    Unknown,
}

impl UnlockRequirement {
    /// Project a raw metadata symbol.
    #[must_use]
    pub fn from_symbol(symbol: Option<&str>) -> Self {
        match symbol {
            None => Self::None,
            Some("unlock_requirement_boss") => Self::Boss,
            Some("unlock_requirement_playcount") => Self::PlayCount,
            Some("unlock_requirement_world1") => Self::World1,
            Some("unlock_requirement_world2") => Self::World2,
            Some("unlock_requirement_world3") => Self::World3,
            Some("unlock_requirement_bonus") => Self::Bonus,
            Some(_) => Self::Unknown,
        }
    }

    /// The metadata symbol for this requirement, if it has one.
    #[must_use]
    pub const fn as_symbol(self) -> Option<&'static str> {
        match self {
            Self::Boss => Some("unlock_requirement_boss"),
            Self::PlayCount => Some("unlock_requirement_playcount"),
            Self::World1 => Some("unlock_requirement_world1"),
            Self::World2 => Some("unlock_requirement_world2"),
            Self::World3 => Some("unlock_requirement_world3"),
            Self::Bonus => Some("unlock_requirement_bonus"),
            Self::None | Self::Unknown => None,
        }
    }
}

impl fmt::Display for UnlockRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::Boss => "boss",
            Self::PlayCount => "play count",
            Self::World1 => "world 1",
            Self::World2 => "world 2",
            Self::World3 => "world 3",
            Self::Bonus => "bonus",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}
