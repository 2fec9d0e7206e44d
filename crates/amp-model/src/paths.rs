//! Layout of an unpacked game directory.

use std::path::{Path, PathBuf};

use crate::platform::Platform;

/// Well-known locations inside an unpacked game directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamePaths {
    /// Unpacked game root (contains the `ps3/` or `ps4/` directory).
    pub root: PathBuf,
    /// Target platform.
    pub platform: Platform,
    /// Global unlock and campaign configuration.
    pub config: PathBuf,
    /// Per-world song list.
    pub songs_config: PathBuf,
    /// Directory holding one folder per song.
    pub songs: PathBuf,
}

impl GamePaths {
    /// Resolve the layout under `root` for `platform`.
    pub fn new(root: impl Into<PathBuf>, platform: Platform) -> Self {
        let root = root.into();
        let base = root.join(platform.as_str());
        let suffix = platform.dta_suffix();
        Self {
            config: base.join("config").join(format!("amp_config.dta{suffix}")),
            songs_config: base
                .join("config")
                .join(format!("amp_songs_config.dta{suffix}")),
            songs: base.join("songs"),
            root,
            platform,
        }
    }

    /// Folder of the song `id`.
    #[must_use]
    pub fn song_dir(&self, id: &str) -> PathBuf {
        self.songs.join(id)
    }

    /// Path of a file named `<id>.<extension>` inside the song's folder.
    #[must_use]
    pub fn song_file(&self, id: &str, extension: &str) -> PathBuf {
        self.song_dir(id).join(format!("{id}.{extension}"))
    }

    /// Engine configuration holding renderer settings.
    #[must_use]
    pub fn system_config(&self) -> PathBuf {
        self.root
            .join(self.platform.as_str())
            .join("system")
            .join("data")
            .join("config")
            .join(format!("default.dta{}", self.platform.dta_suffix()))
    }

    /// Directory for files this tooling keeps next to the game data.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(".amp")
    }

    /// Detect which platform directory exists under `root`.
    ///
    /// PS3 wins when both are present.
    pub fn detect_platform(root: &Path) -> Option<Platform> {
        Platform::ALL
            .into_iter()
            .find(|platform| root.join(platform.as_str()).is_dir())
    }
}
