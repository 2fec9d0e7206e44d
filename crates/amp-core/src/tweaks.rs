//! Toggleable game tweaks.
//!
//! Each tweak is a [`TweakInfo`] row in the static [`TWEAKS`] table. The
//! factory resolves the files a tweak edits and fails early when they are
//! missing; the returned [`Tweak`] reloads them on every call.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use amp_dta::{DataList, DtaDocument, Node, read_dta, write_dta};
use amp_model::{GamePaths, Platform};

use crate::config::ConfigFile;
use crate::error::{Result, SongError};

/// File under [`GamePaths::state_dir`] holding the campaign before unlock-all.
pub const DEFAULT_UNLOCKS_FILE: &str = "default_unlocks.dta";

/// A reversible change to the game data.
pub trait Tweak {
    /// Whether the tweak is currently applied.
    fn is_enabled(&self) -> Result<bool>;
    /// Apply the tweak.
    fn enable(&self) -> Result<()>;
    /// Revert the tweak.
    fn disable(&self) -> Result<()>;
}

/// Static description of a tweak plus its constructor.
#[derive(Debug, Clone, Copy)]
pub struct TweakInfo {
    pub verb: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Shown after enabling.
    pub enable_text: &'static str,
    /// Shown after disabling.
    pub disable_text: &'static str,
    /// Shown by `status` when enabled.
    pub enabled_text: &'static str,
    /// Shown by `status` when disabled.
    pub disabled_text: &'static str,
    pub factory: fn(&GamePaths) -> Result<Box<dyn Tweak>>,
}

impl TweakInfo {
    /// Build the tweak for a game directory.
    pub fn create(&self, paths: &GamePaths) -> Result<Box<dyn Tweak>> {
        (self.factory)(paths)
    }
}

/// Every tweak, sorted by verb.
pub static TWEAKS: &[TweakInfo] = &[
    TweakInfo {
        verb: "unlock-all",
        name: "Unlock all",
        description: "Unlock all arenas, songs, powerups, and freq mode",
        enable_text: "All arenas, songs, powerups, and freq mode will be unlocked when the game is loaded.",
        disable_text: "All arenas, songs, powerups, and freq mode will be unlocked normally as you progress.\n\nThis does not apply to existing saves.",
        enabled_text: "All arenas, songs, powerups, and freq mode will be unlocked when the game is loaded.",
        disabled_text: "All arenas, songs, powerups, and freq mode will be unlocked normally as you progress.",
        factory: UnlockAll::create,
    },
    TweakInfo {
        verb: "unlock-fps",
        name: "Unlock FPS",
        description: "Unlocks the frame rate to run at the highest possible",
        enable_text: "Removed the framerate limit, the game will run at the maximum possible FPS.",
        disable_text: "Locked the frame rate to either 30/60 FPS for the PS3/PS4 respectively.",
        enabled_text: "The frame rate limit has been removed, the game will run at the maximum possible FPS.",
        disabled_text: "The frame rate is locked to either 30/60 FPS for PS3/PS4 respectively.",
        factory: UnlockFps::create,
    },
];

/// Look up a tweak by verb.
pub fn find_tweak(verb: &str) -> Result<&'static TweakInfo> {
    TWEAKS
        .iter()
        .find(|info| info.verb == verb)
        .ok_or_else(|| SongError::UnknownTweak {
            verb: verb.to_string(),
        })
}

fn require_file(path: PathBuf) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(SongError::NotFound { path })
    }
}

/// Renderer vsync switch in the engine config.
struct UnlockFps {
    path: PathBuf,
    platform: Platform,
}

const VSYNC_MODE: [&str; 2] = ["rnd", "vsync_mode"];
const VSYNC_ENABLED: [&str; 2] = ["rnd", "vsync_enabled"];

impl UnlockFps {
    fn create(paths: &GamePaths) -> Result<Box<dyn Tweak>> {
        Ok(Box::new(Self {
            path: require_file(paths.system_config())?,
            platform: paths.platform,
        }))
    }

    fn set_state(&self, enabled: bool) -> Result<()> {
        if self.platform == Platform::Ps4 {
            debug!("frame rate switch is not applied on ps4");
            return Ok(());
        }
        let mut config = ConfigFile::load(&self.path)?;
        let (mode, vsync) = if enabled {
            (Node::int(1), Node::symbol("FALSE"))
        } else {
            (Node::int(2), Node::symbol("TRUE"))
        };
        if let Some(slot) = vsync_slot(&mut config, &VSYNC_MODE)? {
            *slot = mode;
        }
        if let Some(slot) = vsync_slot(&mut config, &VSYNC_ENABLED)? {
            *slot = vsync;
        }
        config.save()?;
        info!(path = %self.path.display(), enabled, "updated vsync settings");
        Ok(())
    }
}

/// Value slot of a two-element `(name value)` record.
fn vsync_slot<'a>(config: &'a mut ConfigFile, path: &[&str]) -> Result<Option<&'a mut Node>> {
    let node = config.require_mut(path)?;
    Ok(if node.len() == 2 {
        node.children.get_mut(1)
    } else {
        None
    })
}

impl Tweak for UnlockFps {
    fn is_enabled(&self) -> Result<bool> {
        let config = ConfigFile::load(&self.path)?;
        let value = |path: &[&str]| -> Result<Option<String>> {
            let node = config.require(path)?;
            Ok((node.len() == 2)
                .then(|| node.child_text(1).map(|text| text.into_owned()))
                .flatten())
        };
        Ok(value(&VSYNC_MODE)?.as_deref() == Some("1")
            && value(&VSYNC_ENABLED)?.as_deref() == Some("FALSE"))
    }

    fn enable(&self) -> Result<()> {
        self.set_state(true)
    }

    fn disable(&self) -> Result<()> {
        self.set_state(false)
    }
}

/// Campaign unlock requirements in the unlock config.
struct UnlockAll {
    path: PathBuf,
    snapshot: PathBuf,
}

const CAMPAIGN: [&str; 2] = ["db", "campaign"];

impl UnlockAll {
    fn create(paths: &GamePaths) -> Result<Box<dyn Tweak>> {
        Ok(Box::new(Self {
            path: require_file(paths.config.clone())?,
            snapshot: paths.state_dir().join(DEFAULT_UNLOCKS_FILE),
        }))
    }

    fn read_snapshot(&self) -> Result<Option<DataList>> {
        if !self.snapshot.is_file() {
            return Ok(None);
        }
        let document = read_dta(&self.snapshot)?;
        let campaign = document
            .root
            .find("campaign")
            .cloned()
            .ok_or_else(|| SongError::malformed_config(&self.snapshot, "campaign"))?;
        Ok(Some(campaign))
    }

    fn write_snapshot(&self, campaign: &DataList) -> Result<()> {
        if let Some(dir) = self.snapshot.parent() {
            fs::create_dir_all(dir)?;
        }
        let document = DtaDocument::new(DataList::new().with(campaign.clone()));
        write_dta(&self.snapshot, &document)?;
        info!(path = %self.snapshot.display(), "saved default campaign unlocks");
        Ok(())
    }
}

fn is_unlocked(entry: &DataList) -> bool {
    entry.child_text(0).as_deref() == Some("beat_num")
        && entry.child::<i32>(1) == Some(0)
        && entry.child_text(2).as_deref() == Some("kUnlockArena")
}

fn entry_token(entry: &DataList) -> Option<String> {
    entry.child_text(3).map(|text| text.into_owned())
}

impl Tweak for UnlockAll {
    fn is_enabled(&self) -> Result<bool> {
        let config = ConfigFile::load(&self.path)?;
        let campaign = config.require(&CAMPAIGN)?;
        match self.read_snapshot()? {
            Some(defaults) => {
                let current = campaign.children.iter().take(defaults.len());
                Ok(!defaults
                    .children
                    .iter()
                    .map(Node::text)
                    .eq(current.map(Node::text)))
            }
            None => Ok(campaign
                .children
                .iter()
                .filter_map(Node::as_list)
                .all(is_unlocked)),
        }
    }

    fn enable(&self) -> Result<()> {
        let mut config = ConfigFile::load(&self.path)?;
        if !self.snapshot.is_file() {
            self.write_snapshot(config.require(&CAMPAIGN)?)?;
        }
        let campaign = config.require_mut(&CAMPAIGN)?;
        let mut changed = 0usize;
        for entry in campaign.children.iter_mut().filter_map(Node::as_list_mut) {
            if entry.len() < 3 {
                continue;
            }
            entry.children[0] = Node::symbol("beat_num");
            entry.children[1] = Node::int(0);
            entry.children[2] = Node::symbol("kUnlockArena");
            changed += 1;
        }
        config.save()?;
        info!(entries = changed, "unlocked campaign");
        Ok(())
    }

    fn disable(&self) -> Result<()> {
        let defaults = self.read_snapshot()?.ok_or_else(|| SongError::MissingSnapshot {
            path: self.snapshot.clone(),
        })?;
        let known: HashSet<String> = defaults
            .children
            .iter()
            .filter_map(Node::as_list)
            .filter_map(entry_token)
            .collect();

        let mut config = ConfigFile::load(&self.path)?;
        let campaign = config.require_mut(&CAMPAIGN)?;
        let current: HashSet<String> = campaign
            .children
            .iter()
            .filter_map(Node::as_list)
            .filter_map(entry_token)
            .collect();
        let added: Vec<Node> = campaign
            .children
            .iter()
            .filter(|node| {
                node.as_list()
                    .and_then(entry_token)
                    .is_some_and(|token| !known.contains(&token))
            })
            .cloned()
            .collect();
        // Songs removed since the snapshot was taken stay removed.
        let restored = defaults.children.into_iter().filter(|node| {
            node.as_list()
                .and_then(entry_token)
                .is_none_or(|token| current.contains(&token))
        });
        campaign.children = restored.chain(added).collect();
        config.save()?;
        info!("restored campaign unlocks");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use amp_dta::{DtbVersion, DtbWriteOptions};

    fn write_binary(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        let doc = DtaDocument::parse_text(text).expect("parse");
        let bytes = doc
            .to_binary(DtbWriteOptions::new().with_version(DtbVersion::V2))
            .expect("binary");
        fs::write(path, bytes).expect("write");
    }

    fn game(platform: Platform) -> (tempfile::TempDir, GamePaths) {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = GamePaths::new(dir.path(), platform);
        write_binary(
            &paths.system_config(),
            "(rnd (title \"Amplitude\") (vsync_mode 2) (vsync_enabled TRUE))",
        );
        write_binary(
            &paths.config,
            "(db (unlock_tokens) (campaign (beat_num 3 kUnlockArena DREAMER) \
             (score 1000 kUnlockSong WETWARE)))",
        );
        (dir, paths)
    }

    #[test]
    fn registry_is_sorted_and_searchable() {
        let verbs: Vec<_> = TWEAKS.iter().map(|info| info.verb).collect();
        let mut sorted = verbs.clone();
        sorted.sort_unstable();
        assert_eq!(verbs, sorted);
        assert_eq!(find_tweak("unlock-fps").expect("tweak").name, "Unlock FPS");
        assert!(matches!(
            find_tweak("unlock-everything"),
            Err(SongError::UnknownTweak { .. })
        ));
    }

    #[test]
    fn unlock_fps_toggles_vsync() {
        let (_dir, paths) = game(Platform::Ps3);
        let tweak = find_tweak("unlock-fps")
            .expect("tweak")
            .create(&paths)
            .expect("create");
        assert!(!tweak.is_enabled().expect("status"));
        tweak.enable().expect("enable");
        assert!(tweak.is_enabled().expect("status"));

        let doc = read_dta(&paths.system_config()).expect("read");
        assert_eq!(doc.version, DtbVersion::V2);
        let mode = doc.root.find_path(&VSYNC_MODE).expect("mode");
        assert_eq!(mode.child::<i32>(1), Some(1));

        tweak.disable().expect("disable");
        assert!(!tweak.is_enabled().expect("status"));
    }

    #[test]
    fn unlock_fps_leaves_ps4_untouched() {
        let (_dir, paths) = game(Platform::Ps4);
        let before = fs::read(paths.system_config()).expect("read");
        let tweak = UnlockFps::create(&paths).expect("create");
        tweak.enable().expect("enable");
        assert_eq!(fs::read(paths.system_config()).expect("read"), before);
        assert!(!tweak.is_enabled().expect("status"));
    }

    #[test]
    fn missing_config_fails_on_create() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = GamePaths::new(dir.path(), Platform::Ps3);
        for info in TWEAKS {
            assert!(matches!(info.create(&paths), Err(SongError::NotFound { .. })));
        }
    }

    #[test]
    fn unlock_all_disable_drops_removed_songs() {
        let (_dir, paths) = game(Platform::Ps3);
        let tweak = UnlockAll::create(&paths).expect("create");
        tweak.enable().expect("enable");

        let mut config = ConfigFile::load(&paths.config).expect("load");
        let removed = config
            .require_mut(&CAMPAIGN)
            .expect("campaign")
            .delete_matching(3, &["DREAMER"]);
        assert_eq!(removed, 1);
        config.save().expect("save");

        tweak.disable().expect("disable");
        let config = ConfigFile::load(&paths.config).expect("load");
        let campaign = config.require(&CAMPAIGN).expect("campaign");
        let text: Vec<String> = campaign.children.iter().map(|n| n.to_string()).collect();
        assert_eq!(text, vec!["campaign", "(score 1000 kUnlockSong WETWARE)"]);
    }

    #[test]
    fn unlock_all_round_trip_keeps_added_entries() {
        let (_dir, paths) = game(Platform::Ps3);
        let tweak = UnlockAll::create(&paths).expect("create");
        assert!(!tweak.is_enabled().expect("status"));
        assert!(matches!(tweak.disable(), Err(SongError::MissingSnapshot { .. })));

        tweak.enable().expect("enable");
        assert!(tweak.is_enabled().expect("status"));
        assert!(paths.state_dir().join(DEFAULT_UNLOCKS_FILE).is_file());
        let config = ConfigFile::load(&paths.config).expect("load");
        let campaign = config.require(&CAMPAIGN).expect("campaign");
        assert!(campaign.children.iter().filter_map(Node::as_list).all(is_unlocked));

        let mut config = config;
        config.require_mut(&CAMPAIGN).expect("campaign").push(
            DataList::named("beat_num")
                .with(Node::int(0))
                .with(Node::symbol("kUnlockArena"))
                .with(Node::symbol("CUSTOM")),
        );
        config.save().expect("save");

        tweak.disable().expect("disable");
        assert!(!tweak.is_enabled().expect("status"));
        let config = ConfigFile::load(&paths.config).expect("load");
        let campaign = config.require(&CAMPAIGN).expect("campaign");
        let text: Vec<String> = campaign.children.iter().map(|n| n.to_string()).collect();
        assert_eq!(
            text,
            vec![
                "campaign",
                "(beat_num 3 kUnlockArena DREAMER)",
                "(score 1000 kUnlockSong WETWARE)",
                "(beat_num 0 kUnlockArena CUSTOM)",
            ]
        );
    }
}
