//! Keeps the unlock config, the song list config and the song folders in
//! step.
//!
//! Both config trees are loaded once per call and written back once at the
//! end. A failure part way through a batch leaves them untouched on disk;
//! per-song files already written for earlier names in the batch (compiled
//! metadata, patched MIDI, copied assets) stay in place.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span, warn};
use walkdir::WalkDir;

use amp_dta::{Atom, DataList, DtbWriteOptions, Node};
use amp_model::{GamePaths, Platform, ProgressFn, is_base_song};

use crate::config::ConfigFile;
use crate::error::{Result, SongError};
use crate::midi::patch_tempo_file;
use crate::song::SongRecord;

/// Companion files every song folder must hold.
pub const REQUIRED_ASSETS: [&str; 3] = ["mogg", "mid", "moggsong"];

/// Song whose platform assets are copied into songs that lack them.
pub const DONOR_SONG: &str = "tut0";

const UNLOCK_TOKENS: [&str; 2] = ["db", "unlock_tokens"];
const CAMPAIGN: [&str; 2] = ["db", "campaign"];

/// Options for [`SongRegistry::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoveOptions {
    /// Allow removing built-in songs (default: false).
    pub force: bool,
    /// Delete the song folder as well (default: false).
    pub delete: bool,
}

impl RemoveOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[must_use]
    pub fn with_delete(mut self, delete: bool) -> Self {
        self.delete = delete;
        self
    }
}

/// Song operations on one unpacked game directory.
#[derive(Debug, Clone)]
pub struct SongRegistry {
    paths: GamePaths,
}

impl SongRegistry {
    #[must_use]
    pub fn new(paths: GamePaths) -> Self {
        Self { paths }
    }

    /// Open `root`, detecting the platform unless one is given.
    pub fn open(root: &Path, platform: Option<Platform>) -> Result<Self> {
        if !root.is_dir() {
            return Err(SongError::NotFound {
                path: root.to_path_buf(),
            });
        }
        let platform = platform
            .or_else(|| GamePaths::detect_platform(root))
            .ok_or_else(|| SongError::UnsupportedPlatform {
                path: root.to_path_buf(),
            })?;
        Ok(Self::new(GamePaths::new(root, platform)))
    }

    #[must_use]
    pub fn paths(&self) -> &GamePaths {
        &self.paths
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.paths.platform
    }

    fn load_configs(&self) -> Result<(ConfigFile, ConfigFile)> {
        Ok((
            ConfigFile::load(&self.paths.config)?,
            ConfigFile::load(&self.paths.songs_config)?,
        ))
    }

    /// Every song referenced by the song list plus every song folder that
    /// is not, de-duplicated by metadata path and sorted by audio path.
    ///
    /// # Errors
    ///
    /// Returns [`SongError::NotFound`] when a referenced metadata file is
    /// missing and [`SongError::MalformedConfig`] when the unlock config
    /// lacks `db/unlock_tokens` or `db/campaign`.
    pub fn list(&self) -> Result<Vec<SongRecord>> {
        let (config, songs_config) = self.load_configs()?;
        self.list_with(&config, &songs_config)
    }

    fn list_with(&self, config: &ConfigFile, songs_config: &ConfigFile) -> Result<Vec<SongRecord>> {
        config.require(&UNLOCK_TOKENS)?;
        config.require(&CAMPAIGN)?;

        let mut songs = Vec::new();
        let mut seen = HashSet::new();

        for entry in song_lists(songs_config.root())
            .flat_map(|list| list.children.iter().skip(1))
            .filter_map(Node::as_list)
            .filter(|entry| entry.len() > 1)
        {
            let Some(id) = include_id(entry) else {
                debug!(entry = ?entry.name(), "skipping song entry without include");
                continue;
            };
            let path = self.paths.song_file(&id, "moggsong");
            if !path.is_file() {
                return Err(SongError::NotFound { path });
            }
            let mut record = SongRecord::read(&path)?;
            record.node_id = entry.child::<String>(0);
            record.in_game = true;
            seen.insert(path_key(&path));
            songs.push(record);
        }

        for id in song_folders(&self.paths.songs)? {
            if id.eq_ignore_ascii_case("credits") {
                continue;
            }
            let path = self.paths.song_file(&id, "moggsong");
            if !path.is_file() || seen.contains(&path_key(&path)) {
                continue;
            }
            songs.push(SongRecord::read(&path)?);
        }

        let mut unique = HashSet::new();
        songs.retain(|song| {
            song.moggsong_path
                .as_deref()
                .is_none_or(|path| unique.insert(path_key(path)))
        });
        songs.sort_by(|a, b| a.mogg_path.cmp(&b.mogg_path));
        Ok(songs)
    }

    /// Metadata of the song folder `name`.
    pub fn read_song(&self, name: &str) -> Result<SongRecord> {
        SongRecord::read(&self.paths.song_file(name, "moggsong"))
    }

    /// Register songs already present in the songs folder.
    ///
    /// Any existing registration of a name is removed first, so adding a
    /// song twice leaves one entry.
    ///
    /// # Errors
    ///
    /// - [`SongError::NotFound`] for a missing song folder, config or donor asset
    /// - [`SongError::Validation`] naming every missing companion file
    /// - [`SongError::MalformedConfig`] when a config lacks a required node
    /// - [`SongError::MissingTempo`] / [`SongError::PatchNotFound`] for tempo patching
    pub fn add<S: AsRef<str>>(&self, names: &[S], progress: &mut ProgressFn<'_>) -> Result<()> {
        let span = info_span!("add", platform = %self.platform());
        let _guard = span.enter();

        let (mut config, mut songs_config) = self.load_configs()?;
        let existing = self.list_with(&config, &songs_config)?;
        if emptiest_world(songs_config.root()).is_none() {
            return Err(SongError::malformed_config(songs_config.path(), "World"));
        }

        let total = names.len() as u64;
        for (index, name) in names.iter().enumerate() {
            let name = name.as_ref();
            let token = token_for(&existing, name)?;
            unregister(&mut config, &mut songs_config, &token)?;
            let record = self.prepare_song(name)?;
            register(&mut config, &mut songs_config, name, &token, &record)?;
            info!(song = name, %token, "added song");
            progress(&format!("Added {name}"), index as u64 + 1, total);
        }

        config.save()?;
        songs_config.save()?;
        progress("Rebuilt config files", total, total);
        Ok(())
    }

    /// Validate a song folder and write its platform files.
    fn prepare_song(&self, name: &str) -> Result<SongRecord> {
        let dir = self.paths.song_dir(name);
        if !dir.is_dir() {
            return Err(SongError::NotFound { path: dir });
        }
        validate_assets(&dir, name)?;

        let platform = self.platform();
        for ext in donor_extensions(platform) {
            let target = self.paths.song_file(name, &ext);
            if !target.exists() {
                let donor = self.paths.song_file(DONOR_SONG, &ext);
                fs::copy(&donor, &target).map_err(|e| SongError::from_io(e, &donor))?;
                debug!(from = %donor.display(), to = %target.display(), "copied donor asset");
            }
        }

        let mut record = SongRecord::read(&self.paths.song_file(name, "moggsong"))?;
        record.mogg_path = Some(format!("{name}.mogg"));
        record.midi_path = Some(format!("{name}.mid"));

        let compiled = record.to_document().to_binary(DtbWriteOptions::new())?;
        let compiled_path = self
            .paths
            .song_file(name, &format!("moggsong{}", platform.dta_suffix()));
        fs::write(&compiled_path, compiled)?;

        let bpm = record.bpm.ok_or_else(|| SongError::MissingTempo {
            song: name.to_string(),
        })?;
        let midi = self
            .paths
            .song_file(name, &format!("mid{}", platform.asset_suffix()));
        patch_tempo_file(&midi, bpm, platform).inspect_err(|err| {
            warn!(path = %midi.display(), %err, "tempo patch failed");
        })?;
        Ok(record)
    }

    /// Register every listed song that is not in the game yet, skipping
    /// tutorials and credits. Returns the added names.
    pub fn add_all(&self, progress: &mut ProgressFn<'_>) -> Result<Vec<String>> {
        let names: Vec<String> = self
            .list()?
            .iter()
            .filter(|song| !song.in_game && !song.special)
            .filter_map(SongRecord::id)
            .collect();
        self.add(&names, progress)?;
        Ok(names)
    }

    /// Remove the registrations of songs, optionally deleting their
    /// folders.
    ///
    /// # Errors
    ///
    /// Returns [`SongError::ProtectedSong`] before touching any file when a
    /// built-in song is named without `force`.
    pub fn remove<S: AsRef<str>>(
        &self,
        names: &[S],
        options: RemoveOptions,
        progress: &mut ProgressFn<'_>,
    ) -> Result<()> {
        if !options.force
            && let Some(name) = names.iter().map(AsRef::as_ref).find(|name| is_base_song(name))
        {
            return Err(SongError::ProtectedSong {
                song: name.to_string(),
            });
        }
        let span = info_span!("remove", platform = %self.platform());
        let _guard = span.enter();

        let (mut config, mut songs_config) = self.load_configs()?;
        let existing = self.list_with(&config, &songs_config)?;

        let total = names.len() as u64;
        for (index, name) in names.iter().enumerate() {
            let name = name.as_ref();
            let token = token_for(&existing, name)?;
            unregister(&mut config, &mut songs_config, &token)?;
            info!(song = name, %token, "removed song");
            progress(&format!("Removed {name}"), index as u64 + 1, total);
        }

        config.save()?;
        songs_config.save()?;

        if options.delete {
            for name in names {
                let dir = self.paths.song_dir(name.as_ref());
                if dir.is_dir() {
                    fs::remove_dir_all(&dir)?;
                    info!(path = %dir.display(), "deleted song folder");
                }
            }
        }
        progress("Rebuilt config files", total, total);
        Ok(())
    }

    /// Unregister every in-game song that is neither built-in nor a
    /// tutorial. Folders are kept. Returns the removed names.
    pub fn remove_customs(&self, progress: &mut ProgressFn<'_>) -> Result<Vec<String>> {
        let names: Vec<String> = self
            .list()?
            .iter()
            .filter(|song| song.in_game && !song.base_song && !song.special)
            .filter_map(SongRecord::id)
            .collect();
        self.remove(&names, RemoveOptions::default(), progress)?;
        Ok(names)
    }

    /// Copy a song into the songs folder and register it.
    ///
    /// `source` is either a `.moggsong` file or a folder holding
    /// `<folder>.moggsong`. Returns the song name.
    ///
    /// # Errors
    ///
    /// - [`SongError::InvalidFormat`] if the file is not a `.moggsong`
    /// - [`SongError::AlreadyExists`] if the song folder exists and `replace` is false
    pub fn import(
        &self,
        source: &Path,
        replace: bool,
        progress: &mut ProgressFn<'_>,
    ) -> Result<String> {
        let moggsong = if source.is_dir() {
            let name = source.file_name().unwrap_or_default().to_string_lossy();
            source.join(format!("{name}.moggsong"))
        } else if source.is_file() {
            source.to_path_buf()
        } else {
            return Err(SongError::NotFound {
                path: source.to_path_buf(),
            });
        };
        let is_moggsong = moggsong
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("moggsong"));
        if !is_moggsong {
            return Err(SongError::invalid_format(format!(
                "{} is not a .moggsong file",
                moggsong.display()
            )));
        }
        if !moggsong.is_file() {
            return Err(SongError::NotFound { path: moggsong });
        }

        let id = moggsong
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source_dir = moggsong.parent().unwrap_or(Path::new(".")).to_path_buf();
        validate_assets(&source_dir, &id)?;

        let target = self.paths.song_dir(&id);
        if same_dir(&source_dir, &target) {
            self.add(&[id.as_str()], progress)?;
            return Ok(id);
        }
        if target.exists() {
            if !replace {
                return Err(SongError::AlreadyExists { song: id });
            }
            let options = RemoveOptions::new().with_force(true).with_delete(true);
            self.remove(&[id.as_str()], options, progress)?;
        }

        fs::create_dir_all(&target)?;
        for ext in import_extensions(self.platform()) {
            let from = source_dir.join(format!("{id}.{ext}"));
            let to = target.join(format!("{id}.{ext}"));
            if from.is_file() && (replace || !to.exists()) {
                fs::copy(&from, &to)?;
            }
        }

        self.add(&[id.as_str()], progress)?;
        progress(&format!("Imported {id}"), 1, 1);
        Ok(id)
    }
}

/// Top-level lists of the song list config that hold song entries.
fn song_lists(root: &DataList) -> impl Iterator<Item = &DataList> {
    root.children
        .iter()
        .filter_map(Node::as_list)
        .filter(|list| list.len() > 1)
}

/// Index of the `World*` list with the fewest children; ties go to the
/// earliest.
fn emptiest_world(root: &DataList) -> Option<usize> {
    root.children
        .iter()
        .enumerate()
        .filter_map(|(index, node)| node.as_list().map(|list| (index, list)))
        .filter(|(_, list)| {
            list.len() > 1 && list.child_text(0).is_some_and(|name| name.starts_with("World"))
        })
        .min_by_key(|(_, list)| list.len())
        .map(|(index, _)| index)
}

/// Song folder name from an entry's `#include ../Songs/<id>/<id>.moggsong`.
fn include_id(entry: &DataList) -> Option<String> {
    let Some(Node::Atom(Atom::Include(path))) = entry.get(1) else {
        return None;
    };
    let file = path.rsplit(['/', '\\']).next()?;
    let stem = Path::new(file).file_stem()?;
    Some(stem.to_string_lossy().into_owned())
}

/// Token recorded for `name` in the registry, or its upper-cased form when
/// it is not registered.
fn token_for(existing: &[SongRecord], name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(SongError::invalid_format("song name is empty"));
    }
    Ok(existing
        .iter()
        .filter(|song| song.in_game)
        .find(|song| song.id().as_deref() == Some(name))
        .and_then(|song| song.node_id.clone())
        .unwrap_or_else(|| name.to_uppercase()))
}

fn unregister(config: &mut ConfigFile, songs_config: &mut ConfigFile, token: &str) -> Result<()> {
    config.require_mut(&UNLOCK_TOKENS)?.delete_matching(0, &[token]);
    config.require_mut(&CAMPAIGN)?.delete_matching(3, &[token]);
    for node in &mut songs_config.root_mut().children {
        if let Some(list) = node.as_list_mut().filter(|list| list.len() > 1) {
            list.delete_matching(0, &[token]);
        }
    }
    Ok(())
}

fn register(
    config: &mut ConfigFile,
    songs_config: &mut ConfigFile,
    name: &str,
    token: &str,
    record: &SongRecord,
) -> Result<()> {
    let title = record.title.as_deref().unwrap_or(name);
    config.require_mut(&UNLOCK_TOKENS)?.push(
        DataList::named(token)
            .with(Node::symbol(title))
            .with(Node::symbol("unlock_extra"))
            .with(Node::symbol("unlock_extra_desc"))
            .with(Node::symbol("ui/textures/black_square.png"))
            .with(Node::symbol("CAMPVO_song_extra")),
    );
    config.require_mut(&CAMPAIGN)?.push(
        DataList::named("beat_num")
            .with(Node::int(0))
            .with(Node::symbol("kUnlockArena"))
            .with(Node::symbol(token)),
    );

    let file = songs_config.path().to_path_buf();
    let world = emptiest_world(songs_config.root())
        .and_then(|index| songs_config.root_mut().children[index].as_list_mut())
        .ok_or_else(|| SongError::malformed_config(file, "World"))?;
    world.push(
        DataList::named(token)
            .with(Node::include(format!("../Songs/{name}/{name}.moggsong")))
            .with(DataList::named("type").with(Node::symbol("kSongExtra"))),
    );
    Ok(())
}

/// Fail with every missing companion file of song `id` in `dir`.
fn validate_assets(dir: &Path, id: &str) -> Result<()> {
    let missing: Vec<PathBuf> = REQUIRED_ASSETS
        .iter()
        .map(|ext| dir.join(format!("{id}.{ext}")))
        .filter(|path| !path.is_file())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SongError::Validation {
            song: id.to_string(),
            missing,
        })
    }
}

fn donor_extensions(platform: Platform) -> [String; 3] {
    let p = platform.as_str();
    [format!("mid_{p}"), format!("png.dta_dta_{p}"), format!("png_{p}")]
}

fn import_extensions(platform: Platform) -> Vec<String> {
    let mut extensions: Vec<String> = ["moggsong", "mid", "mogg"].map(String::from).into();
    extensions.extend(donor_extensions(platform));
    extensions
}

/// Names of the folders directly under `songs`, sorted.
fn song_folders(songs: &Path) -> Result<Vec<String>> {
    if !songs.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in WalkDir::new(songs).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

fn same_dir(a: &Path, b: &Path) -> bool {
    let resolve = |path: &Path| fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    path_key(&resolve(a)) == path_key(&resolve(b))
}
