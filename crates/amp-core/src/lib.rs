//! Song registry, metadata mapping and tweaks for an unpacked Amplitude
//! game directory.
//!
//! A song becomes playable when three things agree: its folder under
//! `<platform>/songs/<id>/` holds the audio, MIDI and `.moggsong` metadata,
//! the unlock config lists its token under `db/unlock_tokens` and
//! `db/campaign`, and one of the `World*` lists in the song list config
//! includes its metadata. [`SongRegistry`] keeps those in step.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use amp_core::{RemoveOptions, SongRegistry};
//! use amp_model::no_progress;
//!
//! let registry = SongRegistry::open(Path::new("unpacked"), None)?;
//! registry.add(&["wetware"], &mut no_progress)?;
//! for song in registry.list()? {
//!     println!("{:?} in game: {}", song.id(), song.in_game);
//! }
//! registry.remove(&["wetware"], RemoveOptions::new().with_delete(true), &mut no_progress)?;
//! # Ok::<(), amp_core::SongError>(())
//! ```
//!
//! # Tweaks
//!
//! ```no_run
//! use std::path::Path;
//! use amp_core::{SongRegistry, find_tweak};
//!
//! let registry = SongRegistry::open(Path::new("unpacked"), None)?;
//! let tweak = find_tweak("unlock-fps")?.create(registry.paths())?;
//! if !tweak.is_enabled()? {
//!     tweak.enable()?;
//! }
//! # Ok::<(), amp_core::SongError>(())
//! ```

mod config;
mod error;
pub mod midi;
mod registry;
mod song;
mod tweaks;

pub use config::ConfigFile;
pub use error::{Result, SongError};
pub use midi::{TEMPO_SCAN_WINDOW, patch_tempo, patch_tempo_file, tempo_value};
pub use registry::{DONOR_SONG, REQUIRED_ASSETS, RemoveOptions, SongRegistry};
pub use song::{SongRecord, Track};
pub use tweaks::{DEFAULT_UNLOCKS_FILE, TWEAKS, Tweak, TweakInfo, find_tweak};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
