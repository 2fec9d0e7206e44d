//! Shared vocabulary for the Amplitude tooling crates.
//!
//! Everything here is plain data: the two supported console targets and
//! their constants, the layout of an unpacked game directory, the built-in
//! song catalog and the progress callback signature used by long-running
//! operations.

pub mod catalog;
pub mod enums;
pub mod paths;
pub mod platform;

pub use catalog::{BASE_SONGS, SPECIAL_SONGS, is_base_song, is_special_song};
pub use enums::UnlockRequirement;
pub use paths::GamePaths;
pub use platform::Platform;

/// Progress callback: `(message, current, total)`.
///
/// Invoked synchronously on the calling thread after each unit of work.
pub type ProgressFn<'a> = dyn FnMut(&str, u64, u64) + 'a;

/// A progress callback that ignores every report.
pub fn no_progress(_message: &str, _current: u64, _total: u64) {}
