//! ARK archive packer and unpacker.
//!
//! An archive is a header (`*.hdr`) plus one or more part files
//! (`<stem>_<n>.ark`) holding concatenated payloads. The header is an
//! obfuscated index of parts and entries; its first four bytes identify the
//! console the archive was built for.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use amp_ark::{PackOptions, UnpackOptions, pack, unpack};
//! use amp_model::{Platform, no_progress};
//!
//! let header = Path::new("out/main_ps4.hdr");
//! let archive = pack(
//!     Path::new("game"),
//!     header,
//!     Platform::Ps4,
//!     &PackOptions::default(),
//!     &mut no_progress,
//! )?;
//! println!("{} entries in {} parts", archive.entries.len(), archive.parts.len());
//!
//! let options = UnpackOptions::new().with_conversion(true);
//! unpack(header, Path::new("unpacked"), &options, &mut no_progress)?;
//! # Ok::<(), amp_ark::ArkError>(())
//! ```
//!
//! # Compiled trees
//!
//! Text trees (`.dta`, `.fusion`, `.moggsong`, `.script`) are compiled to
//! the binary tree form while packing and stored as
//! `<name>_dta_<platform>`. Unpacking can turn them back into text.

mod error;
mod header;
mod pack;
mod path;
mod unpack;

pub use error::{ArkError, Result};
pub use header::{ARCHIVE_VERSION, Archive, ArchiveEntry, ArchivePart, HEADER_XOR, read_header};
pub use pack::{
    DEFAULT_PART_SIZE_LIMIT, PackOptions, SERIALIZABLE_EXTENSIONS, entry_size, is_serializable,
    pack,
};
pub use path::{disk_path, escape_segment, logical_path, unescape_segment};
pub use unpack::{UnpackOptions, UnpackReport, unpack};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
