//! DTA/DTB data tree reader and writer.
//!
//! Game configuration and song metadata are stored as nested lists of
//! symbols and atoms. The same tree has two encodings:
//!
//! - **Text** (`.dta`): an S-expression dialect that people edit by hand.
//! - **Binary** (`.dtb`): a compact, versioned encoding that the game loads,
//!   optionally obfuscated with a keystream.
//!
//! Text to binary to text loses only whitespace and comments. Binary to
//! text to binary reproduces the same bytes for the same version and
//! obfuscation flag.
//!
//! # Example
//!
//! ```
//! use amp_dta::{DtaDocument, DtbVersion, DtbWriteOptions};
//!
//! let doc = DtaDocument::parse_text("(db (campaign (beat_num 0 kUnlockArena DREAMER)))").unwrap();
//! let campaign = doc.root.find_path(&["db", "campaign"]).unwrap();
//! let unlock = campaign.find_by_child("DREAMER", 3).next().unwrap();
//! assert_eq!(unlock.child::<i32>(1), Some(0));
//!
//! let options = DtbWriteOptions::new().with_version(DtbVersion::V3);
//! let bytes = doc.to_binary(options).unwrap();
//! let back = DtaDocument::parse_binary(&bytes).unwrap();
//! assert_eq!(back.root, doc.root);
//! ```
//!
//! # Lookups
//!
//! Lists whose first child is a symbol act as named records. Lookups compare
//! the textual form of a child and keep document order; duplicates are
//! meaningful and never collapsed.

mod access;
mod binary;
pub mod crypt;
mod document;
mod error;
mod node;
mod text;

pub use error::{DtaError, Result};

pub use access::FromNode;
pub use node::{Atom, DataList, ListKind, Node};

pub use binary::{
    BINARY_MAGIC, DtbVersion, DtbWriteOptions, StringEncoding, looks_binary, parse_binary,
    serialize_binary,
};
pub use document::{DtaDocument, SourceFormat, read_dta, write_dta};
pub use text::{parse_text, parse_text_bytes, serialize_text};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
