//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use amp_dta::DtbVersion;
use amp_model::Platform;

#[derive(Parser)]
#[command(
    name = "amp",
    version,
    about = "Amplitude game data tools",
    long_about = "Pack and unpack game archives, convert data trees, and manage the\n\
                  custom songs and tweaks of an unpacked Amplitude (PS3/PS4) game."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Pack, unpack and inspect `.hdr`/`.ark` archives.
    #[command(subcommand)]
    Archive(ArchiveCommand),

    /// List, add, remove and import songs in an unpacked game.
    #[command(subcommand)]
    Song(SongCommand),

    /// Convert data trees between text and binary.
    #[command(subcommand)]
    Dta(DtaCommand),

    /// Show, enable or disable game tweaks.
    Tweak(TweakArgs),
}

#[derive(Subcommand)]
pub enum ArchiveCommand {
    /// Pack a directory into an archive header plus part files.
    Pack(PackArgs),
    /// Extract an archive into a directory.
    Unpack(UnpackArgs),
    /// List the entries of an archive.
    List(ListArgs),
}

#[derive(Args)]
pub struct PackArgs {
    /// Directory to pack.
    #[arg(value_name = "DIR")]
    pub source: PathBuf,

    /// Header file to write (must end in `.hdr`).
    #[arg(value_name = "HEADER")]
    pub header: PathBuf,

    /// Target platform (default: detected from DIR or the header name).
    #[arg(long, value_enum)]
    pub platform: Option<PlatformArg>,

    /// Maximum size of one part file in bytes.
    #[arg(long = "part-size", value_name = "BYTES")]
    pub part_size: Option<u64>,

    /// Binary layout for data trees compiled while packing.
    #[arg(long = "dtb-version", value_enum, default_value = "v3")]
    pub dtb_version: DtbVersionArg,
}

#[derive(Args)]
pub struct UnpackArgs {
    /// Archive header to read.
    #[arg(value_name = "HEADER")]
    pub header: PathBuf,

    /// Directory to extract into.
    #[arg(value_name = "DIR")]
    pub output: PathBuf,

    /// Convert compiled data trees back to text.
    #[arg(long = "dtb-to-text")]
    pub dtb_to_text: bool,

    /// Keep the compiled file next to its converted text.
    #[arg(long = "keep-binary", requires = "dtb_to_text")]
    pub keep_binary: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Archive header to read.
    #[arg(value_name = "HEADER")]
    pub header: PathBuf,
}

/// Unpacked game directory plus an optional platform override.
#[derive(Args)]
pub struct GameArgs {
    /// Unpacked game directory (contains `ps3/` or `ps4/`).
    #[arg(value_name = "GAME_DIR")]
    pub dir: PathBuf,

    /// Platform to use instead of detecting it.
    #[arg(long, value_enum)]
    pub platform: Option<PlatformArg>,
}

#[derive(Subcommand)]
pub enum SongCommand {
    /// List every song, registered or not.
    List {
        #[command(flatten)]
        game: GameArgs,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,

        /// Indent JSON output.
        #[arg(long, requires = "json")]
        pretty: bool,
    },
    /// Register songs already in the songs folder.
    Add {
        #[command(flatten)]
        game: GameArgs,

        /// Song folder names.
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,
    },
    /// Register every song that is not in the game yet.
    AddAll {
        #[command(flatten)]
        game: GameArgs,
    },
    /// Unregister songs.
    Remove {
        #[command(flatten)]
        game: GameArgs,

        /// Song folder names.
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,

        /// Allow removing songs that ship with the game.
        #[arg(long)]
        force: bool,

        /// Delete the song folders too.
        #[arg(long)]
        delete: bool,
    },
    /// Unregister every custom song, keeping the folders.
    RemoveCustoms {
        #[command(flatten)]
        game: GameArgs,
    },
    /// Copy a song into the game and register it.
    Import {
        #[command(flatten)]
        game: GameArgs,

        /// `.moggsong` file or a folder holding `<folder>.moggsong`.
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Overwrite a song that is already in the game.
        #[arg(long)]
        replace: bool,
    },
}

#[derive(Subcommand)]
pub enum DtaCommand {
    /// Decode a data tree (either encoding) to text.
    ToText {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
    /// Encode a data tree (either encoding) to binary.
    ToBinary {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Binary list header layout.
        #[arg(long, value_enum, default_value = "v3")]
        version: DtbVersionArg,

        /// Obfuscate the output.
        #[arg(long)]
        obfuscate: bool,
    },
}

#[derive(Args)]
pub struct TweakArgs {
    /// Tweak verb; omit to list every tweak.
    #[arg(value_name = "TWEAK")]
    pub verb: Option<String>,

    #[arg(value_name = "ACTION", value_enum)]
    pub action: Option<TweakAction>,

    /// Unpacked game directory.
    #[arg(value_name = "GAME_DIR")]
    pub dir: Option<PathBuf>,

    /// Platform to use instead of detecting it.
    #[arg(long, value_enum)]
    pub platform: Option<PlatformArg>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TweakAction {
    Status,
    Enable,
    Disable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    Ps3,
    Ps4,
}

impl From<PlatformArg> for Platform {
    fn from(value: PlatformArg) -> Self {
        match value {
            PlatformArg::Ps3 => Platform::Ps3,
            PlatformArg::Ps4 => Platform::Ps4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DtbVersionArg {
    V1,
    V2,
    V3,
}

impl From<DtbVersionArg> for DtbVersion {
    fn from(value: DtbVersionArg) -> Self {
        match value {
            DtbVersionArg::V1 => DtbVersion::V1,
            DtbVersionArg::V2 => DtbVersion::V2,
            DtbVersionArg::V3 => DtbVersion::V3,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
