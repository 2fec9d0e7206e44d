//! Directory to archive packing.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span};
use walkdir::WalkDir;

use amp_dta::{DtaDocument, DtbVersion, DtbWriteOptions};
use amp_model::{Platform, ProgressFn};

use crate::error::{ArkError, Result};
use crate::header::{Archive, ArchiveEntry, ArchivePart};
use crate::path::{logical_path, split_logical};

/// Default cap on the payload bytes of one part file (1 GiB).
pub const DEFAULT_PART_SIZE_LIMIT: u64 = 1 << 30;

/// Extensions of text trees that are compiled to binary while packing.
pub const SERIALIZABLE_EXTENSIONS: [&str; 4] = ["dta", "fusion", "moggsong", "script"];

/// Options for packing an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackOptions {
    /// Maximum payload bytes per part (default: 1 GiB).
    ///
    /// A single file larger than the limit still gets a part of its own.
    pub part_size_limit: u64,
    /// Layout used when compiling text trees (default: v3).
    pub dtb_version: DtbVersion,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            part_size_limit: DEFAULT_PART_SIZE_LIMIT,
            dtb_version: DtbVersion::V3,
        }
    }
}

impl PackOptions {
    /// Create pack options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the part size limit, clamped to the 32-bit offset range.
    #[must_use]
    pub fn with_part_size_limit(mut self, limit: u64) -> Self {
        self.part_size_limit = limit.clamp(1, u64::from(u32::MAX));
        self
    }

    /// Set the layout used for compiled trees.
    #[must_use]
    pub fn with_dtb_version(mut self, version: DtbVersion) -> Self {
        self.dtb_version = version;
        self
    }
}

/// Whether `path` is a text tree that packing compiles.
#[must_use]
pub fn is_serializable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SERIALIZABLE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Check that `path` ends in `.hdr`.
pub(crate) fn check_header_path(path: &Path) -> Result<()> {
    let is_hdr = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("hdr"));
    if is_hdr {
        Ok(())
    } else {
        Err(ArkError::InvalidHeaderPath {
            path: path.to_path_buf(),
        })
    }
}

/// Size of an entry as stored in the header.
///
/// # Errors
///
/// Returns [`ArkError::UnsupportedFileSize`] above `u32::MAX` bytes.
pub fn entry_size(path: &Path, size: u64) -> Result<u32> {
    u32::try_from(size).map_err(|_| ArkError::UnsupportedFileSize {
        path: path.to_path_buf(),
        size,
    })
}

/// Pack every file under `source_dir` into `header_path` and its parts.
///
/// Text trees with a serializable extension are compiled to binary and
/// stored as `<name>_dta_<platform>`, unless such a file already sits next
/// to them. Files are added in sorted path order.
///
/// # Errors
///
/// - [`ArkError::InvalidHeaderPath`] if `header_path` does not end in `.hdr`
/// - [`ArkError::NotFound`] if `source_dir` is missing
/// - [`ArkError::UnsupportedFileSize`] for a file above 4 GiB
/// - [`ArkError::Compile`] for a text tree that does not parse
pub fn pack(
    source_dir: &Path,
    header_path: &Path,
    platform: Platform,
    options: &PackOptions,
    progress: &mut ProgressFn<'_>,
) -> Result<Archive> {
    check_header_path(header_path)?;
    if !source_dir.is_dir() {
        return Err(ArkError::NotFound {
            path: source_dir.to_path_buf(),
        });
    }
    let span = info_span!("pack", header = %header_path.display(), %platform);
    let _guard = span.enter();

    let files = collect_files(source_dir)?;
    let total = files.iter().map(|(_, len)| *len).sum::<u64>() + 1;
    progress("Starting", 0, total);

    let header_dir = match header_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&header_dir)?;
    let stem = header_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut builder = ArchiveBuilder::new(platform, header_dir, stem, options.part_size_limit);
    let suffix = platform.dta_suffix();
    let compile = DtbWriteOptions::new().with_version(options.dtb_version);
    let mut current = 0u64;

    for (path, len) in &files {
        let relative = path.strip_prefix(source_dir).unwrap_or(path);
        let mut logical = logical_path(relative);

        if is_serializable(path) && !compiled_sibling(path, &suffix).exists() {
            let bytes = compile_tree(path, compile)?;
            logical.push_str(&suffix);
            let size = entry_size(path, bytes.len() as u64)?;
            builder.append(&logical, &mut bytes.as_slice(), size)?;
        } else {
            let size = entry_size(path, *len)?;
            let mut file = File::open(path)?;
            builder.append(&logical, &mut file, size)?;
        }

        current += len;
        progress(&format!("Added {logical}"), current, total);
    }

    let archive = builder.commit(header_path)?;
    info!(
        parts = archive.parts.len(),
        entries = archive.entries.len(),
        "packed archive"
    );
    progress(&format!("Wrote {}", header_path.display()), total, total);
    Ok(archive)
}

fn collect_files(source_dir: &Path) -> Result<Vec<(PathBuf, u64)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            let len = entry.metadata().map_err(std::io::Error::from)?.len();
            files.push((entry.into_path(), len));
        }
    }
    Ok(files)
}

fn compiled_sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

fn compile_tree(path: &Path, options: DtbWriteOptions) -> Result<Vec<u8>> {
    let data = fs::read(path)?;
    DtaDocument::from_bytes(&data)
        .and_then(|doc| doc.to_binary(options))
        .map_err(|source| ArkError::Compile {
            path: path.to_path_buf(),
            source,
        })
}

/// Accumulates entries and streams payloads into part files.
struct ArchiveBuilder {
    archive: Archive,
    header_dir: PathBuf,
    stem: String,
    limit: u64,
    writer: Option<BufWriter<File>>,
    part_size: u64,
    part_entries: usize,
}

impl ArchiveBuilder {
    fn new(platform: Platform, header_dir: PathBuf, stem: String, limit: u64) -> Self {
        Self {
            archive: Archive::new(platform),
            header_dir,
            stem,
            limit,
            writer: None,
            part_size: 0,
            part_entries: 0,
        }
    }

    fn start_part(&mut self) -> Result<()> {
        self.finish_part()?;
        let file_name = format!("{}_{}.ark", self.stem, self.archive.parts.len());
        let file = File::create(self.header_dir.join(&file_name))?;
        debug!(part = %file_name, "started part");
        self.archive.parts.push(ArchivePart { file_name, size: 0 });
        self.writer = Some(BufWriter::new(file));
        self.part_size = 0;
        self.part_entries = 0;
        Ok(())
    }

    fn finish_part(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            if let Some(part) = self.archive.parts.last_mut() {
                part.size = self.part_size as u32;
            }
        }
        Ok(())
    }

    fn append(&mut self, logical: &str, payload: &mut dyn Read, size: u32) -> Result<()> {
        let rolls = self.part_entries > 0 && self.part_size + u64::from(size) > self.limit;
        if self.writer.is_none() || rolls {
            self.start_part()?;
        }
        let Some(writer) = self.writer.as_mut() else {
            return Err(ArkError::Io(std::io::Error::other("no part file is open")));
        };
        let copied = std::io::copy(&mut Read::take(payload, u64::from(size)), writer)?;
        if copied != u64::from(size) {
            return Err(ArkError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("{logical} shrank while packing"),
            )));
        }

        let (dir_path, file_name) = split_logical(logical);
        let entry = ArchiveEntry {
            file_name: file_name.to_string(),
            dir_path: dir_path.to_string(),
            part: (self.archive.parts.len() - 1) as u32,
            offset: self.part_size as u32,
            size,
            inflated_size: size,
            extra: self.archive.platform.extra(),
        };
        debug!(path = logical, part = entry.part, offset = entry.offset, size, "added entry");
        self.archive.entries.push(entry);
        self.part_size += u64::from(size);
        self.part_entries += 1;
        Ok(())
    }

    fn commit(mut self, header_path: &Path) -> Result<Archive> {
        self.finish_part()?;
        fs::write(header_path, self.archive.to_bytes())?;
        Ok(self.archive)
    }
}
