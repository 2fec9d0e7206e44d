//! Archive to directory unpacking.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span, warn};

use amp_dta::{DtaDocument, parse_text, serialize_text};
use amp_model::ProgressFn;

use crate::error::{ArkError, Result};
use crate::header::{Archive, ArchiveEntry, read_header};
use crate::pack::check_header_path;
use crate::path::disk_path;

/// Options for unpacking an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnpackOptions {
    /// Write compiled trees as text next to where they would land (default: false).
    pub convert_dtb: bool,
    /// Also extract the compiled form of converted trees (default: false).
    pub keep_binary: bool,
}

impl UnpackOptions {
    /// Create unpack options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable binary tree conversion.
    #[must_use]
    pub fn with_conversion(mut self, enable: bool) -> Self {
        self.convert_dtb = enable;
        self
    }

    /// Keep the binary entry of a converted tree.
    #[must_use]
    pub fn with_keep_binary(mut self, keep: bool) -> Self {
        self.keep_binary = keep;
        self
    }
}

/// What an unpack produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnpackReport {
    /// Entries written byte for byte.
    pub extracted: usize,
    /// Compiled trees written as text.
    pub converted: usize,
    /// Compiled trees whose text form failed the re-parse check.
    pub unconvertible: Vec<String>,
}

/// Unpack `header_path` and its parts into `output_dir`.
///
/// With conversion enabled, an entry named `<path>_dta_<platform>` is
/// decoded and written as text to `<path>` when that text parses back to the
/// same tree. The raw entry is then skipped unless `keep_binary` is set.
/// Entries whose un-suffixed twin is also in the archive are never
/// converted.
///
/// # Errors
///
/// - [`ArkError::InvalidHeaderPath`] if `header_path` does not end in `.hdr`
/// - [`ArkError::NotFound`] if the header or a part file is missing
/// - [`ArkError::InvalidHeader`] if the header or an entry range is corrupt
pub fn unpack(
    header_path: &Path,
    output_dir: &Path,
    options: &UnpackOptions,
    progress: &mut ProgressFn<'_>,
) -> Result<UnpackReport> {
    check_header_path(header_path)?;
    let archive = read_header(header_path)?;
    let span = info_span!("unpack", header = %header_path.display(), platform = %archive.platform);
    let _guard = span.enter();

    let header_dir = header_path.parent().unwrap_or(Path::new("")).to_path_buf();
    let mut parts = PartFiles::new(&archive, header_dir);
    let paths: HashSet<String> = archive.entries.iter().map(ArchiveEntry::full_path).collect();
    let suffix = archive.platform.dta_suffix();
    let total: u64 = archive.entries.iter().map(ArchiveEntry::weight).sum();

    let mut report = UnpackReport::default();
    let mut current = 0u64;
    progress("Starting", 0, total);

    for entry in &archive.entries {
        current += entry.weight();
        let full_path = entry.full_path();

        if options.convert_dtb
            && let Some(twin) = full_path.strip_suffix(suffix.as_str())
            && !paths.contains(twin)
        {
            let data = parts.read(entry)?;
            match to_checked_text(&data) {
                Some(text) => {
                    write_file(&disk_path(output_dir, twin), text.as_bytes())?;
                    report.converted += 1;
                    debug!(path = twin, "converted compiled tree");
                    progress(&format!("Unpacked {twin}"), current, total);
                    if !options.keep_binary {
                        continue;
                    }
                }
                None => {
                    warn!(
                        path = %full_path,
                        "compiled tree does not survive text conversion; extracting as-is"
                    );
                    report.unconvertible.push(full_path.clone());
                }
            }
        }

        let target = disk_path(output_dir, &full_path);
        parts.extract(entry, &target)?;
        report.extracted += 1;
        debug!(path = %full_path, size = entry.size, "extracted entry");
        progress(&format!("Unpacked {full_path}"), current, total);
    }

    info!(
        extracted = report.extracted,
        converted = report.converted,
        "unpacked archive"
    );
    Ok(report)
}

/// Decode a compiled tree and return its text if the text parses back to
/// an equal tree.
fn to_checked_text(data: &[u8]) -> Option<String> {
    let document = DtaDocument::parse_binary(data).ok()?;
    let text = serialize_text(&document.root);
    match parse_text(&text) {
        Ok(reparsed) if reparsed == document.root => Some(text),
        _ => None,
    }
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, data)?;
    Ok(())
}

/// Part files opened on first use.
struct PartFiles<'a> {
    archive: &'a Archive,
    header_dir: PathBuf,
    open: Vec<Option<File>>,
}

impl<'a> PartFiles<'a> {
    fn new(archive: &'a Archive, header_dir: PathBuf) -> Self {
        Self {
            archive,
            header_dir,
            open: (0..archive.parts.len()).map(|_| None).collect(),
        }
    }

    fn seek_to(&mut self, entry: &ArchiveEntry) -> Result<&mut File> {
        let index = entry.part as usize;
        let part = self.archive.parts.get(index).ok_or_else(|| {
            ArkError::invalid_header(format!(
                "missing part {} for {}",
                entry.part,
                entry.full_path()
            ))
        })?;
        if u64::from(entry.offset) + u64::from(entry.size) > u64::from(part.size) {
            return Err(ArkError::invalid_header(format!(
                "entry {} runs past the end of {}",
                entry.full_path(),
                part.file_name
            )));
        }
        let slot = &mut self.open[index];
        let file = match slot {
            Some(file) => file,
            None => {
                let path = self.header_dir.join(&part.file_name);
                slot.insert(File::open(&path).map_err(|e| ArkError::from_io(e, &path))?)
            }
        };
        file.seek(SeekFrom::Start(u64::from(entry.offset)))?;
        Ok(file)
    }

    fn read(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>> {
        let file = self.seek_to(entry)?;
        let mut data = vec![0u8; entry.size as usize];
        file.read_exact(&mut data)?;
        Ok(data)
    }

    fn extract(&mut self, entry: &ArchiveEntry, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = self.seek_to(entry)?;
        let mut out = BufWriter::new(File::create(target)?);
        let copied = std::io::copy(&mut file.take(u64::from(entry.size)), &mut out)?;
        out.flush()?;
        if copied != u64::from(entry.size) {
            return Err(ArkError::invalid_header(format!(
                "part data for {} is truncated",
                entry.full_path()
            )));
        }
        Ok(())
    }
}
