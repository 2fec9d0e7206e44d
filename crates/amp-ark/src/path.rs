//! Mapping between logical archive paths and on-disk paths.
//!
//! A segment made only of dots (`.`, `..`, `...`) cannot exist as a real
//! directory name, so on disk it is wrapped in parentheses: `(..)`.

use std::path::{Path, PathBuf};

fn is_dots(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b == b'.')
}

/// Turn a disk segment back into its logical form: `(..)` becomes `..`.
#[must_use]
pub fn unescape_segment(segment: &str) -> &str {
    match segment.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) if is_dots(inner) => inner,
        _ => segment,
    }
}

/// Turn a logical segment into a safe disk name: `..` becomes `(..)`.
#[must_use]
pub fn escape_segment(segment: &str) -> String {
    if is_dots(segment) {
        format!("({segment})")
    } else {
        segment.to_string()
    }
}

/// Logical path of `relative` (a path under the source directory).
#[must_use]
pub fn logical_path(relative: &Path) -> String {
    relative
        .components()
        .map(|component| {
            let segment = component.as_os_str().to_string_lossy();
            unescape_segment(&segment).to_string()
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Disk location of logical `path` under `root`.
///
/// Empty segments are dropped so absolute logical paths stay under `root`.
#[must_use]
pub fn disk_path(root: &Path, path: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        out.push(escape_segment(segment));
    }
    out
}

/// Split a logical path into `(dir_path, file_name)`.
#[must_use]
pub fn split_logical(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots_segments_are_wrapped() {
        assert_eq!(escape_segment(".."), "(..)");
        assert_eq!(escape_segment("..."), "(...)");
        assert_eq!(escape_segment("a.."), "a..");
        assert_eq!(unescape_segment("(..)"), "..");
        assert_eq!(unescape_segment("(.)"), ".");
        assert_eq!(unescape_segment("(a)"), "(a)");
        assert_eq!(unescape_segment("()"), "()");
    }

    #[test]
    fn logical_and_disk_paths_mirror() {
        let relative = Path::new("(..)").join("(..)").join("ui").join("x.dta");
        let logical = logical_path(&relative);
        assert_eq!(logical, "../../ui/x.dta");

        let disk = disk_path(Path::new("/out"), &logical);
        assert_eq!(disk, Path::new("/out/(..)/(..)/ui/x.dta"));
        assert_eq!(disk_path(Path::new("/out"), "/etc/x"), Path::new("/out/etc/x"));
    }

    #[test]
    fn split_separates_file_name() {
        assert_eq!(split_logical("ps3/songs/a.mid"), ("ps3/songs", "a.mid"));
        assert_eq!(split_logical("a.mid"), ("", "a.mid"));
    }
}
