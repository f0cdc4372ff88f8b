//! Directory creation and deterministic, filtered directory listing

use crate::io::configuration::{HIDDEN_PREFIX, IGNORED_NAME_MARKERS};
use crate::io::error::{Result, WithPath};
use std::path::{Path, PathBuf};

/// Create a directory (and missing parents) if it does not exist yet
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the path is a file
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).with_path(path, "create directory")
}

/// Whether a directory entry name survives the listing filters
///
/// Hidden entries, editor backups (`~`) and `Thumbs.db` artifacts are rejected. When
/// a keyword is given, the name must also contain it.
pub fn is_listed(name: &str, keyword: Option<&str>) -> bool {
    if name.starts_with(HIDDEN_PREFIX) {
        return false;
    }
    if IGNORED_NAME_MARKERS
        .iter()
        .any(|marker| name.contains(marker))
    {
        return false;
    }
    keyword.is_none_or(|keyword| name.contains(keyword))
}

/// List the full paths of a directory's entries in lexicographic order
///
/// Both files and subdirectories are returned; see [`is_listed`] for the filters.
/// Entries whose names are not valid UTF-8 are skipped.
///
/// # Errors
///
/// Returns an error if the directory cannot be read
pub fn list_dir_filtered(dir: &Path, keyword: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).with_path(dir, "list directory")? {
        let entry = entry.with_path(dir, "read directory entry")?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            log::debug!("Skipping non UTF-8 entry {:?} in {}", file_name, dir.display());
            continue;
        };
        if is_listed(name, keyword) {
            entries.push(entry.path());
        }
    }
    entries.sort();
    Ok(entries)
}

/// Whether two paths name the same file
///
/// Compares canonical forms when both resolve, otherwise the literal paths.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Name of the per-volume output directory: the file name without its extension
///
/// `brain01.tif` and `brain01.tiff` both map to `brain01`.
pub fn volume_stem(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}
