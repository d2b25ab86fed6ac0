use crate::error::MdupError;
use anyhow::{Context, Result};
use ignore::{DirEntry, WalkBuilder};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Collects the Markdown documents under `root`.
///
/// A file root is returned as-is, whatever its suffix. A directory root is
/// walked recursively; any entry whose name starts with `.` is skipped along
/// with everything below it, and only files (or symlinks to files) ending in
/// one of `suffixes` are kept. The result is sorted, but callers should not
/// depend on that.
pub fn collect_markdown_files(root: &Path, suffixes: &[&str]) -> Result<Vec<PathBuf>> {
    let meta = fs::metadata(root)
        .map_err(|e| MdupError::path(root, e))
        .with_context(|| format!("Failed to stat {}", root.display()))?;

    if !meta.is_dir() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut builder = WalkBuilder::new(root);
    // Only the hidden rule applies; .gitignore and friends are not consulted.
    builder
        .standard_filters(false)
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    let mut files = Vec::new();
    for result in builder.build() {
        match result {
            Ok(entry) => {
                debug!("{}", entry.path().display());
                if is_document(&entry) && has_suffix(entry.path(), suffixes) {
                    files.push(entry.into_path());
                }
            }
            Err(err) => {
                warn!("Error walking path: {err}");
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Regular files, and symlinks that resolve to one. Linked directories are
/// not followed.
fn is_document(entry: &DirEntry) -> bool {
    match entry.file_type() {
        Some(t) if t.is_file() => true,
        Some(t) if t.is_symlink() => {
            let is_file = entry.path().is_file();
            if !is_file {
                debug!("skipping symlink {}: not a file", entry.path().display());
            }
            is_file
        }
        _ => false,
    }
}

/// Determines if a file/folder is hidden (starts with a dot)
fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|s| s.starts_with('.'))
}

/// Case-insensitive suffix match on the file name.
pub fn has_suffix(path: &Path, suffixes: &[&str]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.to_lowercase();
    suffixes
        .iter()
        .any(|suffix| name.ends_with(&suffix.to_lowercase()))
}
