use crate::error::MdupError;
use crate::extractor::image_targets;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::task;

/// Replaces image targets found in `mapping` with their hosted URL.
///
/// Matching is exact string equality on the reference of each image token;
/// nothing outside image tokens is touched, so a document whose references
/// are all unmapped comes back byte-for-byte identical.
pub fn rewrite(text: &str, mapping: &HashMap<String, String>) -> String {
    if mapping.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for target in image_targets(text) {
        if let Some(url) = mapping.get(&target.reference) {
            out.push_str(&text[last..target.span.start]);
            out.push_str(url);
            last = target.span.end;
        }
    }
    out.push_str(&text[last..]);
    out
}

/// Writes `contents` to `path` through a temporary file in the same
/// directory, keeping the original permissions. A symlink is resolved first,
/// so the file it points at is replaced and the link survives.
///
/// Blocking; async callers go through [`write_atomic_async`].
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), MdupError> {
    let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| MdupError::path(dir, e))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| MdupError::path(tmp.path(), e))?;

    if let Ok(meta) = fs::metadata(&target) {
        fs::set_permissions(tmp.path(), meta.permissions())
            .map_err(|e| MdupError::path(tmp.path(), e))?;
    }

    tmp.persist(&target)
        .map_err(|e| MdupError::path(&target, e.error))?;
    Ok(())
}

/// Runs [`write_atomic`] on the blocking pool.
pub async fn write_atomic_async(path: &Path, contents: String) -> Result<(), MdupError> {
    let owned = path.to_path_buf();
    task::spawn_blocking(move || write_atomic(&owned, &contents))
        .await
        .map_err(|e| MdupError::path(path, io::Error::other(e)))?
}
