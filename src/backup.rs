//! Pre-upload snapshots of documents, and restoring from them.
//!
//! Snapshots live in `<home>/backups/`, one per document, named after a hash
//! of the document's canonical path followed by its file name. Two `README.md`
//! files in different directories get different snapshots.

use crate::error::MdupError;
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const BACKUP_DIR: &str = "backups";

pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    pub fn new(home: &Path) -> Self {
        Self {
            dir: home.join(BACKUP_DIR),
        }
    }

    /// Location of the snapshot for `document`.
    pub async fn backup_path(&self, document: &Path) -> PathBuf {
        let canonical = fs::canonicalize(document)
            .await
            .unwrap_or_else(|_| document.to_path_buf());
        let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
        let prefix = &hex::encode(digest)[..16];
        let name = canonical
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        self.dir.join(format!("{prefix}-{name}"))
    }

    /// Copies `document` into its snapshot. An existing snapshot is kept
    /// unless `force` is set. Returns whether a copy was written.
    pub async fn backup(&self, document: &Path, force: bool) -> Result<bool, MdupError> {
        let target = self.backup_path(document).await;
        if !force && fs::try_exists(&target).await.unwrap_or(false) {
            debug!("backup exists: {}", target.display());
            return Ok(false);
        }

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MdupError::path(&self.dir, e))?;
        let bytes = fs::read(document)
            .await
            .map_err(|e| MdupError::path(document, e))?;
        fs::write(&target, bytes)
            .await
            .map_err(|e| MdupError::path(&target, e))?;
        info!("backup {} -> {}", document.display(), target.display());
        Ok(true)
    }

    /// Copies the snapshot of `document` back over it. A symlinked document
    /// is restored through the link, into the file it points at.
    pub async fn restore(&self, document: &Path) -> Result<(), MdupError> {
        let source = self.backup_path(document).await;
        let bytes = fs::read(&source)
            .await
            .map_err(|e| MdupError::path(&source, e))?;
        fs::write(document, bytes)
            .await
            .map_err(|e| MdupError::path(document, e))?;
        Ok(())
    }
}
