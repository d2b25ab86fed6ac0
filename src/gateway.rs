use crate::classify::Origin;
use crate::error::MdupError;
use crate::filewalker::has_suffix;
use crate::storage::ObjectStore;
use log::debug;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Routes a classified reference to the matching store operation.
pub struct UploadGateway<'a, S> {
    store: &'a S,
    image_suffixes: Vec<String>,
}

impl<'a, S: ObjectStore> UploadGateway<'a, S> {
    pub fn new(store: &'a S, image_suffixes: &[String]) -> Self {
        Self {
            store,
            image_suffixes: image_suffixes.to_vec(),
        }
    }

    /// Uploads `reference` and returns the key the bucket assigned.
    ///
    /// `Ok(None)` means the reference was skipped: already hosted, a local
    /// path that is missing, a directory or not an allowed image, or an
    /// external URL the bucket cannot fetch.
    pub async fn upload(
        &self,
        reference: &str,
        origin: Origin,
        base_dir: &Path,
    ) -> Result<Option<String>, MdupError> {
        match origin {
            Origin::RemoteHosted => Ok(None),
            Origin::Local => self.upload_local(reference, base_dir).await,
            Origin::External => {
                if !is_fetchable(reference) {
                    debug!("[skipped] {reference}: only http and https URLs can be fetched");
                    return Ok(None);
                }
                self.store.fetch_remote(reference).await.map(Some)
            }
        }
    }

    async fn upload_local(
        &self,
        reference: &str,
        base_dir: &Path,
    ) -> Result<Option<String>, MdupError> {
        let path = resolve_local(reference, base_dir);

        let Ok(meta) = fs::metadata(&path).await else {
            debug!("[skipped] {reference}: no such file {}", path.display());
            return Ok(None);
        };
        if meta.is_dir() {
            debug!("[skipped] {reference}: is a directory");
            return Ok(None);
        }
        let suffixes: Vec<&str> = self.image_suffixes.iter().map(String::as_str).collect();
        if !has_suffix(&path, &suffixes) {
            debug!("[skipped] {reference}: suffix not in {suffixes:?}");
            return Ok(None);
        }

        let bytes = fs::read(&path)
            .await
            .map_err(|e| MdupError::path(&path, e))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        self.store.put_file(&name, bytes).await.map(Some)
    }
}

/// Absolute references are used as-is, relative ones are taken from the
/// document's directory.
pub fn resolve_local(reference: &str, base_dir: &Path) -> PathBuf {
    let path = Path::new(reference);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn is_fetchable(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
