//! The object-storage seam. The rest of the crate only talks to a bucket
//! through [`ObjectStore`].

use crate::error::MdupError;
use std::future::Future;
use url::Url;

/// A bucket that assigns keys to what it stores.
pub trait ObjectStore {
    /// Stores `bytes` without a caller-chosen key and returns the key the
    /// service assigned. `name` is only used for diagnostics and the
    /// multipart file name.
    fn put_file(
        &self,
        name: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<String, MdupError>> + Send;

    /// Asks the service to download `url` into the bucket and returns the
    /// assigned key.
    fn fetch_remote(&self, url: &str) -> impl Future<Output = Result<String, MdupError>> + Send;
}

/// Stand-in when no backend is compiled in. Every call fails, so only
/// rollback and documents without uploadable images get through.
#[cfg(not(feature = "qiniu"))]
pub struct Unavailable;

#[cfg(not(feature = "qiniu"))]
impl ObjectStore for Unavailable {
    async fn put_file(&self, name: &str, _bytes: Vec<u8>) -> Result<String, MdupError> {
        Err(MdupError::upload(name, "built without a storage backend"))
    }

    async fn fetch_remote(&self, url: &str) -> Result<String, MdupError> {
        Err(MdupError::upload(url, "built without a storage backend"))
    }
}

/// Public URL of `key` under the bucket `domain` (`domain + "/" + key`).
pub fn public_url(domain: &Url, key: &str) -> String {
    let mut url = domain.clone();
    let base = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{base}/{}", key.trim_start_matches('/')));
    url.to_string()
}
