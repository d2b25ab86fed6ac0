//! Storage settings loaded from `<home>/config.json`.

use crate::error::MdupError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const CONFIG_FILE: &str = "config.json";

/// Image suffixes accepted for local uploads when `imageSuffixes` is absent.
pub const DEFAULT_IMAGE_SUFFIXES: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".ico"];

/// Suffixes that mark a file as a Markdown document.
pub const MARKDOWN_SUFFIXES: &[&str] = &[".md", ".markdown"];

pub const DEFAULT_UPLOAD_HOST: &str = "https://up.qiniup.com";
pub const DEFAULT_FETCH_HOST: &str = "https://iovip.qbox.me";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Public domain the bucket is served from, e.g. `https://cdn.example.com`.
    pub domain: String,
    #[serde(default = "default_image_suffixes")]
    pub image_suffixes: Vec<String>,
    #[serde(default = "default_upload_host")]
    pub upload_host: String,
    #[serde(default = "default_fetch_host")]
    pub fetch_host: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_image_suffixes() -> Vec<String> {
    DEFAULT_IMAGE_SUFFIXES.iter().map(|s| s.to_string()).collect()
}

fn default_upload_host() -> String {
    DEFAULT_UPLOAD_HOST.to_string()
}

fn default_fetch_host() -> String {
    DEFAULT_FETCH_HOST.to_string()
}

impl Settings {
    /// Reads and validates `config.json` inside `home`.
    pub fn load(home: &Path) -> Result<Self, MdupError> {
        let path = home.join(CONFIG_FILE);
        let raw = fs::read_to_string(&path)
            .map_err(|e| MdupError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&raw)
            .map_err(|e| MdupError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_json(raw: &str) -> Result<Self, MdupError> {
        let settings: Settings =
            serde_json::from_str(raw).map_err(|e| MdupError::Config(e.to_string()))?;
        settings.domain_url()?;
        Ok(settings)
    }

    /// The bucket domain as a URL; classification compares hosts against it.
    pub fn domain_url(&self) -> Result<Url, MdupError> {
        let url = Url::parse(&self.domain)
            .map_err(|e| MdupError::Config(format!("invalid domain {:?}: {e}", self.domain)))?;
        if url.host_str().is_none() {
            return Err(MdupError::Config(format!(
                "domain {:?} has no host",
                self.domain
            )));
        }
        Ok(url)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Creates the tool home directory when it does not exist yet.
pub fn ensure_home(home: &Path) -> Result<(), MdupError> {
    if !home.is_dir() {
        fs::create_dir_all(home).map_err(|e| MdupError::path(home, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MINIMAL: &str = r#"{
        "accessKey": "ak",
        "secretKey": "sk",
        "bucket": "notes",
        "domain": "https://cdn.example.com"
    }"#;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let settings = Settings::from_json(MINIMAL).unwrap();
        assert_eq!(settings.bucket, "notes");
        assert_eq!(settings.image_suffixes, default_image_suffixes());
        assert_eq!(settings.upload_host, DEFAULT_UPLOAD_HOST);
        assert_eq!(settings.fetch_host, DEFAULT_FETCH_HOST);
        assert!(settings.timeout().is_none());
        assert_eq!(
            settings.domain_url().unwrap().host_str(),
            Some("cdn.example.com")
        );
    }

    #[test]
    fn test_optional_fields() {
        let raw = r#"{
            "accessKey": "ak", "secretKey": "sk", "bucket": "b",
            "domain": "http://img.example.org",
            "imageSuffixes": [".webp"],
            "timeoutSecs": 30
        }"#;
        let settings = Settings::from_json(raw).unwrap();
        assert_eq!(settings.image_suffixes, vec![".webp".to_string()]);
        assert_eq!(settings.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_missing_field_is_config_error() {
        let err = Settings::from_json(r#"{"accessKey": "ak"}"#).unwrap_err();
        assert!(matches!(err, MdupError::Config(_)));
    }

    #[test]
    fn test_domain_without_scheme_is_rejected() {
        let raw = r#"{"accessKey": "a", "secretKey": "s", "bucket": "b", "domain": "cdn.example.com"}"#;
        assert!(matches!(
            Settings::from_json(raw),
            Err(MdupError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = Settings::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn test_ensure_home_creates_nested_dir() {
        let dir = tempdir().unwrap();
        let home = dir.path().join("a").join(".mdup");
        ensure_home(&home).unwrap();
        assert!(home.is_dir());
        ensure_home(&home).unwrap();
    }
}
