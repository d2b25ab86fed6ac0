use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure classes surfaced by the upload and rollback passes.
#[derive(Debug, Error)]
pub enum MdupError {
    /// Missing or malformed `config.json`, or an unusable value inside it.
    #[error("config error: {0}")]
    Config(String),

    /// Stat, read or write failure on a document, image or backup file.
    #[error("path error on {}: {source}", .path.display())]
    Path {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A reference that looks like a URL but does not parse as one.
    #[error("cannot parse reference {reference:?}: {reason}")]
    Parse { reference: String, reason: String },

    /// The storage service rejected or failed an upload.
    #[error("upload of {reference:?} failed: {reason}")]
    Upload { reference: String, reason: String },
}

impl MdupError {
    pub fn path(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MdupError::Path {
            path: path.into(),
            source,
        }
    }

    pub fn upload(reference: impl Into<String>, reason: impl ToString) -> Self {
        MdupError::Upload {
            reference: reference.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_error_names_the_path() {
        let err = MdupError::path(
            "/tmp/missing.md",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/missing.md"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn test_upload_error_keeps_reason() {
        let err = MdupError::upload("http://a.com/x.png", "401 bad token");
        assert_eq!(
            err.to_string(),
            "upload of \"http://a.com/x.png\" failed: 401 bad token"
        );
    }
}
