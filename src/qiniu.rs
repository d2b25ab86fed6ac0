//! Qiniu Kodo backend for [`ObjectStore`].
//!
//! Only the two calls the tool needs are implemented: form upload without a
//! key and server-side fetch without a key. Both let the service derive the
//! key from the content hash.

use crate::error::MdupError;
use crate::settings::Settings;
use crate::storage::ObjectStore;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::debug;
use reqwest::{Client, Response, header, multipart};
use serde::{Deserialize, Serialize};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Lifetime of a generated upload token.
const TOKEN_TTL_SECS: i64 = 3600;

#[derive(Serialize)]
struct PutPolicy<'a> {
    scope: &'a str,
    deadline: i64,
}

/// Body of both the upload and the fetch responses.
#[derive(Debug, Deserialize)]
struct PutRet {
    key: Option<String>,
    error: Option<String>,
}

pub struct QiniuStore {
    client: Client,
    access_key: String,
    secret_key: String,
    bucket: String,
    upload_host: String,
    fetch_host: String,
}

impl QiniuStore {
    pub fn new(settings: &Settings) -> Result<Self, MdupError> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| MdupError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            access_key: settings.access_key.clone(),
            secret_key: settings.secret_key.clone(),
            bucket: settings.bucket.clone(),
            upload_host: settings.upload_host.trim_end_matches('/').to_string(),
            fetch_host: settings.fetch_host.trim_end_matches('/').to_string(),
        })
    }

    /// URL-safe base64 of HMAC-SHA1(secret key, data).
    fn sign(&self, data: &[u8]) -> Result<String, MdupError> {
        let mut mac = HmacSha1::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| MdupError::Config(format!("unusable secret key: {e}")))?;
        mac.update(data);
        Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
    }

    /// `ak:sign:policy` token scoped to the whole bucket.
    pub fn upload_token(&self, deadline: i64) -> Result<String, MdupError> {
        let policy = PutPolicy {
            scope: &self.bucket,
            deadline,
        };
        let policy = serde_json::to_string(&policy)
            .map_err(|e| MdupError::Config(format!("cannot encode put policy: {e}")))?;
        let encoded = URL_SAFE.encode(policy);
        let sign = self.sign(encoded.as_bytes())?;
        Ok(format!("{}:{sign}:{encoded}", self.access_key))
    }

    /// Management token for a request with an empty body.
    fn access_token(&self, path: &str) -> Result<String, MdupError> {
        let sign = self.sign(format!("{path}\n").as_bytes())?;
        Ok(format!("{}:{sign}", self.access_key))
    }

    fn fetch_path(&self, url: &str) -> String {
        format!(
            "/fetch/{}/to/{}",
            URL_SAFE.encode(url),
            URL_SAFE.encode(&self.bucket)
        )
    }
}

impl ObjectStore for QiniuStore {
    async fn put_file(&self, name: &str, bytes: Vec<u8>) -> Result<String, MdupError> {
        let token = self.upload_token(Utc::now().timestamp() + TOKEN_TTL_SECS)?;
        let part = multipart::Part::bytes(bytes).file_name(name.to_string());
        let form = multipart::Form::new().text("token", token).part("file", part);

        debug!("POST {} ({name})", self.upload_host);
        let response = self
            .client
            .post(&self.upload_host)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MdupError::upload(name, e))?;
        read_key(name, response).await
    }

    async fn fetch_remote(&self, url: &str) -> Result<String, MdupError> {
        let path = self.fetch_path(url);
        let token = self.access_token(&path)?;

        debug!("POST {}{path} ({url})", self.fetch_host);
        let response = self
            .client
            .post(format!("{}{path}", self.fetch_host))
            .header(header::AUTHORIZATION, format!("QBox {token}"))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .send()
            .await
            .map_err(|e| MdupError::upload(url, e))?;
        read_key(url, response).await
    }
}

async fn read_key(reference: &str, response: Response) -> Result<String, MdupError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| MdupError::upload(reference, e))?;
    let parsed: Option<PutRet> = serde_json::from_str(&body).ok();

    if !status.is_success() {
        let reason = parsed
            .and_then(|ret| ret.error)
            .unwrap_or_else(|| body.trim().to_string());
        return Err(MdupError::upload(reference, format!("{status}: {reason}")));
    }

    parsed
        .and_then(|ret| ret.key)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| MdupError::upload(reference, format!("response has no key: {body}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> QiniuStore {
        let settings = Settings::from_json(
            r#"{"accessKey": "ak", "secretKey": "sk", "bucket": "notes", "domain": "https://cdn.example.com"}"#,
        )
        .unwrap();
        QiniuStore::new(&settings).unwrap()
    }

    #[test]
    fn test_upload_token_layout() {
        let token = store().upload_token(1_700_000_000).unwrap();
        assert_eq!(
            token,
            "ak:fJkes2EaKlt8wYpf3S4iy-gnYso=:eyJzY29wZSI6Im5vdGVzIiwiZGVhZGxpbmUiOjE3MDAwMDAwMDB9"
        );
    }

    #[test]
    fn test_fetch_path_and_access_token() {
        let store = store();
        let path = store.fetch_path("http://other.com/pic.png");
        assert_eq!(path, "/fetch/aHR0cDovL290aGVyLmNvbS9waWMucG5n/to/bm90ZXM=");
        assert_eq!(
            store.access_token(&path).unwrap(),
            "ak:F2oC-Xk5ZhnxarBJmWk-xJTGfRU="
        );
    }

    fn response(status: u16, body: &'static str) -> Response {
        Response::from(
            http::Response::builder()
                .status(status)
                .body(body)
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_read_key_accepts_assigned_key() {
        let key = read_key("a.png", response(200, r#"{"hash":"Fh","key":"Fh"}"#))
            .await
            .unwrap();
        assert_eq!(key, "Fh");
    }

    #[tokio::test]
    async fn test_read_key_reports_service_error_text() {
        let err = read_key("a.png", response(401, r#"{"error":"bad token"}"#))
            .await
            .unwrap_err();
        assert!(matches!(err, MdupError::Upload { .. }));
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("bad token"));
    }

    #[tokio::test]
    async fn test_read_key_without_key_is_upload_error() {
        for body in [r#"{"hash":"Fh"}"#, r#"{"key":""}"#, "<html>gateway</html>"] {
            let err = read_key("a.png", response(200, body)).await.unwrap_err();
            assert!(matches!(err, MdupError::Upload { .. }), "{body}");
            assert!(err.to_string().contains("response has no key"), "{body}");
        }
    }

    #[tokio::test]
    async fn test_read_key_plain_text_error_body() {
        let err = read_key("http://other.com/x.png", response(502, "bad gateway\n"))
            .await
            .unwrap_err();
        assert!(err.to_string().ends_with("502 Bad Gateway: bad gateway"));
    }
}
