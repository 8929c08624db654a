//! Blob storage: reference-text lookup and proposal upload.
//!
//! The generator treats storage as an opaque key-value byte store with
//! path-like keys. [`BlobStore`] is the seam; [`GcsStore`] talks to the
//! Google Cloud Storage JSON API with a bearer token, and [`MemoryStore`] is
//! an in-process double for tests and offline runs.
//!
//! A missing object is `Ok(None)`, not an error: the assembler probes several
//! candidate keys per reference document and missing ones are expected.

use crate::error::DocGenError;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Opaque key-value byte store with path-like keys.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch an object as UTF-8 text. `Ok(None)` when the key does not exist.
    async fn fetch_text(&self, key: &str) -> Result<Option<String>, DocGenError>;

    /// Store bytes under `key` and return a publicly reachable URL.
    async fn store(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, DocGenError>;
}

/// Try each candidate key in order and return the first object found,
/// together with the key that matched.
pub async fn fetch_first(
    store: &dyn BlobStore,
    candidates: &[String],
) -> Result<Option<(String, String)>, DocGenError> {
    for key in candidates {
        if let Some(content) = store.fetch_text(key).await? {
            debug!("Loaded reference '{}' ({} chars)", key, content.len());
            return Ok(Some((key.clone(), content)));
        }
    }
    Ok(None)
}

// ── Google Cloud Storage ─────────────────────────────────────────────────

const GCS_API: &str = "https://storage.googleapis.com/storage/v1/b";
const GCS_UPLOAD_API: &str = "https://storage.googleapis.com/upload/storage/v1/b";

/// Blob store backed by the GCS JSON API.
pub struct GcsStore {
    http: reqwest::Client,
    bucket: String,
    token: String,
}

impl GcsStore {
    /// Build a client with an explicit per-request timeout.
    pub fn new(
        bucket: impl Into<String>,
        token: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, DocGenError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DocGenError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            bucket: bucket.into(),
            token: token.into(),
        })
    }

    /// `…/b/{bucket}/o/{key}` with the key percent-encoded as one path
    /// segment, as the JSON API requires (`/` becomes `%2F`).
    fn object_url(&self, base: &str, key: &str) -> Result<Url, DocGenError> {
        let mut url =
            Url::parse(base).map_err(|e| DocGenError::Internal(format!("bad base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| DocGenError::Internal("URL cannot be a base".into()))?
            .push(&self.bucket)
            .push("o")
            .push(key);
        Ok(url)
    }
}

#[async_trait]
impl BlobStore for GcsStore {
    async fn fetch_text(&self, key: &str) -> Result<Option<String>, DocGenError> {
        let mut url = self.object_url(GCS_API, key)?;
        url.set_query(Some("alt=media"));

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| DocGenError::StorageReadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!("Object not found: {}/{}", self.bucket, key);
                Ok(None)
            }
            status if status.is_success() => {
                let text = response.text().await.map_err(|e| DocGenError::StorageReadFailed {
                    key: key.to_string(),
                    reason: e.to_string(),
                })?;
                info!("Read {}/{} ({} chars)", self.bucket, key, text.len());
                Ok(Some(text))
            }
            status => Err(DocGenError::StorageReadFailed {
                key: key.to_string(),
                reason: format!("HTTP {status}"),
            }),
        }
    }

    async fn store(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, DocGenError> {
        let mut url = Url::parse(GCS_UPLOAD_API)
            .map_err(|e| DocGenError::Internal(format!("bad base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| DocGenError::Internal("URL cannot be a base".into()))?
            .push(&self.bucket)
            .push("o");
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", key);

        let size = bytes.len();
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| DocGenError::StorageUploadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Upload of {}/{} failed: HTTP {}", self.bucket, key, status);
            return Err(DocGenError::StorageUploadFailed {
                key: key.to_string(),
                reason: format!("HTTP {status}: {}", truncate(&body, 200)),
            });
        }

        info!("Uploaded {}/{} ({} bytes)", self.bucket, key, size);
        Ok(public_url(&self.bucket, key))
    }
}

/// Public download URL for an uploaded object.
fn public_url(bucket: &str, key: &str) -> String {
    format!("https://storage.googleapis.com/{bucket}/{key}")
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── In-memory store ──────────────────────────────────────────────────────

/// In-process blob store used by tests and offline dry runs.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a text object.
    pub fn insert_text(&self, key: impl Into<String>, content: impl Into<String>) {
        self.blobs
            .lock()
            .expect("memory store lock poisoned")
            .insert(key.into(), content.into().into_bytes());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs
            .lock()
            .expect("memory store lock poisoned")
            .contains_key(key)
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn fetch_text(&self, key: &str) -> Result<Option<String>, DocGenError> {
        let blobs = self.blobs.lock().expect("memory store lock poisoned");
        Ok(blobs
            .get(key)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned()))
    }

    async fn store(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, DocGenError> {
        self.blobs
            .lock()
            .expect("memory store lock poisoned")
            .insert(key.to_string(), bytes);
        Ok(public_url("memory", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        store.insert_text("a/b.txt", "conteúdo");
        assert_eq!(
            store.fetch_text("a/b.txt").await.unwrap().as_deref(),
            Some("conteúdo")
        );
        assert_eq!(store.fetch_text("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn fetch_first_probes_in_order() {
        let store = MemoryStore::new();
        store.insert_text("alt/key.txt", "found");
        let candidates = vec!["primary/key.txt".to_string(), "alt/key.txt".to_string()];
        let hit = fetch_first(&store, &candidates).await.unwrap();
        assert_eq!(hit, Some(("alt/key.txt".to_string(), "found".to_string())));
    }

    #[test]
    fn object_url_encodes_key_as_single_segment() {
        let store = GcsStore::new("bkt", "tok", 5).unwrap();
        let url = store.object_url(GCS_API, "dir/BC - Produto.txt").unwrap();
        let s = url.as_str();
        assert!(s.contains("/b/bkt/o/dir%2FBC%20-%20Produto.txt"), "got {s}");
    }

    #[test]
    fn public_url_shape() {
        assert_eq!(
            public_url("bkt", "props/file.pdf"),
            "https://storage.googleapis.com/bkt/props/file.pdf"
        );
    }
}
