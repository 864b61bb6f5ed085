//! Where processing-time documents come from.
//!
//! `HttpSource` is the production path (reqwest against the configured base
//! URL). `DirSource` reads the same relative layout from a local directory,
//! and `MemorySource` serves canned documents for offline runs and tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::FetchError;

/// A read-only store of JSON documents addressed by relative path.
#[async_trait]
pub trait JsonSource: Send + Sync {
    /// Absolute location for `path`; used as the cache key and in log lines.
    fn locate(&self, path: &str) -> String;

    /// Fetch and parse one document.
    async fn fetch_json(&self, path: &str) -> Result<Value, FetchError>;

    /// Lightweight existence probe. Any failure counts as "missing".
    async fn exists(&self, path: &str) -> bool;
}

fn parse_document(location: &str, body: &str) -> Result<Value, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Parse {
        url: location.to_string(),
        message: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

pub struct HttpSource {
    client: reqwest::Client,
    base: Url,
    timeout_secs: u64,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, FetchError> {
        // Url::join drops the last segment unless the base ends with '/'
        let mut base_str = base_url.trim().to_string();
        if !base_str.ends_with('/') {
            base_str.push('/');
        }
        let base = Url::parse(&base_str)
            .map_err(|e| FetchError::Configuration(format!("Invalid baseUrl {}: {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base,
            timeout_secs,
        })
    }

    fn resolve(&self, path: &str) -> Result<Url, FetchError> {
        self.base
            .join(path)
            .map_err(|e| FetchError::Configuration(format!("Invalid document path {}: {}", path, e)))
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout_secs)
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl JsonSource for HttpSource {
    fn locate(&self, path: &str) -> String {
        self.resolve(path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}{}", self.base, path))
    }

    async fn fetch_json(&self, path: &str) -> Result<Value, FetchError> {
        let url = self.resolve(path)?;
        log::debug!("GET {}", url);

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !resp.status().is_success() {
            return Err(FetchError::HttpStatus {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp.text().await.map_err(|e| self.classify(e))?;
        parse_document(url.as_str(), &body)
    }

    async fn exists(&self, path: &str) -> bool {
        let Ok(url) = self.resolve(path) else {
            return false;
        };
        match self.client.head(url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                log::debug!("HEAD {} failed: {}", path, e);
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Local directory
// ---------------------------------------------------------------------------

pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl JsonSource for DirSource {
    fn locate(&self, path: &str) -> String {
        self.root.join(path).display().to_string()
    }

    async fn fetch_json(&self, path: &str) -> Result<Value, FetchError> {
        let location = self.locate(path);
        let body = tokio::fs::read_to_string(self.root.join(path)).await?;
        parse_document(&location, &body)
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::metadata(self.root.join(path))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

/// Canned documents keyed by relative path.
///
/// Bodies are stored as text so malformed JSON can be served on purpose.
#[derive(Default)]
pub struct MemorySource {
    docs: HashMap<String, String>,
    failures: Mutex<HashMap<String, u32>>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(mut self, path: &str, value: Value) -> Self {
        self.docs.insert(path.to_string(), value.to_string());
        self
    }

    pub fn with_raw(mut self, path: &str, body: &str) -> Self {
        self.docs.insert(path.to_string(), body.to_string());
        self
    }

    /// Make the next `times` fetches of `path` fail with a network error.
    pub fn failing(self, path: &str, times: u32) -> Self {
        if let Ok(mut guard) = self.failures.lock() {
            guard.insert(path.to_string(), times);
        }
        self
    }

    /// Number of `fetch_json` calls served so far, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JsonSource for MemorySource {
    fn locate(&self, path: &str) -> String {
        format!("memory://{}", path)
    }

    async fn fetch_json(&self, path: &str) -> Result<Value, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Ok(mut guard) = self.failures.lock() {
            if let Some(remaining) = guard.get_mut(path) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(FetchError::Network(format!("simulated failure for {}", path)));
                }
            }
        }

        match self.docs.get(path) {
            Some(body) => parse_document(&self.locate(path), body),
            None => Err(FetchError::HttpStatus {
                status: 404,
                url: self.locate(path),
            }),
        }
    }

    async fn exists(&self, path: &str) -> bool {
        self.docs.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_http_source_joins_paths_against_base() {
        let source = HttpSource::new("https://data.example.test/json", 5).unwrap();
        assert_eq!(
            source.locate("history/2025-W01.json"),
            "https://data.example.test/json/history/2025-W01.json"
        );
    }

    #[test]
    fn test_http_source_rejects_invalid_base() {
        let err = HttpSource::new("not a url", 5).err().unwrap();
        assert!(matches!(err, FetchError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_dir_source_reads_and_probes() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("history")).unwrap();
        std::fs::write(temp.path().join("history/2025-W02.json"), r#"{"a":{"IN":"3 months"}}"#)
            .unwrap();
        std::fs::write(temp.path().join("broken.json"), "{ not json").unwrap();

        let source = DirSource::new(temp.path());
        let doc = source.fetch_json("history/2025-W02.json").await.unwrap();
        assert_eq!(doc["a"]["IN"], json!("3 months"));

        assert!(source.exists("history/2025-W02.json").await);
        assert!(!source.exists("history/2025-W03.json").await);
        assert!(!source.exists("history").await);

        let missing = source.fetch_json("nope.json").await.unwrap_err();
        assert!(matches!(missing, FetchError::NotFound(_)));

        let broken = source.fetch_json("broken.json").await.unwrap_err();
        assert!(matches!(broken, FetchError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_memory_source_failures_then_success() {
        let source = MemorySource::new()
            .with_json("a.json", json!({"x": 1}))
            .failing("a.json", 1);

        assert!(matches!(
            source.fetch_json("a.json").await,
            Err(FetchError::Network(_))
        ));
        assert_eq!(source.fetch_json("a.json").await.unwrap(), json!({"x": 1}));
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_memory_source_missing_is_404() {
        let source = MemorySource::new();
        match source.fetch_json("gone.json").await {
            Err(FetchError::HttpStatus { status, .. }) => assert_eq!(status, 404),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!source.exists("gone.json").await);
    }
}
