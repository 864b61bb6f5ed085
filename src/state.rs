use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;

use crate::error::FetchError;
use crate::source::{DirSource, HttpSource, JsonSource};
use crate::types::{Config, Snapshot};

/// Base delay between retry attempts; attempt `n` waits `n` times this.
const RETRY_BACKOFF_MS: u64 = 250;

/// One dashboard session: the document source, the URL-keyed response cache,
/// and the snapshots loaded so far.
///
/// Nothing here outlives the session. Dropping it (or calling [`Session::clear`])
/// is the whole teardown.
pub struct Session {
    config: Config,
    source: Box<dyn JsonSource>,
    cache: DashMap<String, Value>,
    snapshots: Vec<Snapshot>,
}

impl Session {
    pub fn new(config: Config, source: Box<dyn JsonSource>) -> Self {
        Self {
            config,
            source,
            cache: DashMap::new(),
            snapshots: Vec::new(),
        }
    }

    /// Build the source the config asks for: a local directory when `dataDir`
    /// is set, HTTP against `baseUrl` otherwise.
    pub fn from_config(config: Config) -> Result<Self, FetchError> {
        let source: Box<dyn JsonSource> = match config.data_dir.as_deref() {
            Some(dir) if !dir.is_empty() => {
                log::info!("Reading documents from local directory {}", dir);
                Box::new(DirSource::new(dir))
            }
            _ => Box::new(HttpSource::new(
                &config.base_url,
                config.request_timeout_secs,
            )?),
        };
        Ok(Self::new(config, source))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> &dyn JsonSource {
        self.source.as_ref()
    }

    /// Fetch a document, memoizing successful responses by resolved URL.
    ///
    /// Failures are returned to the caller and never cached.
    pub async fn fetch_with_cache(&self, path: &str) -> Result<Value, FetchError> {
        let key = self.source.locate(path);
        if let Some(hit) = self.cache.get(&key) {
            log::debug!("cache hit: {}", key);
            return Ok(hit.value().clone());
        }

        let value = self.fetch_with_retry(path).await?;
        self.cache.insert(key, value.clone());
        Ok(value)
    }

    async fn fetch_with_retry(&self, path: &str) -> Result<Value, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            match self.source.fetch_json(path).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.config.retries => {
                    attempt += 1;
                    log::warn!(
                        "Fetch of {} failed ({}), retry {}/{}",
                        path,
                        e,
                        attempt,
                        self.config.retries
                    );
                    tokio::time::sleep(Duration::from_millis(
                        RETRY_BACKOFF_MS * u64::from(attempt),
                    ))
                    .await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn cached_documents(&self) -> usize {
        self.cache.len()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub(crate) fn set_snapshots(&mut self, snapshots: Vec<Snapshot>) {
        self.snapshots = snapshots;
    }

    /// Drop cached documents and loaded snapshots.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.snapshots.clear();
    }
}

/// Get the canonical config file path (~/.proctime/config.json)
pub fn config_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".proctime").join("config.json"))
}

/// Load configuration from ~/.proctime/config.json
pub fn load_config() -> Result<Config, String> {
    load_config_from(&config_path()?)
}

/// Load configuration from an explicit path.
pub fn load_config_from(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        return Err(format!(
            "Config file not found at {}. Create it with: {{ \"baseUrl\": \"https://...\" }}",
            path.display()
        ));
    }

    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;

    let config: Config =
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?;

    if config.max_weeks == 0 {
        return Err("maxWeeks must be at least 1".to_string());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Lets a test keep a handle on the source after the session takes ownership.
    struct Shared(Arc<MemorySource>);

    #[async_trait::async_trait]
    impl JsonSource for Shared {
        fn locate(&self, path: &str) -> String {
            self.0.locate(path)
        }
        async fn fetch_json(&self, path: &str) -> Result<Value, FetchError> {
            self.0.fetch_json(path).await
        }
        async fn exists(&self, path: &str) -> bool {
            self.0.exists(path).await
        }
    }

    fn session_with(source: MemorySource, retries: u32) -> (Session, Arc<MemorySource>) {
        let shared = Arc::new(source);
        let config = Config {
            retries,
            ..Config::default()
        };
        (
            Session::new(config, Box::new(Shared(shared.clone()))),
            shared,
        )
    }

    #[tokio::test]
    async fn test_fetch_with_cache_memoizes_success() {
        let (session, source) =
            session_with(MemorySource::new().with_json("a.json", json!({"k": 1})), 0);

        let first = session.fetch_with_cache("a.json").await.unwrap();
        let second = session.fetch_with_cache("a.json").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(session.cached_documents(), 1);
    }

    #[tokio::test]
    async fn test_fetch_with_cache_does_not_cache_failures() {
        let (session, source) = session_with(
            MemorySource::new()
                .with_json("a.json", json!({"k": 1}))
                .failing("a.json", 1),
            0,
        );

        assert!(session.fetch_with_cache("a.json").await.is_err());
        assert_eq!(session.cached_documents(), 0);

        assert!(session.fetch_with_cache("a.json").await.is_ok());
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_retries_only_retryable_errors() {
        let (session, source) = session_with(
            MemorySource::new()
                .with_json("a.json", json!([1]))
                .failing("a.json", 2),
            2,
        );
        assert_eq!(session.fetch_with_cache("a.json").await.unwrap(), json!([1]));
        assert_eq!(source.fetch_count(), 3);

        // 404 is not retryable: exactly one more fetch
        assert!(session.fetch_with_cache("missing.json").await.is_err());
        assert_eq!(source.fetch_count(), 4);
    }

    #[tokio::test]
    async fn test_clear_drops_cache() {
        let (mut session, source) =
            session_with(MemorySource::new().with_json("a.json", json!(1)), 0);
        session.fetch_with_cache("a.json").await.unwrap();
        session.clear();
        assert_eq!(session.cached_documents(), 0);
        session.fetch_with_cache("a.json").await.unwrap();
        assert_eq!(source.fetch_count(), 2);
    }

    #[test]
    fn test_from_config_prefers_data_dir() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            data_dir: Some(temp.path().display().to_string()),
            ..Config::default()
        };
        let session = Session::from_config(config).unwrap();
        assert!(session
            .source()
            .locate("x.json")
            .starts_with(&temp.path().display().to_string()));
    }

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{ "maxWeeks": 8, "retries": 1 }"#).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.max_weeks, 8);
        assert_eq!(config.retries, 1);
    }

    #[test]
    fn test_load_config_errors() {
        let temp = TempDir::new().unwrap();
        assert!(load_config_from(&temp.path().join("missing.json"))
            .unwrap_err()
            .contains("not found"));

        let bad = temp.path().join("bad.json");
        fs::write(&bad, "{").unwrap();
        assert!(load_config_from(&bad).unwrap_err().contains("parse"));

        let zero = temp.path().join("zero.json");
        fs::write(&zero, r#"{ "maxWeeks": 0 }"#).unwrap();
        assert!(load_config_from(&zero).is_err());
    }
}
