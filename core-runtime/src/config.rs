//! # Core Configuration
//!
//! Builder for [`CoreConfig`], the single value a host hands to the service
//! façade. It names the catalog endpoint and local directories, tunes the
//! media cache, and carries the bridge implementations the core runs on.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - catalog and audio fetches
//! - `BlobStore` - local object URLs for cached audio
//! - `SettingsStore` - persisted volume
//!
//! With the `desktop-shims` feature enabled, missing bridges are filled with
//! `ReqwestHttpClient`, `FileBlobStore` (under the cache directory) and
//! `SqliteSettingsStore` (under the data directory). Without it, a missing
//! bridge is a [`Error::CapabilityMissing`] naming what to inject.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .catalog_url("https://api.example.com/music")
//!     .data_dir("/home/ana/.local/share/cadence")
//!     .cache_capacity(30)
//!     .build()
//!     .await?;
//! ```
//!
//! `build` is async because the default settings store opens its database.

use crate::error::{Error, Result};
use bridge_traits::{BlobStore, Clock, HttpClient, SettingsStore, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default number of cached tracks.
pub const DEFAULT_CACHE_CAPACITY: usize = 50;
/// Default lifetime of a cached track.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Default delay before a neighbor prefetch starts.
pub const DEFAULT_PREFETCH_DELAY: Duration = Duration::from_millis(100);
/// Default timeout for fetching one audio file.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);
/// Default timeout for one catalog request.
pub const DEFAULT_CATALOG_TIMEOUT: Duration = Duration::from_secs(10);

#[cfg_attr(not(feature = "desktop-shims"), allow(dead_code))]
const SETTINGS_DB_FILE: &str = "settings.db";
const MEDIA_DIR: &str = "media";

/// Core configuration for the player.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Endpoint returning the catalog as a JSON array
    pub catalog_url: String,

    /// Directory for persistent state (the settings database)
    pub data_dir: PathBuf,

    /// Directory backing cached audio blobs
    pub cache_dir: PathBuf,

    /// Maximum number of cached tracks
    pub cache_capacity: usize,

    /// How long a cached track stays playable
    pub cache_ttl: Duration,

    /// Delay before prefetching neighbors of the selected track
    pub prefetch_delay: Duration,

    /// Timeout for one audio fetch
    pub fetch_timeout: Duration,

    /// Timeout for one catalog request
    pub catalog_timeout: Duration,

    pub http_client: Arc<dyn HttpClient>,
    pub blob_store: Arc<dyn BlobStore>,
    pub settings_store: Arc<dyn SettingsStore>,
    pub clock: Arc<dyn Clock>,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("catalog_url", &self.catalog_url)
            .field("data_dir", &self.data_dir)
            .field("cache_dir", &self.cache_dir)
            .field("cache_capacity", &self.cache_capacity)
            .field("cache_ttl", &self.cache_ttl)
            .field("prefetch_delay", &self.prefetch_delay)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("catalog_timeout", &self.catalog_timeout)
            .field("http_client", &"HttpClient { ... }")
            .field("blob_store", &"BlobStore { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("features", &self.features)
            .finish()
    }
}

/// Optional behaviour toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Prefetch the previous and next tracks once a selection settles
    pub enable_prefetch: bool,

    /// Persist volume changes through the settings store
    pub persist_volume: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_prefetch: true,
            persist_volume: true,
        }
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        check_fields(&Fields {
            catalog_url: &self.catalog_url,
            data_dir: &self.data_dir,
            cache_capacity: self.cache_capacity,
            cache_ttl: self.cache_ttl,
            fetch_timeout: self.fetch_timeout,
            catalog_timeout: self.catalog_timeout,
        })
    }
}

struct Fields<'a> {
    catalog_url: &'a str,
    data_dir: &'a Path,
    cache_capacity: usize,
    cache_ttl: Duration,
    fetch_timeout: Duration,
    catalog_timeout: Duration,
}

fn check_fields(fields: &Fields<'_>) -> Result<()> {
    let url = fields.catalog_url.trim();
    if url.is_empty() {
        return Err(Error::Config("Catalog URL cannot be empty".to_string()));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "Catalog URL must be http(s), got '{}'",
            url
        )));
    }

    if fields.data_dir.as_os_str().is_empty() {
        return Err(Error::Config("Data directory cannot be empty".to_string()));
    }

    if fields.cache_capacity == 0 {
        return Err(Error::Config(
            "Cache capacity must be greater than 0".to_string(),
        ));
    }

    if fields.cache_ttl.is_zero() {
        return Err(Error::Config("Cache TTL must be greater than 0".to_string()));
    }

    if fields.fetch_timeout.is_zero() || fields.catalog_timeout.is_zero() {
        return Err(Error::Config("Timeouts must be greater than 0".to_string()));
    }

    Ok(())
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, purpose: &str, desktop_default: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Desktop: enable the 'desktop-shims' feature to use {}. \
             Other hosts: inject a platform implementation through the builder.",
            capability, purpose, desktop_default
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Ok(Arc::new(bridge_desktop::ReqwestHttpClient::with_timeout(
        timeout,
    )))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(capability_missing(
        "HttpClient",
        "catalog and audio fetches",
        "ReqwestHttpClient",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_blob_store(cache_dir: &Path) -> Result<Arc<dyn BlobStore>> {
    Ok(Arc::new(bridge_desktop::FileBlobStore::with_directory(
        cache_dir.to_path_buf(),
    )))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_blob_store(_cache_dir: &Path) -> Result<Arc<dyn BlobStore>> {
    Err(capability_missing(
        "BlobStore",
        "cached audio",
        "FileBlobStore",
    ))
}

#[cfg(feature = "desktop-shims")]
async fn provide_default_settings_store(data_dir: &Path) -> Result<Arc<dyn SettingsStore>> {
    let store = bridge_desktop::SqliteSettingsStore::new(data_dir.join(SETTINGS_DB_FILE))
        .await
        .map_err(|e| Error::Internal(format!("Failed to open default SettingsStore: {}", e)))?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
async fn provide_default_settings_store(_data_dir: &Path) -> Result<Arc<dyn SettingsStore>> {
    Err(capability_missing(
        "SettingsStore",
        "persisting the user's volume",
        "SqliteSettingsStore",
    ))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    catalog_url: Option<String>,
    data_dir: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    cache_capacity: Option<usize>,
    cache_ttl: Option<Duration>,
    prefetch_delay: Option<Duration>,
    fetch_timeout: Option<Duration>,
    catalog_timeout: Option<Duration>,
    http_client: Option<Arc<dyn HttpClient>>,
    blob_store: Option<Arc<dyn BlobStore>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    clock: Option<Arc<dyn Clock>>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the catalog endpoint (required).
    pub fn catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = Some(url.into());
        self
    }

    /// Sets the persistent data directory (required).
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Sets the blob directory. Defaults to `<data_dir>/media`.
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Default: 50 tracks
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// Default: 24 hours
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Default: 100 ms
    pub fn prefetch_delay(mut self, delay: Duration) -> Self {
        self.prefetch_delay = Some(delay);
        self
    }

    /// Default: 60 seconds
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Default: 10 seconds
    pub fn catalog_timeout(mut self, timeout: Duration) -> Self {
        self.catalog_timeout = Some(timeout);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(store);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Overrides the time source used for cache expiry.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Default: enabled
    pub fn enable_prefetch(mut self, enabled: bool) -> Self {
        self.features.enable_prefetch = enabled;
        self
    }

    /// Default: enabled
    pub fn persist_volume(mut self, enabled: bool) -> Self {
        self.features.persist_volume = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds and validates the final [`CoreConfig`].
    ///
    /// Fails when a required field or bridge is missing, or a value is out
    /// of range. Scalar settings are validated before any default bridge is
    /// created, so a bad value never opens a database.
    pub async fn build(self) -> Result<CoreConfig> {
        let catalog_url = self.catalog_url.ok_or_else(|| {
            Error::Config("Catalog URL is required. Use .catalog_url() to set it.".to_string())
        })?;

        let data_dir = self.data_dir.ok_or_else(|| {
            Error::Config("Data directory is required. Use .data_dir() to set it.".to_string())
        })?;

        let cache_dir = self
            .cache_dir
            .unwrap_or_else(|| data_dir.join(MEDIA_DIR));
        let cache_capacity = self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY);
        let cache_ttl = self.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL);
        let fetch_timeout = self.fetch_timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT);
        let catalog_timeout = self.catalog_timeout.unwrap_or(DEFAULT_CATALOG_TIMEOUT);

        check_fields(&Fields {
            catalog_url: &catalog_url,
            data_dir: &data_dir,
            cache_capacity,
            cache_ttl,
            fetch_timeout,
            catalog_timeout,
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(fetch_timeout)?,
        };
        let blob_store = match self.blob_store {
            Some(store) => store,
            None => provide_default_blob_store(&cache_dir)?,
        };
        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(&data_dir).await?,
        };

        Ok(CoreConfig {
            catalog_url,
            data_dir,
            cache_dir,
            cache_capacity,
            cache_ttl,
            prefetch_delay: self.prefetch_delay.unwrap_or(DEFAULT_PREFETCH_DELAY),
            fetch_timeout,
            catalog_timeout,
            http_client,
            blob_store,
            settings_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            features: self.features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{HttpRequest, HttpResponse, ManualClock};
    use bytes::Bytes;

    struct NullHttpClient;

    #[async_trait]
    impl HttpClient for NullHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Ok(HttpResponse {
                status: 204,
                headers: Default::default(),
                body: Bytes::new(),
            })
        }
    }

    struct NullBlobStore;

    #[async_trait]
    impl BlobStore for NullBlobStore {
        async fn create_object_url(
            &self,
            _data: Bytes,
            _content_type: Option<&str>,
        ) -> BridgeResult<String> {
            Ok("blob:null".to_string())
        }

        fn revoke_object_url(&self, _uri: &str) {}
    }

    struct NullSettingsStore;

    #[async_trait]
    impl SettingsStore for NullSettingsStore {
        async fn set_string(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }
        async fn get_string(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }
        async fn set_bool(&self, _key: &str, _value: bool) -> BridgeResult<()> {
            Ok(())
        }
        async fn get_bool(&self, _key: &str) -> BridgeResult<Option<bool>> {
            Ok(None)
        }
        async fn set_i64(&self, _key: &str, _value: i64) -> BridgeResult<()> {
            Ok(())
        }
        async fn get_i64(&self, _key: &str) -> BridgeResult<Option<i64>> {
            Ok(None)
        }
        async fn delete(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }
        async fn has_key(&self, _key: &str) -> BridgeResult<bool> {
            Ok(false)
        }
        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn clear_all(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn injected() -> CoreConfigBuilder {
        CoreConfig::builder()
            .catalog_url("https://api.example.com/music")
            .data_dir("/data/cadence")
            .http_client(Arc::new(NullHttpClient))
            .blob_store(Arc::new(NullBlobStore))
            .settings_store(Arc::new(NullSettingsStore))
    }

    #[tokio::test]
    async fn test_defaults_applied() {
        let config = injected().build().await.unwrap();

        assert_eq!(config.cache_capacity, 50);
        assert_eq!(config.cache_ttl, Duration::from_secs(86_400));
        assert_eq!(config.prefetch_delay, Duration::from_millis(100));
        assert_eq!(config.catalog_timeout, Duration::from_secs(10));
        assert_eq!(config.cache_dir, PathBuf::from("/data/cadence/media"));
        assert!(config.features.enable_prefetch);
        assert!(config.features.persist_volume);
    }

    #[tokio::test]
    async fn test_overrides_applied() {
        let clock = Arc::new(ManualClock::default());
        let config = injected()
            .cache_dir("/tmp/blobs")
            .cache_capacity(3)
            .cache_ttl(Duration::from_secs(60))
            .prefetch_delay(Duration::ZERO)
            .enable_prefetch(false)
            .clock(clock)
            .build()
            .await
            .unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/blobs"));
        assert_eq!(config.cache_capacity, 3);
        assert_eq!(config.prefetch_delay, Duration::ZERO);
        assert!(!config.features.enable_prefetch);
    }

    #[tokio::test]
    async fn test_requires_catalog_url() {
        let err = CoreConfig::builder()
            .data_dir("/data")
            .build()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Catalog URL is required"));
    }

    #[tokio::test]
    async fn test_requires_data_dir() {
        let err = CoreConfig::builder()
            .catalog_url("https://api.example.com/music")
            .build()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Data directory is required"));
    }

    #[tokio::test]
    async fn test_rejects_non_http_catalog() {
        let err = injected()
            .catalog_url("ftp://example.com/music")
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_rejects_zero_capacity_and_ttl() {
        let err = injected().cache_capacity(0).build().await.unwrap_err();
        assert!(err.to_string().contains("capacity"));

        let err = injected().cache_ttl(Duration::ZERO).build().await.unwrap_err();
        assert!(err.to_string().contains("TTL"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[tokio::test]
    async fn test_missing_bridge_is_actionable() {
        let err = CoreConfig::builder()
            .catalog_url("https://api.example.com/music")
            .data_dir("/data")
            .build()
            .await
            .unwrap_err();

        match err {
            Error::CapabilityMissing {
                capability,
                message,
            } => {
                assert_eq!(capability, "HttpClient");
                assert!(message.contains("desktop-shims"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[tokio::test]
    async fn test_desktop_defaults_open_settings_database() {
        let base = std::env::temp_dir().join(format!("cadence-config-{}", uuid::Uuid::new_v4()));

        let config = CoreConfig::builder()
            .catalog_url("https://api.example.com/music")
            .data_dir(&base)
            .build()
            .await
            .unwrap();

        config.settings_store.set_i64("player-volume", 55).await.unwrap();
        assert_eq!(
            config.settings_store.get_i64("player-volume").await.unwrap(),
            Some(55)
        );
        assert!(base.join("settings.db").exists());

        drop(config);
        let _ = std::fs::remove_dir_all(&base);
    }
}
