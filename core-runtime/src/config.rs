//! # Core Configuration Module
//!
//! Provides configuration management for the rehearsal audio core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds every host bridge the playback engine talks to. It
//! enforces fail-fast validation so a missing bridge is reported at startup
//! rather than on the first line a user tries to hear.
//!
//! ## Required Dependencies
//!
//! - `ObjectStorage` - Mints fresh signed links from stable storage paths
//! - `DocumentStore` - Per-user script documents that receive refreshed links
//! - `LocalCacheStore` - Local mirror of script lines (desktop default: JSON file)
//! - At least one audio output: a `PlaybackAdapter`, or an `AudioSink`
//!   together with an `HttpClient`
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - Fetching clips for in-process decoding (desktop default: reqwest)
//! - `Clock` - Time source for cache expiry (default: system clock)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .object_storage(Arc::new(MyStorage))
//!     .document_store(Arc::new(MyDocuments))
//!     .audio_sink(Arc::new(MySink))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Panics with an actionable message naming the missing capability
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing required bridges");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    AudioSink, Clock, DocumentStore, HttpClient, LocalCacheStore, ObjectStorage, PlaybackAdapter,
    SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Core configuration for the rehearsal audio core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Directory used by desktop defaults for local files
    pub cache_dir: Option<PathBuf>,

    /// HTTP client for fetch-based playback strategies
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Signed link minting (required)
    pub object_storage: Arc<dyn ObjectStorage>,

    /// Script documents (required)
    pub document_store: Arc<dyn DocumentStore>,

    /// Local key-value cache (required)
    pub local_cache_store: Arc<dyn LocalCacheStore>,

    /// Host-native media element
    pub playback_adapter: Option<Arc<dyn PlaybackAdapter>>,

    /// PCM output graph
    pub audio_sink: Option<Arc<dyn AudioSink>>,

    /// Time source
    pub clock: Arc<dyn Clock>,

    /// Features flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("cache_dir", &self.cache_dir)
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field("object_storage", &"ObjectStorage { ... }")
            .field("document_store", &"DocumentStore { ... }")
            .field("local_cache_store", &"LocalCacheStore { ... }")
            .field(
                "playback_adapter",
                &self
                    .playback_adapter
                    .as_ref()
                    .map(|_| "PlaybackAdapter { ... }"),
            )
            .field(
                "audio_sink",
                &self.audio_sink.as_ref().map(|_| "AudioSink { ... }"),
            )
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Retry a failed line once with a freshly minted link
    pub enable_link_refresh: bool,

    /// Write refreshed links back to the document store and local cache
    pub enable_link_persistence: bool,

    /// Run a periodic sweep of expired cache entries
    pub enable_cache_sweeper: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_link_refresh: true,
            enable_link_persistence: true,
            enable_cache_sweeper: false,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Whether the in-process decoding path (fetch + decode + sink) is usable.
    pub fn has_pcm_output(&self) -> bool {
        self.audio_sink.is_some() && self.http_client.is_some()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - At least one audio output path is wired
    /// - Cache directory, when given, is not empty
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.cache_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::Config("Cache directory cannot be empty".to_string()));
            }
        }

        if self.playback_adapter.is_none() && !self.has_pcm_output() {
            return Err(output_missing_error(
                self.audio_sink.is_some(),
                self.http_client.is_some(),
            ));
        }

        if self.features.enable_link_persistence && !self.features.enable_link_refresh {
            return Err(Error::Config(
                "Link persistence enabled but link refresh disabled. \
                 Persistence only runs after a refresh; enable both or disable persistence."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn output_missing_error(has_sink: bool, has_http: bool) -> Error {
    let detail = match (has_sink, has_http) {
        (true, false) => "An AudioSink was provided but no HttpClient to fetch clips with.",
        (false, true) => "An HttpClient was provided but no AudioSink to render decoded audio.",
        _ => "Neither a PlaybackAdapter nor an AudioSink was provided.",
    };
    Error::CapabilityMissing {
        capability: "AudioOutput".to_string(),
        message: format!(
            "{} Inject a PlaybackAdapter (native media element), or an AudioSink \
             together with an HttpClient for in-process decoding.",
            detail
        ),
    }
}

fn object_storage_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "ObjectStorage".to_string(),
        message: "ObjectStorage implementation is required to mint fresh signed links. \
                 Inject provider_signed_url::SignedUrlStorage or a host-native storage client."
            .to_string(),
    }
}

fn document_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "DocumentStore".to_string(),
        message: "DocumentStore implementation is required to persist refreshed links \
                 into the user's script document."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn local_cache_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "LocalCacheStore".to_string(),
        message: "LocalCacheStore implementation is required to mirror script lines locally. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default JsonFileCacheStore. \
                 Web: inject a localStorage-based store."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_local_cache_store(
    cache_dir: Option<&PathBuf>,
) -> Result<Arc<dyn LocalCacheStore>> {
    use bridge_desktop::JsonFileCacheStore;

    let store = match cache_dir {
        Some(dir) => JsonFileCacheStore::with_path(dir.join("local-cache.json")),
        None => JsonFileCacheStore::new(),
    };
    let store: Arc<dyn LocalCacheStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_local_cache_store(
    _cache_dir: Option<&PathBuf>,
) -> Result<Arc<dyn LocalCacheStore>> {
    Err(local_cache_store_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Option<Arc<dyn HttpClient>>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| {
        Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
    })?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(Some(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Option<Arc<dyn HttpClient>>> {
    Ok(None)
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    cache_dir: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    object_storage: Option<Arc<dyn ObjectStorage>>,
    document_store: Option<Arc<dyn DocumentStore>>,
    local_cache_store: Option<Arc<dyn LocalCacheStore>>,
    playback_adapter: Option<Arc<dyn PlaybackAdapter>>,
    audio_sink: Option<Arc<dyn AudioSink>>,
    clock: Option<Arc<dyn Clock>>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the directory used by desktop defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .cache_dir("/path/to/cache");
    /// ```
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the object storage implementation (required).
    pub fn object_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.object_storage = Some(storage);
        self
    }

    /// Sets the document store implementation (required).
    pub fn document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.document_store = Some(store);
        self
    }

    /// Sets the local cache store implementation.
    ///
    /// Required unless the `desktop-shims` feature provides the JSON-file default.
    pub fn local_cache_store(mut self, store: Arc<dyn LocalCacheStore>) -> Self {
        self.local_cache_store = Some(store);
        self
    }

    /// Sets the native playback adapter.
    pub fn playback_adapter(mut self, adapter: Arc<dyn PlaybackAdapter>) -> Self {
        self.playback_adapter = Some(adapter);
        self
    }

    /// Sets the PCM audio sink.
    pub fn audio_sink(mut self, sink: Arc<dyn AudioSink>) -> Self {
        self.audio_sink = Some(sink);
        self
    }

    /// Sets the time source. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Enables or disables the fresh-link retry pass.
    ///
    /// Default: true
    pub fn enable_link_refresh(mut self, enabled: bool) -> Self {
        self.features.enable_link_refresh = enabled;
        self
    }

    /// Enables or disables writing refreshed links back to storage.
    ///
    /// Default: true
    pub fn enable_link_persistence(mut self, enabled: bool) -> Self {
        self.features.enable_link_persistence = enabled;
        self
    }

    /// Enables or disables the periodic cache sweeper.
    ///
    /// Default: false
    pub fn enable_cache_sweeper(mut self, enabled: bool) -> Self {
        self.features.enable_cache_sweeper = enabled;
        self
    }

    /// Sets all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns an error if:
    /// - Required bridges are missing (ObjectStorage, DocumentStore, LocalCacheStore)
    /// - No audio output path is wired
    /// - Feature flags are inconsistent
    pub fn build(self) -> Result<CoreConfig> {
        let object_storage = self
            .object_storage
            .ok_or_else(object_storage_missing_error)?;

        let document_store = self
            .document_store
            .ok_or_else(document_store_missing_error)?;

        let local_cache_store = match self.local_cache_store {
            Some(store) => store,
            None => provide_default_local_cache_store(self.cache_dir.as_ref())?,
        };

        let http_client = match self.http_client {
            Some(client) => Some(client),
            None => provide_default_http_client()?,
        };

        let config = CoreConfig {
            cache_dir: self.cache_dir,
            http_client,
            object_storage,
            document_store,
            local_cache_store,
            playback_adapter: self.playback_adapter,
            audio_sink: self.audio_sink,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
