//! # Fresh-Link Service
//!
//! Mints replacement signed URLs for stable storage paths.
//!
//! - Minted links are cached per path for `ttl` and reused until they expire.
//! - Concurrent calls for the same path share a single object-storage fetch.
//! - After each mint the new link is written back to the user's script
//!   document and mirrored into the local cache store. That write runs in a
//!   spawned task; its outcome is reported through the event bus and never
//!   reaches the caller.

use crate::error::{PlaybackError, Result};
use crate::types::RefreshRequest;
use bridge_traits::storage::{script_cache_key, DocumentStore, LocalCacheStore, ObjectStorage};
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_runtime::events::{CoreEvent, EventBus, LinkEvent};
use core_runtime::logging::redact_url;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Callback run synchronously after every successful mint with the request
/// and the new URL.
pub type UrlRefreshedListener = Arc<dyn Fn(&RefreshRequest, &str) + Send + Sync>;

#[derive(Debug, Clone)]
struct LinkEntry {
    url: String,
    minted_at: DateTime<Utc>,
}

/// Writes refreshed links back to durable storage.
#[derive(Clone)]
struct LinkPersister {
    documents: Arc<dyn DocumentStore>,
    local_cache: Arc<dyn LocalCacheStore>,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
}

impl LinkPersister {
    async fn persist(&self, request: &RefreshRequest, url: &str) -> Result<()> {
        let mut document = self
            .documents
            .get_document(&request.user_id, &request.script_id)
            .await
            .map_err(|e| {
                PlaybackError::Persistence(format!(
                    "Failed to load script {}: {}",
                    request.script_id, e
                ))
            })?;

        let line = document.line_mut(request.line_index).ok_or_else(|| {
            PlaybackError::Persistence(format!(
                "Script {} has no line {}",
                request.script_id, request.line_index
            ))
        })?;
        line.tts_url = Some(url.to_string());
        line.tts_url_refreshed_at = Some(self.clock.now());

        self.documents
            .put_document(&request.user_id, &request.script_id, document.script.clone())
            .await
            .map_err(|e| {
                PlaybackError::Persistence(format!(
                    "Failed to write script {}: {}",
                    request.script_id, e
                ))
            })?;

        let mirror = serde_json::to_string(&document.script)
            .map_err(|e| PlaybackError::Persistence(format!("Failed to encode lines: {}", e)))?;
        self.local_cache
            .set_string(&script_cache_key(&request.user_id, &request.script_id), &mirror)
            .await
            .map_err(|e| {
                PlaybackError::Persistence(format!("Failed to update local cache: {}", e))
            })?;

        Ok(())
    }

    fn spawn(&self, request: RefreshRequest, url: String) -> JoinHandle<()> {
        let persister = self.clone();
        tokio::spawn(async move {
            let event = match persister.persist(&request, &url).await {
                Ok(()) => {
                    info!(
                        script_id = %request.script_id,
                        line_index = request.line_index,
                        "Persisted refreshed link"
                    );
                    LinkEvent::Persisted {
                        script_id: request.script_id.clone(),
                        line_index: request.line_index,
                    }
                }
                Err(e) => {
                    warn!(
                        script_id = %request.script_id,
                        line_index = request.line_index,
                        error = %e,
                        "Background link persistence failed"
                    );
                    LinkEvent::PersistFailed {
                        script_id: request.script_id.clone(),
                        line_index: request.line_index,
                        message: e.to_string(),
                    }
                }
            };

            if let Some(bus) = &persister.event_bus {
                let _ = bus.emit(CoreEvent::Link(event));
            }
        })
    }
}

/// Signed-link refresher with a per-path cache.
pub struct FreshLinkService {
    storage: Arc<dyn ObjectStorage>,
    persister: LinkPersister,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    persist_enabled: bool,
    entries: RwLock<HashMap<String, LinkEntry>>,
    /// One lock per storage path serializes fetches for that path.
    fetch_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    listener: RwLock<Option<UrlRefreshedListener>>,
}

impl FreshLinkService {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        documents: Arc<dyn DocumentStore>,
        local_cache: Arc<dyn LocalCacheStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            storage,
            persister: LinkPersister {
                documents,
                local_cache,
                clock: clock.clone(),
                event_bus: None,
            },
            clock,
            ttl: chrono::Duration::from_std(ttl)
                .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100)),
            persist_enabled: true,
            entries: RwLock::new(HashMap::new()),
            fetch_locks: Mutex::new(HashMap::new()),
            listener: RwLock::new(None),
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.persister.event_bus = Some(event_bus);
        self
    }

    /// Skip writing minted links back to durable storage.
    pub fn with_persistence(mut self, enabled: bool) -> Self {
        self.persist_enabled = enabled;
        self
    }

    /// Register the listener invoked after every mint, replacing any previous
    /// one.
    pub fn set_on_url_refreshed<F>(&self, listener: F)
    where
        F: Fn(&RefreshRequest, &str) + Send + Sync + 'static,
    {
        *self.listener.write() = Some(Arc::new(listener));
    }

    pub fn clear_on_url_refreshed(&self) {
        self.listener.write().take();
    }

    fn is_expired(&self, entry: &LinkEntry, now: DateTime<Utc>) -> bool {
        now - entry.minted_at >= self.ttl
    }

    /// Live cached link for `storage_path`. Expired entries are dropped.
    pub fn cached_url(&self, storage_path: &str) -> Option<String> {
        let now = self.clock.now();
        {
            let entries = self.entries.read();
            match entries.get(storage_path) {
                None => return None,
                Some(entry) if !self.is_expired(entry, now) => return Some(entry.url.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write();
        let expired = entries
            .get(storage_path)
            .map(|entry| self.is_expired(entry, now))
            .unwrap_or(false);
        if expired {
            debug!(storage_path, "Cached link expired");
            entries.remove(storage_path);
            return None;
        }
        entries.get(storage_path).map(|entry| entry.url.clone())
    }

    /// Return a currently valid URL for `request.storage_path`.
    ///
    /// Serves the cache when possible; otherwise mints a new link, caches it,
    /// notifies the listener, emits [`LinkEvent::Refreshed`] and schedules
    /// background persistence.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::LinkUnavailable`] when object storage cannot mint a
    /// link. Persistence failures are never returned.
    #[instrument(skip(self, request), fields(storage_path = %request.storage_path))]
    pub async fn refresh_url(&self, request: &RefreshRequest) -> Result<String> {
        if let Some(url) = self.cached_url(&request.storage_path) {
            debug!("Serving cached fresh link");
            return Ok(url);
        }

        let fetch_lock = {
            let mut locks = self.fetch_locks.lock().await;
            locks
                .entry(request.storage_path.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = fetch_lock.lock().await;
        let minted = self.mint(request).await;

        // Only the map and this call still hold the lock: nobody waits on it.
        let mut locks = self.fetch_locks.lock().await;
        if Arc::strong_count(&fetch_lock) == 2 {
            locks.remove(&request.storage_path);
        }
        minted
    }

    /// Mint, cache and announce a link. Runs under the path's fetch lock.
    async fn mint(&self, request: &RefreshRequest) -> Result<String> {
        // Another caller may have minted while we waited.
        if let Some(url) = self.cached_url(&request.storage_path) {
            debug!("Fresh link minted by a concurrent caller");
            return Ok(url);
        }

        let url = self
            .storage
            .get_download_url(&request.storage_path)
            .await
            .map_err(|source| {
                warn!(error = %source, "Object storage refused to mint a link");
                PlaybackError::LinkUnavailable {
                    storage_path: request.storage_path.clone(),
                    source,
                }
            })?;

        self.entries.write().insert(
            request.storage_path.clone(),
            LinkEntry {
                url: url.clone(),
                minted_at: self.clock.now(),
            },
        );
        info!(url = %redact_url(&url), "Minted fresh link");

        let listener = self.listener.read().clone();
        if let Some(listener) = listener {
            listener(request, &url);
        }

        if let Some(bus) = &self.persister.event_bus {
            let _ = bus.emit(CoreEvent::Link(LinkEvent::Refreshed {
                storage_path: request.storage_path.clone(),
                url: url.clone(),
            }));
        }

        if self.persist_enabled {
            self.persister.spawn(request.clone(), url.clone());
        }

        Ok(url)
    }

    /// Write `url` into the request's script line and local cache mirror,
    /// waiting for the result.
    pub async fn persist_refreshed_url(&self, request: &RefreshRequest, url: &str) -> Result<()> {
        self.persister.persist(request, url).await
    }

    /// Drop every cached link.
    pub fn clear(&self) {
        let count = {
            let mut entries = self.entries.write();
            let count = entries.len();
            entries.clear();
            count
        };
        debug!(count, "Cleared fresh link cache");
    }

    /// Remove expired links and idle fetch locks. Returns how many links
    /// were removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let removed = {
            let mut entries = self.entries.write();
            let before = entries.len();
            entries.retain(|_, entry| !self.is_expired(entry, now));
            before - entries.len()
        };

        self.fetch_locks
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);

        if removed > 0 {
            debug!(removed, "Swept expired fresh links");
        }
        removed
    }

    /// Number of cached links, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
