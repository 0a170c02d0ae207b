//! # Preload Cache
//!
//! Loaded-but-not-playing clips keyed by URL.
//!
//! Entries expire `ttl` after they were loaded. Expiry is checked on access
//! against the injected [`Clock`]; expired entries are removed at that point
//! and parked until the owner collects them with [`PreloadCache::take_evicted`]
//! and releases their clips.

use crate::traits::LoadedClip;
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_runtime::logging::redact_url;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A loaded clip waiting to be played.
#[derive(Clone)]
pub struct PreloadedHandle {
    pub url: String,
    pub clip: Arc<dyn LoadedClip>,
    pub preloaded_at: DateTime<Utc>,
}

impl std::fmt::Debug for PreloadedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreloadedHandle")
            .field("url", &self.url)
            .field("backend", &self.clip.backend())
            .field("preloaded_at", &self.preloaded_at)
            .finish()
    }
}

pub struct PreloadCache {
    entries: RwLock<HashMap<String, PreloadedHandle>>,
    evicted: Mutex<Vec<PreloadedHandle>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl PreloadCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            evicted: Mutex::new(Vec::new()),
            ttl: chrono::Duration::from_std(ttl)
                .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100)),
            clock,
        }
    }

    fn is_expired(&self, handle: &PreloadedHandle, now: DateTime<Utc>) -> bool {
        now - handle.preloaded_at >= self.ttl
    }

    /// Live clip for `url`. An expired entry is evicted and reported absent.
    pub fn get(&self, url: &str) -> Option<Arc<dyn LoadedClip>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read();
            match entries.get(url) {
                None => return None,
                Some(handle) if !self.is_expired(handle, now) => {
                    return Some(handle.clip.clone());
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write();
        // Re-check under the write lock; the entry may have been replaced.
        let expired = match entries.get(url) {
            None => return None,
            Some(handle) => self.is_expired(handle, now),
        };
        if !expired {
            return entries.get(url).map(|handle| handle.clip.clone());
        }

        if let Some(handle) = entries.remove(url) {
            debug!(url = %redact_url(&handle.url), "Preloaded handle expired");
            self.evicted.lock().push(handle);
        }
        None
    }

    /// Whether a live entry exists for `url`.
    pub fn contains(&self, url: &str) -> bool {
        self.get(url).is_some()
    }

    /// Insert or replace the entry for `url`, stamped with the current time.
    /// Returns the replaced entry.
    pub fn insert(
        &self,
        url: impl Into<String>,
        clip: Arc<dyn LoadedClip>,
    ) -> Option<PreloadedHandle> {
        let url = url.into();
        let handle = PreloadedHandle {
            url: url.clone(),
            clip,
            preloaded_at: self.clock.now(),
        };
        self.entries.write().insert(url, handle)
    }

    pub fn remove(&self, url: &str) -> Option<PreloadedHandle> {
        self.entries.write().remove(url)
    }

    /// Remove and return the named entries, or every entry when `urls` is
    /// `None`.
    pub fn drain(&self, urls: Option<&[String]>) -> Vec<PreloadedHandle> {
        let mut entries = self.entries.write();
        let mut drained: Vec<PreloadedHandle> = match urls {
            None => entries.drain().map(|(_, handle)| handle).collect(),
            Some(urls) => urls.iter().filter_map(|url| entries.remove(url)).collect(),
        };
        drop(entries);

        drained.append(&mut self.evicted.lock());
        drained
    }

    /// Remove every expired entry and return it together with anything
    /// evicted lazily since the last collection.
    pub fn sweep_expired(&self) -> Vec<PreloadedHandle> {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, handle)| self.is_expired(handle, now))
            .map(|(url, _)| url.clone())
            .collect();

        let mut swept: Vec<PreloadedHandle> = expired
            .iter()
            .filter_map(|url| entries.remove(url))
            .collect();
        drop(entries);

        if !swept.is_empty() {
            debug!(count = swept.len(), "Swept expired preloads");
        }
        swept.append(&mut self.evicted.lock());
        swept
    }

    /// Entries evicted on access since the last call.
    pub fn take_evicted(&self) -> Vec<PreloadedHandle> {
        std::mem::take(&mut *self.evicted.lock())
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
