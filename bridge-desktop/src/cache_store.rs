//! Local Cache Store backed by a JSON file

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::LocalCacheStore,
};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const DEFAULT_FILE_NAME: &str = "local-cache.json";

/// JSON-file local cache store
///
/// Holds every key in memory and rewrites the whole file on each mutation.
/// The file is written to a sibling temp path and renamed into place so a
/// crash mid-write never leaves a truncated cache behind.
pub struct JsonFileCacheStore {
    path: PathBuf,
    entries: Mutex<Option<HashMap<String, String>>>,
}

impl JsonFileCacheStore {
    /// Store under the platform cache directory.
    pub fn new() -> Self {
        let dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("rehearsal-audio-core");
        Self::with_path(dir.join(DEFAULT_FILE_NAME))
    }

    /// Store at an explicit file path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            entries: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, String>> {
        match fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => Ok(map),
                Err(e) => {
                    warn!(path = ?self.path, error = %e, "Discarding unreadable cache file");
                    Ok(HashMap::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    /// The in-memory map, read from disk on first use.
    async fn loaded<'a>(
        &self,
        slot: &'a mut Option<HashMap<String, String>>,
    ) -> Result<&'a mut HashMap<String, String>> {
        if slot.is_none() {
            *slot = Some(self.load().await?);
        }
        Ok(slot.get_or_insert_with(HashMap::new))
    }

    /// Write `entries` to disk. Callers swap them into memory only on success.
    async fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let data = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!(path = ?self.path, keys = entries.len(), "Persisted local cache");
        Ok(())
    }
}

impl Default for JsonFileCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalCacheStore for JsonFileCacheStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self.entries.lock().await;
        let entries = self.loaded(&mut guard).await?;

        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let mut guard = self.entries.lock().await;
        let entries = self.loaded(&mut guard).await?;
        Ok(entries.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut guard = self.entries.lock().await;
        let entries = self.loaded(&mut guard).await?;
        if !entries.contains_key(key) {
            return Ok(());
        }

        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }
}
