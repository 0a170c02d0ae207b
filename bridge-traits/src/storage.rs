//! Storage Abstractions
//!
//! Contracts for the three storage collaborators of the playback core:
//! object storage (signed URL minting), the per-user script document store,
//! and the local key-value cache used to warm future sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Prefix of the local cache key holding a script's line records.
pub const SCRIPT_CACHE_PREFIX: &str = "script-cache";

/// Build the local cache key for a user's script: `script-cache:<user>:<script>`.
pub fn script_cache_key(user_id: &str, script_id: &str) -> String {
    format!("{}:{}:{}", SCRIPT_CACHE_PREFIX, user_id, script_id)
}

/// One line of a persisted script.
///
/// Only the audio fields are owned by the playback core. Every other field
/// written by the script pipeline is preserved verbatim in `extra` so a
/// read-modify-write cycle never drops data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRecord {
    /// Stable position of the line in the script.
    pub index: u32,
    /// Signed URL of the generated clip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_url: Option<String>,
    /// When `tts_url` was last replaced by a freshly minted link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_url_refreshed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LineRecord {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            tts_url: None,
            tts_url_refreshed_at: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_tts_url(mut self, url: impl Into<String>) -> Self {
        self.tts_url = Some(url.into());
        self
    }
}

/// Per-user, per-script document as held by the document store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptDocument {
    #[serde(default)]
    pub script: Vec<LineRecord>,
}

impl ScriptDocument {
    pub fn new(script: Vec<LineRecord>) -> Self {
        Self { script }
    }

    /// Mutable access to the line with the given stable index.
    pub fn line_mut(&mut self, index: u32) -> Option<&mut LineRecord> {
        self.script.iter_mut().find(|line| line.index == index)
    }
}

/// Object storage trait
///
/// Mints a signed, time-limited download URL for a stable storage path. The
/// expiry of the returned link is chosen by the storage backend, not by the
/// application.
///
/// # Errors
///
/// Implementations should return [`BridgeError::NotFound`](crate::BridgeError::NotFound)
/// for missing objects and [`BridgeError::HttpStatus`](crate::BridgeError::HttpStatus)
/// for authorization failures.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Return a currently valid URL for `storage_path`.
    async fn get_download_url(&self, storage_path: &str) -> Result<String>;
}

/// Script document store trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::DocumentStore;
///
/// async fn line_count(store: &dyn DocumentStore) -> Result<usize> {
///     let doc = store.get_document("user-1", "script-1").await?;
///     Ok(doc.script.len())
/// }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load the document for a user's script.
    async fn get_document(&self, user_id: &str, script_id: &str) -> Result<ScriptDocument>;

    /// Replace the line records of a user's script.
    async fn put_document(
        &self,
        user_id: &str,
        script_id: &str,
        records: Vec<LineRecord>,
    ) -> Result<()>;
}

/// Local key-value cache trait
///
/// Abstracts platform-specific local storage:
/// - Desktop: JSON file in the user cache directory
/// - Web: localStorage / IndexedDB
/// - Mobile: UserDefaults / SharedPreferences
#[async_trait]
pub trait LocalCacheStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a value
    async fn delete(&self, key: &str) -> Result<()>;
}
