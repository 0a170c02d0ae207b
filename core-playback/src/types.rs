//! # Playback Types
//!
//! Values exchanged between the coordinator, its callers and the backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One playback technique in the fallback chain.
///
/// Variants are listed in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Download, buffer and decode incrementally into the PCM sink.
    BufferedStream,
    /// Fetch the whole clip, decode it to PCM up front, then render.
    DecodeGraph,
    /// Hand the remote URL to the host's native media element.
    NativeElement,
    /// Fetch into memory and hand the bytes to the native media element.
    BlobElement,
}

impl BackendKind {
    /// Fixed chain order.
    pub const CHAIN: [BackendKind; 4] = [
        BackendKind::BufferedStream,
        BackendKind::DecodeGraph,
        BackendKind::NativeElement,
        BackendKind::BlobElement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::BufferedStream => "buffered_stream",
            BackendKind::DecodeGraph => "decode_graph",
            BackendKind::NativeElement => "native_element",
            BackendKind::BlobElement => "blob_element",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A clip the caller wants preloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioItem {
    /// Short-lived signed link.
    pub url: String,
    /// Stable object-storage key used to mint a new `url`.
    pub storage_path: Option<String>,
    /// Script line the clip belongs to.
    pub line_index: Option<u32>,
}

impl AudioItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            storage_path: None,
            line_index: None,
        }
    }

    pub fn with_storage_path(mut self, storage_path: impl Into<String>) -> Self {
        self.storage_path = Some(storage_path.into());
        self
    }

    pub fn with_line_index(mut self, line_index: u32) -> Self {
        self.line_index = Some(line_index);
        self
    }
}

/// Script and user a batch of preloads belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshContext {
    pub script_id: String,
    pub user_id: String,
}

impl RefreshContext {
    pub fn new(script_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            script_id: script_id.into(),
            user_id: user_id.into(),
        }
    }
}

/// Everything needed to mint a fresh link and write it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub storage_path: String,
    pub script_id: String,
    pub user_id: String,
    pub line_index: u32,
}

impl RefreshRequest {
    pub fn new(
        storage_path: impl Into<String>,
        script_id: impl Into<String>,
        user_id: impl Into<String>,
        line_index: u32,
    ) -> Self {
        Self {
            storage_path: storage_path.into(),
            script_id: script_id.into(),
            user_id: user_id.into(),
            line_index,
        }
    }

    /// Combine a preload item with its batch context. `None` unless the item
    /// carries both a storage path and a line index.
    pub fn for_item(item: &AudioItem, context: &RefreshContext) -> Option<Self> {
        Some(Self {
            storage_path: item.storage_path.clone()?,
            script_id: context.script_id.clone(),
            user_id: context.user_id.clone(),
            line_index: item.line_index?,
        })
    }
}

/// Optional caller metadata for `play()`.
///
/// A fresh-link retry happens only when every field is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackMetadata {
    pub storage_path: Option<String>,
    pub script_id: Option<String>,
    pub user_id: Option<String>,
    pub line_index: Option<u32>,
}

impl PlaybackMetadata {
    /// Metadata with every refresh field set.
    pub fn complete(
        storage_path: impl Into<String>,
        script_id: impl Into<String>,
        user_id: impl Into<String>,
        line_index: u32,
    ) -> Self {
        Self {
            storage_path: Some(storage_path.into()),
            script_id: Some(script_id.into()),
            user_id: Some(user_id.into()),
            line_index: Some(line_index),
        }
    }

    pub fn refresh_request(&self) -> Option<RefreshRequest> {
        Some(RefreshRequest {
            storage_path: self.storage_path.clone()?,
            script_id: self.script_id.clone()?,
            user_id: self.user_id.clone()?,
            line_index: self.line_index?,
        })
    }
}

impl From<RefreshRequest> for PlaybackMetadata {
    fn from(request: RefreshRequest) -> Self {
        Self {
            storage_path: Some(request.storage_path),
            script_id: Some(request.script_id),
            user_id: Some(request.user_id),
            line_index: Some(request.line_index),
        }
    }
}

/// Identifier of one `play()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    /// Walking the preload cache or the strategy chain.
    Loading,
    Playing,
    Ended,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Ended | SessionState::Failed | SessionState::Cancelled
        )
    }
}

/// Result of a settled `play()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackOutcome {
    pub session: SessionId,
    /// `Ended` or `Cancelled`.
    pub state: SessionState,
    /// URL that played, which is the fresh link after a refresh.
    pub url: String,
    /// Backend that played the clip; `None` when cancelled first.
    pub backend: Option<BackendKind>,
    pub refreshed: bool,
}

impl PlaybackOutcome {
    pub fn is_cancelled(&self) -> bool {
        self.state == SessionState::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_order_is_fixed() {
        assert_eq!(BackendKind::CHAIN[0], BackendKind::BufferedStream);
        assert_eq!(BackendKind::CHAIN[3], BackendKind::BlobElement);
        assert_eq!(BackendKind::DecodeGraph.to_string(), "decode_graph");
    }

    #[test]
    fn refresh_request_needs_every_field() {
        let partial = PlaybackMetadata {
            storage_path: Some("p1".into()),
            script_id: Some("s1".into()),
            user_id: None,
            line_index: Some(3),
        };
        assert!(partial.refresh_request().is_none());

        let full = PlaybackMetadata::complete("p1", "s1", "u1", 3);
        assert_eq!(
            full.refresh_request(),
            Some(RefreshRequest::new("p1", "s1", "u1", 3))
        );
    }

    #[test]
    fn item_without_line_index_cannot_refresh() {
        let context = RefreshContext::new("s1", "u1");
        let item = AudioItem::new("https://a").with_storage_path("p1");
        assert!(RefreshRequest::for_item(&item, &context).is_none());

        let item = item.with_line_index(2);
        assert_eq!(
            RefreshRequest::for_item(&item, &context).map(|r| r.line_index),
            Some(2)
        );
    }

    #[test]
    fn terminal_states() {
        assert!(SessionState::Cancelled.is_terminal());
        assert!(!SessionState::Playing.is_terminal());
    }
}
