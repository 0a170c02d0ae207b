//! # Backend Strategy Traits
//!
//! A [`BackendStrategy`] is one technique for turning a URL into sound. It
//! loads a clip without making sound and hands back a [`LoadedClip`] the
//! coordinator can play, halt and release.

use crate::error::BackendResult;
use crate::types::BackendKind;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How a clip's playback ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipEnd {
    /// The clip played to its end.
    Finished,
    /// Playback stopped early because the token was cancelled or the host
    /// stopped the element.
    Cancelled,
}

/// A single playback technique.
///
/// Implementations must be cheap to call repeatedly; every `load` returns a
/// fresh, independent clip.
#[async_trait]
pub trait BackendStrategy: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Load `url` up to the point where playback can start. No sound is made.
    async fn load(&self, url: &str) -> BackendResult<Arc<dyn LoadedClip>>;
}

/// A clip loaded by a strategy.
///
/// A clip may be played more than once (it can sit in the preload cache).
/// `halt` silences it and keeps its resources; `release` frees them. Both
/// are idempotent and never fail; teardown problems are logged.
#[async_trait]
pub trait LoadedClip: Send + Sync {
    fn backend(&self) -> BackendKind;

    /// Play from the start until the clip ends, fails or `cancel` fires.
    async fn play(&self, cancel: CancellationToken) -> BackendResult<ClipEnd>;

    /// Stop sound, keep the clip loaded.
    async fn halt(&self);

    /// Free everything the clip holds. Later `play` calls fail.
    async fn release(&self);
}

/// Halt then release, in that order.
pub async fn teardown(clip: &dyn LoadedClip) {
    clip.halt().await;
    clip.release().await;
}
