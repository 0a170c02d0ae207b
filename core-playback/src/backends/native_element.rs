//! Strategy C: host-native media element fed with the remote URL.

use crate::backends::play_error;
use crate::classifier::classify_message;
use crate::error::{BackendError, BackendResult, FailureKind};
use crate::traits::{BackendStrategy, ClipEnd, LoadedClip};
use crate::types::BackendKind;
use async_trait::async_trait;
use bridge_traits::playback::{
    AudioSource, PlaybackAdapter, PlaybackRequest, PlaybackSessionId, PlaybackState,
};
use core_runtime::logging::redact_url;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

const KIND: BackendKind = BackendKind::NativeElement;

/// Lets the host fetch and decode the URL itself.
pub struct NativeElementStrategy {
    adapter: Arc<dyn PlaybackAdapter>,
    poll_interval: Duration,
}

impl NativeElementStrategy {
    pub fn new(adapter: Arc<dyn PlaybackAdapter>, poll_interval: Duration) -> Self {
        Self {
            adapter,
            poll_interval,
        }
    }
}

#[async_trait]
impl BackendStrategy for NativeElementStrategy {
    fn kind(&self) -> BackendKind {
        KIND
    }

    #[instrument(skip(self, url), fields(backend = %KIND, url = %redact_url(url)))]
    async fn load(&self, url: &str) -> BackendResult<Arc<dyn LoadedClip>> {
        ElementClip::prepare(
            self.adapter.clone(),
            KIND,
            AudioSource::remote(url),
            self.poll_interval,
        )
        .await
    }
}

/// A prepared session on the host's media element. Shared by the native and
/// blob strategies.
pub(crate) struct ElementClip {
    adapter: Arc<dyn PlaybackAdapter>,
    backend: BackendKind,
    session: PlaybackSessionId,
    poll_interval: Duration,
    played: AtomicBool,
    released: AtomicBool,
}

impl ElementClip {
    /// Prepare `source` and fail early if the host already reports an error.
    pub(crate) async fn prepare(
        adapter: Arc<dyn PlaybackAdapter>,
        backend: BackendKind,
        source: AudioSource,
        poll_interval: Duration,
    ) -> BackendResult<Arc<dyn LoadedClip>> {
        let session = adapter
            .prepare(PlaybackRequest::new(source))
            .await
            .map_err(|e| BackendError::from_bridge(backend, &e))?;

        let failure = match adapter.state(session).await {
            Ok(PlaybackState::Error { message }) => {
                Some(BackendError::new(backend, classify_message(&message), message))
            }
            Ok(_) => None,
            Err(e) => Some(BackendError::from_bridge(backend, &e)),
        };

        if let Some(err) = failure {
            if let Err(e) = adapter.unload(session).await {
                warn!(backend = %backend, error = %e, "Failed to unload rejected element");
            }
            return Err(err);
        }

        debug!(backend = %backend, session = %session, "Element prepared");
        Ok(Arc::new(Self {
            adapter,
            backend,
            session,
            poll_interval,
            played: AtomicBool::new(false),
            released: AtomicBool::new(false),
        }))
    }
}

#[async_trait]
impl LoadedClip for ElementClip {
    fn backend(&self) -> BackendKind {
        self.backend
    }

    async fn play(&self, cancel: CancellationToken) -> BackendResult<ClipEnd> {
        if self.released.load(Ordering::SeqCst) {
            return Err(BackendError::new(
                self.backend,
                FailureKind::Other,
                "clip was released",
            ));
        }

        // Rewind a clip that already played.
        if self.played.swap(true, Ordering::SeqCst) {
            if let Err(e) = self.adapter.stop(self.session).await {
                warn!(backend = %self.backend, error = %e, "Failed to rewind element");
            }
        }

        self.adapter
            .play(self.session)
            .await
            .map_err(|e| play_error(self.backend, &e))?;

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(ClipEnd::Cancelled),
                _ = ticker.tick() => {}
            }

            let state = self
                .adapter
                .state(self.session)
                .await
                .map_err(|e| BackendError::from_bridge(self.backend, &e))?;

            if !state.is_terminal() {
                continue;
            }
            return match state {
                PlaybackState::Error { message } => Err(BackendError::new(
                    self.backend,
                    classify_message(&message),
                    message,
                )),
                PlaybackState::Stopped => Ok(ClipEnd::Cancelled),
                _ => Ok(ClipEnd::Finished),
            };
        }
    }

    async fn halt(&self) {
        if self.released.load(Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.adapter.stop(self.session).await {
            warn!(backend = %self.backend, error = %e, "Failed to stop element");
        }
    }

    async fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.adapter.unload(self.session).await {
            Ok(()) => debug!(backend = %self.backend, session = %self.session, "Element unloaded"),
            Err(e) => warn!(backend = %self.backend, error = %e, "Failed to unload element"),
        }
    }
}
