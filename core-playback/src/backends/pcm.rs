//! Sink session bookkeeping shared by the PCM backends.

use crate::backends::play_error;
use crate::error::{BackendError, BackendResult};
use crate::types::BackendKind;
use bridge_traits::playback::{AudioFormat, AudioFrameChunk, AudioSink, PlaybackSessionId};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// One open output node at most per clip.
pub(crate) struct SinkSlot {
    sink: Arc<dyn AudioSink>,
    backend: BackendKind,
    session: Mutex<Option<PlaybackSessionId>>,
}

impl SinkSlot {
    pub(crate) fn new(sink: Arc<dyn AudioSink>, backend: BackendKind) -> Self {
        Self {
            sink,
            backend,
            session: Mutex::new(None),
        }
    }

    /// Open a node for `format`, closing any node left from a previous play.
    pub(crate) async fn open(&self, format: AudioFormat) -> BackendResult<PlaybackSessionId> {
        let id = self
            .sink
            .open(format)
            .await
            .map_err(|e| play_error(self.backend, &e))?;

        let previous = self.session.lock().replace(id);
        if let Some(previous) = previous {
            self.close_node(previous).await;
        }
        Ok(id)
    }

    pub(crate) async fn write(
        &self,
        id: PlaybackSessionId,
        chunk: AudioFrameChunk,
    ) -> BackendResult<()> {
        self.sink
            .write(id, chunk)
            .await
            .map_err(|e| BackendError::from_bridge(self.backend, &e))
    }

    pub(crate) async fn drain(&self, id: PlaybackSessionId) -> BackendResult<()> {
        self.sink
            .drain(id)
            .await
            .map_err(|e| BackendError::from_bridge(self.backend, &e))
    }

    /// Close the open node, if any.
    pub(crate) async fn close(&self) {
        let current = self.session.lock().take();
        if let Some(id) = current {
            self.close_node(id).await;
        }
    }

    async fn close_node(&self, id: PlaybackSessionId) {
        match self.sink.close(id).await {
            Ok(()) => debug!(backend = %self.backend, sink = %id, "Closed sink node"),
            Err(e) => warn!(backend = %self.backend, sink = %id, error = %e, "Failed to close sink node"),
        }
    }
}
