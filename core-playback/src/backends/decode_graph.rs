//! Strategy B: fetch, decode the whole clip, then render the PCM graph.

use crate::backends::pcm::SinkSlot;
use crate::backends::{content_type, fetch};
use crate::decoder::{ClipDecoder, DecodedClip, FormatDetector};
use crate::error::{BackendError, BackendResult, FailureKind};
use crate::traits::{BackendStrategy, ClipEnd, LoadedClip};
use crate::types::BackendKind;
use async_trait::async_trait;
use bridge_traits::http::HttpClient;
use bridge_traits::playback::AudioSink;
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const KIND: BackendKind = BackendKind::DecodeGraph;

/// Decodes the entire clip at load time so playback never waits on the codec.
pub struct DecodeGraphStrategy {
    http: Arc<dyn HttpClient>,
    sink: Arc<dyn AudioSink>,
    chunk_frames: usize,
}

impl DecodeGraphStrategy {
    pub fn new(http: Arc<dyn HttpClient>, sink: Arc<dyn AudioSink>, chunk_frames: usize) -> Self {
        Self {
            http,
            sink,
            chunk_frames: chunk_frames.max(1),
        }
    }
}

#[async_trait]
impl BackendStrategy for DecodeGraphStrategy {
    fn kind(&self) -> BackendKind {
        KIND
    }

    #[instrument(skip(self, url), fields(backend = %KIND, url = %redact_url(url)))]
    async fn load(&self, url: &str) -> BackendResult<Arc<dyn LoadedClip>> {
        let response = fetch(&self.http, KIND, url).await?;
        let hint = FormatDetector::hint_for(url, content_type(&response).as_deref());
        let chunk_frames = self.chunk_frames;
        let body = response.body;

        let decoded =
            tokio::task::spawn_blocking(move || ClipDecoder::open(body, hint)?.decode_all(chunk_frames))
                .await
                .map_err(|e| {
                    BackendError::new(KIND, FailureKind::Other, format!("Decode task failed: {}", e))
                })?
                .map_err(|e| BackendError::decode(KIND, &e))?;

        debug!(
            frames = decoded.total_frames,
            duration = ?decoded.duration(),
            "Decoded clip graph"
        );

        Ok(Arc::new(GraphClip {
            pcm: Mutex::new(Some(Arc::new(decoded))),
            output: SinkSlot::new(self.sink.clone(), KIND),
        }))
    }
}

struct GraphClip {
    /// `None` once released.
    pcm: Mutex<Option<Arc<DecodedClip>>>,
    output: SinkSlot,
}

#[async_trait]
impl LoadedClip for GraphClip {
    fn backend(&self) -> BackendKind {
        KIND
    }

    async fn play(&self, cancel: CancellationToken) -> BackendResult<ClipEnd> {
        let pcm = self
            .pcm
            .lock()
            .clone()
            .ok_or_else(|| BackendError::new(KIND, FailureKind::Other, "clip was released"))?;

        let node = self.output.open(pcm.format.clone()).await?;

        for chunk in &pcm.chunks {
            if cancel.is_cancelled() {
                return Ok(ClipEnd::Cancelled);
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(ClipEnd::Cancelled),
                written = self.output.write(node, chunk.clone()) => written?,
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(ClipEnd::Cancelled),
            drained = self.output.drain(node) => drained?,
        }

        self.output.close().await;
        Ok(ClipEnd::Finished)
    }

    async fn halt(&self) {
        self.output.close().await;
    }

    async fn release(&self) {
        self.output.close().await;
        self.pcm.lock().take();
    }
}
