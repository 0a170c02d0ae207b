//! Strategy A: buffered streaming decode into the PCM sink.

use crate::backends::pcm::SinkSlot;
use crate::decoder::{ClipDecoder, FormatDetector};
use crate::error::{BackendError, BackendResult, FailureKind};
use crate::traits::{BackendStrategy, ClipEnd, LoadedClip};
use crate::types::BackendKind;
use async_trait::async_trait;
use bridge_traits::http::HttpClient;
use bridge_traits::playback::AudioSink;
use bytes::Bytes;
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const KIND: BackendKind = BackendKind::BufferedStream;

/// Streams the clip body, buffers it and decodes it incrementally on play.
pub struct BufferedStreamStrategy {
    http: Arc<dyn HttpClient>,
    sink: Arc<dyn AudioSink>,
    chunk_frames: usize,
}

impl BufferedStreamStrategy {
    pub fn new(http: Arc<dyn HttpClient>, sink: Arc<dyn AudioSink>, chunk_frames: usize) -> Self {
        Self {
            http,
            sink,
            chunk_frames: chunk_frames.max(1),
        }
    }
}

#[async_trait]
impl BackendStrategy for BufferedStreamStrategy {
    fn kind(&self) -> BackendKind {
        KIND
    }

    #[instrument(skip(self, url), fields(backend = %KIND, url = %redact_url(url)))]
    async fn load(&self, url: &str) -> BackendResult<Arc<dyn LoadedClip>> {
        let mut reader = self
            .http
            .download_stream(url.to_string())
            .await
            .map_err(|e| BackendError::from_bridge(KIND, &e))?;

        let mut body = Vec::new();
        reader.read_to_end(&mut body).await.map_err(|e| {
            BackendError::new(KIND, FailureKind::Network, format!("Stream read failed: {}", e))
        })?;

        if body.is_empty() {
            return Err(BackendError::new(KIND, FailureKind::Decode, "stream was empty"));
        }

        let data = Bytes::from(body);
        let hint = FormatDetector::hint_for(url, None);
        let probed = data.clone();
        let format = off_executor(move || Ok(ClipDecoder::open(probed, hint)?.format().clone()))
            .await?;
        debug!(bytes = data.len(), ?format, "Buffered clip");

        Ok(Arc::new(StreamedClip {
            url: url.to_string(),
            data: Mutex::new(Some(data)),
            chunk_frames: self.chunk_frames,
            output: SinkSlot::new(self.sink.clone(), KIND),
        }))
    }
}

/// Run probing or decoding on the blocking pool.
async fn off_executor<T, F>(work: F) -> BackendResult<T>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| BackendError::new(KIND, FailureKind::Other, format!("Decode task failed: {}", e)))?
        .map_err(|e| BackendError::decode(KIND, &e))
}

struct StreamedClip {
    url: String,
    /// `None` once released.
    data: Mutex<Option<Bytes>>,
    chunk_frames: usize,
    output: SinkSlot,
}

#[async_trait]
impl LoadedClip for StreamedClip {
    fn backend(&self) -> BackendKind {
        KIND
    }

    async fn play(&self, cancel: CancellationToken) -> BackendResult<ClipEnd> {
        let data = self
            .data
            .lock()
            .clone()
            .ok_or_else(|| BackendError::new(KIND, FailureKind::Other, "clip was released"))?;

        let hint = FormatDetector::hint_for(&self.url, None);
        let mut decoder = off_executor(move || ClipDecoder::open(data, hint)).await?;
        let node = self.output.open(decoder.format().clone()).await?;

        let chunk_frames = self.chunk_frames;
        loop {
            if cancel.is_cancelled() {
                return Ok(ClipEnd::Cancelled);
            }

            // The decoder travels to the blocking pool and back with each chunk.
            let (returned, chunk) = off_executor(move || {
                let chunk = decoder.next_chunk(chunk_frames)?;
                Ok((decoder, chunk))
            })
            .await?;
            decoder = returned;
            let Some(chunk) = chunk else {
                break;
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(ClipEnd::Cancelled),
                written = self.output.write(node, chunk) => written?,
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
        self.data.lock().take();
    }
}
