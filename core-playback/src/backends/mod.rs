//! # Playback Backends
//!
//! The four strategies of the fallback chain, in chain order:
//!
//! | Strategy | Load | Play |
//! |----------|------|------|
//! | [`BufferedStreamStrategy`] | stream the body, buffer, probe | decode chunk by chunk into the sink |
//! | [`DecodeGraphStrategy`] | GET, decode the whole clip | write the PCM graph into the sink |
//! | [`NativeElementStrategy`] | prepare a remote source on the host element | play, poll state |
//! | [`BlobElementStrategy`] | GET into memory, prepare an in-memory source | play, poll state |
//!
//! The PCM strategies need an [`AudioSink`](bridge_traits::playback::AudioSink)
//! and an [`HttpClient`]; the element strategies need a
//! [`PlaybackAdapter`](bridge_traits::playback::PlaybackAdapter).
//! [`default_chain`] builds whichever of them the injected bridges allow.

mod blob_element;
mod buffered_stream;
mod decode_graph;
mod native_element;
mod pcm;

pub use blob_element::BlobElementStrategy;
pub use buffered_stream::BufferedStreamStrategy;
pub use decode_graph::DecodeGraphStrategy;
pub use native_element::NativeElementStrategy;

use crate::config::PlaybackConfig;
use crate::error::{BackendError, BackendResult, FailureKind};
use crate::traits::BackendStrategy;
use crate::types::BackendKind;
use bridge_traits::error::BridgeError;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_runtime::config::CoreConfig;
use std::sync::Arc;
use tracing::debug;

/// Build the strategy chain supported by the injected bridges.
///
/// Order is always A, B, C, D with unavailable strategies left out.
pub fn default_chain(core: &CoreConfig, config: &PlaybackConfig) -> Vec<Arc<dyn BackendStrategy>> {
    let mut chain: Vec<Arc<dyn BackendStrategy>> = Vec::with_capacity(BackendKind::CHAIN.len());

    if let (Some(http), Some(sink)) = (&core.http_client, &core.audio_sink) {
        chain.push(Arc::new(BufferedStreamStrategy::new(
            http.clone(),
            sink.clone(),
            config.decode_chunk_frames,
        )));
        chain.push(Arc::new(DecodeGraphStrategy::new(
            http.clone(),
            sink.clone(),
            config.decode_chunk_frames,
        )));
    }

    if let Some(adapter) = &core.playback_adapter {
        chain.push(Arc::new(NativeElementStrategy::new(
            adapter.clone(),
            config.state_poll_interval,
        )));
        if let Some(http) = &core.http_client {
            chain.push(Arc::new(BlobElementStrategy::new(
                http.clone(),
                adapter.clone(),
                config.state_poll_interval,
            )));
        }
    }

    debug!(
        backends = ?chain.iter().map(|s| s.kind()).collect::<Vec<_>>(),
        "Built playback strategy chain"
    );
    chain
}

/// GET `url` and insist on a 2xx answer.
pub(crate) async fn fetch(
    http: &Arc<dyn HttpClient>,
    backend: BackendKind,
    url: &str,
) -> BackendResult<HttpResponse> {
    let response = http
        .execute(HttpRequest::get(url))
        .await
        .map_err(|e| BackendError::from_bridge(backend, &e))?;

    let response = response
        .error_for_status()
        .map_err(|e| BackendError::from_bridge(backend, &e))?;

    if response.body.is_empty() {
        return Err(BackendError::new(
            backend,
            FailureKind::Decode,
            "response body is empty",
        ));
    }

    Ok(response)
}

pub(crate) fn content_type(response: &HttpResponse) -> Option<String> {
    response.header("content-type").map(str::to_string)
}

/// Classify a failure to start audible output. Unrecognized host errors
/// are treated as an autoplay refusal.
pub(crate) fn play_error(backend: BackendKind, error: &BridgeError) -> BackendError {
    let mut err = BackendError::from_bridge(backend, error);
    if err.kind == FailureKind::Other {
        err.kind = FailureKind::PlayBlocked;
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::HashMap;

    #[test]
    fn content_type_lookup_ignores_case() {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "audio/mpeg".to_string());
        let response = HttpResponse {
            status: 200,
            headers,
            body: Bytes::new(),
        };
        assert_eq!(content_type(&response).as_deref(), Some("audio/mpeg"));
    }

    #[test]
    fn unknown_play_failures_are_blocked() {
        let err = play_error(
            BackendKind::NativeElement,
            &BridgeError::OperationFailed("NotAllowedError: play() failed".into()),
        );
        assert_eq!(err.kind, FailureKind::PlayBlocked);

        let err = play_error(
            BackendKind::NativeElement,
            &BridgeError::OperationFailed("MEDIA_ERR_NETWORK: network".into()),
        );
        assert_eq!(err.kind, FailureKind::Network);
    }
}
