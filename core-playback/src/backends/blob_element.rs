//! Strategy D: fetch into memory and play the bytes on the native element.
//!
//! Sidesteps hosts whose media element cannot fetch the remote URL itself
//! (CORS, redirects, range-request quirks).

use crate::backends::native_element::ElementClip;
use crate::backends::{content_type, fetch};
use crate::decoder::FormatDetector;
use crate::error::BackendResult;
use crate::traits::{BackendStrategy, LoadedClip};
use crate::types::BackendKind;
use async_trait::async_trait;
use bridge_traits::http::HttpClient;
use bridge_traits::playback::{AudioSource, PlaybackAdapter};
use core_runtime::logging::redact_url;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const KIND: BackendKind = BackendKind::BlobElement;

pub struct BlobElementStrategy {
    http: Arc<dyn HttpClient>,
    adapter: Arc<dyn PlaybackAdapter>,
    poll_interval: Duration,
}

impl BlobElementStrategy {
    pub fn new(
        http: Arc<dyn HttpClient>,
        adapter: Arc<dyn PlaybackAdapter>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            http,
            adapter,
            poll_interval,
        }
    }
}

#[async_trait]
impl BackendStrategy for BlobElementStrategy {
    fn kind(&self) -> BackendKind {
        KIND
    }

    #[instrument(skip(self, url), fields(backend = %KIND, url = %redact_url(url)))]
    async fn load(&self, url: &str) -> BackendResult<Arc<dyn LoadedClip>> {
        let response = fetch(&self.http, KIND, url).await?;
        let mime_type = content_type(&response)
            .or_else(|| FormatDetector::mime_type_for_url(url).map(str::to_string));

        debug!(bytes = response.body.len(), ?mime_type, "Fetched clip into memory");

        let source = AudioSource::MemoryBuffer {
            data: response.body,
            mime_type,
        };
        ElementClip::prepare(self.adapter.clone(), KIND, source, self.poll_interval).await
    }
}
