//! HTTP bridge used to fetch clip bytes and to call signing endpoints.
//!
//! The host supplies the transport. Clip fetches only ever `GET`; signing
//! endpoints take a JSON `POST`.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Body reader handed out by [`HttpClient::download_stream`].
pub type DynAsyncRead = dyn tokio::io::AsyncRead + Send + Unpin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    /// Per-request deadline; the client default applies when unset.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        let value = format!("Bearer {}", token.into());
        self.header("Authorization", value)
    }

    /// Serialize `body` as the JSON payload.
    pub fn json<T: Serialize>(self, body: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(body)?;
        let mut request = self.header("Content-Type", "application/json");
        request.body = Some(Bytes::from(encoded));
        Ok(request)
    }

    pub fn timeout(mut self, deadline: Duration) -> Self {
        self.timeout = Some(deadline);
        self
    }
}

/// A fully buffered response. Non-2xx statuses are not errors at this level.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| BridgeError::Serialization(format!("response body: {}", e)))
    }

    /// Turn a non-2xx response into [`BridgeError::HttpStatus`] carrying the
    /// trimmed body text, which signing services use for the reason.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            let reason = String::from_utf8_lossy(&self.body).trim().to_string();
            Err(BridgeError::http_status(self.status, reason))
        }
    }
}

/// Host HTTP transport.
///
/// [`execute`](HttpClient::execute) returns every response it receives,
/// whatever the status. [`download_stream`](HttpClient::download_stream)
/// checks the status first and fails with [`BridgeError::HttpStatus`] before
/// handing out a reader, so streaming callers can classify expired links.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send a request and buffer the whole body.
    ///
    /// Errors are transport-level only: DNS, TLS, connection resets and
    /// timeouts.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Open a streaming `GET` of `url`.
    async fn download_stream(&self, url: String) -> Result<Box<DynAsyncRead>>;
}
