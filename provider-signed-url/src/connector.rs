//! Signing endpoint connector
//!
//! Implements the `ObjectStorage` trait over an HTTP signing API.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::storage::ObjectStorage;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::SignedUrlError;
use crate::types::{ApiErrorBody, SignRequest, SignResponse};

/// Default lifetime requested for signed links.
const DEFAULT_EXPIRES_IN: Duration = Duration::from_secs(60 * 60);

/// Maximum attempts for rate-limited or 5xx responses.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Object storage connector that mints signed download URLs.
///
/// Sends `POST {base_url}/object/sign/{bucket}/{path}` with the requested
/// lifetime and returns the absolute URL from the response.
///
/// # Example
///
/// ```ignore
/// use provider_signed_url::SignedUrlStorage;
/// use bridge_traits::storage::ObjectStorage;
///
/// let storage = SignedUrlStorage::new(http_client, "https://api.example.com/storage/v1", "tts")
///     .with_access_token(token);
/// let url = storage.get_download_url("tts/u1/s1/3.mp3").await?;
/// ```
pub struct SignedUrlStorage {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    bucket: String,
    access_token: Option<String>,
    expires_in: Duration,
    max_retries: u32,
}

impl SignedUrlStorage {
    /// Create a new connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `base_url` - Storage API base, without trailing slash
    /// * `bucket` - Bucket holding the clips
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            access_token: None,
            expires_in: DEFAULT_EXPIRES_IN,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Lifetime requested for each signed link.
    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = expires_in;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// URL of the sign call for a storage path. Path segments are
    /// percent-encoded individually so `/` separators survive.
    fn sign_endpoint(&self, storage_path: &str) -> String {
        let encoded: Vec<String> = storage_path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/object/sign/{}/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            encoded.join("/")
        )
    }

    /// Turn a possibly relative signed URL into an absolute one.
    fn absolutize(&self, signed: &str) -> String {
        if signed.starts_with("http://") || signed.starts_with("https://") {
            signed.to_string()
        } else if signed.starts_with('/') {
            format!("{}{}", self.base_url, signed)
        } else {
            format!("{}/{}", self.base_url, signed)
        }
    }

    fn error_message(response: &HttpResponse) -> String {
        response
            .json::<ApiErrorBody>()
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| String::from_utf8_lossy(&response.body).trim().to_string())
    }

    /// Execute the sign request with retry logic
    ///
    /// Implements exponential backoff for rate limiting and transient errors.
    #[instrument(skip(self, storage_path))]
    async fn sign_with_retry(&self, storage_path: &str) -> Result<HttpResponse> {
        let url = self.sign_endpoint(storage_path);
        let mut attempt = 0;

        loop {
            let mut request = HttpRequest::new(HttpMethod::Post, url.clone())
                .header("Accept", "application/json")
                .json(&SignRequest {
                    expires_in: self.expires_in.as_secs(),
                })?
                .timeout(Duration::from_secs(30));
            if let Some(token) = &self.access_token {
                request = request.bearer_token(token.clone());
            }

            match self.http_client.execute(request).await {
                Ok(response) => {
                    let status = response.status;

                    if response.is_success() {
                        debug!(status, "Sign request succeeded");
                        return Ok(response);
                    } else if status == 429 || response.is_server_error() {
                        attempt += 1;
                        if attempt >= self.max_retries {
                            warn!(status, attempts = attempt, "Sign request failed");
                            return Err(SignedUrlError::ApiError {
                                status_code: status,
                                message: format!("Request failed after {} retries", attempt),
                            }
                            .into());
                        }

                        let backoff_ms = 100u64 * 2u64.pow(attempt);
                        warn!(
                            "Sign request failed (attempt {}/{}): status={}, retrying in {}ms",
                            attempt, self.max_retries, status, backoff_ms
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    } else {
                        let message = Self::error_message(&response);
                        warn!(status, %message, "Sign request rejected");
                        let error = match status {
                            401 | 403 => SignedUrlError::AuthenticationFailed(message),
                            404 => SignedUrlError::ObjectNotFound {
                                path: storage_path.to_string(),
                            },
                            _ => SignedUrlError::ApiError {
                                status_code: status,
                                message,
                            },
                        };
                        return Err(error.into());
                    }
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        warn!("Sign request failed after {} attempts: {}", attempt, e);
                        return Err(e);
                    }

                    let backoff_ms = 100u64 * 2u64.pow(attempt);
                    warn!(
                        "Sign request failed (attempt {}/{}): {}, retrying in {}ms",
                        attempt, self.max_retries, e, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStorage for SignedUrlStorage {
    #[instrument(skip(self))]
    async fn get_download_url(&self, storage_path: &str) -> Result<String> {
        info!("Minting signed download URL");

        let response = self.sign_with_retry(storage_path).await?;
        let parsed: SignResponse = response
            .json()
            .map_err(|e| SignedUrlError::ParseError(e.to_string()))?;

        Ok(self.absolutize(&parsed.signed_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
            async fn download_stream(&self, url: String) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn storage(mock_http: MockHttpClient) -> SignedUrlStorage {
        SignedUrlStorage::new(Arc::new(mock_http), "https://store.test/storage/v1/", "tts")
            .with_access_token("service-key")
    }

    #[test]
    fn test_sign_endpoint_encodes_segments() {
        let connector = storage(MockHttpClient::new());
        assert_eq!(
            connector.sign_endpoint("/u 1/s1/3.mp3"),
            "https://store.test/storage/v1/object/sign/tts/u%201/s1/3.mp3"
        );
    }

    #[test]
    fn test_absolutize() {
        let connector = storage(MockHttpClient::new());
        assert_eq!(connector.absolutize("https://cdn/x"), "https://cdn/x");
        assert_eq!(
            connector.absolutize("/object/sign/tts/a?token=t"),
            "https://store.test/storage/v1/object/sign/tts/a?token=t"
        );
    }

    #[tokio::test]
    async fn test_get_download_url_success() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .withf(|request| {
                request.method == HttpMethod::Post
                    && request.url.ends_with("/object/sign/tts/u1/s1/3.mp3")
                    && request.headers.get("Authorization")
                        == Some(&"Bearer service-key".to_string())
            })
            .returning(|_| Ok(response(200, r#"{"signedURL":"/object/sign/tts/u1/s1/3.mp3?token=abc"}"#)));

        let url = storage(mock_http)
            .get_download_url("u1/s1/3.mp3")
            .await
            .unwrap();

        assert_eq!(
            url,
            "https://store.test/storage/v1/object/sign/tts/u1/s1/3.mp3?token=abc"
        );
    }

    #[tokio::test]
    async fn test_missing_object_maps_to_not_found() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(404, r#"{"message":"Object not found"}"#)));

        let err = storage(mock_http)
            .get_download_url("missing.mp3")
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::NotFound(path) if path == "missing.mp3"));
    }

    #[tokio::test]
    async fn test_forbidden_keeps_status() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(403, r#"{"error":"jwt expired"}"#)));

        let err = storage(mock_http).get_download_url("a.mp3").await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains("jwt expired"));
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(503, "")));
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(200, r#"{"signedUrl":"https://cdn/a?sig=1"}"#)));

        let url = storage(mock_http).get_download_url("a.mp3").await.unwrap();
        assert_eq!(url, "https://cdn/a?sig=1");
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(200, "not json")));

        let err = storage(mock_http).get_download_url("a.mp3").await.unwrap_err();
        assert!(matches!(err, BridgeError::Serialization(_)));
    }
}
