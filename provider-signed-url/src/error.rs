//! Error types for the signed URL provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Signed URL provider errors
#[derive(Error, Debug)]
pub enum SignedUrlError {
    /// Token rejected by the storage service
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Signing endpoint returned an error
    #[error("Storage API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Object does not exist
    #[error("Object not found: {path}")]
    ObjectNotFound { path: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Result type for signed URL operations
pub type Result<T> = std::result::Result<T, SignedUrlError>;

impl From<SignedUrlError> for BridgeError {
    fn from(error: SignedUrlError) -> Self {
        match error {
            SignedUrlError::AuthenticationFailed(msg) => BridgeError::http_status(403, msg),
            SignedUrlError::ApiError {
                status_code,
                message,
            } => BridgeError::http_status(status_code, message),
            SignedUrlError::ObjectNotFound { path } => BridgeError::NotFound(path),
            SignedUrlError::ParseError(msg) => BridgeError::Serialization(msg),
            SignedUrlError::Bridge(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SignedUrlError::ApiError {
            status_code: 500,
            message: "signer unavailable".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Storage API error (status 500): signer unavailable"
        );
    }

    #[test]
    fn test_error_conversion_keeps_status() {
        let error = SignedUrlError::AuthenticationFailed("Token expired".to_string());
        let bridge_error: BridgeError = error.into();
        assert_eq!(bridge_error.status(), Some(403));

        let missing: BridgeError = SignedUrlError::ObjectNotFound {
            path: "tts/a.mp3".into(),
        }
        .into();
        assert!(matches!(missing, BridgeError::NotFound(_)));
    }
}
