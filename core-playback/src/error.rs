//! # Playback Error Types
//!
//! Two layers of errors live here:
//!
//! - [`BackendError`] is what a single strategy reports when it cannot load or
//!   play a clip. It never escapes the fallback chain on its own.
//! - [`PlaybackError`] is what the engine's public operations return.

use crate::types::BackendKind;
use bridge_traits::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classified reason a strategy failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Bytes arrived but could not be decoded.
    Decode,
    /// 401/403 from the link host.
    Forbidden,
    /// 404/410, or the host reported the resource missing.
    NotFound,
    /// Transport failure or a 5xx/408/429 answer.
    Network,
    /// Host refused to start audible output (autoplay policy).
    PlayBlocked,
    /// Load did not finish within the attempt timeout.
    Timeout,
    Other,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Decode => "decode",
            FailureKind::Forbidden => "forbidden",
            FailureKind::NotFound => "not_found",
            FailureKind::Network => "network",
            FailureKind::PlayBlocked => "play_blocked",
            FailureKind::Timeout => "timeout",
            FailureKind::Other => "other",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one strategy attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{backend} failed ({kind}): {message}")]
pub struct BackendError {
    pub kind: FailureKind,
    pub backend: BackendKind,
    pub message: String,
}

impl BackendError {
    pub fn new(backend: BackendKind, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            backend,
            message: message.into(),
        }
    }

    /// Wrap a host bridge error, classifying it on the way.
    pub fn from_bridge(backend: BackendKind, error: &BridgeError) -> Self {
        Self::new(
            backend,
            crate::classifier::classify_bridge_error(error),
            error.to_string(),
        )
    }

    /// Wrap a decoder error.
    pub fn decode(backend: BackendKind, error: &PlaybackError) -> Self {
        Self::new(backend, FailureKind::Decode, error.to_string())
    }

    pub fn timeout(backend: BackendKind, after: std::time::Duration) -> Self {
        Self::new(
            backend,
            FailureKind::Timeout,
            format!("load did not finish within {:?}", after),
        )
    }

    /// Whether this failure suggests the signed link has died.
    pub fn is_link_expired(&self) -> bool {
        crate::classifier::is_link_expired(self.kind)
    }
}

/// Result type for a single strategy step.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Errors returned by the playback engine.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Terminal Playback Errors
    // ========================================================================
    /// Every strategy failed on every pass.
    #[error("All playback strategies failed for {url} after {} attempts", .attempts.len())]
    AllStrategiesFailed {
        url: String,
        attempts: Vec<BackendError>,
    },

    // ========================================================================
    // Fresh Link Errors
    // ========================================================================
    /// Object storage could not mint a replacement link.
    #[error("Could not mint a fresh link for {storage_path}: {source}")]
    LinkUnavailable {
        storage_path: String,
        #[source]
        source: BridgeError,
    },

    /// Writing a refreshed link back to durable storage failed.
    #[error("Failed to persist refreshed link: {0}")]
    Persistence(String),

    // ========================================================================
    // Format/Codec Errors
    // ========================================================================
    /// Audio format is not recognized or cannot be parsed.
    #[error("Unsupported or invalid audio format: {0}")]
    InvalidFormat(String),

    /// Codec is not supported by the decoder.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// Error occurred during audio decoding.
    #[error("Decoding error: {0}")]
    DecodingError(String),

    // ========================================================================
    // Setup Errors
    // ========================================================================
    #[error("Invalid playback configuration: {0}")]
    InvalidConfig(String),

    /// No backend could be built from the injected bridges.
    #[error("No playback backend available: {0}")]
    NoBackends(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if this error is related to audio format/codec issues.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::InvalidFormat(_)
                | PlaybackError::UnsupportedCodec(_)
                | PlaybackError::DecodingError(_)
        )
    }

    /// Strategy attempts carried by an [`PlaybackError::AllStrategiesFailed`].
    pub fn attempts(&self) -> &[BackendError] {
        match self {
            PlaybackError::AllStrategiesFailed { attempts, .. } => attempts,
            _ => &[],
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
