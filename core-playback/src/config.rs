//! # Playback Configuration
//!
//! Tunables for the playback engine. Every field has a serde default so a
//! partial JSON document is enough to override one value.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// How long a preloaded handle stays usable.
    ///
    /// Default: 20 minutes.
    #[serde(default = "default_preload_ttl")]
    pub preload_ttl: Duration,

    /// How long a freshly minted link is reused for the same storage path.
    ///
    /// Default: 20 minutes.
    #[serde(default = "default_url_cache_ttl")]
    pub url_cache_ttl: Duration,

    /// Upper bound for a single strategy load. A load that runs longer is
    /// recorded as a `Timeout` failure and the chain moves on.
    ///
    /// Default: 15 seconds.
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout: Duration,

    /// Interval between state polls of a native media element.
    ///
    /// Default: 50 ms.
    #[serde(default = "default_state_poll_interval")]
    pub state_poll_interval: Duration,

    /// Period of the background cache sweeper. `None` leaves expiry to
    /// sweep-on-access only.
    #[serde(default)]
    pub sweep_interval: Option<Duration>,

    /// Number of settled sessions whose terminal state stays queryable.
    ///
    /// Default: 16.
    #[serde(default = "default_session_history")]
    pub session_history: usize,

    /// Frames handed to the PCM sink per write.
    ///
    /// Default: 4096 frames (~93ms at 44.1kHz).
    #[serde(default = "default_decode_chunk_frames")]
    pub decode_chunk_frames: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            preload_ttl: default_preload_ttl(),
            url_cache_ttl: default_url_cache_ttl(),
            attempt_timeout: default_attempt_timeout(),
            state_poll_interval: default_state_poll_interval(),
            sweep_interval: None,
            session_history: default_session_history(),
            decode_chunk_frames: default_decode_chunk_frames(),
        }
    }
}

impl PlaybackConfig {
    /// Parse a JSON document, filling absent fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PlaybackError::InvalidConfig(format!("Malformed JSON: {}", e)))?;
        config.validate().map_err(PlaybackError::InvalidConfig)?;
        Ok(config)
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.preload_ttl.is_zero() {
            return Err("preload_ttl must be > 0".to_string());
        }

        if self.url_cache_ttl.is_zero() {
            return Err("url_cache_ttl must be > 0".to_string());
        }

        if self.attempt_timeout.is_zero() {
            return Err("attempt_timeout must be > 0".to_string());
        }

        if self.state_poll_interval.is_zero() {
            return Err("state_poll_interval must be > 0".to_string());
        }

        if matches!(self.sweep_interval, Some(interval) if interval.is_zero()) {
            return Err("sweep_interval must be > 0 when set".to_string());
        }

        if self.decode_chunk_frames == 0 {
            return Err("decode_chunk_frames must be > 0".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_preload_ttl() -> Duration {
    Duration::from_secs(20 * 60)
}

fn default_url_cache_ttl() -> Duration {
    Duration::from_secs(20 * 60)
}

fn default_attempt_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_state_poll_interval() -> Duration {
    Duration::from_millis(50)
}

fn default_session_history() -> usize {
    16
}

fn default_decode_chunk_frames() -> usize {
    4096 // ~93ms at 44.1kHz
}
