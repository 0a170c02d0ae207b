//! Audio output bridges.
//!
//! - [`PlaybackAdapter`] drives a host media element. The host fetches and
//!   decodes the source; the core prepares, starts, polls and unloads it.
//! - [`AudioSink`] is a PCM graph. The core decodes in-process and writes
//!   interleaved `f32` frames.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AudioCodec {
    Mp3,
    Aac,
    Flac,
    Vorbis,
    Opus,
    Wav,
    Unknown,
    Other(String),
}

/// Decoded PCM layout announced to an [`AudioSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    pub codec: AudioCodec,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub fn new(codec: AudioCodec, sample_rate: u32, channels: u16) -> Self {
        Self {
            codec,
            sample_rate,
            channels,
        }
    }
}

/// What a media element should load.
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// The element fetches the URL itself.
    RemoteStream { url: String },
    /// Bytes the core already downloaded, exposed to the element as a blob.
    MemoryBuffer {
        data: Bytes,
        mime_type: Option<String>,
    },
}

impl AudioSource {
    pub fn remote(url: impl Into<String>) -> Self {
        AudioSource::RemoteStream { url: url.into() }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, AudioSource::RemoteStream { .. })
    }
}

/// Handle for an element session or an open sink node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackSessionId(Uuid);

impl PlaybackSessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlaybackSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaybackSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Element state as last reported by the host.
///
/// `Stopped` means the host halted the element (user action or our own
/// `stop`); `Completed` means it reached the end of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Preparing,
    Playing,
    Paused,
    Stopped,
    Completed,
    Error { message: String },
}

impl PlaybackState {
    /// Whether the element will not make further progress on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlaybackState::Stopped | PlaybackState::Completed | PlaybackState::Error { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackRequest {
    pub source: AudioSource,
    /// Linear gain, 1.0 is unity.
    pub volume: f32,
}

impl PlaybackRequest {
    pub fn new(source: AudioSource) -> Self {
        Self {
            source,
            volume: 1.0,
        }
    }
}

/// Interleaved PCM samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct AudioFrameChunk {
    pub samples: Vec<f32>,
    /// Samples per channel in this chunk.
    pub frames: usize,
    /// Position of the first frame within the clip.
    pub timestamp: Duration,
}

impl AudioFrameChunk {
    pub fn new(samples: Vec<f32>, frames: usize, timestamp: Duration) -> Self {
        Self {
            samples,
            frames,
            timestamp,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0 || self.samples.is_empty()
    }
}

/// Host media element.
///
/// `prepare` loads without sound. `play` may be refused by autoplay policy,
/// which hosts report as an error whose message mentions autoplay or a user
/// gesture.
#[async_trait]
pub trait PlaybackAdapter: Send + Sync {
    async fn prepare(&self, request: PlaybackRequest) -> Result<PlaybackSessionId>;

    async fn play(&self, session: PlaybackSessionId) -> Result<()>;

    /// Halt and rewind. Must be safe to call on a session that already ended.
    async fn stop(&self, session: PlaybackSessionId) -> Result<()>;

    async fn state(&self, session: PlaybackSessionId) -> Result<PlaybackState>;

    /// Detach the source and free the session.
    async fn unload(&self, session: PlaybackSessionId) -> Result<()>;
}

/// PCM output graph.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn open(&self, format: AudioFormat) -> Result<PlaybackSessionId>;

    async fn write(&self, sink: PlaybackSessionId, chunk: AudioFrameChunk) -> Result<()>;

    /// Resolves once every queued sample has been rendered.
    async fn drain(&self, sink: PlaybackSessionId) -> Result<()>;

    /// Stop immediately, dropping queued samples.
    async fn close(&self, sink: PlaybackSessionId) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_request_plays_at_unity_gain() {
        let request = PlaybackRequest::new(AudioSource::remote("https://cdn/clip.mp3"));
        assert_eq!(request.volume, 1.0);
        assert!(request.source.is_remote());
        let blob = AudioSource::MemoryBuffer {
            data: Bytes::from_static(b"ID3"),
            mime_type: None,
        };
        assert!(!blob.is_remote());
    }

    #[test]
    fn terminal_states() {
        assert!(PlaybackState::Completed.is_terminal());
        assert!(PlaybackState::Error {
            message: "4".into()
        }
        .is_terminal());
        assert!(!PlaybackState::Preparing.is_terminal());
        assert_ne!(PlaybackSessionId::new(), PlaybackSessionId::new());
    }

    #[test]
    fn empty_chunk() {
        assert!(AudioFrameChunk::new(Vec::new(), 0, Duration::ZERO).is_empty());
        assert!(!AudioFrameChunk::new(vec![0.0; 2], 1, Duration::ZERO).is_empty());
    }
}
