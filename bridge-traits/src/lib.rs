//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and the host
//! application. Each trait represents a capability that the core requires but
//! that is provided differently per platform (desktop shell, mobile, web view).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations used by the
//!   fetch-based playback strategies
//!
//! ### Storage
//! - [`ObjectStorage`](storage::ObjectStorage) - Mints signed download URLs from
//!   stable storage paths
//! - [`DocumentStore`](storage::DocumentStore) - Per-user script documents
//!   holding one audio URL per line
//! - [`LocalCacheStore`](storage::LocalCacheStore) - Key-value cache used to warm
//!   future sessions
//!
//! ### Audio output
//! - [`PlaybackAdapter`](playback::PlaybackAdapter) - Native media element
//! - [`AudioSink`](playback::AudioSink) - PCM output graph fed by in-process decoding
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Host
//! implementations should report HTTP failures through
//! [`BridgeError::HttpStatus`] so the core can tell an expired link apart from
//! a decoding problem without parsing free text.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks behind `Arc`.

pub mod error;
pub mod http;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use playback::{
    AudioCodec, AudioFormat, AudioFrameChunk, AudioSink, AudioSource, PlaybackAdapter,
    PlaybackRequest, PlaybackSessionId, PlaybackState,
};
pub use storage::{DocumentStore, LineRecord, LocalCacheStore, ObjectStorage, ScriptDocument};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
