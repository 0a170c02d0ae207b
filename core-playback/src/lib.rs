//! # Resilient Playback Module
//!
//! Plays rehearsal clips from short-lived signed URLs.
//!
//! ## Overview
//!
//! This module handles:
//! - A fallback chain of four playback strategies (PCM streaming, PCM graph,
//!   native element, in-memory element)
//! - Classification of strategy failures into link-expired and other kinds
//! - Fresh-link minting with per-path caching and background persistence
//! - A time-limited preload cache for upcoming lines
//! - A coordinator enforcing a single active playback with cancellation
//! - Audio decoding using symphonia

pub mod backends;
pub mod classifier;
pub mod config;
pub mod coordinator;
pub mod decoder;
pub mod error;
pub mod fresh_link;
pub mod preload;
pub mod traits;
pub mod types;

pub use config::PlaybackConfig;
pub use coordinator::PlaybackCoordinator;
pub use error::{BackendError, BackendResult, FailureKind, PlaybackError, Result};
pub use fresh_link::{FreshLinkService, UrlRefreshedListener};
pub use preload::{PreloadCache, PreloadedHandle};
pub use traits::{BackendStrategy, ClipEnd, LoadedClip};
pub use types::{
    AudioItem, BackendKind, PlaybackMetadata, PlaybackOutcome, RefreshContext, RefreshRequest,
    SessionId, SessionState,
};
