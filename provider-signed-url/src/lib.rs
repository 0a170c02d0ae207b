//! # Signed URL Provider
//!
//! Implements `ObjectStorage` against an HTTP signing endpoint.
//!
//! ## Overview
//!
//! Clip audio lives in an object-storage bucket under stable paths
//! (`tts/<user>/<script>/<line>.mp3`). Playback needs a short-lived signed
//! link for each path. This crate asks the storage service to sign a path and
//! turns the answer into an absolute URL:
//! - Bearer authentication via a service or user token
//! - Retry with exponential backoff for rate limiting and 5xx responses
//! - Status-preserving errors so the playback core can classify failures

pub mod connector;
pub mod error;
pub mod types;

pub use connector::SignedUrlStorage;
pub use error::{Result, SignedUrlError};
