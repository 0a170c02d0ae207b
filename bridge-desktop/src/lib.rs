//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, with retry and streaming downloads
//! - `LocalCacheStore` as a JSON file in the user cache directory
//! - `DocumentStore` held in memory, for tooling and tests
//!
//! Object storage and the native playback adapter are host-specific and have
//! no desktop default.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{JsonFileCacheStore, ReqwestHttpClient};
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new()?);
//! let cache = Arc::new(JsonFileCacheStore::new());
//! ```

mod cache_store;
mod document_store;
mod http;

pub use cache_store::JsonFileCacheStore;
pub use document_store::InMemoryDocumentStore;
pub use http::{ReqwestHttpClient, RetryPolicy};
