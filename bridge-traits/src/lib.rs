//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the player core and platform-specific
//! implementations. Each trait represents a capability that the core requires but
//! that must be implemented differently per platform (desktop, web, mobile).
//!
//! ## Traits
//!
//! ### Networking & Storage
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with retry and TLS
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//! - [`BlobStore`](blob::BlobStore) - Materializes fetched bytes into revocable object URLs
//!
//! ### Media
//! - [`MediaElement`](playback::MediaElement) - Audio primitive that loads a source,
//!   starts/stops playback and reports [`MediaSignal`](playback::MediaSignal)s
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ HTTP, settings, blob store |
//! | Web      | TBD                 | 📋 Planned |
//!
//! The desktop crate does not ship a `MediaElement`; hosts inject the audio
//! primitive that matches their output stack.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type for consistent
//! error handling. Platform implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Provide actionable error messages
//! - Include error context (e.g., locators, HTTP status)
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks. Implementations must ensure thread safety.
//!
//! ## Examples
//!
//! ### Implementing BlobStore
//!
//! ```ignore
//! use bridge_traits::blob::BlobStore;
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//! use bytes::Bytes;
//!
//! pub struct MyBlobStore;
//!
//! #[async_trait]
//! impl BlobStore for MyBlobStore {
//!     async fn create_object_url(&self, data: Bytes, content_type: Option<&str>) -> Result<String> {
//!         todo!()
//!     }
//!
//!     fn revoke_object_url(&self, uri: &str) {
//!         todo!()
//!     }
//! }
//! ```

pub mod blob;
pub mod error;
pub mod http;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use blob::BlobStore;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use playback::{MediaElement, MediaInfo, MediaSignal, MediaSource};
pub use storage::SettingsStore;
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
