//! # Media Cache Module
//!
//! Turns remote audio locators into locally-backed playable handles.
//!
//! ## Components
//!
//! - **CacheConfig**: capacity, TTL, prefetch delay and fetch timeout
//! - **MediaCache**: entry map, coalesced fetches, eviction and expiry
//! - **PlayableHandle**: owned object URL, revoked exactly once
//! - **CacheStats**: hit/miss/eviction counters
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::cache::{CacheConfig, MediaCache};
//!
//! let cache = MediaCache::new(CacheConfig::default(), http_client, blob_store)?
//!     .with_event_bus(event_bus);
//!
//! let source = cache.acquire(&track.audio_locator).await;
//! cache.prefetch(&next_track.audio_locator);
//! ```

pub mod config;
pub mod handle;
pub mod manager;
pub mod stats;

pub use config::CacheConfig;
pub use handle::PlayableHandle;
pub use manager::MediaCache;
pub use stats::CacheStats;
