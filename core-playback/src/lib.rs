//! # Playback Module
//!
//! Client-side player core: media cache, track sequencing, transport state
//! and the engine that ties them to a host audio element.
//!
//! ## Overview
//!
//! This module handles:
//! - Caching fetched audio as revocable object URLs ([`cache`])
//! - In-order and shuffled navigation with repeat modes ([`sequencer`])
//! - A pure transport state machine with load generations ([`state`])
//! - The engine that performs the I/O ([`engine`])
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::{CacheConfig, MediaCache, PlaybackEngine};
//!
//! let cache = MediaCache::new(CacheConfig::default(), http_client, blob_store)?;
//! let engine = PlaybackEngine::new(cache, media_element).with_settings(settings);
//!
//! engine.restore_volume().await;
//! engine.set_tracks(tracks);
//! engine.play_track(0).await?;
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod models;
pub mod sequencer;
pub mod state;

pub use cache::{CacheConfig, CacheStats, MediaCache, PlayableHandle};
pub use engine::{PlaybackEngine, PlayerSnapshot, SEEK_STEP, VOLUME_KEY, VOLUME_STEP};
pub use error::{PlaybackError, Result};
pub use models::{format_clock, AccentPair, Track, TrackId};
pub use sequencer::{Direction, RepeatMode, SequencerSnapshot, TrackSequencer};
pub use state::{Generation, PlaybackSnapshot, PlaybackStateMachine, TransportPhase};
