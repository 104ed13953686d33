//! Playback bridge traits and supporting media types.
//!
//! These abstractions let the playback engine drive a host audio primitive (an
//! HTML audio element, a native player, a test double) through a small async
//! API, and receive its progress through an explicit, finite set of
//! [`MediaSignal`]s instead of ad hoc callbacks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Source handed to a [`MediaElement`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaSource {
    /// Locally-backed object URI produced by a [`BlobStore`](crate::BlobStore).
    Cached { uri: String },
    /// Remote locator streamed directly by the host (cache fallback).
    Direct { locator: String },
}

impl MediaSource {
    /// URI the host should load.
    pub fn uri(&self) -> &str {
        match self {
            MediaSource::Cached { uri } => uri,
            MediaSource::Direct { locator } => locator,
        }
    }

    /// Returns `true` when the source is served from local storage.
    pub fn is_cached(&self) -> bool {
        matches!(self, MediaSource::Cached { .. })
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

/// Facts reported once a source became playable.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MediaInfo {
    /// Duration in seconds; `0.0` when the host cannot determine it.
    pub duration: f64,
}

impl MediaInfo {
    pub fn new(duration: f64) -> Self {
        Self { duration }
    }
}

/// Asynchronous notifications emitted by a media element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum MediaSignal {
    /// Metadata loaded; duration is now authoritative.
    Ready { duration: f64 },
    /// Periodic playback progress.
    TimeUpdate { position: f64, duration: f64 },
    /// Playback reached the natural end of the media.
    Ended,
    /// Decoding or network failure while playing.
    Error { message: String },
}

/// Audio primitive driven by the playback engine.
///
/// `load` resolves once the source can start playing (the browser's
/// `canplay`), or fails when the host cannot decode or reach it. `play` may be
/// rejected asynchronously, e.g. by autoplay policy. The remaining controls are
/// fire-and-forget.
#[async_trait]
pub trait MediaElement: Send + Sync {
    /// Replace the current source and wait until it is playable.
    async fn load(&self, source: &MediaSource) -> Result<MediaInfo>;

    /// Begin or resume playback.
    async fn play(&self) -> Result<()>;

    /// Pause playback without unloading the source.
    fn pause(&self);

    /// Jump to an absolute position in seconds.
    fn seek(&self, position: f64);

    /// Set output gain, normalized to `0.0..=1.0`.
    fn set_volume(&self, volume: f32);

    /// Mute or unmute output without touching the gain.
    fn set_muted(&self, muted: bool);
}
