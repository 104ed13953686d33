//! # Playback State Machine
//!
//! Pure transport state: no I/O, no clocks, no async. The engine performs the
//! side effects and reports their outcome here.
//!
//! ```text
//!          begin_load            complete_load
//!   Idle ─────────────► Loading ───────────────► Paused ◄─┐
//!                          │                       │      │ mark_paused
//!                fail_load │          mark_playing ▼      │
//!                          └──────► Error ◄────── Playing ┘
//!                                        fail_playback
//! ```
//!
//! `begin_load` is valid from every phase.
//!
//! Every load is tagged with a [`Generation`]. Completions carrying an older
//! generation are stale and ignored, so the most recent selection always wins.

use crate::error::{PlaybackError, Result};
use crate::models::Track;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_VOLUME: u8 = 70;
pub const MAX_VOLUME: u8 = 100;

/// Transport phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportPhase {
    /// Nothing selected yet.
    #[default]
    Idle,
    /// Waiting for the media element to report the source playable.
    Loading,
    Paused,
    Playing,
    /// The last load or play attempt failed.
    Error,
}

impl TransportPhase {
    /// `Paused` or `Playing`.
    pub fn is_ready(&self) -> bool {
        matches!(self, TransportPhase::Paused | TransportPhase::Playing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportPhase::Idle => "idle",
            TransportPhase::Loading => "loading",
            TransportPhase::Paused => "paused",
            TransportPhase::Playing => "playing",
            TransportPhase::Error => "error",
        }
    }
}

impl fmt::Display for TransportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic load token.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Copy of the playback state at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub track: Option<Track>,
    pub track_index: Option<usize>,
    pub phase: TransportPhase,
    /// Seconds.
    pub position: f64,
    /// Seconds; `0.0` until the media reports it.
    pub duration: f64,
    pub volume: u8,
    pub muted: bool,
    pub error: Option<String>,
    pub generation: Generation,
}

impl PlaybackSnapshot {
    pub fn is_playing(&self) -> bool {
        self.phase == TransportPhase::Playing
    }

    pub fn is_loading(&self) -> bool {
        self.phase == TransportPhase::Loading
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackStateMachine {
    track: Option<Track>,
    index: Option<usize>,
    phase: TransportPhase,
    position: f64,
    duration: f64,
    volume: u8,
    muted: bool,
    error: Option<String>,
    generation: Generation,
}

impl Default for PlaybackStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackStateMachine {
    pub fn new() -> Self {
        Self {
            track: None,
            index: None,
            phase: TransportPhase::Idle,
            position: 0.0,
            duration: 0.0,
            volume: DEFAULT_VOLUME,
            muted: false,
            error: None,
            generation: Generation::default(),
        }
    }

    /// Start loading `track`. Valid from any phase.
    pub fn begin_load(&mut self, track: Track, index: usize) -> Generation {
        self.generation = self.generation.next();
        self.track = Some(track);
        self.index = Some(index);
        self.phase = TransportPhase::Loading;
        self.position = 0.0;
        self.duration = 0.0;
        self.error = None;
        self.generation
    }

    /// Source became playable. Returns `false` for a stale generation.
    pub fn complete_load(&mut self, generation: Generation, duration: f64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.phase = TransportPhase::Paused;
        self.position = 0.0;
        self.duration = sanitize(duration);
        self.error = None;
        true
    }

    /// Source could not be loaded. Returns `false` for a stale generation.
    pub fn fail_load(&mut self, generation: Generation, message: impl Into<String>) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.phase = TransportPhase::Error;
        self.error = Some(message.into());
        true
    }

    /// `Ok` only when a loaded source is paused or playing.
    pub fn ensure_playable(&self) -> Result<()> {
        if self.phase.is_ready() {
            Ok(())
        } else {
            Err(PlaybackError::InvalidTransition {
                operation: "play",
                phase: self.phase.to_string(),
            })
        }
    }

    /// Media started. Returns `false` when the load it belongs to was superseded.
    pub fn mark_playing(&mut self, generation: Generation) -> bool {
        if !self.is_current(generation) || !self.phase.is_ready() {
            return false;
        }
        self.phase = TransportPhase::Playing;
        self.error = None;
        true
    }

    /// Media refused to start.
    pub fn fail_playback(&mut self, generation: Generation, message: impl Into<String>) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.phase = TransportPhase::Error;
        self.error = Some(message.into());
        true
    }

    /// `Playing -> Paused`. Returns `false` (no change) from any other phase.
    pub fn mark_paused(&mut self) -> bool {
        if self.phase != TransportPhase::Playing {
            return false;
        }
        self.phase = TransportPhase::Paused;
        self.clear_stale_error();
        true
    }

    /// Back to the start of the current source, whether or not its duration
    /// is known.
    pub fn rewind(&mut self) {
        self.position = 0.0;
    }

    /// Clamp `time` into `[0, duration]`.
    ///
    /// `None` when the duration is unknown or `time` is not finite.
    pub fn clamp_seek(&self, time: f64) -> Option<f64> {
        if !time.is_finite() || self.duration <= 0.0 {
            return None;
        }
        Some(time.clamp(0.0, self.duration))
    }

    /// Clamp and store a seek target.
    pub fn apply_seek(&mut self, time: f64) -> Option<f64> {
        let target = self.clamp_seek(time)?;
        self.position = target;
        self.clear_stale_error();
        Some(target)
    }

    /// Clamp to `0..=100` and unmute. Returns the stored volume.
    pub fn set_volume(&mut self, volume: i64) -> u8 {
        // Lossless: clamped into u8 range first.
        self.volume = volume.clamp(0, MAX_VOLUME as i64) as u8;
        self.muted = false;
        self.clear_stale_error();
        self.volume
    }

    /// Returns the new mute flag.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    /// Progress report from the media element.
    ///
    /// Ignored while idle or loading, where it would belong to the previous
    /// source. Returns whether it was applied.
    pub fn apply_progress(&mut self, position: f64, duration: f64) -> bool {
        if matches!(self.phase, TransportPhase::Idle | TransportPhase::Loading) {
            return false;
        }
        let duration = sanitize(duration);
        if duration > 0.0 {
            self.duration = duration;
        }
        self.position = if self.duration > 0.0 {
            sanitize(position).min(self.duration)
        } else {
            sanitize(position)
        };
        true
    }

    /// Authoritative duration reported after metadata loaded.
    ///
    /// Unknown or non-positive durations never replace a known one.
    pub fn apply_duration(&mut self, duration: f64) -> bool {
        if self.phase == TransportPhase::Idle {
            return false;
        }
        let duration = sanitize(duration);
        if duration <= 0.0 {
            return false;
        }
        self.duration = duration;
        self.position = self.position.min(self.duration);
        true
    }

    /// Natural end without a follow-up track: paused at the end.
    pub fn finish_at_end(&mut self) {
        self.phase = TransportPhase::Paused;
        self.position = self.duration;
    }

    /// Failure reported by the media element outside a load or play attempt.
    pub fn record_error(&mut self, message: impl Into<String>) {
        if self.track.is_some() {
            self.phase = TransportPhase::Error;
        }
        self.error = Some(message.into());
    }

    // The message of a failed track stays until that track is reloaded or
    // played, other successful operations clear anything older.
    fn clear_stale_error(&mut self) {
        if self.phase != TransportPhase::Error {
            self.error = None;
        }
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn phase(&self) -> TransportPhase {
        self.phase
    }

    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            track: self.track.clone(),
            track_index: self.index,
            phase: self.phase,
            position: self.position,
            duration: self.duration,
            volume: self.volume,
            muted: self.muted,
            error: self.error.clone(),
            generation: self.generation,
        }
    }
}

fn sanitize(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}
