//! # Playback Engine
//!
//! Drives a host [`MediaElement`] from user intents and platform signals.
//!
//! The engine owns the [`PlaybackStateMachine`] and [`TrackSequencer`] behind
//! short `parking_lot` critical sections and performs every side effect
//! itself: cache acquisition, media loading, play/pause, volume persistence,
//! event publication and neighbour prefetch. Locks are never held across an
//! `.await`.
//!
//! ## Selection races
//!
//! Each [`select_track`](PlaybackEngine::select_track) takes a fresh
//! [`Generation`]. When a slower, older load finishes after a newer selection,
//! its result is dropped; the cache entry it populated stays usable.

use crate::cache::MediaCache;
use crate::error::{PlaybackError, Result};
use crate::models::Track;
use crate::sequencer::{Direction, RepeatMode, SequencerSnapshot, TrackSequencer};
use crate::state::{
    Generation, PlaybackSnapshot, PlaybackStateMachine, TransportPhase, DEFAULT_VOLUME,
};
use bridge_traits::{MediaElement, MediaSignal, SettingsStore};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Settings key holding the persisted volume (0-100).
pub const VOLUME_KEY: &str = "player-volume";

/// Seconds moved by [`seek_by`](PlaybackEngine::seek_by) shortcuts.
pub const SEEK_STEP: f64 = 10.0;

/// Volume points moved by [`adjust_volume`](PlaybackEngine::adjust_volume) shortcuts.
pub const VOLUME_STEP: i64 = 10;

const LOAD_FAILED_MESSAGE: &str = "Failed to load audio";

/// Combined playback and sequencing view for hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub playback: PlaybackSnapshot,
    pub sequencer: SequencerSnapshot,
}

pub struct PlaybackEngine {
    // Lock order: sequencer, then state.
    sequencer: Mutex<TrackSequencer>,
    state: Mutex<PlaybackStateMachine>,
    cache: MediaCache,
    media: Arc<dyn MediaElement>,
    settings: Option<Arc<dyn SettingsStore>>,
    event_bus: Option<EventBus>,
    prefetch_enabled: bool,
}

impl PlaybackEngine {
    pub fn new(cache: MediaCache, media: Arc<dyn MediaElement>) -> Self {
        Self {
            sequencer: Mutex::new(TrackSequencer::new()),
            state: Mutex::new(PlaybackStateMachine::new()),
            cache,
            media,
            settings: None,
            event_bus: None,
            prefetch_enabled: true,
        }
    }

    /// Persist volume changes through `settings`.
    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Replace the sequencer, e.g. with a seeded one.
    pub fn with_sequencer(mut self, sequencer: TrackSequencer) -> Self {
        self.sequencer = Mutex::new(sequencer);
        self
    }

    pub fn with_prefetch(mut self, enabled: bool) -> Self {
        self.prefetch_enabled = enabled;
        self
    }

    pub fn cache(&self) -> &MediaCache {
        &self.cache
    }

    // ------------------------------------------------------------------------
    // Track list
    // ------------------------------------------------------------------------

    /// Install the catalog. The current selection is forgotten.
    pub fn set_tracks(&self, tracks: Vec<Track>) {
        info!(count = tracks.len(), "Track list updated");
        self.sequencer.lock().seed(tracks);
    }

    pub fn track_count(&self) -> usize {
        self.sequencer.lock().len()
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.sequencer.lock().tracks().to_vec()
    }

    pub fn current_track(&self) -> Option<Track> {
        self.state.lock().track().cloned()
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    /// Load the track at `index` and leave it paused at the start.
    ///
    /// A later selection supersedes this one; in that case this returns
    /// `Ok(())` without touching state.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::IndexOutOfRange`] with no state change
    /// - [`PlaybackError::LoadFailed`] after the engine moved to the error phase
    pub async fn select_track(&self, index: usize) -> Result<()> {
        self.load(index).await.map(|_| ())
    }

    /// Select `index` and start playing it.
    pub async fn play_track(&self, index: usize) -> Result<()> {
        if let Some(generation) = self.load(index).await? {
            self.start(generation).await?;
        }
        Ok(())
    }

    /// Resume the loaded track.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::InvalidTransition`] unless a track is loaded (paused
    /// or playing); [`PlaybackError::PlaybackFailed`] when the media element
    /// refuses to start.
    pub async fn play(&self) -> Result<()> {
        let generation = {
            let state = self.state.lock();
            state.ensure_playable()?;
            state.generation()
        };
        self.start(generation).await
    }

    /// Pause if playing; otherwise nothing happens.
    pub fn pause(&self) {
        let paused = {
            let mut state = self.state.lock();
            if state.mark_paused() {
                state.track().map(|t| (t.id.to_string(), state.position()))
            } else {
                None
            }
        };

        if let Some((track_id, position)) = paused {
            self.media.pause();
            self.emit(PlaybackEvent::Paused {
                track_id,
                position_ms: millis(position),
            });
        }
    }

    /// Play/pause button. From the error phase the current track is reloaded.
    pub async fn toggle_play(&self) -> Result<()> {
        let (phase, index) = {
            let state = self.state.lock();
            (state.phase(), state.index())
        };

        match (phase, index) {
            (TransportPhase::Playing, _) => {
                self.pause();
                Ok(())
            }
            (TransportPhase::Error, Some(index)) => self.play_track(index).await,
            _ => self.play().await,
        }
    }

    /// Advance in catalog or shuffle order and play.
    pub async fn next(&self) -> Result<()> {
        self.step(Direction::Next).await
    }

    pub async fn previous(&self) -> Result<()> {
        self.step(Direction::Previous).await
    }

    async fn step(&self, direction: Direction) -> Result<()> {
        let index = self.sequencer.lock().advance(direction);
        match index {
            Some(index) => self.play_track(index).await,
            None => {
                debug!(?direction, "No tracks to advance through");
                Ok(())
            }
        }
    }

    /// Jump to `time` seconds, clamped to the track. Returns the applied position.
    ///
    /// Ignored when the duration is unknown or `time` is not finite.
    pub fn seek(&self, time: f64) -> Option<f64> {
        let applied = {
            let mut state = self.state.lock();
            state.apply_seek(time).map(|position| {
                (
                    position,
                    state.duration(),
                    state.track().map(|t| t.id.to_string()),
                )
            })
        };

        let (position, duration, track_id) = applied?;
        self.media.seek(position);
        if let Some(track_id) = track_id {
            self.emit(PlaybackEvent::PositionChanged {
                track_id,
                position_ms: millis(position),
                duration_ms: millis(duration),
            });
        }
        Some(position)
    }

    /// Relative seek, e.g. `±SEEK_STEP` from arrow keys.
    pub fn seek_by(&self, delta: f64) -> Option<f64> {
        let position = self.state.lock().position();
        self.seek(position + delta)
    }

    // ------------------------------------------------------------------------
    // Volume
    // ------------------------------------------------------------------------

    /// Set volume (clamped to 0-100), unmute, and persist.
    ///
    /// Persistence failures are logged only.
    pub async fn set_volume(&self, volume: i64) -> u8 {
        let volume = self.state.lock().set_volume(volume);
        self.apply_volume(volume);

        if let Some(settings) = &self.settings {
            if let Err(e) = settings.set_i64(VOLUME_KEY, i64::from(volume)).await {
                warn!(error = %e, "Failed to persist volume");
            }
        }
        volume
    }

    pub async fn adjust_volume(&self, delta: i64) -> u8 {
        let current = i64::from(self.state.lock().volume());
        self.set_volume(current + delta).await
    }

    /// Flip mute; the stored volume is untouched.
    pub fn toggle_mute(&self) -> bool {
        let (volume, muted) = {
            let mut state = self.state.lock();
            let muted = state.toggle_mute();
            (state.volume(), muted)
        };
        self.media.set_muted(muted);
        self.emit(PlaybackEvent::VolumeChanged { volume, muted });
        muted
    }

    /// Load the persisted volume, falling back to the default.
    pub async fn restore_volume(&self) -> u8 {
        let stored = match &self.settings {
            Some(settings) => match settings.get_i64(VOLUME_KEY).await {
                Ok(value) => value,
                Err(e) => {
                    warn!(error = %e, "Failed to read persisted volume");
                    None
                }
            },
            None => None,
        };

        let volume = self
            .state
            .lock()
            .set_volume(stored.unwrap_or(i64::from(DEFAULT_VOLUME)));
        self.apply_volume(volume);
        debug!(volume, restored = stored.is_some(), "Volume restored");
        volume
    }

    fn apply_volume(&self, volume: u8) {
        self.media.set_volume(f32::from(volume) / 100.0);
        self.media.set_muted(false);
        self.emit(PlaybackEvent::VolumeChanged {
            volume,
            muted: false,
        });
    }

    // ------------------------------------------------------------------------
    // Modes
    // ------------------------------------------------------------------------

    pub fn toggle_shuffle(&self) -> bool {
        let (shuffle, repeat) = {
            let mut sequencer = self.sequencer.lock();
            (sequencer.toggle_shuffle(), sequencer.repeat_mode())
        };
        self.emit_mode(shuffle, repeat);
        shuffle
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) {
        let shuffle = {
            let mut sequencer = self.sequencer.lock();
            sequencer.set_repeat_mode(mode);
            sequencer.shuffle()
        };
        self.emit_mode(shuffle, mode);
    }

    /// `None -> All -> One -> None`
    pub fn cycle_repeat_mode(&self) -> RepeatMode {
        let (shuffle, repeat) = {
            let mut sequencer = self.sequencer.lock();
            let repeat = sequencer.cycle_repeat_mode();
            (sequencer.shuffle(), repeat)
        };
        self.emit_mode(shuffle, repeat);
        repeat
    }

    fn emit_mode(&self, shuffle: bool, repeat: RepeatMode) {
        self.emit(PlaybackEvent::ModeChanged {
            shuffle,
            repeat: repeat.as_str().to_string(),
        });
    }

    // ------------------------------------------------------------------------
    // Platform signals
    // ------------------------------------------------------------------------

    /// Apply a notification from the media element.
    pub async fn handle_signal(&self, signal: MediaSignal) -> Result<()> {
        match signal {
            MediaSignal::Ready { duration } => {
                self.state.lock().apply_duration(duration);
                Ok(())
            }
            MediaSignal::TimeUpdate { position, duration } => {
                let progress = {
                    let mut state = self.state.lock();
                    if state.apply_progress(position, duration) {
                        state
                            .track()
                            .map(|t| (t.id.to_string(), state.position(), state.duration()))
                    } else {
                        None
                    }
                };
                if let Some((track_id, position, duration)) = progress {
                    self.emit(PlaybackEvent::PositionChanged {
                        track_id,
                        position_ms: millis(position),
                        duration_ms: millis(duration),
                    });
                }
                Ok(())
            }
            MediaSignal::Ended => self.handle_ended().await,
            MediaSignal::Error { message } => {
                warn!(error = %message, "Media element reported an error");
                let track_id = {
                    let mut state = self.state.lock();
                    state.record_error(message.clone());
                    state.track().map(|t| t.id.to_string())
                };
                self.emit(PlaybackEvent::Error {
                    track_id,
                    message,
                    recoverable: true,
                });
                Ok(())
            }
        }
    }

    async fn handle_ended(&self) -> Result<()> {
        let ended = {
            let state = self.state.lock();
            if state.phase().is_ready() {
                state.track().map(|t| t.id.to_string())
            } else {
                None
            }
        };
        let Some(track_id) = ended else {
            debug!("Ignoring end of stale media");
            return Ok(());
        };
        self.emit(PlaybackEvent::Completed { track_id });

        let (repeat, is_last) = {
            let sequencer = self.sequencer.lock();
            (sequencer.repeat_mode(), sequencer.is_last())
        };

        match repeat {
            RepeatMode::One => {
                let generation = {
                    let mut state = self.state.lock();
                    state.rewind();
                    state.generation()
                };
                self.media.seek(0.0);
                self.start(generation).await
            }
            RepeatMode::All => self.next().await,
            RepeatMode::None if !is_last => self.next().await,
            RepeatMode::None => {
                let position = {
                    let mut state = self.state.lock();
                    state.finish_at_end();
                    state.track().map(|t| (t.id.to_string(), state.position()))
                };
                self.media.pause();
                if let Some((track_id, position)) = position {
                    info!(track_id = %track_id, "Reached end of track list");
                    self.emit(PlaybackEvent::Paused {
                        track_id,
                        position_ms: millis(position),
                    });
                }
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------------

    pub fn snapshot(&self) -> PlayerSnapshot {
        let sequencer = self.sequencer.lock().snapshot();
        let playback = self.state.lock().snapshot();
        PlayerSnapshot {
            playback,
            sequencer,
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Returns the load's generation, or `None` when it was superseded.
    #[instrument(skip(self))]
    async fn load(&self, index: usize) -> Result<Option<Generation>> {
        let (track, generation) = {
            let mut sequencer = self.sequencer.lock();
            let track = sequencer.select_index(index)?.clone();
            let generation = self.state.lock().begin_load(track.clone(), index);
            (track, generation)
        };

        debug!(track_id = %track.id, generation = generation.value(), "Loading track");
        self.emit(PlaybackEvent::TrackLoading {
            track_id: track.id.to_string(),
            index,
        });

        self.media.pause();
        let source = self.cache.acquire(&track.audio_locator).await;
        if !self.state.lock().is_current(generation) {
            debug!(track_id = %track.id, "Selection superseded before load");
            return Ok(None);
        }

        let loaded = self.media.load(&source).await;
        let outcome = match loaded {
            Ok(info) => {
                if !self.state.lock().complete_load(generation, info.duration) {
                    debug!(track_id = %track.id, "Discarding stale load");
                    return Ok(None);
                }
                self.emit(PlaybackEvent::TrackReady {
                    track_id: track.id.to_string(),
                    duration_ms: millis(info.duration),
                });
                Ok(Some(generation))
            }
            Err(e) => {
                if !self
                    .state
                    .lock()
                    .fail_load(generation, LOAD_FAILED_MESSAGE)
                {
                    debug!(track_id = %track.id, "Discarding stale load failure");
                    return Ok(None);
                }
                warn!(track_id = %track.id, error = %e, "Track failed to load");
                self.media.pause();
                self.emit(PlaybackEvent::Error {
                    track_id: Some(track.id.to_string()),
                    message: LOAD_FAILED_MESSAGE.to_string(),
                    recoverable: true,
                });
                Err(PlaybackError::LoadFailed(e.to_string()))
            }
        };

        self.prefetch_neighbors(index);
        outcome
    }

    /// Start the media element for load `generation`.
    async fn start(&self, generation: Generation) -> Result<()> {
        let result = self.media.play().await;

        match result {
            Ok(()) => {
                let started = {
                    let mut state = self.state.lock();
                    if state.mark_playing(generation) {
                        state.track().map(|t| (t.id.to_string(), t.title.clone()))
                    } else {
                        None
                    }
                };
                if let Some((track_id, title)) = started {
                    info!(track_id = %track_id, "Playback started");
                    self.emit(PlaybackEvent::Started { track_id, title });
                }
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                let failed = {
                    let mut state = self.state.lock();
                    if state.fail_playback(generation, message.clone()) {
                        Some(state.track().map(|t| t.id.to_string()))
                    } else {
                        None
                    }
                };
                match failed {
                    Some(track_id) => {
                        warn!(error = %message, "Media element refused to play");
                        self.emit(PlaybackEvent::Error {
                            track_id,
                            message: message.clone(),
                            recoverable: true,
                        });
                        Err(PlaybackError::PlaybackFailed(message))
                    }
                    None => Ok(()),
                }
            }
        }
    }

    fn prefetch_neighbors(&self, index: usize) {
        if !self.prefetch_enabled {
            return;
        }

        let locators = {
            let sequencer = self.sequencer.lock();
            if sequencer.len() < 2 {
                return;
            }
            sequencer.neighbors(index).map(|(previous, next)| {
                let mut locators = Vec::with_capacity(2);
                for i in [previous, next] {
                    if let Some(track) = sequencer.track(i) {
                        if !locators.contains(&track.audio_locator) {
                            locators.push(track.audio_locator.clone());
                        }
                    }
                }
                locators
            })
        };

        for locator in locators.unwrap_or_default() {
            self.cache.prefetch(&locator);
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Playback(event));
        }
    }
}

impl fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("snapshot", &self.snapshot())
            .field("cache", &self.cache)
            .field("prefetch_enabled", &self.prefetch_enabled)
            .finish()
    }
}

fn millis(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}
