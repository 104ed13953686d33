//! # Event Bus
//!
//! Typed, broadcast-based notifications from the player core to its host.
//!
//! The engine, the media cache and the catalog client publish [`CoreEvent`]s
//! on a shared [`EventBus`]; any number of subscribers (UI bindings, logging,
//! tests) receive every event emitted after they subscribed.
//!
//! ```text
//! ┌────────────────┐  emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ PlaybackEngine ├────────>│           ├────────────>│ UI binding │
//! └────────────────┘         │ EventBus  │             └────────────┘
//! ┌────────────────┐  emit   │ (tokio    │  subscribe  ┌────────────┐
//! │ MediaCache     ├────────>│ broadcast)├────────────>│ Test probe │
//! └────────────────┘         │           │             └────────────┘
//! ┌────────────────┐  emit   │           │
//! │ CatalogClient  ├────────>│           │
//! └────────────────┘         └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut playback = EventStream::new(bus.subscribe())
//!     .filter(|event| matches!(event, CoreEvent::Playback(_)));
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Completed {
//!     track_id: "night-drive".to_string(),
//! }))
//! .ok();
//!
//! let event = playback.recv().await.unwrap();
//! assert_eq!(event.description(), "Track completed");
//! # }
//! ```
//!
//! ## Lagging
//!
//! Slow subscribers receive `RecvError::Lagged(n)` and keep going;
//! `RecvError::Closed` means every sender is gone. `PositionChanged` fires on
//! every media time update, so size the buffer with that in mind.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Transport and track-selection changes
    Playback(PlaybackEvent),
    /// Media cache population and eviction
    Cache(CacheEvent),
    /// Catalog loading progress
    Catalog(CatalogEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
            CoreEvent::Catalog(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Catalog(CatalogEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Cache(CacheEvent::Fallback { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::Started { .. }) => EventSeverity::Info,
            CoreEvent::Catalog(CatalogEvent::Loaded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to audio playback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A new selection started loading.
    TrackLoading {
        track_id: String,
        /// Catalog index of the selection.
        index: usize,
    },
    /// The selected track is loaded and paused at the start.
    TrackReady {
        track_id: String,
        duration_ms: u64,
    },
    /// Playback started or resumed.
    Started { track_id: String, title: String },
    /// Playback paused.
    Paused { track_id: String, position_ms: u64 },
    /// Track reached its natural end.
    Completed { track_id: String },
    /// Playback position changed (seek or natural progression).
    PositionChanged {
        track_id: String,
        position_ms: u64,
        duration_ms: u64,
    },
    /// Volume or mute changed.
    VolumeChanged { volume: u8, muted: bool },
    /// Shuffle or repeat policy changed.
    ModeChanged {
        shuffle: bool,
        /// `none`, `all` or `one`.
        repeat: String,
    },
    /// Load or playback failure for the current track.
    Error {
        track_id: Option<String>,
        message: String,
        /// Whether selecting the track again may succeed.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::TrackLoading { .. } => "Track loading",
            PlaybackEvent::TrackReady { .. } => "Track ready",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Completed { .. } => "Track completed",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::VolumeChanged { .. } => "Volume changed",
            PlaybackEvent::ModeChanged { .. } => "Playback mode changed",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Cache Events
// ============================================================================

/// Why a cache entry left the cache.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvictionReason {
    /// Oldest entry displaced by a new one at capacity.
    Capacity,
    /// Entry outlived the configured time-to-live.
    Expired,
    /// Caller released the entry explicitly.
    Released,
    /// Cache was cleared.
    Cleared,
}

/// Events related to the media cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// Remote audio fetched and stored locally.
    Populated {
        locator: String,
        uri: String,
        bytes: u64,
    },
    /// Fetch failed; the caller received the remote locator instead.
    Fallback { locator: String, message: String },
    /// Entry removed and its handle revoked.
    Evicted {
        locator: String,
        reason: EvictionReason,
    },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::Populated { .. } => "Media cached",
            CacheEvent::Fallback { .. } => "Media cache fallback",
            CacheEvent::Evicted { .. } => "Media evicted",
        }
    }
}

// ============================================================================
// Catalog Events
// ============================================================================

/// Events related to fetching the track catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CatalogEvent {
    /// A fetch attempt started (1-based).
    Loading { url: String, attempt: u32 },
    /// Catalog parsed successfully.
    Loaded { track_count: usize },
    /// Every attempt failed.
    Failed { message: String, attempts: u32 },
}

impl CatalogEvent {
    fn description(&self) -> &str {
        match self {
            CatalogEvent::Loading { .. } => "Catalog loading",
            CatalogEvent::Loaded { .. } => "Catalog loaded",
            CatalogEvent::Failed { .. } => "Catalog failed to load",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus shares the underlying channel. Emitting with no
/// subscribers returns an error that publishers are free to ignore.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all current subscribers.
    ///
    /// Returns the number of subscribers that will see the event.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new receiver for events emitted from now on.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned from `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next matching event.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns the next buffered matching event, or `None` when drained.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every buffered matching event.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
