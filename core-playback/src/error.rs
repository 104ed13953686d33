//! # Playback Error Types
//!
//! Errors surfaced by the cache, sequencer, state machine and engine.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Selection Errors
    // ========================================================================
    /// No track with the given identifier exists in the current list.
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// Index outside the current track list.
    #[error("Track index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Attempted operation when no track is selected.
    #[error("No track loaded")]
    NoTrackLoaded,

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Operation is not valid in the current transport phase.
    #[error("Cannot {operation} while {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: String,
    },

    /// The media element could not load the source.
    #[error("Failed to load track: {0}")]
    LoadFailed(String),

    /// The media element refused to start (e.g. autoplay policy).
    #[error("Playback operation failed: {0}")]
    PlaybackFailed(String),

    // ========================================================================
    // Source Errors
    // ========================================================================
    /// Audio source is unavailable (e.g., network error).
    #[error("Audio source unavailable: {0}")]
    SourceUnavailable(String),

    /// Media cache operation failed.
    #[error("Cache error: {0}")]
    CacheError(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Host bridge failure.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::SourceUnavailable(_)
                | PlaybackError::LoadFailed(_)
                | PlaybackError::PlaybackFailed(_)
        )
    }

    /// Returns `true` if the error belongs in the player's last-error slot.
    ///
    /// Contract violations (bad index, wrong phase) are the caller's bug and
    /// are reported only through the returned `Err`.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            PlaybackError::LoadFailed(_)
                | PlaybackError::PlaybackFailed(_)
                | PlaybackError::SourceUnavailable(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let load = PlaybackError::LoadFailed("decode error".into());
        assert!(load.is_transient());
        assert!(load.is_user_facing());

        let contract = PlaybackError::IndexOutOfRange { index: 9, len: 3 };
        assert!(!contract.is_transient());
        assert!(!contract.is_user_facing());
        assert_eq!(contract.to_string(), "Track index 9 out of range (len 3)");
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = PlaybackError::InvalidTransition {
            operation: "play",
            phase: "idle".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot play while idle");
    }
}
