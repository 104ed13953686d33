//! # Track Sequencer
//!
//! Owns the ordered track list and decides which index plays next.
//!
//! In order, navigation always wraps around. Under shuffle, indices are drawn
//! from a pool holding the rest of the current pass, so every other track is
//! heard once before anything repeats and the same track never plays twice
//! in a row.

use crate::error::{PlaybackError, Result};
use crate::models::Track;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// What happens when a track ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop after the last track.
    #[default]
    None,
    /// Wrap to the start after the last track.
    All,
    /// Replay the current track.
    One,
}

impl RepeatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::None => "none",
            RepeatMode::All => "all",
            RepeatMode::One => "one",
        }
    }

    /// `None -> All -> One -> None`
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::None => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::None,
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of the sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerSnapshot {
    pub current_index: Option<usize>,
    pub track_count: usize,
    pub shuffle: bool,
    pub repeat: RepeatMode,
}

pub struct TrackSequencer {
    tracks: Vec<Track>,
    current: Option<usize>,
    shuffle: bool,
    repeat: RepeatMode,
    /// Indices not yet drawn in the current shuffle pass.
    pool: Vec<usize>,
    rng: StdRng,
}

impl TrackSequencer {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic shuffle order, for tests and replays.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            tracks: Vec::new(),
            current: None,
            shuffle: false,
            repeat: RepeatMode::None,
            pool: Vec::new(),
            rng,
        }
    }

    /// Install a new list and forget the previous selection.
    pub fn seed(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
        self.current = None;
        self.pool.clear();
    }

    /// Make `index` current.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::IndexOutOfRange`] when `index` is past the end; the
    /// selection is left unchanged.
    pub fn select_index(&mut self, index: usize) -> Result<&Track> {
        if index >= self.tracks.len() {
            return Err(PlaybackError::IndexOutOfRange {
                index,
                len: self.tracks.len(),
            });
        }

        self.current = Some(index);
        self.pool.retain(|&i| i != index);
        Ok(&self.tracks[index])
    }

    /// Move in `direction` and return the new current index.
    ///
    /// Returns `None` only when the list is empty.
    pub fn advance(&mut self, direction: Direction) -> Option<usize> {
        let len = self.tracks.len();
        if len == 0 {
            return None;
        }

        let index = if self.shuffle {
            self.draw()
        } else {
            match (self.current, direction) {
                (None, Direction::Next) => 0,
                (None, Direction::Previous) => len - 1,
                (Some(current), Direction::Next) => (current + 1) % len,
                (Some(current), Direction::Previous) => (current + len - 1) % len,
            }
        };

        self.current = Some(index);
        Some(index)
    }

    fn draw(&mut self) -> usize {
        let len = self.tracks.len();
        if len == 1 {
            return 0;
        }

        if self.pool.is_empty() {
            let current = self.current;
            self.pool = (0..len).filter(|&i| Some(i) != current).collect();
        }

        let pick = self.rng.gen_range(0..self.pool.len());
        self.pool.swap_remove(pick)
    }

    /// Flip shuffle. Starts a fresh pass either way.
    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.pool.clear();
        self.shuffle
    }

    pub fn set_shuffle(&mut self, enabled: bool) {
        if self.shuffle != enabled {
            self.toggle_shuffle();
        }
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat = mode;
    }

    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        self.repeat = self.repeat.cycle();
        self.repeat
    }

    /// Wrapping `(previous, next)` around `index`.
    pub fn neighbors(&self, index: usize) -> Option<(usize, usize)> {
        let len = self.tracks.len();
        if index >= len {
            return None;
        }
        Some(((index + len - 1) % len, (index + 1) % len))
    }

    /// `true` when the last track in catalog order is current.
    pub fn is_last(&self) -> bool {
        !self.tracks.is_empty() && self.current == Some(self.tracks.len() - 1)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat
    }

    pub fn snapshot(&self) -> SequencerSnapshot {
        SequencerSnapshot {
            current_index: self.current,
            track_count: self.tracks.len(),
            shuffle: self.shuffle,
            repeat: self.repeat,
        }
    }
}

impl Default for TrackSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TrackSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackSequencer")
            .field("tracks", &self.tracks.len())
            .field("current", &self.current)
            .field("shuffle", &self.shuffle)
            .field("repeat", &self.repeat)
            .field("pool", &self.pool)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn tracks(n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| Track::new(format!("t{}", i).as_str(), format!("Track {}", i), format!("a{}", i)))
            .collect()
    }

    fn sequencer(n: usize) -> TrackSequencer {
        let mut seq = TrackSequencer::with_seed(7);
        seq.seed(tracks(n));
        seq
    }

    #[test]
    fn test_in_order_wraps_both_ways() {
        let mut seq = sequencer(3);
        seq.select_index(2).unwrap();
        assert_eq!(seq.advance(Direction::Next), Some(0));
        assert_eq!(seq.advance(Direction::Previous), Some(2));
        assert_eq!(seq.advance(Direction::Previous), Some(1));
    }

    #[test]
    fn test_from_no_selection() {
        let mut seq = sequencer(4);
        assert_eq!(seq.advance(Direction::Next), Some(0));

        seq.seed(tracks(4));
        assert_eq!(seq.advance(Direction::Previous), Some(3));
    }

    #[test]
    fn test_next_len_times_returns_to_start() {
        let mut seq = sequencer(5);
        seq.select_index(1).unwrap();
        for _ in 0..5 {
            seq.advance(Direction::Next);
        }
        assert_eq!(seq.current_index(), Some(1));
    }

    #[test]
    fn test_empty_list_has_no_next() {
        let mut seq = sequencer(0);
        assert_eq!(seq.advance(Direction::Next), None);
        assert_eq!(seq.advance(Direction::Previous), None);
        assert!(!seq.is_last());
    }

    #[test]
    fn test_select_out_of_range_keeps_state() {
        let mut seq = sequencer(2);
        seq.select_index(1).unwrap();
        let err = seq.select_index(5).unwrap_err();
        assert!(matches!(err, PlaybackError::IndexOutOfRange { index: 5, len: 2 }));
        assert_eq!(seq.current_index(), Some(1));
    }

    #[test]
    fn test_shuffle_pass_visits_every_other_track_once() {
        let mut seq = sequencer(6);
        seq.toggle_shuffle();
        seq.select_index(0).unwrap();

        let mut seen = HashSet::new();
        let mut previous = 0;
        for _ in 0..5 {
            let index = seq.advance(Direction::Next).unwrap();
            assert_ne!(index, previous);
            assert!(seen.insert(index));
            previous = index;
        }
        assert_eq!(seen, (1..6).collect::<HashSet<_>>());

        // The next pass starts without repeating the last draw.
        let next = seq.advance(Direction::Next).unwrap();
        assert_ne!(next, previous);
    }

    #[test]
    fn test_shuffle_never_repeats_immediately() {
        let mut seq = sequencer(3);
        seq.toggle_shuffle();
        let mut previous = seq.advance(Direction::Next).unwrap();
        for _ in 0..50 {
            let direction = if previous % 2 == 0 {
                Direction::Next
            } else {
                Direction::Previous
            };
            let index = seq.advance(direction).unwrap();
            assert_ne!(index, previous);
            previous = index;
        }
    }

    #[test]
    fn test_shuffle_single_track_stays() {
        let mut seq = sequencer(1);
        seq.toggle_shuffle();
        seq.select_index(0).unwrap();
        assert_eq!(seq.advance(Direction::Next), Some(0));
        assert_eq!(seq.advance(Direction::Previous), Some(0));
    }

    #[test]
    fn test_seeded_shuffle_is_deterministic() {
        let draws = |seed| {
            let mut seq = TrackSequencer::with_seed(seed);
            seq.seed(tracks(8));
            seq.toggle_shuffle();
            (0..8)
                .map(|_| seq.advance(Direction::Next).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(draws(42), draws(42));
    }

    #[test]
    fn test_mode_changes_keep_selection() {
        let mut seq = sequencer(3);
        seq.select_index(1).unwrap();
        assert!(seq.toggle_shuffle());
        seq.set_repeat_mode(RepeatMode::One);
        assert_eq!(seq.current_index(), Some(1));
        assert_eq!(seq.repeat_mode(), RepeatMode::One);

        assert_eq!(seq.cycle_repeat_mode(), RepeatMode::None);
        assert_eq!(seq.cycle_repeat_mode(), RepeatMode::All);
        assert_eq!(seq.cycle_repeat_mode(), RepeatMode::One);
    }

    #[test]
    fn test_neighbors_wrap() {
        let seq = sequencer(4);
        assert_eq!(seq.neighbors(0), Some((3, 1)));
        assert_eq!(seq.neighbors(3), Some((2, 0)));
        assert_eq!(seq.neighbors(4), None);
        assert_eq!(sequencer(1).neighbors(0), Some((0, 0)));
    }

    #[test]
    fn test_is_last_and_snapshot() {
        let mut seq = sequencer(2);
        seq.select_index(1).unwrap();
        assert!(seq.is_last());
        assert_eq!(seq.current_track().unwrap().title, "Track 1");

        let snapshot = seq.snapshot();
        assert_eq!(snapshot.current_index, Some(1));
        assert_eq!(snapshot.track_count, 2);
        assert_eq!(snapshot.repeat.to_string(), "none");
    }

    #[test]
    fn test_seed_resets_selection() {
        let mut seq = sequencer(3);
        seq.select_index(2).unwrap();
        seq.seed(tracks(2));
        assert_eq!(seq.current_index(), None);
        assert_eq!(seq.len(), 2);
    }
}
