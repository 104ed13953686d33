//! Track model as delivered by the catalog.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable catalog identifier (the catalog's `encoded_title`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A dominant color and the color that contrasts with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccentPair {
    pub dominant: String,
    pub complementary: String,
}

/// Immutable catalog record.
///
/// Field names follow the catalog JSON. Only `encoded_title`, `title`,
/// `audiofile` and `coverart` are required to be present; the catalog client
/// additionally drops records where any of the latter three is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(rename = "encoded_title")]
    pub id: TrackId,
    pub title: String,
    #[serde(default)]
    pub artist: String,
    /// Comma-separated genre list.
    #[serde(default)]
    pub genre: String,
    /// Advisory duration in seconds; the media element is authoritative.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub track_number: u32,
    /// Locator of the audio bytes.
    #[serde(rename = "audiofile")]
    pub audio_locator: String,
    /// Locator of the artwork.
    #[serde(rename = "coverart")]
    pub artwork_locator: String,
    #[serde(default)]
    pub dominant_color_1: String,
    #[serde(default)]
    pub complementary_color_1: String,
    #[serde(default)]
    pub dominant_color_2: String,
    #[serde(default)]
    pub complementary_color_2: String,
}

impl Track {
    /// Minimal track, mostly for hosts building lists by hand and for tests.
    pub fn new(
        id: impl Into<TrackId>,
        title: impl Into<String>,
        audio_locator: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: String::new(),
            genre: String::new(),
            duration: 0.0,
            track_number: 0,
            audio_locator: audio_locator.into(),
            artwork_locator: String::new(),
            dominant_color_1: String::new(),
            complementary_color_1: String::new(),
            dominant_color_2: String::new(),
            complementary_color_2: String::new(),
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = seconds;
        self
    }

    pub fn with_artwork(mut self, locator: impl Into<String>) -> Self {
        self.artwork_locator = locator.into();
        self
    }

    /// Trimmed, non-empty genres.
    pub fn genres(&self) -> Vec<&str> {
        self.genre
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .collect()
    }

    pub fn primary_accent(&self) -> AccentPair {
        AccentPair {
            dominant: self.dominant_color_1.clone(),
            complementary: self.complementary_color_1.clone(),
        }
    }

    /// Second color pair, when the catalog supplied one.
    pub fn secondary_accent(&self) -> Option<AccentPair> {
        if self.dominant_color_2.is_empty() && self.complementary_color_2.is_empty() {
            return None;
        }
        Some(AccentPair {
            dominant: self.dominant_color_2.clone(),
            complementary: self.complementary_color_2.clone(),
        })
    }

    /// `m:ss` rendering of the advisory duration.
    pub fn duration_label(&self) -> String {
        format_clock(self.duration)
    }

    /// Whether the record carries everything needed to show and play it.
    pub fn is_playable(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.audio_locator.trim().is_empty()
            && !self.artwork_locator.trim().is_empty()
    }
}

/// Formats seconds as `m:ss`; negative or non-finite input renders `0:00`.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG_RECORD: &str = r##"{
        "encoded_title": "night-drive",
        "title": "Night Drive",
        "artist": "Lumen",
        "genre": "Synthwave, Electronic ,",
        "duration": 215.4,
        "track_number": 3,
        "audiofile": "https://cdn.example.com/night-drive.mp3",
        "coverart": "https://cdn.example.com/night-drive.jpg",
        "dominant_color_1": "#1a1a2e",
        "complementary_color_1": "#e94560",
        "dominant_color_2": "",
        "complementary_color_2": ""
    }"##;

    #[test]
    fn test_deserialize_catalog_record() {
        let track: Track = serde_json::from_str(CATALOG_RECORD).unwrap();

        assert_eq!(track.id.as_str(), "night-drive");
        assert_eq!(track.track_number, 3);
        assert_eq!(track.audio_locator, "https://cdn.example.com/night-drive.mp3");
        assert_eq!(track.genres(), vec!["Synthwave", "Electronic"]);
        assert_eq!(track.primary_accent().complementary, "#e94560");
        assert!(track.secondary_accent().is_none());
        assert!(track.is_playable());
    }

    #[test]
    fn test_optional_fields_default() {
        let track: Track = serde_json::from_str(
            r#"{"encoded_title":"a","title":"A","audiofile":"a.mp3","coverart":"a.jpg"}"#,
        )
        .unwrap();
        assert_eq!(track.duration, 0.0);
        assert!(track.genres().is_empty());
    }

    #[test]
    fn test_serializes_with_catalog_names() {
        let track = Track::new("a", "A", "https://cdn.example.com/a.mp3");
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["encoded_title"], "a");
        assert_eq!(json["audiofile"], "https://cdn.example.com/a.mp3");
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(65.9), "1:05");
        assert_eq!(format_clock(3600.0), "60:00");
        assert_eq!(format_clock(f64::NAN), "0:00");
        assert_eq!(Track::new("a", "A", "a.mp3").with_duration(215.4).duration_label(), "3:35");
    }

    #[test]
    fn test_playable_requires_artwork() {
        let track = Track::new("a", "A", "a.mp3");
        assert!(!track.is_playable());
        assert!(track.with_artwork("a.jpg").is_playable());
    }
}
