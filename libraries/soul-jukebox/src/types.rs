//! Core types for the jukebox controller

use crate::error::{JukeboxError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A playable song
///
/// The playlist is a fixed, ordered list of these supplied at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Song title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Playable resource path or URL
    pub locator: String,
}

impl Track {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            locator: locator.into(),
        }
    }
}

/// Who asked for a track to be played
///
/// Manual selections cancel an in-progress "play all"; sequence advances
/// keep it running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayOrigin {
    /// The user picked a track
    Manual,

    /// The controller moved on to the next track of a "play all" run
    SequenceAdvance,
}

/// Coarse playback status, derived from controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// No track loaded
    Idle,

    /// Track loaded, start requested but not yet confirmed
    Loading,

    /// Currently playing
    Playing,

    /// Track loaded but not playing (paused, ended, or failed to start)
    Paused,
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub is_playing: bool,
    pub current_index: Option<usize>,
    /// Stored volume, reported unchanged while muted
    pub volume: f32,
    pub is_muted: bool,
    pub is_sequence_mode: bool,
    pub current_track: Option<Track>,
}

/// Configuration for the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JukeboxConfig {
    /// Initial volume (0.0-1.0, default: 1.0)
    pub initial_volume: f32,

    /// Start muted (default: false)
    pub start_muted: bool,

    /// How long a track error stays on screen (default: 5000 ms)
    pub error_notice_ms: u64,

    /// Delay before skipping past a failed track during "play all" (default: 500 ms)
    pub error_skip_delay_ms: u64,
}

impl Default for JukeboxConfig {
    fn default() -> Self {
        Self {
            initial_volume: 1.0,
            start_muted: false,
            error_notice_ms: 5000,
            error_skip_delay_ms: 500,
        }
    }
}

impl JukeboxConfig {
    pub fn error_notice_duration(&self) -> Duration {
        Duration::from_millis(self.error_notice_ms)
    }

    pub fn error_skip_delay(&self) -> Duration {
        Duration::from_millis(self.error_skip_delay_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(JukeboxError::Config(format!(
                "initial_volume must be between 0.0 and 1.0, got {}",
                self.initial_volume
            )));
        }

        if self.error_notice_ms == 0 {
            return Err(JukeboxError::Config(
                "error_notice_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
