/// Simulator configuration
use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use soul_jukebox::{JukeboxConfig, Track};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimConfig {
    #[serde(default)]
    pub player: JukeboxConfig,

    #[serde(default = "default_tracks")]
    pub tracks: Vec<SimTrack>,
}

/// A playlist entry plus how the simulated deck should treat it
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimTrack {
    pub title: String,

    pub artist: String,

    pub locator: String,

    /// Playing time before the track ends
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,

    /// The audio element cannot be created
    #[serde(default)]
    pub fail_on_open: bool,

    /// `play()` is refused
    #[serde(default)]
    pub fail_on_start: bool,

    /// Raise a media error after this much playing time
    #[serde(default)]
    pub fail_after_ms: Option<u64>,
}

impl SimTrack {
    pub fn track(&self) -> Track {
        Track::new(&self.title, &self.artist, &self.locator)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Playing time until the track stops, and whether it stops by failing
    pub fn playing_time(&self) -> (Duration, bool) {
        match self.fail_after_ms {
            Some(ms) if ms < self.duration_ms => (Duration::from_millis(ms), true),
            _ => (self.duration(), false),
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            player: JukeboxConfig::default(),
            tracks: default_tracks(),
        }
    }
}

impl SimConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist. Without one, `jukebox.toml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from("jukebox.toml");
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (e.g. JUKEBOX_PLAYER__INITIAL_VOLUME)
        settings = settings.add_source(
            config::Environment::with_prefix("JUKEBOX")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| SimError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| SimError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.player.validate()?;

        for (index, track) in self.tracks.iter().enumerate() {
            if track.locator.trim().is_empty() {
                return Err(SimError::Config(format!(
                    "track {} ({:?}) has no locator",
                    index, track.title
                )));
            }

            if track.duration_ms == 0 {
                return Err(SimError::Config(format!(
                    "track {} ({:?}) must have a non-zero duration",
                    index, track.title
                )));
            }
        }

        Ok(())
    }

    pub fn playlist(&self) -> Vec<Track> {
        self.tracks.iter().map(SimTrack::track).collect()
    }
}

// Default values
fn default_duration_ms() -> u64 {
    30_000
}

fn default_tracks() -> Vec<SimTrack> {
    [
        ("Morning Light", "Aster Quay", "audio/morning-light.mp3"),
        ("Paper Boats", "The Lanterns", "audio/paper-boats.mp3"),
        ("Slow Tide", "Aster Quay", "audio/slow-tide.mp3"),
    ]
    .into_iter()
    .map(|(title, artist, locator)| SimTrack {
        title: title.to_string(),
        artist: artist.to_string(),
        locator: locator.to_string(),
        duration_ms: default_duration_ms(),
        fail_on_open: false,
        fail_on_start: false,
        fail_after_ms: None,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = SimConfig::default();
        assert_eq!(config.tracks.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loads_playlist_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[player]
initial_volume = 0.5
error_skip_delay_ms = 250

[[tracks]]
title = "One"
artist = "First"
locator = "one.mp3"
duration_ms = 1000

[[tracks]]
title = "Two"
artist = "Second"
locator = "two.mp3"
fail_after_ms = 400
"#
        )
        .unwrap();

        let config = SimConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.player.initial_volume, 0.5);
        assert_eq!(config.player.error_skip_delay_ms, 250);
        assert_eq!(config.player.error_notice_ms, 5000);
        assert_eq!(config.tracks.len(), 2);
        assert_eq!(config.tracks[0].duration(), Duration::from_secs(1));
        assert_eq!(
            config.tracks[1].playing_time(),
            (Duration::from_millis(400), true)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = SimConfig::load(Some(Path::new("/nonexistent/jukebox.toml")));
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn validate_rejects_empty_locator() {
        let mut config = SimConfig::default();
        config.tracks[1].locator = "  ".to_string();
        assert!(matches!(config.validate(), Err(SimError::Config(_))));
    }

    #[test]
    fn validate_rejects_bad_player_settings() {
        let mut config = SimConfig::default();
        config.player.initial_volume = 2.0;
        assert!(matches!(config.validate(), Err(SimError::Jukebox(_))));
    }

    #[test]
    fn late_failure_after_end_never_fires() {
        let mut config = SimConfig::default();
        config.tracks[0].duration_ms = 1000;
        config.tracks[0].fail_after_ms = Some(5000);
        assert_eq!(
            config.tracks[0].playing_time(),
            (Duration::from_secs(1), false)
        );
    }
}
