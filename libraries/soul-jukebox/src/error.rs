//! Error types for the jukebox controller

use thiserror::Error;

/// Jukebox errors
///
/// None of these are fatal to the controller: every path that produces one
/// leaves the controller in a consistent state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JukeboxError {
    /// Requested index is outside the track list
    #[error("Track index {index} out of range (playlist has {len} tracks)")]
    InvalidIndex { index: i64, len: usize },

    /// Play-all requested with no tracks
    #[error("Playlist is empty")]
    EmptyPlaylist,

    /// The audio handle refused to start
    #[error("Playback failed to start: {0}")]
    StartFailed(String),

    /// The audio backend could not create a handle
    #[error("Audio backend error: {0}")]
    Backend(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for jukebox operations
pub type Result<T> = std::result::Result<T, JukeboxError>;
