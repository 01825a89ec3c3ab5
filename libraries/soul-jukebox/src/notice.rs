//! User-facing error notices

use crate::types::Track;
use serde::{Deserialize, Serialize};

/// Message shown to the user when a track cannot be played
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    /// Index of the failed track
    pub index: usize,

    /// Text for display
    pub message: String,
}

impl ErrorNotice {
    /// Build the notice for a failed track
    ///
    /// Low-level failure detail goes to the log, not to the user.
    pub fn for_track(index: usize, track: &Track) -> Self {
        Self {
            index,
            message: format!(
                "Unable to play \"{}\" by {}",
                track.title, track.artist
            ),
        }
    }
}
