//! Platform audio abstraction
//!
//! The controller never talks to an audio device directly. A platform
//! provides an [`AudioBackend`] that opens one [`AudioHandle`] per track
//! (an `<audio>` element in the browser, a simulated deck in tests).
//!
//! Handles are stamped with a [`HandleId`]. Anything the platform reports
//! later ("ended", "error", "start finished") is routed back to the
//! controller as a [`MediaSignal`] carrying that id, so reports from a
//! handle that has since been replaced can be told apart and ignored.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one audio handle
///
/// Ids increase monotonically for the lifetime of a controller and are
/// never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(u64);

impl HandleId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of asking a handle to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Audio is playing
    Started,

    /// Start is in flight; the platform reports the result later with
    /// [`MediaSignal::StartSettled`]
    Pending,

    /// Start was refused (autoplay policy, unsupported source, ...)
    Failed(String),
}

/// One loaded track on the platform audio primitive
///
/// Dropping the handle releases it. Implementations should stop routing
/// signals for a dropped handle, but the controller ignores stale ids
/// anyway.
pub trait AudioHandle {
    /// Id this handle was opened with
    fn id(&self) -> HandleId;

    /// Request playback
    fn start(&mut self) -> StartOutcome;

    /// Pause playback, keeping the position
    fn pause(&mut self);

    /// Reset position to the start of the track
    fn rewind(&mut self);

    /// Set output level (0.0-1.0)
    fn set_level(&mut self, level: f32);
}

/// Factory for audio handles
pub trait AudioBackend {
    /// Open a handle for `locator`
    ///
    /// The returned handle must report `id` from [`AudioHandle::id`].
    fn open(&mut self, id: HandleId, locator: &str) -> Result<Box<dyn AudioHandle>>;
}

/// Notification from the platform about a handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSignal {
    /// The track reached its end
    Ended(HandleId),

    /// Load, decode or playback failed
    Failed {
        handle: HandleId,
        detail: Option<String>,
    },

    /// An earlier [`StartOutcome::Pending`] resolved
    StartSettled {
        handle: HandleId,
        result: std::result::Result<(), String>,
    },
}

impl MediaSignal {
    /// Handle the signal refers to
    pub fn handle(&self) -> HandleId {
        match self {
            MediaSignal::Ended(handle) => *handle,
            MediaSignal::Failed { handle, .. } | MediaSignal::StartSettled { handle, .. } => {
                *handle
            }
        }
    }
}
