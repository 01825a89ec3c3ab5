//! Playback Events
//!
//! Outbound notifications for whatever presentation layer sits on top of
//! the controller. Observers are registered on the controller and called
//! synchronously, in registration order, as each transition happens.

use crate::notice::ErrorNotice;
use crate::types::{PlaybackStatus, Track};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Events emitted by the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    /// A track started playing
    SongChanged {
        /// Position of the track in the playlist
        index: usize,
        /// The track itself
        track: Track,
    },

    /// Playback was stopped and the handle released
    PlaybackStopped,

    /// Playback status changed without a track change (pause, resume, end)
    StateChanged {
        /// The new status
        status: PlaybackStatus,
    },

    /// Volume or mute changed
    VolumeChanged {
        /// Stored volume (unchanged by mute)
        volume: f32,
        /// Whether output is muted
        muted: bool,
    },

    /// A track failed; the notice should be shown to the user
    TrackError {
        /// Notice text and failed index
        notice: ErrorNotice,
    },

    /// The current error notice expired or was replaced
    NoticeCleared,
}

/// Receiver of playback events
pub trait PlaybackObserver {
    fn on_event(&mut self, event: &PlaybackEvent);
}

impl<F> PlaybackObserver for F
where
    F: FnMut(&PlaybackEvent),
{
    fn on_event(&mut self, event: &PlaybackEvent) {
        self(event);
    }
}

/// Observer that buffers events for later draining
///
/// Clones share one buffer: register one clone with the controller and
/// drain the other once the controller call has returned. Hosts that call
/// back into the controller from their event handlers (JS callbacks) must
/// use this instead of handling events inline.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Rc<RefCell<VecDeque<PlaybackEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all buffered events, oldest first
    pub fn drain(&self) -> Vec<PlaybackEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl PlaybackObserver for EventQueue {
    fn on_event(&mut self, event: &PlaybackEvent) {
        self.events.borrow_mut().push_back(event.clone());
    }
}
