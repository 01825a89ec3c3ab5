//! Soul Jukebox - Playback Controller
//!
//! Platform-agnostic jukebox playback for Soul Player.
//!
//! This crate provides:
//! - A playback controller over a fixed playlist (play, pause, resume, stop)
//! - Sequential "play all" with auto-advance and skip-on-error
//! - Volume control (linear 0.0-1.0, mute that preserves the level)
//! - User-facing error notices that expire on their own
//! - Observer-based event delivery for any presentation layer
//!
//! # Architecture
//!
//! `soul-jukebox` never touches an audio device, a timer or a thread:
//! - Audio comes from an [`AudioBackend`] the platform provides
//!   (`HtmlAudioBackend` in the browser, [`HeadlessBackend`] for tests and
//!   simulations)
//! - Time comes from a [`Clock`]; delayed work is queued and run when the
//!   host calls [`PlaybackController::run_due_tasks`]
//! - Platform notifications come back as [`MediaSignal`]s tagged with the
//!   handle they belong to, so late notifications are recognised as stale
//!
//! # Example: Play All
//!
//! ```rust
//! use soul_jukebox::{
//!     EventQueue, HeadlessDeck, JukeboxConfig, ManualClock, PlaybackController,
//!     PlaybackEvent, Track,
//! };
//!
//! let tracks = vec![
//!     Track::new("Intro", "The Band", "songs/intro.mp3"),
//!     Track::new("Outro", "The Band", "songs/outro.mp3"),
//! ];
//!
//! let deck = HeadlessDeck::new();
//! let events = EventQueue::new();
//! let mut controller = PlaybackController::new(
//!     tracks,
//!     Box::new(deck.backend()),
//!     Box::new(ManualClock::new()),
//!     JukeboxConfig::default(),
//! );
//! controller.subscribe(events.clone());
//!
//! controller.play_all().unwrap();
//! assert_eq!(controller.current_index(), Some(0));
//!
//! // The platform reports the end of the first track
//! let handle = controller.active_handle().unwrap();
//! controller.handle_signal(deck.finish(handle));
//! assert_eq!(controller.current_index(), Some(1));
//!
//! let changes = events
//!     .drain()
//!     .into_iter()
//!     .filter(|e| matches!(e, PlaybackEvent::SongChanged { .. }))
//!     .count();
//! assert_eq!(changes, 2);
//! ```
//!
//! # Example: Platform Integration
//!
//! ```rust,no_run
//! use soul_jukebox::{AudioBackend, AudioHandle, HandleId, Result, StartOutcome};
//!
//! struct MyHandle {
//!     id: HandleId,
//!     // ... platform player
//! }
//!
//! impl AudioHandle for MyHandle {
//!     fn id(&self) -> HandleId {
//!         self.id
//!     }
//!
//!     fn start(&mut self) -> StartOutcome {
//!         // Kick off playback; report Pending if it completes later
//!         StartOutcome::Started
//!     }
//!
//!     fn pause(&mut self) {}
//!     fn rewind(&mut self) {}
//!     fn set_level(&mut self, _level: f32) {}
//! }
//!
//! struct MyBackend;
//!
//! impl AudioBackend for MyBackend {
//!     fn open(&mut self, id: HandleId, _locator: &str) -> Result<Box<dyn AudioHandle>> {
//!         Ok(Box::new(MyHandle { id }))
//!     }
//! }
//! ```

mod backend;
mod controller;
mod error;
mod events;
mod headless;
mod notice;
mod scheduler;
mod types;
mod volume;

#[cfg(feature = "wasm")]
pub mod wasm;

// Public exports
pub use backend::{AudioBackend, AudioHandle, HandleId, MediaSignal, StartOutcome};
pub use controller::PlaybackController;
pub use error::{JukeboxError, Result};
pub use events::{EventQueue, PlaybackEvent, PlaybackObserver};
pub use headless::{HandleRecord, HandleStatus, HeadlessBackend, HeadlessDeck, StartPolicy};
pub use notice::ErrorNotice;
pub use scheduler::{Clock, DeferredTasks, ManualClock, SystemClock, TaskId};
pub use types::{JukeboxConfig, PlayOrigin, PlaybackSnapshot, PlaybackStatus, Track};
pub use volume::Volume;
