//! Playback controller - the jukebox state machine
//!
//! Owns at most one audio handle and decides what plays next. Driven by
//! three kinds of input, handled one at a time:
//! - user commands (`play`, `pause`, `stop`, `play_all`, volume...)
//! - platform signals (`track_ended`, `track_failed`, `start_settled`)
//! - due deferred tasks (`run_due_tasks`)
//!
//! Every platform signal carries the [`HandleId`] it was raised for. A
//! signal for any handle other than the active one is stale and dropped,
//! which is what keeps a late "ended" or a late start completion from
//! resurrecting a track the user already moved away from.

use crate::{
    backend::{AudioBackend, AudioHandle, HandleId, MediaSignal, StartOutcome},
    error::{JukeboxError, Result},
    events::{PlaybackEvent, PlaybackObserver},
    notice::ErrorNotice,
    scheduler::{Clock, DeferredTasks, TaskId},
    types::{JukeboxConfig, PlayOrigin, PlaybackSnapshot, PlaybackStatus, Track},
    volume::Volume,
};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Work the controller schedules for later
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    /// Move past a track that failed during "play all"
    ///
    /// `handle` is `None` when the track could not even be opened.
    SkipFailedTrack {
        handle: Option<HandleId>,
        index: usize,
    },

    /// Take down the current error notice
    ClearNotice,
}

/// The loaded track. Index and handle live and die together.
struct ActiveTrack {
    index: usize,
    handle: Box<dyn AudioHandle>,

    /// A start request is in flight
    start_pending: bool,

    /// SongChanged has been emitted for this handle
    announced: bool,
}

/// Central jukebox playback control
pub struct PlaybackController {
    tracks: Vec<Track>,
    backend: Box<dyn AudioBackend>,
    clock: Box<dyn Clock>,
    config: JukeboxConfig,

    // State
    active: Option<ActiveTrack>,
    is_playing: bool,
    volume: Volume,
    sequence_mode: bool,
    last_handle: HandleId,

    // Deferred work
    tasks: DeferredTasks<Deferred>,
    pending_skip: Option<TaskId>,
    notice: Option<(ErrorNotice, TaskId)>,

    observers: Vec<Box<dyn PlaybackObserver>>,
}

impl PlaybackController {
    /// Create a controller over a fixed playlist
    pub fn new(
        tracks: Vec<Track>,
        backend: Box<dyn AudioBackend>,
        clock: Box<dyn Clock>,
        config: JukeboxConfig,
    ) -> Self {
        let mut volume = Volume::new(config.initial_volume);
        if config.start_muted {
            volume.mute();
        }

        Self {
            tracks,
            backend,
            clock,
            config,
            active: None,
            is_playing: false,
            volume,
            sequence_mode: false,
            last_handle: HandleId::new(0),
            tasks: DeferredTasks::new(),
            pending_skip: None,
            notice: None,
            observers: Vec::new(),
        }
    }

    /// Register an observer for playback events
    pub fn subscribe(&mut self, observer: impl PlaybackObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    // ===== Playback Control =====

    /// Play the track at `index`
    ///
    /// Any loaded track is released first. A manual selection always ends
    /// an in-progress "play all".
    ///
    /// # Returns
    /// * `Ok(())` - Track loaded and started (or start pending)
    /// * `Err(InvalidIndex)` - Index out of range, nothing changed
    /// * `Err(Backend)` - Handle could not be created, controller is idle.
    ///   During "play all" the next track is tried after the skip delay.
    /// * `Err(StartFailed)` - Track loaded but refused to start
    pub fn play(&mut self, index: usize, origin: PlayOrigin) -> Result<()> {
        let len = self.tracks.len();
        if index >= len {
            warn!("Ignoring play request for index {} ({} tracks)", index, len);
            return Err(JukeboxError::InvalidIndex {
                index: index as i64,
                len,
            });
        }

        self.cancel_pending_skip();
        let had_track = self.release_active();

        if origin == PlayOrigin::Manual {
            if self.sequence_mode {
                debug!("Manual selection cancels play-all");
            }
            self.sequence_mode = false;
        }

        self.last_handle = self.last_handle.next();
        let id = self.last_handle;
        let locator = self.tracks[index].locator.clone();

        let mut handle = match self.backend.open(id, &locator) {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to open track {} ({}): {}", index, locator, e);
                self.show_notice(index);

                if self.sequence_mode && index + 1 < len {
                    self.schedule_skip(None, index);
                    if had_track {
                        self.emit_status();
                    }
                    return Err(e);
                }

                self.sequence_mode = false;
                if had_track {
                    self.emit(PlaybackEvent::PlaybackStopped);
                }
                return Err(e);
            }
        };

        handle.set_level(self.volume.effective());
        let outcome = handle.start();

        self.active = Some(ActiveTrack {
            index,
            handle,
            start_pending: false,
            announced: false,
        });

        debug!("Loaded track {} on handle {} ({:?})", index, id, origin);
        self.apply_start_outcome(outcome)
    }

    /// Pause playback
    ///
    /// No-op unless something is playing. A start that is still in flight
    /// is abandoned: its eventual completion will be ignored.
    pub fn pause(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        if active.start_pending {
            debug!("Pause abandons pending start on {}", active.handle.id());
            active.start_pending = false;
            active.handle.pause();
            self.emit_status();
            return;
        }

        if !self.is_playing {
            return;
        }

        active.handle.pause();
        self.is_playing = false;
        self.emit_status();
    }

    /// Resume the loaded track
    ///
    /// No-op without a loaded track, while playing, or while a start is
    /// already in flight.
    pub fn resume(&mut self) -> Result<()> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };

        if self.is_playing || active.start_pending {
            return Ok(());
        }

        let outcome = active.handle.start();
        self.apply_start_outcome(outcome)
    }

    /// Pause when playing, resume when a track is loaded, otherwise start
    /// the first track
    pub fn toggle_playback(&mut self) -> Result<()> {
        if self.is_playing || self.is_loading() {
            self.pause();
            return Ok(());
        }

        if self.active.is_some() {
            return self.resume();
        }

        if self.tracks.is_empty() {
            warn!("Nothing to play: playlist is empty");
            return Err(JukeboxError::EmptyPlaylist);
        }

        self.play(0, PlayOrigin::Manual)
    }

    /// Stop playback and release the loaded track
    ///
    /// Ends "play all". No-op (and no event) if nothing is loaded.
    pub fn stop(&mut self) {
        self.cancel_pending_skip();

        if !self.release_active() {
            return;
        }

        self.sequence_mode = false;
        info!("Playback stopped");
        self.emit(PlaybackEvent::PlaybackStopped);
    }

    /// Play every track from the first, advancing automatically
    ///
    /// Always restarts from index 0, discarding whatever was playing.
    pub fn play_all(&mut self) -> Result<()> {
        if self.tracks.is_empty() {
            warn!("Play all requested on an empty playlist");
            return Err(JukeboxError::EmptyPlaylist);
        }

        info!("Play all ({} tracks)", self.tracks.len());
        self.sequence_mode = true;
        self.play(0, PlayOrigin::SequenceAdvance)
    }

    // ===== Volume =====

    /// Set volume (clamped to 0.0-1.0)
    ///
    /// Applied to the loaded track right away unless muted.
    pub fn set_volume(&mut self, level: f32) {
        self.volume.set_level(level);
        if !self.volume.is_muted() {
            self.apply_level();
        }
        self.emit_volume_changed();
    }

    /// Get stored volume (0.0-1.0), unaffected by mute
    pub fn volume(&self) -> f32 {
        self.volume.level()
    }

    /// Mute audio
    pub fn mute(&mut self) {
        self.volume.mute();
        self.apply_level();
        self.emit_volume_changed();
    }

    /// Unmute audio, restoring the stored volume
    pub fn unmute(&mut self) {
        self.volume.unmute();
        self.apply_level();
        self.emit_volume_changed();
    }

    /// Toggle mute state
    pub fn toggle_mute(&mut self) {
        self.volume.toggle_mute();
        self.apply_level();
        self.emit_volume_changed();
    }

    /// Check if muted
    pub fn is_muted(&self) -> bool {
        self.volume.is_muted()
    }

    // ===== Platform Signals =====

    /// Route a platform signal to its handler
    pub fn handle_signal(&mut self, signal: MediaSignal) {
        match signal {
            MediaSignal::Ended(handle) => self.track_ended(handle),
            MediaSignal::Failed { handle, detail } => self.track_failed(handle, detail),
            MediaSignal::StartSettled { handle, result } => self.start_settled(handle, result),
        }
    }

    /// The track on `handle` finished naturally
    pub fn track_ended(&mut self, handle: HandleId) {
        let Some(index) = self.current_index_for(handle) else {
            debug!("Ignoring ended signal from stale handle {}", handle);
            return;
        };

        self.is_playing = false;
        if let Some(active) = self.active.as_mut() {
            active.start_pending = false;
        }

        if self.sequence_mode && index + 1 < self.tracks.len() {
            if let Err(e) = self.play(index + 1, PlayOrigin::SequenceAdvance) {
                warn!("Play-all could not advance to track {}: {}", index + 1, e);
            }
            return;
        }

        if self.sequence_mode {
            info!("Play-all finished");
        }
        self.sequence_mode = false;
        self.emit_status();
    }

    /// The track on `handle` failed to load, decode or play
    pub fn track_failed(&mut self, handle: HandleId, detail: Option<String>) {
        let Some(index) = self.current_index_for(handle) else {
            debug!("Ignoring error signal from stale handle {}", handle);
            return;
        };

        error!(
            "Track {} ({}) failed: {}",
            index,
            self.tracks[index].locator,
            detail.as_deref().unwrap_or("unknown error")
        );

        // Playing and Loading both fall back to Paused
        let before = self.status();
        self.is_playing = false;
        if let Some(active) = self.active.as_mut() {
            active.start_pending = false;
        }
        self.show_notice(index);
        if self.status() != before {
            self.emit_status();
        }

        if !self.sequence_mode {
            return;
        }

        if index + 1 < self.tracks.len() {
            self.schedule_skip(Some(handle), index);
        } else {
            info!("Last track failed, ending play-all");
            self.sequence_mode = false;
            self.stop();
        }
    }

    /// A pending start on `handle` resolved
    pub fn start_settled(&mut self, handle: HandleId, result: std::result::Result<(), String>) {
        let Some(active) = self.active.as_mut() else {
            debug!("Ignoring start result for {}: nothing loaded", handle);
            return;
        };

        if active.handle.id() != handle {
            debug!("Ignoring start result from stale handle {}", handle);
            return;
        }

        if !active.start_pending {
            debug!("Ignoring start result for {}: start was abandoned", handle);
            return;
        }

        active.start_pending = false;
        match result {
            Ok(()) => self.on_started(),
            Err(reason) => {
                warn!("Track {} failed to start: {}", active.index, reason);
                self.is_playing = false;
                self.emit_status();
            }
        }
    }

    // ===== Deferred Tasks =====

    /// Run every deferred task that is due
    pub fn run_due_tasks(&mut self) {
        let now = self.clock.now();

        while let Some((id, task)) = self.tasks.pop_due(now) {
            match task {
                Deferred::ClearNotice => {
                    if matches!(self.notice, Some((_, current)) if current == id) {
                        self.notice = None;
                        self.emit(PlaybackEvent::NoticeCleared);
                    }
                }
                Deferred::SkipFailedTrack { handle, index } => {
                    if self.pending_skip == Some(id) {
                        self.pending_skip = None;
                    }

                    let still_current = match handle {
                        Some(handle) => self.current_index_for(handle).is_some(),
                        None => self.active.is_none(),
                    };
                    if !self.sequence_mode || !still_current {
                        debug!("Dropping stale skip after track {}", index);
                        continue;
                    }

                    if let Err(e) = self.play(index + 1, PlayOrigin::SequenceAdvance) {
                        warn!("Play-all could not skip to track {}: {}", index + 1, e);
                    }
                }
            }
        }
    }

    /// When the next deferred task falls due, on the controller's clock
    pub fn next_deadline(&self) -> Option<Duration> {
        self.tasks.next_deadline()
    }

    /// Time from now until the next deferred task falls due
    pub fn time_until_next_task(&self) -> Option<Duration> {
        self.next_deadline()
            .map(|due| due.saturating_sub(self.clock.now()))
    }

    // ===== State Queries =====

    /// Track at the current index, if any
    pub fn current_track(&self) -> Option<&Track> {
        self.active
            .as_ref()
            .and_then(|active| self.tracks.get(active.index))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.active.as_ref().map(|active| active.index)
    }

    /// Id of the loaded handle, for routing platform signals
    pub fn active_handle(&self) -> Option<HandleId> {
        self.active.as_ref().map(|active| active.handle.id())
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// A start request is in flight
    pub fn is_loading(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.start_pending)
    }

    pub fn is_sequence_mode(&self) -> bool {
        self.sequence_mode
    }

    pub fn status(&self) -> PlaybackStatus {
        match &self.active {
            None => PlaybackStatus::Idle,
            Some(_) if self.is_playing => PlaybackStatus::Playing,
            Some(active) if active.start_pending => PlaybackStatus::Loading,
            Some(_) => PlaybackStatus::Paused,
        }
    }

    /// Error notice currently on screen
    pub fn current_notice(&self) -> Option<&ErrorNotice> {
        self.notice.as_ref().map(|(notice, _)| notice)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn config(&self) -> &JukeboxConfig {
        &self.config
    }

    /// Snapshot of the observable state
    pub fn playback_state(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: self.status(),
            is_playing: self.is_playing,
            current_index: self.current_index(),
            volume: self.volume.level(),
            is_muted: self.volume.is_muted(),
            is_sequence_mode: self.sequence_mode,
            current_track: self.current_track().cloned(),
        }
    }

    // ===== Internals =====

    /// Index of the active track if `handle` is the active handle
    fn current_index_for(&self, handle: HandleId) -> Option<usize> {
        self.active
            .as_ref()
            .filter(|active| active.handle.id() == handle)
            .map(|active| active.index)
    }

    fn apply_start_outcome(&mut self, outcome: StartOutcome) -> Result<()> {
        match outcome {
            StartOutcome::Started => {
                self.on_started();
                Ok(())
            }
            StartOutcome::Pending => {
                if let Some(active) = self.active.as_mut() {
                    active.start_pending = true;
                }
                self.emit_status();
                Ok(())
            }
            StartOutcome::Failed(reason) => {
                warn!("Playback failed to start: {}", reason);
                self.is_playing = false;
                self.emit_status();
                Err(JukeboxError::StartFailed(reason))
            }
        }
    }

    /// Audio is confirmed playing on the active handle
    fn on_started(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        self.is_playing = true;

        if active.announced {
            self.emit_status();
            return;
        }

        active.announced = true;
        let index = active.index;
        let track = self.tracks[index].clone();
        info!("Now playing {}: {} - {}", index, track.artist, track.title);
        self.emit(PlaybackEvent::SongChanged { index, track });
    }

    /// Pause, rewind and drop the active handle. Returns whether one existed.
    fn release_active(&mut self) -> bool {
        self.is_playing = false;

        match self.active.take() {
            Some(mut active) => {
                active.handle.pause();
                active.handle.rewind();
                debug!("Released handle {}", active.handle.id());
                true
            }
            None => false,
        }
    }

    /// Schedule the move past a failed track at `index`, replacing any
    /// skip already pending
    fn schedule_skip(&mut self, handle: Option<HandleId>, index: usize) {
        self.cancel_pending_skip();
        let delay = self.config.error_skip_delay();
        let task = self.tasks.schedule(
            self.clock.now() + delay,
            Deferred::SkipFailedTrack { handle, index },
        );
        self.pending_skip = Some(task);
        debug!("Skipping to track {} in {:?}", index + 1, delay);
    }

    fn cancel_pending_skip(&mut self) {
        if let Some(task) = self.pending_skip.take() {
            if self.tasks.cancel(task) {
                debug!("Cancelled pending play-all skip");
            }
        }
    }

    fn apply_level(&mut self) {
        let level = self.volume.effective();
        if let Some(active) = self.active.as_mut() {
            active.handle.set_level(level);
        }
    }

    /// Show an error notice for `index`, replacing any current one
    fn show_notice(&mut self, index: usize) {
        if let Some((_, task)) = self.notice.take() {
            self.tasks.cancel(task);
        }

        let notice = ErrorNotice::for_track(index, &self.tracks[index]);
        let due = self.clock.now() + self.config.error_notice_duration();
        let task = self.tasks.schedule(due, Deferred::ClearNotice);
        self.notice = Some((notice.clone(), task));

        self.emit(PlaybackEvent::TrackError { notice });
    }

    fn emit(&mut self, event: PlaybackEvent) {
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }

    fn emit_status(&mut self) {
        let status = self.status();
        self.emit(PlaybackEvent::StateChanged { status });
    }

    fn emit_volume_changed(&mut self) {
        let event = PlaybackEvent::VolumeChanged {
            volume: self.volume.level(),
            muted: self.volume.is_muted(),
        };
        self.emit(event);
    }
}
