/// Simulated audio deck driving the playback controller
///
/// Tracks "play" on a headless deck. The simulation watches which handle is
/// live and whether it is playing, counts down its playing time, and feeds
/// the controller the "ended" or "error" signal a browser would raise.
use crate::command::Command;
use crate::config::{SimConfig, SimTrack};
use crate::error::Result;
use soul_jukebox::{
    Clock, EventQueue, HandleId, HandleStatus, HeadlessDeck, ManualClock, PlayOrigin,
    PlaybackController, PlaybackEvent,
};
use std::time::Duration;
use tracing::debug;

/// Countdown for the live handle
#[derive(Debug, Clone)]
struct Playhead {
    handle: HandleId,

    /// Playing time of a full run (ends or fails)
    full: Duration,

    /// Playing time left in this run
    remaining: Duration,

    /// The run ends in a media error instead of "ended"
    fails: bool,

    /// Start of the current playing stretch
    playing_since: Option<Duration>,
}

impl Playhead {
    fn due(&self) -> Option<Duration> {
        self.playing_since.map(|since| since + self.remaining)
    }
}

pub struct Simulation {
    controller: PlaybackController,
    deck: HeadlessDeck,
    clock: ManualClock,
    events: EventQueue,
    tracks: Vec<SimTrack>,
    playhead: Option<Playhead>,
}

impl Simulation {
    pub fn new(config: &SimConfig) -> Result<Self> {
        config.validate()?;

        let deck = HeadlessDeck::new();
        for track in &config.tracks {
            if track.fail_on_open {
                deck.refuse_open(&track.locator);
            }
            if track.fail_on_start {
                deck.refuse_start(&track.locator);
            }
        }

        let clock = ManualClock::new();
        let events = EventQueue::new();
        let mut controller = PlaybackController::new(
            config.playlist(),
            Box::new(deck.backend()),
            Box::new(clock.clone()),
            config.player.clone(),
        );
        controller.subscribe(events.clone());

        Ok(Self {
            controller,
            deck,
            clock,
            events,
            tracks: config.tracks.clone(),
            playhead: None,
        })
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    /// Events emitted since the last drain
    pub fn drain_events(&self) -> Vec<PlaybackEvent> {
        self.events.drain()
    }

    /// Simulation time
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Run a command at time `now`
    ///
    /// Commands that only read state (`status`, `list`, `help`, `quit`) do
    /// nothing here.
    pub fn execute(&mut self, command: &Command, now: Duration) -> Result<()> {
        self.advance_to(now);

        let result = match command {
            Command::Play(index) => self.controller.play(*index, PlayOrigin::Manual),
            Command::PlayAll => self.controller.play_all(),
            Command::Pause => {
                self.controller.pause();
                Ok(())
            }
            Command::Resume => self.controller.resume(),
            Command::Toggle => self.controller.toggle_playback(),
            Command::Stop => {
                self.controller.stop();
                Ok(())
            }
            Command::Volume(level) => {
                self.controller.set_volume(*level);
                Ok(())
            }
            Command::Mute => {
                self.controller.mute();
                Ok(())
            }
            Command::Unmute => {
                self.controller.unmute();
                Ok(())
            }
            Command::ToggleMute => {
                self.controller.toggle_mute();
                Ok(())
            }
            Command::Status | Command::List | Command::Help | Command::Quit => Ok(()),
        };

        self.reconcile();
        result.map_err(Into::into)
    }

    /// Move time forward to `now`
    ///
    /// Track ends and deferred controller tasks that fall due on the way are
    /// handled in time order, each at its own instant.
    pub fn advance_to(&mut self, now: Duration) {
        loop {
            let track_due = self.playhead.as_ref().and_then(Playhead::due);
            let Some(next) = earliest(track_due, self.controller.next_deadline()) else {
                break;
            };
            if next > now {
                break;
            }

            self.clock.set(next);
            if track_due == Some(next) {
                self.finish_run();
            } else {
                self.controller.run_due_tasks();
            }
            self.reconcile();
        }

        self.clock.set(now);
        self.reconcile();
    }

    /// When something will next happen without user input
    pub fn next_wakeup(&self) -> Option<Duration> {
        earliest(
            self.playhead.as_ref().and_then(Playhead::due),
            self.controller.next_deadline(),
        )
    }

    /// The live handle reached the end of its run
    fn finish_run(&mut self) {
        let Some(playhead) = self.playhead.as_mut() else {
            return;
        };

        // A replay of the same element starts over
        let handle = playhead.handle;
        let fails = playhead.fails;
        playhead.remaining = playhead.full;
        playhead.playing_since = None;

        let signal = if fails {
            debug!("Simulated media error on {}", handle);
            self.deck.fail(handle, "simulated media error")
        } else {
            debug!("Simulated end of track on {}", handle);
            self.deck.finish(handle)
        };
        self.controller.handle_signal(signal);
    }

    /// Sync the playhead with the deck after the controller acted
    fn reconcile(&mut self) {
        let now = self.clock.now();

        let Some(live) = self.deck.live() else {
            self.playhead = None;
            return;
        };

        if self.playhead.as_ref().map(|p| p.handle) != Some(live.id) {
            let Some(track) = self
                .controller
                .current_index()
                .and_then(|index| self.tracks.get(index))
            else {
                self.playhead = None;
                return;
            };

            let (full, fails) = track.playing_time();
            self.playhead = Some(Playhead {
                handle: live.id,
                full,
                remaining: full,
                fails,
                playing_since: None,
            });
        }

        let Some(playhead) = self.playhead.as_mut() else {
            return;
        };

        let playing = live.status == HandleStatus::Playing;
        match playhead.playing_since {
            None if playing => playhead.playing_since = Some(now),
            Some(since) if !playing => {
                playhead.remaining = playhead.remaining.saturating_sub(now - since);
                playhead.playing_since = None;
            }
            _ => {}
        }
    }
}

fn earliest(a: Option<Duration>, b: Option<Duration>) -> Option<Duration> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
