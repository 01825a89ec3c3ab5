//! Integration tests for the playback controller
//!
//! These tests drive complete jukebox scenarios through the public API:
//! "play all" runs, skip-on-error, manual selection, volume handling.

use soul_jukebox::{
    EventQueue, HandleStatus, HeadlessDeck, JukeboxConfig, JukeboxError, ManualClock,
    PlayOrigin, PlaybackController, PlaybackEvent, PlaybackStatus, Track,
};
use std::time::Duration;

// ===== Test Helpers =====

struct Jukebox {
    controller: PlaybackController,
    deck: HeadlessDeck,
    clock: ManualClock,
    events: EventQueue,
}

impl Jukebox {
    fn with_tracks(n: usize) -> Self {
        Self::with_config(n, JukeboxConfig::default())
    }

    fn with_config(n: usize, config: JukeboxConfig) -> Self {
        let deck = HeadlessDeck::new();
        let clock = ManualClock::new();
        let events = EventQueue::new();

        let mut controller = PlaybackController::new(
            playlist(n),
            Box::new(deck.backend()),
            Box::new(clock.clone()),
            config,
        );
        controller.subscribe(events.clone());

        Self {
            controller,
            deck,
            clock,
            events,
        }
    }

    /// Deliver "ended" for the active handle
    fn end_current(&mut self) {
        let handle = self.controller.active_handle().expect("no active handle");
        let signal = self.deck.finish(handle);
        self.controller.handle_signal(signal);
    }

    /// Deliver "error" for the active handle
    fn fail_current(&mut self) {
        let handle = self.controller.active_handle().expect("no active handle");
        let signal = self.deck.fail(handle, "decode error");
        self.controller.handle_signal(signal);
    }

    /// Move the clock forward and run whatever fell due
    fn advance(&mut self, by: Duration) {
        self.clock.advance(by);
        self.controller.run_due_tasks();
    }

    fn song_changes(&self) -> Vec<usize> {
        self.events
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                PlaybackEvent::SongChanged { index, .. } => Some(index),
                _ => None,
            })
            .collect()
    }
}

fn playlist(n: usize) -> Vec<Track> {
    (0..n)
        .map(|i| {
            Track::new(
                format!("Track {i}"),
                format!("Artist {i}"),
                format!("audio/track{i}.mp3"),
            )
        })
        .collect()
}

// ===== Play All =====

#[test]
fn play_all_advances_through_every_track_then_clears_sequence() {
    let mut jukebox = Jukebox::with_tracks(3);

    jukebox.controller.play_all().unwrap();
    assert_eq!(jukebox.controller.current_index(), Some(0));
    assert!(jukebox.controller.is_sequence_mode());
    assert!(jukebox.controller.is_playing());

    jukebox.end_current();
    assert_eq!(jukebox.controller.current_index(), Some(1));
    assert!(jukebox.controller.is_sequence_mode());

    jukebox.end_current();
    assert_eq!(jukebox.controller.current_index(), Some(2));
    assert!(jukebox.controller.is_sequence_mode());

    jukebox.end_current();
    assert_eq!(jukebox.controller.current_index(), Some(2));
    assert!(!jukebox.controller.is_sequence_mode());
    assert!(!jukebox.controller.is_playing());
    assert_eq!(jukebox.controller.status(), PlaybackStatus::Paused);

    assert_eq!(jukebox.song_changes(), vec![0, 1, 2]);
}

#[test]
fn play_all_over_many_tracks_visits_each_in_order() {
    let n = 12;
    let mut jukebox = Jukebox::with_tracks(n);

    jukebox.controller.play_all().unwrap();
    for expected in 0..n {
        assert_eq!(jukebox.controller.current_index(), Some(expected));
        jukebox.end_current();
    }

    assert!(!jukebox.controller.is_sequence_mode());
    assert_eq!(jukebox.song_changes(), (0..n).collect::<Vec<_>>());
    assert_eq!(jukebox.deck.opened_count(), n);
    assert_eq!(jukebox.deck.live_count(), 1);
}

#[test]
fn play_all_restarts_from_first_track() {
    let mut jukebox = Jukebox::with_tracks(4);

    jukebox.controller.play(3, PlayOrigin::Manual).unwrap();
    jukebox.controller.play_all().unwrap();

    assert_eq!(jukebox.controller.current_index(), Some(0));
    assert!(jukebox.controller.is_sequence_mode());
}

#[test]
fn play_all_on_empty_playlist_is_rejected_silently() {
    let mut jukebox = Jukebox::with_tracks(0);

    let result = jukebox.controller.play_all();

    assert_eq!(result, Err(JukeboxError::EmptyPlaylist));
    assert!(!jukebox.controller.is_sequence_mode());
    assert_eq!(jukebox.controller.current_index(), None);
    assert!(jukebox.events.is_empty());
    assert_eq!(jukebox.deck.opened_count(), 0);
}

#[test]
fn manual_play_during_play_all_ends_sequence() {
    for k in 0..3 {
        let mut jukebox = Jukebox::with_tracks(3);
        jukebox.controller.play_all().unwrap();

        jukebox.controller.play(k, PlayOrigin::Manual).unwrap();

        assert!(!jukebox.controller.is_sequence_mode(), "k = {k}");
        assert_eq!(jukebox.controller.current_index(), Some(k));

        // The manual track's end no longer advances
        jukebox.end_current();
        assert_eq!(jukebox.controller.current_index(), Some(k));
    }
}

#[test]
fn stop_during_play_all_ends_sequence() {
    let mut jukebox = Jukebox::with_tracks(3);
    jukebox.controller.play_all().unwrap();
    jukebox.events.drain();

    jukebox.controller.stop();

    assert!(!jukebox.controller.is_sequence_mode());
    assert_eq!(jukebox.controller.current_index(), None);
    assert_eq!(jukebox.controller.active_handle(), None);
    assert_eq!(jukebox.deck.live_count(), 0);
    assert_eq!(jukebox.events.drain(), vec![PlaybackEvent::PlaybackStopped]);
}

// ===== Errors =====

#[test]
fn error_in_play_all_skips_after_delay_and_last_error_stops() {
    let mut jukebox = Jukebox::with_tracks(3);
    jukebox.controller.play_all().unwrap();

    jukebox.fail_current();

    // Notice is up, but the skip waits for its delay
    let notice = jukebox.controller.current_notice().cloned().unwrap();
    assert_eq!(notice.index, 0);
    assert!(notice.message.contains("Track 0"));
    assert!(notice.message.contains("Artist 0"));
    assert_eq!(jukebox.controller.current_index(), Some(0));

    jukebox.advance(Duration::from_millis(499));
    assert_eq!(jukebox.controller.current_index(), Some(0));

    jukebox.advance(Duration::from_millis(1));
    assert_eq!(jukebox.controller.current_index(), Some(1));
    assert!(jukebox.controller.is_sequence_mode());
    assert!(jukebox.controller.is_playing());

    jukebox.end_current();
    assert_eq!(jukebox.controller.current_index(), Some(2));

    jukebox.events.drain();
    jukebox.fail_current();

    assert!(!jukebox.controller.is_sequence_mode());
    assert_eq!(jukebox.controller.current_index(), None);
    assert_eq!(jukebox.controller.active_handle(), None);
    assert_eq!(jukebox.deck.live_count(), 0);
    assert_eq!(jukebox.controller.next_deadline(), Some(Duration::from_millis(5500)));

    let events = jukebox.events.drain();
    assert!(matches!(events[0], PlaybackEvent::TrackError { ref notice } if notice.index == 2));
    assert!(events.contains(&PlaybackEvent::PlaybackStopped));
}

#[test]
fn error_during_manual_play_only_shows_notice() {
    let mut jukebox = Jukebox::with_tracks(3);
    jukebox.controller.play(0, PlayOrigin::Manual).unwrap();

    jukebox.fail_current();

    assert_eq!(jukebox.controller.current_index(), Some(0));
    assert!(!jukebox.controller.is_playing());
    assert!(jukebox.controller.current_notice().is_some());

    // Only the notice expiry is scheduled, never a skip
    jukebox.advance(Duration::from_secs(1));
    assert_eq!(jukebox.controller.current_index(), Some(0));
    assert_eq!(jukebox.deck.opened_count(), 1);

    jukebox.advance(Duration::from_secs(4));
    assert!(jukebox.controller.current_notice().is_none());
    assert_eq!(jukebox.controller.next_deadline(), None);
}

#[test]
fn stop_cancels_pending_skip() {
    let mut jukebox = Jukebox::with_tracks(3);
    jukebox.controller.play_all().unwrap();
    jukebox.fail_current();

    jukebox.controller.stop();
    jukebox.advance(Duration::from_secs(1));

    assert_eq!(jukebox.controller.current_index(), None);
    assert_eq!(jukebox.deck.opened_count(), 1);
}

#[test]
fn manual_play_cancels_pending_skip() {
    let mut jukebox = Jukebox::with_tracks(4);
    jukebox.controller.play_all().unwrap();
    jukebox.fail_current();

    jukebox.controller.play(3, PlayOrigin::Manual).unwrap();
    jukebox.advance(Duration::from_secs(1));

    assert_eq!(jukebox.controller.current_index(), Some(3));
    assert_eq!(jukebox.deck.opened_count(), 2);
    assert!(!jukebox.controller.is_sequence_mode());
}

#[test]
fn play_all_during_pending_skip_restarts_cleanly() {
    let mut jukebox = Jukebox::with_tracks(3);
    jukebox.controller.play_all().unwrap();
    jukebox.end_current();
    jukebox.fail_current();

    jukebox.controller.play_all().unwrap();
    jukebox.advance(Duration::from_secs(1));

    assert_eq!(jukebox.controller.current_index(), Some(0));
    assert!(jukebox.controller.is_sequence_mode());
}

#[test]
fn skip_delay_and_notice_duration_follow_config() {
    let config = JukeboxConfig {
        error_skip_delay_ms: 50,
        error_notice_ms: 200,
        ..JukeboxConfig::default()
    };
    let mut jukebox = Jukebox::with_config(3, config);
    jukebox.controller.play_all().unwrap();
    jukebox.fail_current();

    jukebox.advance(Duration::from_millis(50));
    assert_eq!(jukebox.controller.current_index(), Some(1));
    assert!(jukebox.controller.current_notice().is_some());

    jukebox.advance(Duration::from_millis(150));
    assert!(jukebox.controller.current_notice().is_none());
}

#[test]
fn unopenable_track_in_play_all_is_skipped_after_delay() {
    let mut jukebox = Jukebox::with_tracks(3);
    jukebox.deck.refuse_open("audio/track1.mp3");
    jukebox.controller.play_all().unwrap();
    jukebox.events.drain();

    jukebox.end_current();

    // Nothing is loaded while the skip waits, but the run goes on
    assert_eq!(jukebox.controller.current_index(), None);
    assert!(jukebox.controller.is_sequence_mode());
    assert_eq!(jukebox.controller.current_notice().map(|n| n.index), Some(1));
    let events = jukebox.events.drain();
    assert!(!events.contains(&PlaybackEvent::PlaybackStopped));
    assert!(events.contains(&PlaybackEvent::StateChanged {
        status: PlaybackStatus::Idle
    }));

    jukebox.advance(Duration::from_millis(499));
    assert_eq!(jukebox.controller.current_index(), None);

    jukebox.advance(Duration::from_millis(1));
    assert_eq!(jukebox.controller.current_index(), Some(2));
    assert!(jukebox.controller.is_playing());
    assert!(jukebox.controller.is_sequence_mode());
    assert_eq!(jukebox.song_changes(), vec![2]);
}

#[test]
fn unopenable_first_track_still_starts_the_run() {
    let mut jukebox = Jukebox::with_tracks(2);
    jukebox.deck.refuse_open("audio/track0.mp3");

    let result = jukebox.controller.play_all();

    assert!(matches!(result, Err(JukeboxError::Backend(_))));
    assert!(jukebox.controller.is_sequence_mode());

    jukebox.advance(Duration::from_millis(500));
    assert_eq!(jukebox.controller.current_index(), Some(1));
    assert_eq!(jukebox.song_changes(), vec![1]);
}

#[test]
fn unopenable_last_track_ends_play_all() {
    let mut jukebox = Jukebox::with_tracks(2);
    jukebox.deck.refuse_open("audio/track1.mp3");
    jukebox.controller.play_all().unwrap();
    jukebox.events.drain();

    jukebox.end_current();

    assert_eq!(jukebox.controller.current_index(), None);
    assert!(!jukebox.controller.is_sequence_mode());
    assert!(jukebox.events.drain().contains(&PlaybackEvent::PlaybackStopped));

    // Only the notice expiry remains
    assert_eq!(jukebox.controller.next_deadline(), Some(Duration::from_secs(5)));
}

#[test]
fn stop_cancels_skip_past_unopenable_track() {
    let mut jukebox = Jukebox::with_tracks(3);
    jukebox.deck.refuse_open("audio/track1.mp3");
    jukebox.controller.play_all().unwrap();
    jukebox.end_current();

    jukebox.controller.stop();
    jukebox.advance(Duration::from_secs(1));

    assert_eq!(jukebox.controller.current_index(), None);
    assert!(!jukebox.controller.is_sequence_mode());
    assert_eq!(jukebox.deck.opened_count(), 1);
}

#[test]
fn start_failure_does_not_advance() {
    let mut jukebox = Jukebox::with_tracks(3);
    jukebox.deck.refuse_start("audio/track0.mp3");

    let result = jukebox.controller.play_all();

    assert!(matches!(result, Err(JukeboxError::StartFailed(_))));
    assert_eq!(jukebox.controller.current_index(), Some(0));
    assert!(!jukebox.controller.is_playing());

    jukebox.advance(Duration::from_secs(10));
    assert_eq!(jukebox.controller.current_index(), Some(0));
}

// ===== Handles and Volume =====

#[test]
fn every_transition_releases_the_previous_handle() {
    let mut jukebox = Jukebox::with_tracks(3);

    jukebox.controller.play(0, PlayOrigin::Manual).unwrap();
    jukebox.controller.play(1, PlayOrigin::Manual).unwrap();
    jukebox.controller.play(1, PlayOrigin::Manual).unwrap();

    let records = jukebox.deck.records();
    assert_eq!(records.len(), 3);
    for record in &records[..2] {
        assert_eq!(record.status, HandleStatus::Released);
        assert_eq!(record.rewinds, 1);
    }
    assert_eq!(records[2].status, HandleStatus::Playing);
    assert_eq!(jukebox.deck.live_count(), 1);
}

#[test]
fn volume_and_mute_carry_over_to_next_track() {
    let mut jukebox = Jukebox::with_tracks(3);
    jukebox.controller.set_volume(0.4);
    jukebox.controller.mute();

    jukebox.controller.play_all().unwrap();
    assert_eq!(jukebox.deck.live().unwrap().level, 0.0);

    jukebox.controller.unmute();
    assert_eq!(jukebox.deck.live().unwrap().level, 0.4);

    jukebox.end_current();
    assert_eq!(jukebox.deck.live().unwrap().level, 0.4);
    assert_eq!(jukebox.controller.volume(), 0.4);
}

#[test]
fn mute_then_unmute_restores_exact_volume() {
    let mut jukebox = Jukebox::with_tracks(1);
    jukebox.controller.play(0, PlayOrigin::Manual).unwrap();

    jukebox.controller.set_volume(0.37);
    jukebox.controller.mute();
    assert_eq!(jukebox.controller.volume(), 0.37);
    jukebox.controller.set_volume(0.8);
    assert_eq!(jukebox.deck.live().unwrap().level, 0.0);

    jukebox.controller.unmute();
    assert_eq!(jukebox.controller.volume(), 0.8);
    assert_eq!(jukebox.deck.live().unwrap().level, 0.8);
}

#[test]
fn snapshot_reflects_state() {
    let mut jukebox = Jukebox::with_tracks(2);
    jukebox.controller.play_all().unwrap();
    jukebox.controller.set_volume(0.5);

    let snapshot = jukebox.controller.playback_state();

    assert_eq!(snapshot.status, PlaybackStatus::Playing);
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.current_index, Some(0));
    assert_eq!(snapshot.volume, 0.5);
    assert!(!snapshot.is_muted);
    assert!(snapshot.is_sequence_mode);
    assert_eq!(snapshot.current_track.unwrap().title, "Track 0");

    let json = serde_json::to_value(jukebox.controller.playback_state()).unwrap();
    assert_eq!(json["status"], "playing");
    assert_eq!(json["currentIndex"], 0);
    assert_eq!(json["isSequenceMode"], true);
}
