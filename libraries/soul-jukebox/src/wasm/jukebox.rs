//! JavaScript-facing jukebox
//!
//! Wraps the [`PlaybackController`] with a JS-friendly API. Controller
//! events are buffered and handed to JS callbacks only after the
//! controller borrow is released, so callbacks may call straight back into
//! the jukebox.

use super::audio::{HtmlAudioBackend, PerformanceClock, SignalSink};
use crate::{
    EventQueue, JukeboxConfig, JukeboxError, MediaSignal, PlayOrigin, PlaybackController,
    PlaybackEvent, Track,
};
use js_sys::Function;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use wasm_bindgen::{closure::Closure, prelude::*, JsCast};

#[derive(Default)]
struct Callbacks {
    on_song_changed: Option<Function>,
    on_playback_stopped: Option<Function>,
    on_state_change: Option<Function>,
    on_volume_change: Option<Function>,
    on_error_notice: Option<Function>,
    on_notice_cleared: Option<Function>,
}

struct Shared {
    controller: RefCell<PlaybackController>,
    events: EventQueue,
    callbacks: RefCell<Callbacks>,
    /// Signals waiting for the controller to be free
    signals: RefCell<VecDeque<MediaSignal>>,
    /// Bumped on every timer arm; older timers see a mismatch and do nothing
    timer_generation: Cell<u64>,
    this: Weak<Shared>,
}

impl Shared {
    /// Run `f` against the controller, then deliver events and re-arm the timer
    fn with_controller<R>(&self, f: impl FnOnce(&mut PlaybackController) -> R) -> R {
        let result = f(&mut self.controller.borrow_mut());
        self.pump_signals();
        self.flush_events();
        self.arm_timer();
        result
    }

    fn enqueue_signal(&self, signal: MediaSignal) {
        self.signals.borrow_mut().push_back(signal);
        if self.controller.try_borrow_mut().is_ok() {
            self.pump_signals();
            self.flush_events();
            self.arm_timer();
        }
    }

    fn pump_signals(&self) {
        loop {
            let Some(signal) = self.signals.borrow_mut().pop_front() else {
                break;
            };
            self.controller.borrow_mut().handle_signal(signal);
        }
    }

    fn arm_timer(&self) {
        let Some(delay) = self.controller.borrow().time_until_next_task() else {
            return;
        };

        let generation = self.timer_generation.get() + 1;
        self.timer_generation.set(generation);

        let Some(window) = web_sys::window() else {
            return;
        };

        let weak = self.this.clone();
        let callback = Closure::once_into_js(move || {
            if let Some(shared) = weak.upgrade() {
                if shared.timer_generation.get() == generation {
                    shared.with_controller(|c| c.run_due_tasks());
                }
            }
        });

        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        if let Err(e) = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            millis,
        ) {
            web_sys::console::error_1(&e);
        }
    }

    fn flush_events(&self) {
        for event in self.events.drain() {
            let (callback, payload) = {
                let callbacks = self.callbacks.borrow();
                match &event {
                    PlaybackEvent::SongChanged { .. } => (callbacks.on_song_changed.clone(), true),
                    PlaybackEvent::PlaybackStopped => (callbacks.on_playback_stopped.clone(), false),
                    PlaybackEvent::StateChanged { .. } => (callbacks.on_state_change.clone(), true),
                    PlaybackEvent::VolumeChanged { .. } => (callbacks.on_volume_change.clone(), true),
                    PlaybackEvent::TrackError { .. } => (callbacks.on_error_notice.clone(), true),
                    PlaybackEvent::NoticeCleared => (callbacks.on_notice_cleared.clone(), false),
                }
            };

            let Some(callback) = callback else {
                continue;
            };

            let result = if payload {
                match serde_wasm_bindgen::to_value(&event) {
                    Ok(value) => callback.call1(&JsValue::NULL, &value),
                    Err(e) => Err(JsValue::from_str(&e.to_string())),
                }
            } else {
                callback.call0(&JsValue::NULL)
            };

            if let Err(e) = result {
                web_sys::console::error_1(&e);
            }
        }
    }
}

/// WASM-compatible jukebox
#[wasm_bindgen]
pub struct WasmJukebox {
    shared: Rc<Shared>,
}

#[wasm_bindgen]
impl WasmJukebox {
    /// Create a jukebox over `tracks` (`[{title, artist, locator}]`)
    ///
    /// `config` may be `undefined` for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(tracks: JsValue, config: JsValue) -> Result<WasmJukebox, JsValue> {
        // Enable panic hooks for better error messages in console
        console_error_panic_hook::set_once();

        let tracks: Vec<Track> = serde_wasm_bindgen::from_value(tracks)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse tracks: {}", e)))?;

        let config: JukeboxConfig = if config.is_undefined() || config.is_null() {
            JukeboxConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Failed to parse config: {}", e)))?
        };
        config
            .validate()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        let shared = Rc::new_cyclic(|this: &Weak<Shared>| {
            let sink_target = this.clone();
            let sink: SignalSink = Rc::new(move |signal: MediaSignal| {
                if let Some(shared) = sink_target.upgrade() {
                    shared.enqueue_signal(signal);
                }
            });

            let events = EventQueue::new();
            let mut controller = PlaybackController::new(
                tracks,
                Box::new(HtmlAudioBackend::new(sink)),
                Box::new(PerformanceClock),
                config,
            );
            controller.subscribe(events.clone());

            Shared {
                controller: RefCell::new(controller),
                events,
                callbacks: RefCell::new(Callbacks::default()),
                signals: RefCell::new(VecDeque::new()),
                timer_generation: Cell::new(0),
                this: this.clone(),
            }
        });

        Ok(Self { shared })
    }

    // ===== Playback Control =====

    /// Play the track at `index`. Returns false if the request was rejected.
    pub fn play(&self, index: i32) -> bool {
        let Ok(index) = usize::try_from(index) else {
            let len = self.shared.controller.borrow().track_count();
            return self.report(JukeboxError::InvalidIndex {
                index: i64::from(index),
                len,
            });
        };

        match self
            .shared
            .with_controller(|c| c.play(index, PlayOrigin::Manual))
        {
            Ok(()) => true,
            Err(e) => self.report(e),
        }
    }

    /// Play every track from the first
    #[wasm_bindgen(js_name = playAll)]
    pub fn play_all(&self) -> bool {
        match self.shared.with_controller(|c| c.play_all()) {
            Ok(()) => true,
            Err(e) => self.report(e),
        }
    }

    pub fn pause(&self) {
        self.shared.with_controller(|c| c.pause());
    }

    pub fn resume(&self) -> bool {
        match self.shared.with_controller(|c| c.resume()) {
            Ok(()) => true,
            Err(e) => self.report(e),
        }
    }

    #[wasm_bindgen(js_name = togglePlayback)]
    pub fn toggle_playback(&self) -> bool {
        match self.shared.with_controller(|c| c.toggle_playback()) {
            Ok(()) => true,
            Err(e) => self.report(e),
        }
    }

    pub fn stop(&self) {
        self.shared.with_controller(|c| c.stop());
    }

    // ===== Volume Control =====

    /// Set volume (0.0 - 1.0, clamped)
    #[wasm_bindgen(js_name = setVolume)]
    pub fn set_volume(&self, level: f64) {
        self.shared
            .with_controller(|c| c.set_volume(level as f32));
    }

    /// Get stored volume (0.0 - 1.0), unchanged while muted
    #[wasm_bindgen(js_name = getVolume)]
    pub fn get_volume(&self) -> f64 {
        f64::from(self.shared.controller.borrow().volume())
    }

    pub fn mute(&self) {
        self.shared.with_controller(|c| c.mute());
    }

    pub fn unmute(&self) {
        self.shared.with_controller(|c| c.unmute());
    }

    #[wasm_bindgen(js_name = toggleMute)]
    pub fn toggle_mute(&self) {
        self.shared.with_controller(|c| c.toggle_mute());
    }

    #[wasm_bindgen(js_name = isMuted)]
    pub fn is_muted(&self) -> bool {
        self.shared.controller.borrow().is_muted()
    }

    // ===== State Queries =====

    /// Current track as `{title, artist, locator}`, or null
    #[wasm_bindgen(js_name = getCurrentTrack)]
    pub fn get_current_track(&self) -> JsValue {
        let controller = self.shared.controller.borrow();
        match controller.current_track() {
            Some(track) => serde_wasm_bindgen::to_value(track).unwrap_or(JsValue::NULL),
            None => JsValue::NULL,
        }
    }

    /// Snapshot of the playback state
    #[wasm_bindgen(js_name = getPlaybackState)]
    pub fn get_playback_state(&self) -> JsValue {
        let snapshot = self.shared.controller.borrow().playback_state();
        serde_wasm_bindgen::to_value(&snapshot).unwrap_or(JsValue::NULL)
    }

    /// The full playlist
    #[wasm_bindgen(js_name = getTracks)]
    pub fn get_tracks(&self) -> JsValue {
        let controller = self.shared.controller.borrow();
        serde_wasm_bindgen::to_value(controller.tracks()).unwrap_or(JsValue::NULL)
    }

    /// Error notice currently shown, or null
    #[wasm_bindgen(js_name = getErrorNotice)]
    pub fn get_error_notice(&self) -> JsValue {
        let controller = self.shared.controller.borrow();
        match controller.current_notice() {
            Some(notice) => serde_wasm_bindgen::to_value(notice).unwrap_or(JsValue::NULL),
            None => JsValue::NULL,
        }
    }

    // ===== Event Listeners =====

    /// Register song changed callback (`{type, index, track}`)
    #[wasm_bindgen(js_name = onSongChanged)]
    pub fn on_song_changed(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().on_song_changed = Some(callback);
    }

    /// Register playback stopped callback
    #[wasm_bindgen(js_name = onPlaybackStopped)]
    pub fn on_playback_stopped(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().on_playback_stopped = Some(callback);
    }

    /// Register state change callback (`{type, status}`)
    #[wasm_bindgen(js_name = onStateChanged)]
    pub fn on_state_changed(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().on_state_change = Some(callback);
    }

    /// Register volume change callback (`{type, volume, muted}`)
    #[wasm_bindgen(js_name = onVolumeChanged)]
    pub fn on_volume_changed(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().on_volume_change = Some(callback);
    }

    /// Register error notice callback (`{type, notice: {index, message}}`)
    #[wasm_bindgen(js_name = onErrorNotice)]
    pub fn on_error_notice(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().on_error_notice = Some(callback);
    }

    /// Register notice cleared callback
    #[wasm_bindgen(js_name = onNoticeCleared)]
    pub fn on_notice_cleared(&self, callback: Function) {
        self.shared.callbacks.borrow_mut().on_notice_cleared = Some(callback);
    }

    // ===== Internal =====

    fn report(&self, error: JukeboxError) -> bool {
        web_sys::console::warn_1(&JsValue::from_str(&error.to_string()));
        false
    }
}
