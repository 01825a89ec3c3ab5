//! Browser audio backend
//!
//! One `HTMLAudioElement` per handle. The element's `ended` and `error`
//! events and the settlement of its `play()` promise are forwarded to a
//! signal sink as [`MediaSignal`]s stamped with the handle id.

use crate::backend::{AudioBackend, AudioHandle, HandleId, MediaSignal, StartOutcome};
use crate::error::{JukeboxError, Result};
use crate::scheduler::Clock;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::HtmlAudioElement;

/// Where handles deliver their signals
pub type SignalSink = Rc<dyn Fn(MediaSignal)>;

/// [`Clock`] over `performance.now()`, falling back to `Date.now()`
#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceClock;

impl Clock for PerformanceClock {
    fn now(&self) -> Duration {
        let millis = web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now);
        Duration::from_secs_f64(millis.max(0.0) / 1000.0)
    }
}

/// [`AudioBackend`] creating detached `<audio>` elements
pub struct HtmlAudioBackend {
    sink: SignalSink,
}

impl HtmlAudioBackend {
    pub fn new(sink: SignalSink) -> Self {
        Self { sink }
    }
}

impl AudioBackend for HtmlAudioBackend {
    fn open(&mut self, id: HandleId, locator: &str) -> Result<Box<dyn AudioHandle>> {
        let audio = HtmlAudioElement::new_with_src(locator)
            .map_err(|e| JukeboxError::Backend(describe_js_error(&e)))?;
        audio.set_preload("auto");

        let ended_sink = self.sink.clone();
        let on_ended = Closure::wrap(Box::new(move || {
            ended_sink(MediaSignal::Ended(id));
        }) as Box<dyn FnMut()>);

        let error_sink = self.sink.clone();
        let error_source = audio.clone();
        let on_error = Closure::wrap(Box::new(move || {
            let detail = error_source.error().map(|e| media_error_detail(e.code()));
            error_sink(MediaSignal::Failed { handle: id, detail });
        }) as Box<dyn FnMut()>);

        audio
            .add_event_listener_with_callback("ended", on_ended.as_ref().unchecked_ref())
            .map_err(|e| JukeboxError::Backend(describe_js_error(&e)))?;
        audio
            .add_event_listener_with_callback("error", on_error.as_ref().unchecked_ref())
            .map_err(|e| JukeboxError::Backend(describe_js_error(&e)))?;

        Ok(Box::new(HtmlAudioHandle {
            id,
            audio,
            sink: self.sink.clone(),
            on_ended,
            on_error,
        }))
    }
}

struct HtmlAudioHandle {
    id: HandleId,
    audio: HtmlAudioElement,
    sink: SignalSink,
    on_ended: Closure<dyn FnMut()>,
    on_error: Closure<dyn FnMut()>,
}

impl AudioHandle for HtmlAudioHandle {
    fn id(&self) -> HandleId {
        self.id
    }

    fn start(&mut self) -> StartOutcome {
        let promise = match self.audio.play() {
            Ok(promise) => promise,
            Err(e) => return StartOutcome::Failed(describe_js_error(&e)),
        };

        let id = self.id;
        let sink = self.sink.clone();

        // play() resolves with undefined and rejects with a DOMException, so
        // one callback covers both branches. It runs exactly once.
        let on_settled: Closure<dyn FnMut(JsValue)> = Closure::once(move |value: JsValue| {
            let result = if value.is_undefined() {
                Ok(())
            } else {
                Err(describe_js_error(&value))
            };
            sink(MediaSignal::StartSettled { handle: id, result });
        });

        let _ = promise.then2(&on_settled, &on_settled);
        on_settled.forget();

        StartOutcome::Pending
    }

    fn pause(&mut self) {
        let _ = self.audio.pause();
    }

    fn rewind(&mut self) {
        self.audio.set_current_time(0.0);
    }

    fn set_level(&mut self, level: f32) {
        self.audio.set_volume(f64::from(level));
    }
}

impl Drop for HtmlAudioHandle {
    fn drop(&mut self) {
        let _ = self
            .audio
            .remove_event_listener_with_callback("ended", self.on_ended.as_ref().unchecked_ref());
        let _ = self
            .audio
            .remove_event_listener_with_callback("error", self.on_error.as_ref().unchecked_ref());

        // Detach the source so the browser stops fetching
        let _ = self.audio.remove_attribute("src");
        self.audio.load();
    }
}

fn media_error_detail(code: u16) -> String {
    match code {
        1 => "playback aborted".to_string(),
        2 => "network error while loading".to_string(),
        3 => "media could not be decoded".to_string(),
        4 => "media source not supported".to_string(),
        other => format!("media error code {other}"),
    }
}

fn describe_js_error(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}
