//! WASM bindings for soul-jukebox
//!
//! This module provides the browser side of the jukebox: an audio backend
//! over `HTMLAudioElement` and a JavaScript-facing wrapper around the
//! playback controller.

#[cfg(feature = "wasm")]
pub mod audio;

#[cfg(feature = "wasm")]
pub mod jukebox;

#[cfg(feature = "wasm")]
pub use audio::{HtmlAudioBackend, PerformanceClock};

#[cfg(feature = "wasm")]
pub use jukebox::WasmJukebox;
