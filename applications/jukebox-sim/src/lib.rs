//! Jukebox simulator - drives the playback controller from a terminal
pub mod command;
pub mod config;
pub mod error;
pub mod simulation;

pub use command::Command;
pub use config::{SimConfig, SimTrack};
pub use error::{Result, SimError};
pub use simulation::Simulation;
