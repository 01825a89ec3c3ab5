/// Simulator error types
use soul_jukebox::JukeboxError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid argument for {command}: {value}")]
    InvalidArgument { command: &'static str, value: String },

    #[error(transparent)]
    Jukebox(#[from] JukeboxError),
}
