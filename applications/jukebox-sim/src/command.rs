/// Interactive commands read from stdin
use crate::error::SimError;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Play the track at a playlist index
    Play(usize),
    PlayAll,
    Pause,
    Resume,
    Toggle,
    Stop,
    Volume(f32),
    Mute,
    Unmute,
    ToggleMute,
    Status,
    List,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = SimError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Err(SimError::UnknownCommand(String::new()));
        };
        let arg = words.next();

        let command = match word.to_ascii_lowercase().as_str() {
            "play" | "p" => {
                let value = arg.unwrap_or_default();
                let index = value.parse().map_err(|_| SimError::InvalidArgument {
                    command: "play",
                    value: value.to_string(),
                })?;
                Command::Play(index)
            }
            "all" => Command::PlayAll,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "toggle" | "space" => Command::Toggle,
            "stop" => Command::Stop,
            "vol" | "volume" => {
                let value = arg.unwrap_or_default();
                let level = value.parse().map_err(|_| SimError::InvalidArgument {
                    command: "vol",
                    value: value.to_string(),
                })?;
                Command::Volume(level)
            }
            "mute" => Command::Mute,
            "unmute" => Command::Unmute,
            "m" => Command::ToggleMute,
            "status" | "s" => Command::Status,
            "list" | "ls" => Command::List,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            _ => return Err(SimError::UnknownCommand(line.trim().to_string())),
        };

        Ok(command)
    }
}

pub const HELP: &str = "\
Commands:
  play N      play track N (0-based)
  all         play every track from the first
  pause       pause playback
  resume      resume playback
  toggle      pause or resume
  stop        stop and unload
  vol X       set volume (0.0-1.0)
  mute        mute output
  unmute      restore output
  m           toggle mute
  status      print playback state
  list        print the playlist
  quit        exit";
