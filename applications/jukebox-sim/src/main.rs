/// Jukebox Simulator - terminal host for the playback controller
use anyhow::Context;
use clap::{Parser, Subcommand};
use jukebox_sim::{command::HELP, Command, SimConfig, Simulation};
use soul_jukebox::{PlaybackEvent, PlaybackStatus};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "jukebox-sim")]
#[command(about = "Drive the Soul jukebox controller with a simulated audio deck", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the jukebox, reading commands from stdin
    Run {
        /// Configuration file path
        #[arg(short, long, env = "JUKEBOX_CONFIG")]
        config: Option<PathBuf>,

        /// Start "play all" immediately
        #[arg(long)]
        play_all: bool,
    },
    /// Print the configured playlist
    List {
        /// Configuration file path
        #[arg(short, long, env = "JUKEBOX_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (stderr, so it never mixes with command output)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jukebox_sim=info,soul_jukebox=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, play_all } => {
            run(config.as_deref(), play_all).await?;
        }
        Commands::List { config } => {
            let config = load_config(config.as_deref())?;
            print_playlist(&config);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SimConfig> {
    let config = SimConfig::load(path).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run(config_path: Option<&Path>, play_all: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut simulation = Simulation::new(&config)?;
    let started = Instant::now();

    tracing::info!("Jukebox ready with {} tracks", config.tracks.len());
    println!("{HELP}");

    if play_all {
        report(simulation.execute(&Command::PlayAll, started.elapsed()));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_events(&simulation);

        let wakeup = simulation.next_wakeup().map(|at| started + at);

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(Command::Help) => println!("{HELP}"),
                    Ok(Command::List) => print_playlist(&config),
                    Ok(Command::Status) => {
                        simulation.advance_to(started.elapsed());
                        print_events(&simulation);
                        print_status(&simulation)?;
                    }
                    Ok(command) => report(simulation.execute(&command, started.elapsed())),
                    Err(e) => println!("! {e} (try `help`)"),
                }
            }
            () = sleep_until(wakeup) => {
                simulation.advance_to(started.elapsed());
            }
        }
    }

    tracing::info!("Jukebox shutting down");
    Ok(())
}

/// Sleep until `deadline`, or forever without one
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn report(result: jukebox_sim::Result<()>) {
    if let Err(e) = result {
        println!("! {e}");
    }
}

fn print_playlist(config: &SimConfig) {
    println!("Playlist:");
    for (index, track) in config.tracks.iter().enumerate() {
        println!(
            "  {:>2}. {} - {} ({:.1}s)",
            index,
            track.artist,
            track.title,
            track.duration().as_secs_f32()
        );
    }
}

fn print_status(simulation: &Simulation) -> anyhow::Result<()> {
    let snapshot = simulation.controller().playback_state();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    if let Some(notice) = simulation.controller().current_notice() {
        println!("! {}", notice.message);
    }
    Ok(())
}

fn print_events(simulation: &Simulation) {
    for event in simulation.drain_events() {
        match event {
            PlaybackEvent::SongChanged { index, track } => {
                println!("> Now playing {}: {} - {}", index, track.artist, track.title);
            }
            PlaybackEvent::PlaybackStopped => println!("> Stopped"),
            PlaybackEvent::StateChanged { status } => {
                let label = match status {
                    PlaybackStatus::Idle => "idle",
                    PlaybackStatus::Loading => "loading",
                    PlaybackStatus::Playing => "playing",
                    PlaybackStatus::Paused => "paused",
                };
                println!("> {label}");
            }
            PlaybackEvent::VolumeChanged { volume, muted } => {
                let suffix = if muted { " (muted)" } else { "" };
                println!("> Volume {:.0}%{}", volume * 100.0, suffix);
            }
            PlaybackEvent::TrackError { notice } => println!("! {}", notice.message),
            PlaybackEvent::NoticeCleared => {}
        }
    }
}
