use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser};
use env_logger::Env;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use vplay::history::{FileHistory, HistoryStore, MemoryHistory};
use vplay::player::{
    event_channel, PlaybackController, PlaybackFields, PlaybackSession, PlaybackSnapshot,
    PlaybackStatus, SimulatedEngine, SimulatedMedia, TickPolicy,
};
use vplay::utils::{self, Config};

/// vplay - drive a single video through the playback controller
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Source locator to play
    #[arg(value_name = "SOURCE")]
    source: Option<String>,

    /// List previously played sources and exit
    #[arg(long)]
    history: bool,

    /// Length of the simulated media in seconds
    #[arg(long, value_name = "SECS", default_value = "30", value_parser = parse_duration_secs)]
    duration: f64,

    /// Simulate a source that fails to load
    #[arg(long)]
    fail: bool,

    /// When periodic ticks are delivered (continuous, while-playing)
    #[arg(long, value_name = "POLICY")]
    tick_policy: Option<TickPolicy>,

    /// Do not start playback once the source is ready
    #[arg(long = "no-auto-play", action = ArgAction::SetFalse)]
    auto_play: bool,

    /// Seek to this fraction of the duration once playback starts
    #[arg(long, value_name = "FRACTION")]
    seek: Option<f64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Read configuration from this file instead of the default locations
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the effective configuration to the user config file and exit
    #[arg(long)]
    save_config: bool,
}

/// Media length must be a positive, finite number of seconds
fn parse_duration_secs(s: &str) -> std::result::Result<f64, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if secs.is_finite() && secs > 0.0 {
        Ok(secs)
    } else {
        Err(format!("expected a positive number of seconds, got {}", s))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => utils::load_config(),
    };

    // Initialize logging
    let log_level = if args.debug {
        "debug".to_string()
    } else {
        config
            .as_ref()
            .map(|c| c.general.log_level.clone())
            .unwrap_or_else(|_| "info".to_string())
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    info!("Starting vplay v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config.context("Failed to load configuration")?;
    if let Some(policy) = args.tick_policy {
        config.playback.tick_policy = policy;
    }
    config.playback.auto_play &= args.auto_play;
    config.validate()?;

    if args.save_config {
        config.save()?;
        info!("Configuration saved");
        return Ok(());
    }

    let history = open_history(&config);

    if args.history {
        for source in history.retrieve()? {
            println!("{}", source);
        }
        return Ok(());
    }

    let source = args
        .source
        .ok_or_else(|| anyhow!("No source given (see --help)"))?;

    let media = SimulatedMedia {
        duration_secs: args.duration,
        fail: args.fail,
        tick_interval: config.playback.tick_interval(),
        ..SimulatedMedia::default()
    };

    let (sink, events) = event_channel();
    let engine = SimulatedEngine::new(sink.clone(), media);
    let controller = PlaybackController::new(engine, sink, &config.playback).with_history(history);
    let session = PlaybackSession::spawn(controller, events);

    let mut fields = session.fields();
    let mut printer = FieldPrinter::default();
    let mut pending_seek = args.seek;

    info!("Loading {}", source);
    session.load(source.as_str());

    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break Ok(());
            }
            changed = wait_for_change(&mut fields) => {
                if !changed {
                    break Err(anyhow!("Playback session stopped unexpectedly"));
                }

                let snapshot = fields.snapshot();
                printer.handle_snapshot(&snapshot);

                match snapshot.status {
                    PlaybackStatus::Failed => {
                        error!("Failed to load {}", source);
                        break Err(anyhow!("Failed to load {}", source));
                    }
                    PlaybackStatus::ReadyToPlay if !config.playback.auto_play && !printer.played => {
                        info!("Ready; auto-play disabled, exiting");
                        break Ok(());
                    }
                    _ => {}
                }

                if snapshot.is_playing {
                    if let Some(fraction) = pending_seek.take() {
                        info!("Seeking to {:.1}%", fraction * 100.0);
                        session.seek(fraction);
                    }
                }

                if printer.finished() {
                    info!("End of media reached");
                    break Ok(());
                }
            }
        }
    };

    session.dispose().await?;
    outcome
}

/// Open the configured history store, falling back to memory
fn open_history(config: &Config) -> Arc<dyn HistoryStore> {
    if !config.history.enabled {
        return Arc::new(MemoryHistory::new());
    }

    match config.history.resolved_path() {
        Some(path) => match FileHistory::open(&path) {
            Ok(history) => Arc::new(history),
            Err(e) => {
                warn!("History at {:?} unavailable ({}), using memory", path, e);
                Arc::new(MemoryHistory::new())
            }
        },
        None => {
            warn!("No data directory for the history file, using memory");
            Arc::new(MemoryHistory::new())
        }
    }
}

/// Wait until any published field changes; false once the session is gone
async fn wait_for_change(fields: &mut PlaybackFields) -> bool {
    let result = tokio::select! {
        r = fields.status.changed() => r,
        r = fields.duration_text.changed() => r,
        r = fields.current_time_text.changed() => r,
        r = fields.progress.changed() => r,
        r = fields.is_playing.changed() => r,
    };
    result.is_ok()
}

/// Prints one line per distinct snapshot
#[derive(Default)]
struct FieldPrinter {
    last: Option<PlaybackSnapshot>,
    played: bool,
    stopped_at_start: bool,
}

impl FieldPrinter {
    fn handle_snapshot(&mut self, snapshot: &PlaybackSnapshot) {
        if self.last.as_ref() == Some(snapshot) {
            return;
        }

        println!(
            "[{:?}] {} / {}  {:>5.1}%  {}",
            snapshot.status,
            snapshot.current_time_text,
            snapshot.duration_text,
            snapshot.progress * 100.0,
            if snapshot.is_playing { "playing" } else { "paused" }
        );

        if snapshot.is_playing {
            self.played = true;
        }
        self.stopped_at_start = self.played && !snapshot.is_playing && snapshot.progress == 0.0;
        self.last = Some(snapshot.clone());
    }

    /// Playback ran and then came to rest at the start
    fn finished(&self) -> bool {
        self.stopped_at_start
    }
}
