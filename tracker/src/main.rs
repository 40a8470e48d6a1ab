//! Watchtime - streaming watch-time tracker.
//!
//! This binary drives the tracker from recorded browser events and shows or
//! clears the persisted time log.
//!
//! # Commands
//!
//! - `watchtime replay [FILE]`: Feed JSON-lines browser events to the tracker
//! - `watchtime show`: Print the time log
//! - `watchtime clear`: Remove the time log
//!
//! # Environment Variables
//!
//! See the [`config`](watchtime_tracker::config) module for available
//! configuration options.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use watchtime_tracker::config::Config;
use watchtime_tracker::display::{clear_log, LogView, CLEAR_ERROR_MESSAGE};
use watchtime_tracker::replay::Replay;
use watchtime_tracker::storage::FileStore;
use watchtime_tracker::time_log::TimeLogWriter;
use watchtime_tracker::tracker::Tracker;

/// Watchtime - streaming watch-time tracker.
///
/// Attributes time spent on streaming sites to shows, per browser tab, and
/// keeps cumulative totals.
#[derive(Parser, Debug)]
#[command(name = "watchtime")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    WATCHTIME_DATA_DIR    Directory holding the time log (default: ~/.watchtime)
    WATCHTIME_STORE_FILE  Time log file name (default: time_log.json)
    RUST_LOG              Log filter (default: info)

EXAMPLES:
    # Replay a recorded event stream
    watchtime replay events.jsonl

    # Pipe events from another process
    browser-bridge | watchtime replay

    # Show the time log
    watchtime show

    # Clear the time log without confirmation
    watchtime clear --yes
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Feed browser events to the tracker.
    ///
    /// Reads one timed event per line from FILE, or stdin when omitted.
    /// Timers still running at the end of input are stopped as if their tabs
    /// were closed.
    Replay {
        /// JSON-lines event file.
        file: Option<PathBuf>,
    },

    /// Print the time log, longest first.
    Show,

    /// Remove the entire time log.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging();

    let config = Config::from_env().context("Failed to load configuration")?;
    debug!(store_path = %config.store_path().display(), "Configuration loaded");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    match cli.command {
        Command::Replay { file } => runtime.block_on(run_replay(&config, file)),
        Command::Show => runtime.block_on(run_show(&config)),
        Command::Clear { yes } => runtime.block_on(run_clear(&config, yes)),
    }
}

/// Replays timed browser events into a tracker backed by the file store.
async fn run_replay(config: &Config, file: Option<PathBuf>) -> Result<()> {
    let store = FileStore::new(config.store_path());
    let mut tracker = Tracker::new(store);

    let input: Box<dyn AsyncRead + Unpin + Send> = match &file {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open event file {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    let mut lines = BufReader::new(input).lines();

    let source = file
        .as_ref()
        .map_or_else(|| "stdin".to_string(), |p| p.display().to_string());
    info!(%source, "Replaying browser events");

    let mut replay = Replay::new();

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }

            next = lines.next_line() => {
                let Some(line) = next.context("Failed to read event stream")? else {
                    break;
                };
                replay.feed_line(&mut tracker, &line).await;
            }
        }
    }

    replay.finish(&mut tracker).await;

    print!("{}", LogView::load(tracker.writer()).await);
    Ok(())
}

/// Prints the time log.
async fn run_show(config: &Config) -> Result<()> {
    let writer = TimeLogWriter::new(FileStore::new(config.store_path()));
    print!("{}", LogView::load(&writer).await);
    Ok(())
}

/// Clears the time log after confirmation.
async fn run_clear(config: &Config, yes: bool) -> Result<()> {
    if !yes {
        eprint!("Clear the entire time log? This cannot be undone. [y/N] ");
        io::stderr().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Aborted.");
            return Ok(());
        }
    }

    let writer = TimeLogWriter::new(FileStore::new(config.store_path()));
    match clear_log(&writer).await {
        Ok(view) => print!("{view}"),
        Err(_) => eprintln!("{CLEAR_ERROR_MESSAGE}"),
    }
    Ok(())
}

/// Initializes the logging subsystem.
///
/// Logs go to stderr so command output on stdout stays clean.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_level(true)
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// If a handler cannot be installed the corresponding branch never fires.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
