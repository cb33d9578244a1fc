//! `waymark` — Terminal dashboard for live accessory tracking.
//!
//! Built on [ratatui](https://ratatui.rs) with reactive data from
//! `waymark-core`'s [`Tracker`](waymark_core::Tracker). The left pane
//! lists registered accessories; the right pane renders their markers
//! on a pannable, zoomable map canvas.
//!
//! Logs are written to a file (default `/tmp/waymark.log`) to avoid
//! corrupting the terminal UI. A background data bridge task streams
//! registry snapshots, marker positions, and camera directives from
//! the tracker into the TUI action loop.
//!
//! Entry point: CLI argument parsing, tracing setup, panic hooks, and
//! app launch.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod map_view;
mod sidebar;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use waymark_core::{JsonFileStore, MemoryStore, RegistryStore, Tracker};

use crate::app::App;
use crate::map_view::MapView;

/// Terminal dashboard for tracking accessory devices on a live map.
#[derive(Parser, Debug)]
#[command(name = "waymark", version, about)]
struct Cli {
    /// Config file path (defaults to the platform config directory)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Location feed websocket URL (overrides config)
    #[arg(long, env = "WAYMARK_SERVER_FEED_URL")]
    feed_url: Option<Url>,

    /// Device lookup API base URL (overrides config)
    #[arg(long, env = "WAYMARK_SERVER_API_URL")]
    api_url: Option<Url>,

    /// Keep the registry in memory only; skip loading and saving
    #[arg(long)]
    ephemeral: bool,

    /// Log file path (defaults to /tmp/waymark.log)
    #[arg(long, default_value = "/tmp/waymark.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Set up file-based tracing. We MUST NOT log to stdout/stderr — that
/// would corrupt the TUI output. Returns a guard that must be held for
/// the lifetime of the application to ensure logs are flushed.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("waymark={log_level}")));

    let log_dir = cli
        .log_file
        .parent()
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("waymark.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

/// Registry store selection: in-memory for `--ephemeral`, otherwise a
/// JSON file at the configured path or the platform default.
fn build_store(cli: &Cli, cfg: &waymark_config::Config) -> Box<dyn RegistryStore> {
    if cli.ephemeral {
        return Box::new(MemoryStore::new());
    }
    let path = cfg
        .storage
        .registry_path
        .clone()
        .or_else(JsonFileStore::default_path)
        .unwrap_or_else(|| PathBuf::from("accessories.json"));
    Box::new(JsonFileStore::new(path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Install panic/error hooks BEFORE entering the terminal
    tui::install_hooks()?;

    // Tracing to file — hold the guard so logs flush on exit
    let _log_guard = setup_tracing(&cli);

    let cfg = match &cli.config {
        Some(path) => waymark_config::load_config_from(path)
            .wrap_err_with(|| format!("loading config from {}", path.display()))?,
        None => waymark_config::load_config_or_default(),
    };

    let mut tracker_config =
        waymark_config::to_tracker_config(&cfg).wrap_err("invalid server configuration")?;
    if let Some(feed_url) = &cli.feed_url {
        tracker_config.feed_url = feed_url.clone();
    }
    if let Some(api_url) = &cli.api_url {
        tracker_config.api_url = api_url.clone();
    }

    info!(
        feed_url = %tracker_config.feed_url,
        api_url = %tracker_config.api_url,
        ephemeral = cli.ephemeral,
        "starting waymark"
    );

    let store = build_store(&cli, &cfg);
    let tracker = Tracker::connect(tracker_config, store).wrap_err("starting tracker")?;

    let map = MapView::new(cfg.map.center(), cfg.map.zoom, cfg.map.satellite);
    if cfg.map.satellite {
        // Keep the tracker's layer flag in sync with the configured start.
        tracker.toggle_satellite();
    }

    let mut app = App::new(tracker, map);
    app.run().await?;

    Ok(())
}
