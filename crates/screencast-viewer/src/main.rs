//! Screencast viewer: entry point.
//!
//! Connects to a frame source over one WebSocket, pulls frames at the
//! configured refresh rate, and turns the console into a chat with file
//! transfer.
//!
//! # Usage
//!
//! ```text
//! screencast-viewer [OPTIONS]
//!
//! Options:
//!   --endpoint <URL>          WebSocket URL of the frame source [default: ws://localhost:8765]
//!   --refresh-hz <HZ>         Frame requests per second [default: 60]
//!   --frame-out <PATH>        Write each new frame to PATH
//!   --download-dir <DIR>      Where /save puts files [default: .]
//!   --max-message-mib <MIB>   Largest accepted message [default: 64]
//!   --config <PATH>           TOML settings file
//!   --write-config <PATH>     Write the effective settings to PATH and exit
//! ```
//!
//! # Precedence
//!
//! CLI flag, then environment variable, then settings file, then built-in
//! default.
//!
//! | Variable                     | Flag                |
//! |------------------------------|---------------------|
//! | `SCREENCAST_ENDPOINT`        | `--endpoint`        |
//! | `SCREENCAST_REFRESH_HZ`      | `--refresh-hz`      |
//! | `SCREENCAST_FRAME_OUT`       | `--frame-out`       |
//! | `SCREENCAST_DOWNLOAD_DIR`    | `--download-dir`    |
//! | `SCREENCAST_MAX_MESSAGE_MIB` | `--max-message-mib` |
//! | `SCREENCAST_CONFIG`          | `--config`          |
//!
//! Logs go to stderr (level from `RUST_LOG`, else the settings file); the
//! conversation goes to stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use screencast_viewer::application::ViewerCommand;
use screencast_viewer::infrastructure::console::{print_events, spawn_stdin_reader};
use screencast_viewer::infrastructure::frame_output::write_frames;
use screencast_viewer::infrastructure::{
    load_settings, save_settings, Connection, SessionOptions, ViewerSession, ViewerSettings,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Screencast viewer.
///
/// Every option left unset falls back to the settings file, then to the
/// built-in default.
#[derive(Debug, Parser)]
#[command(
    name = "screencast-viewer",
    about = "Remote screen viewer with chat and file transfer over one WebSocket",
    version
)]
struct Cli {
    /// WebSocket URL of the frame source.
    #[arg(long, env = "SCREENCAST_ENDPOINT")]
    endpoint: Option<String>,

    /// Frame requests per second (1-240).
    #[arg(long, env = "SCREENCAST_REFRESH_HZ")]
    refresh_hz: Option<u32>,

    /// Write each newly accepted frame to this path.
    #[arg(long, env = "SCREENCAST_FRAME_OUT")]
    frame_out: Option<PathBuf>,

    /// Directory `/save` writes to when none is given.
    #[arg(long, env = "SCREENCAST_DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// Largest WebSocket message accepted, in MiB.  Bounds received files.
    #[arg(long, env = "SCREENCAST_MAX_MESSAGE_MIB")]
    max_message_mib: Option<usize>,

    /// TOML settings file.  A missing file means all defaults.
    #[arg(long, env = "SCREENCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Write the effective settings to this path and exit.
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

impl Cli {
    /// Loads the settings file (if any) and applies CLI overrides on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but cannot be read or parsed.
    fn resolve_settings(&self) -> anyhow::Result<ViewerSettings> {
        let base = match &self.config {
            Some(path) => load_settings(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => ViewerSettings::default(),
        };
        Ok(self.apply_overrides(base))
    }

    fn apply_overrides(&self, mut settings: ViewerSettings) -> ViewerSettings {
        if let Some(endpoint) = &self.endpoint {
            settings.connection.endpoint = endpoint.clone();
        }
        if let Some(mib) = self.max_message_mib {
            settings.connection.max_message_mib = mib;
        }
        if let Some(hz) = self.refresh_hz {
            settings.display.refresh_hz = hz;
        }
        if let Some(path) = &self.frame_out {
            settings.display.frame_out = Some(path.clone());
        }
        if let Some(dir) = &self.download_dir {
            settings.files.download_dir = dir.clone();
        }
        settings
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.resolve_settings()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = &cli.write_config {
        save_settings(&settings, path)
            .with_context(|| format!("failed to write settings to {}", path.display()))?;
        info!("wrote settings to {}", path.display());
        return Ok(());
    }

    let config = settings.into_config().context("invalid settings")?;
    info!(
        "screencast viewer starting: endpoint={}, refresh={:?}",
        config.endpoint, config.refresh_interval
    );

    // ── Connection and session ────────────────────────────────────────────────
    let connection = Connection::new(Some(config.max_message_size));
    let inbound = connection
        .connect(&config.endpoint)
        .context("failed to start connecting")?;

    let (session, handles) = ViewerSession::new(
        Arc::clone(&connection),
        inbound,
        SessionOptions {
            refresh_interval: config.refresh_interval,
            download_dir: config.download_dir.clone(),
        },
    );

    if let Some(path) = config.frame_out.clone() {
        info!("writing frames to {}", path.display());
        tokio::spawn(write_frames(handles.frames, path));
    }
    tokio::spawn(print_events(handles.events));

    // ── Console and Ctrl+C ────────────────────────────────────────────────────
    let (command_tx, command_rx) = mpsc::channel::<ViewerCommand>(32);
    spawn_stdin_reader(command_tx.clone()).context("failed to start console reader")?;

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, closing the connection");
                let _ = command_tx.send(ViewerCommand::Quit).await;
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    let conversation = session.run(command_rx).await;

    info!(
        "screencast viewer stopped ({} conversation entries)",
        conversation.len()
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
