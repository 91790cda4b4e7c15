//! Screencast frame source: entry point.
//!
//! Serves the JPEG at `--frame-path` to every viewer that asks for it.  Some
//! other program (a capture tool, a script) keeps that file up to date; the
//! server re-reads it when its modification time changes.
//!
//! # Usage
//!
//! ```text
//! screencast-server [OPTIONS]
//!
//! Options:
//!   --bind <IP>               Address to listen on [default: 127.0.0.1]
//!   --port <PORT>             Port to listen on [default: 8765]
//!   --frame-path <PATH>       JPEG served as the current frame [default: screen.jpg]
//!   --static-frame            Read the frame once at startup and always serve it
//!   --max-message-mib <MIB>   Largest accepted message [default: 64]
//! ```
//!
//! | Variable                     | Flag                |
//! |------------------------------|---------------------|
//! | `SCREENCAST_BIND`            | `--bind`            |
//! | `SCREENCAST_PORT`            | `--port`            |
//! | `SCREENCAST_FRAME_PATH`      | `--frame-path`      |
//! | `SCREENCAST_MAX_MESSAGE_MIB` | `--max-message-mib` |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use screencast_server::application::{FileFrameSource, FrameSource, StaticFrameSource};
use screencast_server::domain::ServerConfig;
use screencast_server::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Screencast frame source.
#[derive(Debug, Parser)]
#[command(
    name = "screencast-server",
    about = "Answers screencast viewers' frame requests and receives their chat and files",
    version
)]
struct Cli {
    /// IP address to listen on.  `0.0.0.0` accepts connections from the LAN.
    #[arg(long, default_value = "127.0.0.1", env = "SCREENCAST_BIND")]
    bind: IpAddr,

    /// Port to listen on.
    #[arg(long, default_value_t = 8765, env = "SCREENCAST_PORT")]
    port: u16,

    /// JPEG file served as the current frame.
    #[arg(long, default_value = "screen.jpg", env = "SCREENCAST_FRAME_PATH")]
    frame_path: PathBuf,

    /// Read the frame file once at startup and serve that image on every
    /// request, even if the file changes later.
    #[arg(long)]
    static_frame: bool,

    /// Largest WebSocket message accepted, in MiB.  Bounds received files.
    #[arg(long, default_value_t = 64, env = "SCREENCAST_MAX_MESSAGE_MIB")]
    max_message_mib: usize,
}

impl Cli {
    fn server_config(&self) -> anyhow::Result<ServerConfig> {
        if self.max_message_mib == 0 {
            anyhow::bail!("--max-message-mib must be at least 1");
        }
        Ok(ServerConfig {
            bind_addr: SocketAddr::new(self.bind, self.port),
            frame_path: self.frame_path.clone(),
            max_message_size: self.max_message_mib.saturating_mul(1024 * 1024),
        })
    }
}

async fn frame_source(cli: &Cli, config: &ServerConfig) -> anyhow::Result<Arc<dyn FrameSource>> {
    if cli.static_frame {
        let image = tokio::fs::read(&config.frame_path)
            .await
            .with_context(|| format!("failed to read {}", config.frame_path.display()))?;
        info!(
            "serving a fixed {}-byte frame from {}",
            image.len(),
            config.frame_path.display()
        );
        return Ok(Arc::new(StaticFrameSource::new(&image)));
    }
    info!("serving frames from {}", config.frame_path.display());
    Ok(Arc::new(FileFrameSource::new(&config.frame_path)))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.server_config()?;
    let source = frame_source(&cli, &config).await?;

    let running = Arc::new(AtomicBool::new(true));
    let running_ctrlc = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_ctrlc.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    run_server(config, source, running).await?;

    info!("screencast server stopped");
    Ok(())
}
