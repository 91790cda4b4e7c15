//! WebSocket server: accept loop and per-session tasks.
//!
//! Every accepted connection gets its own Tokio task and its own
//! [`PeerSession`].  Sessions never see each other: a frame is only ever sent
//! in reply to a request from the same viewer.
//!
//! Shutdown is driven by a shared `AtomicBool` (cleared by the Ctrl+C handler
//! in `main.rs`).  The accept loop polls it between 200 ms accept timeouts.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use screencast_core::{decode, encode, Decoded};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async_with_config,
    tungstenite::{protocol::WebSocketConfig, Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, trace, warn};

use crate::application::{FrameSource, PeerSession};
use crate::domain::ServerConfig;

const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the listener for `config.bind_addr`.
///
/// # Errors
///
/// Returns an error if the address is in use or cannot be bound.
pub async fn bind(config: &ServerConfig) -> anyhow::Result<TcpListener> {
    TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {}", config.bind_addr))
}

/// Binds and serves until `running` is cleared.
pub async fn run_server(
    config: ServerConfig,
    source: Arc<dyn FrameSource>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = bind(&config).await?;
    serve(listener, source, config.max_message_size, running).await
}

/// Runs the accept loop on an already bound listener until `running` is
/// cleared.
///
/// Tests bind to port 0 and read the address back before calling this.
pub async fn serve(
    listener: TcpListener,
    source: Arc<dyn FrameSource>,
    max_message_size: usize,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let local = listener
        .local_addr()
        .context("failed to read listener address")?;
    info!("frame source listening on ws://{local}");

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new connection from {peer_addr}");
                let source = Arc::clone(&source);
                tokio::spawn(async move {
                    handle_viewer(stream, peer_addr, source, max_message_size).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g. out of file descriptors); keep serving.
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }

    Ok(())
}

// ── Per-session handler ───────────────────────────────────────────────────────

async fn handle_viewer(
    stream: TcpStream,
    peer_addr: SocketAddr,
    source: Arc<dyn FrameSource>,
    max_message_size: usize,
) {
    let session = PeerSession::new(source);
    let id = session.id();
    match run_session(stream, peer_addr, session, max_message_size).await {
        Ok(session) => info!(
            "session {id} ({peer_addr}) closed: {} frames sent, {} messages received",
            session.frames_sent(),
            session.conversation().len()
        ),
        Err(e) => warn!("session {id} ({peer_addr}) closed with error: {e:#}"),
    }
}

/// Reads envelopes from one viewer and writes back whatever the session
/// answers.  Returns the session so its totals can be logged.
async fn run_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    mut session: PeerSession,
    max_message_size: usize,
) -> anyhow::Result<PeerSession> {
    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(max_message_size);
    ws_config.max_frame_size = Some(max_message_size);

    let mut ws = accept_async_with_config(stream, Some(ws_config))
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;
    let id = session.id();
    info!("session {id}: viewer connected from {peer_addr}");

    while let Some(next) = ws.next().await {
        let raw = match next {
            Ok(WsMessage::Text(raw)) => raw,
            Ok(WsMessage::Binary(bytes)) => {
                warn!("session {id}: ignoring binary frame ({} bytes)", bytes.len());
                continue;
            }
            Ok(WsMessage::Close(frame)) => {
                debug!("session {id}: viewer sent close {frame:?}");
                continue;
            }
            // Ping/pong are answered by tungstenite.
            Ok(_) => continue,
            // A viewer that drops the socket without a close frame ends up here.
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed | WsError::Protocol(_)) => {
                break
            }
            Err(e) => {
                return Err(e).with_context(|| format!("session {id}: read failed"));
            }
        };

        let envelope = match decode(&raw) {
            Ok(Decoded::Envelope(envelope)) => envelope,
            Ok(Decoded::Unrecognized { kind }) => {
                debug!("session {id}: ignoring unrecognised message kind {kind:?}");
                continue;
            }
            Err(e) => {
                warn!("session {id}: dropping malformed message: {e}");
                continue;
            }
        };
        trace!("session {id}: received {}", envelope.kind());

        let Some(reply) = session.handle(envelope).await else {
            continue;
        };
        let text = match encode(&reply) {
            Ok(text) => text,
            Err(e) => {
                error!("session {id}: failed to encode reply: {e}");
                continue;
            }
        };
        match ws.send(WsMessage::Text(text)).await {
            Ok(()) => {}
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => break,
            Err(e) => {
                return Err(e).with_context(|| format!("session {id}: send failed"));
            }
        }
    }

    Ok(session)
}
