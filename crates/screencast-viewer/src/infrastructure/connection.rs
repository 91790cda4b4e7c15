//! The viewer's one WebSocket connection.
//!
//! [`Connection`] owns the socket and the lifecycle state.  It is created
//! once, shared as an `Arc`, and handed to the channels as an
//! [`EnvelopeSink`].  Nothing else ever touches the socket.
//!
//! # Tasks
//!
//! `connect()` spawns one link task per attempt.  After the handshake the
//! socket is split:
//!
//! ```text
//!              send()                         inbound (mpsc, bounded)
//! channels ──────────► outbound (mpsc, bounded) ──► writer task ──► ws sink
//!                                                          ws stream ──► link task ──► Inbound::recv()
//! ```
//!
//! The link task reads until the peer closes or the transport fails, then
//! finalises the state.  The connection never reconnects on its own.
//!
//! # Stale links
//!
//! Every attempt carries a [`LinkToken`] that doubles as its identity.  State
//! changes from a link task are applied only while that link is still the
//! active one, so a finishing task can never clobber a newer attempt.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::{SinkExt, StreamExt};
use screencast_core::{decode, encode, ConnectionState, ConnectionStatus, Decoded, Envelope};
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{
    connect_async_with_config,
    tungstenite::{protocol::WebSocketConfig, Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, trace, warn};

use crate::application::sink::{EnvelopeSink, SendOutcome};

/// Capacity of the inbound envelope queue.  When the session falls behind,
/// the link task stops reading and TCP flow control pushes back on the peer.
const INBOUND_CAPACITY: usize = 128;

/// Capacity of the outbound queue.  A full queue fails sends instead of
/// buffering without bound behind a stalled peer.
const OUTBOUND_CAPACITY: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("connect() called while {0:?}")]
    AlreadyActive(ConnectionState),
}

/// Cancellation of one connection attempt.  Compared by address.
struct LinkToken {
    cancelled: watch::Sender<bool>,
}

impl LinkToken {
    fn new() -> Arc<Self> {
        let (cancelled, _) = watch::channel(false);
        Arc::new(Self { cancelled })
    }

    fn cancel(&self) {
        self.cancelled.send_replace(true);
    }

    fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    async fn cancelled(&self) {
        let mut rx = self.cancelled.subscribe();
        // The sender lives in `self`, so this cannot fail.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Bookkeeping for the current connection attempt.
struct Link {
    /// Present only while the socket is open.  Dropping it tells the writer
    /// to flush what is queued and send the close frame.
    outbound: Option<mpsc::Sender<WsMessage>>,
    token: Arc<LinkToken>,
}

pub struct Connection {
    status: watch::Sender<ConnectionStatus>,
    link: Mutex<Option<Link>>,
    max_message_size: Option<usize>,
}

impl Connection {
    /// Creates an idle connection in the `Closed` state.
    ///
    /// `max_message_size` bounds inbound messages (and so received files);
    /// `None` keeps the tungstenite default limits.
    pub fn new(max_message_size: Option<usize>) -> Arc<Self> {
        let (status, _) = watch::channel(ConnectionStatus::default());
        Arc::new(Self {
            status,
            link: Mutex::new(None),
            max_message_size,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// A receiver that observes every status change from now on.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Resolves once the connection reaches `Closed`.
    pub async fn wait_until_closed(&self) {
        let mut status = self.status.subscribe();
        let _ = status
            .wait_for(|status| status.state == ConnectionState::Closed)
            .await;
    }

    /// Starts connecting to `endpoint` in the background.
    ///
    /// Returns immediately in the `Connecting` state.  Handshake success moves
    /// to `Open`, failure to `Errored` and then `Closed`; neither is reported
    /// through this return value.
    ///
    /// # Errors
    ///
    /// [`ConnectionError::AlreadyActive`] unless the connection is `Closed`
    /// or `Errored`.  Nothing else happens in that case.
    pub fn connect(self: &Arc<Self>, endpoint: &str) -> Result<Inbound, ConnectionError> {
        let token = LinkToken::new();
        {
            let mut link = self.lock_link();
            if !self.apply(ConnectionState::Connecting, None) {
                return Err(ConnectionError::AlreadyActive(self.state()));
            }
            *link = Some(Link {
                outbound: None,
                token: Arc::clone(&token),
            });
        }

        info!("connecting to {endpoint}");
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        tokio::spawn(Arc::clone(self).run_link(
            endpoint.to_string(),
            inbound_tx,
            Arc::clone(&token),
        ));

        Ok(Inbound {
            rx: inbound_rx,
            token,
        })
    }

    /// Starts the close handshake.
    ///
    /// Moves to `Closing` and then, once the peer answers, to `Closed`.  No
    /// envelope is yielded by [`Inbound::recv`] after this call.
    pub fn close(&self) {
        let mut link = self.lock_link();
        let Some(active) = link.as_mut() else {
            debug!("close() on a connection that never connected");
            return;
        };
        active.token.cancel();

        match self.state() {
            ConnectionState::Connecting | ConnectionState::Open => {
                self.apply(ConnectionState::Closing, None);
                active.outbound = None;
            }
            ConnectionState::Errored => {
                self.apply(ConnectionState::Closed, None);
            }
            state @ (ConnectionState::Closing | ConnectionState::Closed) => {
                debug!("close() ignored while {state:?}");
            }
        }
    }

    // ── Link task ─────────────────────────────────────────────────────────────

    async fn run_link(
        self: Arc<Self>,
        endpoint: String,
        inbound: mpsc::Sender<Envelope>,
        token: Arc<LinkToken>,
    ) {
        let config = self.ws_config();
        let ws_stream = match connect_async_with_config(endpoint.as_str(), Some(config), false).await
        {
            Ok((ws_stream, _response)) => ws_stream,
            Err(e) => {
                self.transition_link(&token, ConnectionState::Errored, Some(e.to_string()));
                self.transition_link(&token, ConnectionState::Closed, None);
                return;
            }
        };

        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::channel::<WsMessage>(OUTBOUND_CAPACITY);

        if !self.open_link(&token, out_tx) {
            debug!("{endpoint}: closed before the handshake completed");
            let _ = ws_tx.send(WsMessage::Close(None)).await;
            self.transition_link(&token, ConnectionState::Closed, None);
            return;
        }

        let writer_conn = Arc::clone(&self);
        let writer_token = Arc::clone(&token);
        let writer = tokio::spawn(async move {
            // Ends once the sender is dropped and the queue is drained.
            while let Some(msg) = out_rx.recv().await {
                if let Err(e) = ws_tx.send(msg).await {
                    writer_conn.transition_link(
                        &writer_token,
                        ConnectionState::Errored,
                        Some(format!("send failed: {e}")),
                    );
                    return;
                }
            }
            if writer_token.is_cancelled() {
                if let Err(e) = ws_tx.send(WsMessage::Close(None)).await {
                    debug!("close frame not sent: {e}");
                }
            }
        });

        let outcome: Result<(), String> = loop {
            match ws_rx.next().await {
                Some(Ok(WsMessage::Text(text))) => match decode(&text) {
                    Ok(Decoded::Envelope(envelope)) => {
                        if token.is_cancelled() {
                            trace!("dropping {} received after close()", envelope.kind());
                            continue;
                        }
                        let kind = envelope.kind();
                        trace!("received {kind}");
                        // The queue may be full and never drained again once
                        // close() is called; keep reading for the close reply.
                        tokio::select! {
                            sent = inbound.send(envelope) => {
                                if sent.is_err() {
                                    debug!("{endpoint}: inbound receiver dropped");
                                }
                            }
                            _ = token.cancelled() => {
                                trace!("dropping {kind} received after close()");
                            }
                        }
                    }
                    Ok(Decoded::Unrecognized { kind }) => {
                        debug!("{endpoint}: ignoring envelope of unknown kind '{kind}'");
                    }
                    Err(e) => warn!("{endpoint}: dropping malformed envelope: {e}"),
                },
                Some(Ok(WsMessage::Binary(data))) => {
                    warn!(
                        "{endpoint}: ignoring binary frame ({} bytes); envelopes are text",
                        data.len()
                    );
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    debug!("{endpoint}: close frame received: {frame:?}");
                    break Ok(());
                }
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    break Ok(());
                }
                Some(Err(e)) => break Err(e.to_string()),
            }
        };

        self.release_outbound(&token);
        writer.abort();

        if let Err(detail) = outcome {
            self.transition_link(&token, ConnectionState::Errored, Some(detail));
        }
        self.transition_link(&token, ConnectionState::Closed, None);
        info!("{endpoint}: connection finished");
    }

    /// Installs the outbound queue and moves to `Open`, unless `close()` won
    /// the race or a newer attempt replaced this one.
    fn open_link(
        &self,
        token: &Arc<LinkToken>,
        outbound: mpsc::Sender<WsMessage>,
    ) -> bool {
        let mut link = self.lock_link();
        let Some(active) = link
            .as_mut()
            .filter(|active| Arc::ptr_eq(&active.token, token))
        else {
            return false;
        };
        if token.is_cancelled() {
            return false;
        }
        active.outbound = Some(outbound);
        if self.apply(ConnectionState::Open, None) {
            true
        } else {
            active.outbound = None;
            false
        }
    }

    fn release_outbound(&self, token: &Arc<LinkToken>) {
        let mut link = self.lock_link();
        if let Some(active) = link
            .as_mut()
            .filter(|active| Arc::ptr_eq(&active.token, token))
        {
            active.outbound = None;
        }
    }

    // ── State transitions ─────────────────────────────────────────────────────

    /// Applies a transition on behalf of a link task, if that link is current.
    fn transition_link(
        &self,
        token: &Arc<LinkToken>,
        next: ConnectionState,
        detail: Option<String>,
    ) -> bool {
        let link = self.lock_link();
        match link.as_ref() {
            Some(active) if Arc::ptr_eq(&active.token, token) => self.apply(next, detail),
            _ => {
                debug!("superseded link ignored transition to {next:?}");
                false
            }
        }
    }

    /// The only place the status is written.
    ///
    /// Entering `Connecting` clears the previous error detail; entering
    /// `Errored` sets it.  Other transitions keep it, so a `Closed` status
    /// still says why the last connection ended.
    fn apply(&self, next: ConnectionState, detail: Option<String>) -> bool {
        let mut rejected_from = None;
        let mut label = String::new();

        let changed = self.status.send_if_modified(|status| {
            if !status.state.can_transition_to(next) {
                rejected_from = Some(status.state);
                return false;
            }
            status.state = next;
            match next {
                ConnectionState::Connecting => status.detail = None,
                ConnectionState::Errored => status.detail = detail,
                _ => {}
            }
            label = status.to_string();
            true
        });

        match rejected_from {
            None if next == ConnectionState::Errored => warn!("connection status: {label}"),
            None => info!("connection status: {label}"),
            Some(from) if from == next => debug!("already {next:?}"),
            Some(from) => warn!("rejected connection transition {from:?} -> {next:?}"),
        }
        changed
    }

    fn ws_config(&self) -> WebSocketConfig {
        let mut config = WebSocketConfig::default();
        if let Some(limit) = self.max_message_size {
            config.max_message_size = Some(limit);
            config.max_frame_size = Some(limit);
        }
        config
    }

    fn lock_link(&self) -> MutexGuard<'_, Option<Link>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EnvelopeSink for Connection {
    fn state(&self) -> ConnectionState {
        Connection::state(self)
    }

    fn send(&self, envelope: &Envelope) -> SendOutcome {
        let state = Connection::state(self);
        if !state.is_open() {
            debug!("suppressed {} send while {state:?}", envelope.kind());
            return SendOutcome::Suppressed { state };
        }

        let text = match encode(envelope) {
            Ok(text) => text,
            Err(e) => {
                error!("failed to encode {}: {e}", envelope.kind());
                return SendOutcome::Failed;
            }
        };

        let link = self.lock_link();
        let outbound = link.as_ref().and_then(|active| active.outbound.as_ref());
        match outbound.map(|outbound| outbound.try_send(WsMessage::Text(text))) {
            Some(Ok(())) => {
                trace!("sent {}", envelope.kind());
                SendOutcome::Sent
            }
            Some(Err(TrySendError::Full(_))) => {
                debug!("{} not sent: outbound queue full", envelope.kind());
                SendOutcome::Failed
            }
            Some(Err(TrySendError::Closed(_))) | None => {
                let state = Connection::state(self);
                debug!(
                    "suppressed {} send; socket no longer writable ({state:?})",
                    envelope.kind()
                );
                SendOutcome::Suppressed { state }
            }
        }
    }
}

/// Inbound envelopes of one connection attempt, in arrival order.
pub struct Inbound {
    rx: mpsc::Receiver<Envelope>,
    token: Arc<LinkToken>,
}

impl Inbound {
    /// Waits for the next envelope.
    ///
    /// Returns `None` once the connection has finished or `close()` was
    /// called.  Cancel safe.
    pub async fn recv(&mut self) -> Option<Envelope> {
        if self.token.is_cancelled() {
            return None;
        }
        let envelope = self.rx.recv().await?;
        (!self.token.is_cancelled()).then_some(envelope)
    }
}
