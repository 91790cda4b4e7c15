//! The viewer session: one task that drives everything.
//!
//! [`ViewerSession::run`] is a single `tokio::select!` loop over five event
//! sources:
//!
//! | Source            | Action                                          |
//! |-------------------|-------------------------------------------------|
//! | refresh ticker    | send the next frame request                     |
//! | inbound envelopes | update the frame slot or the conversation       |
//! | console commands  | chat, start a file send, save, list, quit       |
//! | prepared files    | transmit a file whose read + encode finished    |
//! | status watch      | report connection state changes                 |
//!
//! The loop owns the conversation log and the frame pacer, so nothing in
//! here needs a lock.  Slow work (file reads, saves) runs on spawned tasks
//! that report back through channels.  The session ends when the connection
//! finishes or `/quit` is received.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use screencast_core::{
    ConnectionState, ConnectionStatus, ConversationEntry, ConversationLog, Envelope, Frame,
    FrameOffer, Origin,
};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::application::commands::HELP;
use crate::application::{
    save_to, ChannelError, ChatChannel, EnvelopeSink, FileTransferChannel, FramePacer,
    PreparedFile, ViewerCommand,
};
use crate::infrastructure::connection::{Connection, Inbound};

/// How long `/quit` waits for the peer to answer the close handshake.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub refresh_interval: Duration,
    pub download_dir: PathBuf,
}

/// Something the user should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Chat {
        origin: Origin,
        text: String,
    },
    /// `number` is the one-based index accepted by `/save`.
    File {
        origin: Origin,
        number: usize,
        file_name: String,
        size: usize,
    },
    Status(ConnectionStatus),
    Notice(String),
}

/// Receiving ends of the session's outputs.
pub struct SessionHandles {
    /// The frame currently on screen; updated on every accepted frame.
    pub frames: watch::Receiver<Option<Frame>>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

pub struct ViewerSession {
    connection: Arc<Connection>,
    inbound: Inbound,
    pacer: FramePacer,
    chat: ChatChannel,
    files: FileTransferChannel,
    conversation: ConversationLog,
    frames: watch::Sender<Option<Frame>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    options: SessionOptions,
}

type PreparedResult = Result<PreparedFile, ChannelError>;

impl ViewerSession {
    pub fn new(
        connection: Arc<Connection>,
        inbound: Inbound,
        options: SessionOptions,
    ) -> (Self, SessionHandles) {
        let sink: Arc<dyn EnvelopeSink> = connection.clone();
        let (frames_tx, frames_rx) = watch::channel(None);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let session = Self {
            connection,
            inbound,
            pacer: FramePacer::new(Arc::clone(&sink)),
            chat: ChatChannel::new(Arc::clone(&sink)),
            files: FileTransferChannel::new(sink),
            conversation: ConversationLog::new(),
            frames: frames_tx,
            events: events_tx,
            options,
        };
        let handles = SessionHandles {
            frames: frames_rx,
            events: events_rx,
        };
        (session, handles)
    }

    /// Runs until the connection finishes or [`ViewerCommand::Quit`] arrives.
    ///
    /// If the command channel closes (e.g. stdin hit EOF) the session keeps
    /// running and keeps pulling frames.  Returns the conversation.
    pub async fn run(mut self, mut commands: mpsc::Receiver<ViewerCommand>) -> ConversationLog {
        let mut ticker = time::interval(self.options.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut status = self.connection.watch_status();
        let initial = status.borrow_and_update().clone();
        self.emit(SessionEvent::Status(initial));

        let (prepared_tx, mut prepared_rx) = mpsc::channel::<PreparedResult>(4);
        let mut commands_open = true;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.pacer.tick();
                }
                envelope = self.inbound.recv() => match envelope {
                    Some(envelope) => self.dispatch(envelope),
                    None => {
                        debug!("inbound stream ended");
                        break;
                    }
                },
                command = commands.recv(), if commands_open => match command {
                    Some(ViewerCommand::Quit) => {
                        info!("quit requested");
                        self.connection.close();
                        break;
                    }
                    Some(command) => self.handle_command(command, &prepared_tx),
                    None => {
                        debug!("command input closed; session continues");
                        commands_open = false;
                    }
                },
                Some(prepared) = prepared_rx.recv() => self.finish_file_send(prepared),
                Ok(()) = status.changed() => {
                    let current = status.borrow_and_update().clone();
                    self.emit(SessionEvent::Status(current));
                }
            }
        }

        if self.connection.state() != ConnectionState::Closed
            && time::timeout(CLOSE_GRACE, self.connection.wait_until_closed())
                .await
                .is_err()
        {
            warn!("peer did not finish the close handshake within {CLOSE_GRACE:?}");
        }
        self.emit(SessionEvent::Status(self.connection.status()));
        info!(
            "session ended: {} frames shown, {} stale, {} conversation entries",
            self.pacer.slot().accepted_count(),
            self.pacer.slot().stale_count(),
            self.conversation.len()
        );
        self.conversation
    }

    fn dispatch(&mut self, envelope: Envelope) {
        match envelope {
            Envelope::FrameData { data, seq } => {
                if self.pacer.on_frame_data(data, seq) == FrameOffer::Accepted {
                    self.frames.send_replace(self.pacer.current_frame().cloned());
                }
            }
            Envelope::ChatMessage { data } => {
                self.chat
                    .on_chat_message_received(data, &mut self.conversation);
                self.publish_last_entry();
            }
            Envelope::FileTransfer {
                file_name,
                file_data,
            } => {
                self.files
                    .on_file_received(file_name, file_data, &mut self.conversation);
                self.publish_last_entry();
            }
            Envelope::FrameRequest { seq } => {
                debug!("ignoring frame request {seq:?}; the viewer is not a frame source");
            }
        }
    }

    fn handle_command(
        &mut self,
        command: ViewerCommand,
        prepared_tx: &mpsc::Sender<PreparedResult>,
    ) {
        match command {
            ViewerCommand::Chat(text) => {
                let result = self
                    .chat
                    .send_chat_message(&text, &mut self.conversation)
                    .map(|_| ());
                match result {
                    Ok(()) => self.publish_last_entry(),
                    Err(ChannelError::EmptyMessage) => {}
                    Err(e) => self.report_failure("message not sent", &e),
                }
            }
            ViewerCommand::SendFile(path) => {
                if let Err(e) = self.files.check_ready(&path) {
                    self.report_failure("file not sent", &e);
                    return;
                }
                self.notice(format!("sending '{}'", path.display()));
                let prepared_tx = prepared_tx.clone();
                tokio::spawn(async move {
                    let prepared = FileTransferChannel::prepare(path).await;
                    let _ = prepared_tx.send(prepared).await;
                });
            }
            ViewerCommand::ListFiles => self.list_files(),
            ViewerCommand::SaveFile { index, dir } => self.save_file(index, dir),
            ViewerCommand::Status => self.notice(self.connection.status().to_string()),
            ViewerCommand::Help => self.notice(HELP.to_string()),
            ViewerCommand::Quit => self.connection.close(),
        }
    }

    fn finish_file_send(&mut self, prepared: PreparedResult) {
        let result = prepared.and_then(|prepared| {
            self.files
                .send_prepared(prepared, &mut self.conversation)
                .map(|_| ())
        });
        match result {
            Ok(()) => self.publish_last_entry(),
            Err(e) => self.report_failure("file not sent", &e),
        }
    }

    /// Tells the user; only failures past local validation are logged.
    fn report_failure(&self, what: &str, error: &ChannelError) {
        if !error.is_validation() {
            warn!("{what}: {error}");
        }
        self.notice(format!("{what}: {error}"));
    }

    fn list_files(&self) {
        let lines: Vec<String> = self
            .conversation
            .files()
            .enumerate()
            .map(|(i, record)| {
                format!(
                    "{:>3}. {} ({} bytes, {})",
                    i + 1,
                    record.file_name(),
                    record.size(),
                    match record.origin() {
                        Origin::Local => "sent",
                        Origin::Remote => "received",
                    }
                )
            })
            .collect();

        if lines.is_empty() {
            self.notice("no files yet".to_string());
        } else {
            self.notice(lines.join("\n"));
        }
    }

    fn save_file(&self, index: usize, dir: Option<PathBuf>) {
        let Some(record) = self.conversation.file(index).cloned() else {
            self.notice(ChannelError::UnknownFile(index + 1).to_string());
            return;
        };
        let dir = dir.unwrap_or_else(|| self.options.download_dir.clone());
        let events = self.events.clone();

        tokio::spawn(async move {
            let message = match save_to(&record, &dir).await {
                Ok(path) => format!("saved {}", path.display()),
                Err(e) => {
                    warn!("save failed: {e}");
                    format!("save failed: {e}")
                }
            };
            let _ = events.send(SessionEvent::Notice(message));
        });
    }

    fn publish_last_entry(&self) {
        let event = match self.conversation.entries().last() {
            Some(ConversationEntry::Chat(message)) => SessionEvent::Chat {
                origin: message.origin,
                text: message.text.clone(),
            },
            Some(ConversationEntry::File(record)) => SessionEvent::File {
                origin: record.origin(),
                number: self.conversation.files().count(),
                file_name: record.file_name().to_string(),
                size: record.size(),
            },
            None => return,
        };
        self.emit(event);
    }

    fn notice(&self, text: String) {
        self.emit(SessionEvent::Notice(text));
    }

    fn emit(&self, event: SessionEvent) {
        // The receiver is gone only while the process is shutting down.
        let _ = self.events.send(event);
    }
}
