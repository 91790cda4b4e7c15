//! Per-viewer envelope handling, independent of the socket.
//!
//! [`PeerSession::handle`] takes one decoded envelope and returns the reply
//! to send, if any.  Only frame requests are ever answered.

use std::sync::Arc;

use screencast_core::{ConversationLog, Envelope, FileTransferRecord, Origin};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::frame_source::{FrameSource, FrameVersion};

pub struct PeerSession {
    id: Uuid,
    source: Arc<dyn FrameSource>,
    last_sent: Option<FrameVersion>,
    source_failing: bool,
    frames_sent: u64,
    conversation: ConversationLog,
}

impl PeerSession {
    pub fn new(source: Arc<dyn FrameSource>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            last_sent: None,
            source_failing: false,
            frames_sent: 0,
            conversation: ConversationLog::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Everything the viewer sent in this session.
    pub fn conversation(&self) -> &ConversationLog {
        &self.conversation
    }

    /// Handles one envelope from the viewer and returns the reply, if any.
    pub async fn handle(&mut self, envelope: Envelope) -> Option<Envelope> {
        match envelope {
            Envelope::FrameRequest { seq } => self.answer_frame_request(seq).await,
            Envelope::ChatMessage { data } => {
                info!("session {}: chat message ({} bytes)", self.id, data.len());
                debug!("session {}: chat: {data}", self.id);
                self.conversation.push_chat(data, Origin::Remote);
                None
            }
            Envelope::FileTransfer {
                file_name,
                file_data,
            } => {
                info!(
                    "session {}: received file '{file_name}' ({} bytes)",
                    self.id,
                    file_data.decoded_len()
                );
                self.conversation
                    .push_file(FileTransferRecord::new(file_name, file_data, Origin::Remote));
                None
            }
            Envelope::FrameData { .. } => {
                debug!("session {}: ignoring image sent by the viewer", self.id);
                None
            }
        }
    }

    async fn answer_frame_request(&mut self, seq: Option<u64>) -> Option<Envelope> {
        match self.source.next_frame(self.last_sent).await {
            Ok(Some(frame)) => {
                if self.source_failing {
                    info!("session {}: frame source recovered", self.id);
                    self.source_failing = false;
                }
                self.last_sent = frame.version;
                self.frames_sent += 1;
                trace!("session {}: answering frame request {seq:?}", self.id);
                Some(Envelope::FrameData {
                    data: frame.data,
                    seq,
                })
            }
            Ok(None) => {
                trace!("session {}: frame unchanged; not answering {seq:?}", self.id);
                None
            }
            Err(e) => {
                // Requests arrive at display rate; warn once per outage.
                if !self.source_failing {
                    warn!("session {}: {e}", self.id);
                    self.source_failing = true;
                } else {
                    debug!("session {}: {e}", self.id);
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::frame_source::{FileFrameSource, StaticFrameSource};
    use screencast_core::EncodedBytes;

    fn static_session() -> PeerSession {
        PeerSession::new(Arc::new(StaticFrameSource::new(b"jpeg")))
    }

    #[tokio::test]
    async fn test_frame_reply_echoes_request_seq() {
        let mut session = static_session();

        let reply = session.handle(Envelope::frame_request(41)).await;

        assert_eq!(
            reply,
            Some(Envelope::FrameData {
                data: EncodedBytes::from_bytes(b"jpeg"),
                seq: Some(41),
            })
        );
        assert_eq!(session.frames_sent(), 1);
    }

    #[tokio::test]
    async fn test_unsequenced_request_gets_unsequenced_reply() {
        let mut session = static_session();

        let reply = session.handle(Envelope::FrameRequest { seq: None }).await;

        assert!(matches!(reply, Some(Envelope::FrameData { seq: None, .. })));
    }

    #[tokio::test]
    async fn test_chat_and_files_are_recorded_without_reply() {
        // Arrange
        let mut session = static_session();

        // Act
        let chat_reply = session.handle(Envelope::chat("hello")).await;
        let file_reply = session.handle(Envelope::file("report.pdf", b"X")).await;

        // Assert
        assert!(chat_reply.is_none());
        assert!(file_reply.is_none());
        assert_eq!(session.conversation().len(), 2);
        let record = session.conversation().file(0).unwrap();
        assert_eq!(record.file_name(), "report.pdf");
        assert_eq!(record.bytes().unwrap(), b"X");
    }

    #[tokio::test]
    async fn test_unchanged_file_is_not_resent_to_the_same_session() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screen.jpg");
        std::fs::write(&path, b"frame").unwrap();
        let source: Arc<dyn FrameSource> = Arc::new(FileFrameSource::new(&path));
        let mut first = PeerSession::new(Arc::clone(&source));
        let mut second = PeerSession::new(source);

        // Act
        let a = first.handle(Envelope::frame_request(0)).await;
        let b = first.handle(Envelope::frame_request(1)).await;
        let c = second.handle(Envelope::frame_request(0)).await;

        // Assert: each session gets the frame once
        assert!(a.is_some());
        assert!(b.is_none());
        assert!(c.is_some());
    }

    #[tokio::test]
    async fn test_failing_source_stays_silent() {
        let dir = tempfile::tempdir().unwrap();
        let mut session =
            PeerSession::new(Arc::new(FileFrameSource::new(dir.path().join("none.jpg"))));

        assert!(session.handle(Envelope::frame_request(0)).await.is_none());
        assert!(session.handle(Envelope::frame_request(1)).await.is_none());
        assert_eq!(session.frames_sent(), 0);
    }

    #[test]
    fn test_sessions_get_distinct_ids() {
        assert_ne!(static_session().id(), static_session().id());
    }
}
