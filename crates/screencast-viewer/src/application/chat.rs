//! Chat channel: short text messages in both directions.
//!
//! Outgoing messages are echoed into the conversation as soon as the
//! connection accepts them; there is no delivery acknowledgement.

use std::sync::Arc;

use screencast_core::{ConversationEntry, ConversationLog, Envelope, Origin};
use tracing::debug;

use super::error::ChannelError;
use super::sink::{EnvelopeSink, SendOutcome};

pub struct ChatChannel {
    sink: Arc<dyn EnvelopeSink>,
}

impl ChatChannel {
    pub fn new(sink: Arc<dyn EnvelopeSink>) -> Self {
        Self { sink }
    }

    /// Sends `text` and appends it to `log` as a local message.
    ///
    /// The text goes out exactly as given; trimming only decides whether it
    /// is empty.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::EmptyMessage`] if `text` is empty or whitespace.
    /// - [`ChannelError::NotOpen`] if the connection is not open.
    /// - [`ChannelError::SendFailed`] if the envelope could not be serialised.
    ///
    /// On error nothing is transmitted and nothing is appended.
    pub fn send_chat_message<'a>(
        &self,
        text: &str,
        log: &'a mut ConversationLog,
    ) -> Result<&'a ConversationEntry, ChannelError> {
        if text.trim().is_empty() {
            return Err(ChannelError::EmptyMessage);
        }

        let state = self.sink.state();
        if !state.is_open() {
            return Err(ChannelError::NotOpen(state));
        }

        match self.sink.send(&Envelope::chat(text)) {
            SendOutcome::Sent => {
                debug!("chat message sent ({} bytes)", text.len());
                Ok(log.push_chat(text, Origin::Local))
            }
            SendOutcome::Suppressed { state } => Err(ChannelError::NotOpen(state)),
            SendOutcome::Failed => Err(ChannelError::SendFailed),
        }
    }

    /// Appends a message received from the peer.
    pub fn on_chat_message_received<'a>(
        &self,
        text: String,
        log: &'a mut ConversationLog,
    ) -> &'a ConversationEntry {
        debug!("chat message received ({} bytes)", text.len());
        log.push_chat(text, Origin::Remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::sink::MockEnvelopeSink;
    use screencast_core::{ChatMessage, ConnectionState};

    fn open_sink() -> MockEnvelopeSink {
        let mut sink = MockEnvelopeSink::new();
        sink.expect_state().return_const(ConnectionState::Open);
        sink
    }

    #[test]
    fn test_empty_and_whitespace_messages_are_never_sent() {
        for text in ["", "   ", "\t\n"] {
            // Arrange: any send would fail the test
            let mut sink = open_sink();
            sink.expect_send().never();
            let chat = ChatChannel::new(Arc::new(sink));
            let mut log = ConversationLog::new();

            // Act
            let result = chat.send_chat_message(text, &mut log);

            // Assert
            assert!(matches!(result, Err(ChannelError::EmptyMessage)), "{text:?}");
            assert!(log.is_empty());
        }
    }

    #[test]
    fn test_hello_sends_one_envelope_and_appends_one_local_entry() {
        // Arrange
        let mut sink = open_sink();
        sink.expect_send()
            .withf(|env| *env == Envelope::chat("hello"))
            .times(1)
            .return_const(SendOutcome::Sent);
        let chat = ChatChannel::new(Arc::new(sink));
        let mut log = ConversationLog::new();

        // Act
        chat.send_chat_message("hello", &mut log).unwrap();

        // Assert
        let messages: Vec<&ChatMessage> = log.chat_messages().collect();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[0].origin, Origin::Local);
    }

    #[test]
    fn test_surrounding_whitespace_is_sent_verbatim() {
        let mut sink = open_sink();
        sink.expect_send()
            .withf(|env| *env == Envelope::chat("  hi  "))
            .times(1)
            .return_const(SendOutcome::Sent);
        let chat = ChatChannel::new(Arc::new(sink));
        let mut log = ConversationLog::new();

        chat.send_chat_message("  hi  ", &mut log).unwrap();

        assert_eq!(log.chat_messages().next().unwrap().text, "  hi  ");
    }

    #[test]
    fn test_message_is_rejected_when_not_open() {
        for state in [
            ConnectionState::Connecting,
            ConnectionState::Closing,
            ConnectionState::Closed,
            ConnectionState::Errored,
        ] {
            let mut sink = MockEnvelopeSink::new();
            sink.expect_state().return_const(state);
            sink.expect_send().never();
            let chat = ChatChannel::new(Arc::new(sink));
            let mut log = ConversationLog::new();

            let result = chat.send_chat_message("hello", &mut log);

            assert!(matches!(result, Err(ChannelError::NotOpen(s)) if s == state));
            assert!(log.is_empty());
        }
    }

    #[test]
    fn test_suppressed_send_does_not_append() {
        // Arrange: the connection closes between the state check and the send
        let mut sink = open_sink();
        sink.expect_send().return_const(SendOutcome::Suppressed {
            state: ConnectionState::Closed,
        });
        let chat = ChatChannel::new(Arc::new(sink));
        let mut log = ConversationLog::new();

        // Act
        let result = chat.send_chat_message("hello", &mut log);

        // Assert
        assert!(matches!(result, Err(ChannelError::NotOpen(ConnectionState::Closed))));
        assert!(log.is_empty());
    }

    #[test]
    fn test_received_message_is_appended_as_remote() {
        let mut sink = MockEnvelopeSink::new();
        sink.expect_send().never();
        let chat = ChatChannel::new(Arc::new(sink));
        let mut log = ConversationLog::new();

        chat.on_chat_message_received("hi there".to_string(), &mut log);

        let message = log.chat_messages().next().unwrap();
        assert_eq!(message.text, "hi there");
        assert_eq!(message.origin, Origin::Remote);
    }
}
