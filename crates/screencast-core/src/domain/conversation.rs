//! The conversation: chat messages and file transfers, in arrival order.
//!
//! Chat and files are two independent streams on the wire, but the viewer
//! shows them as one timeline.  [`ConversationLog`] is that timeline.  It is
//! append-only for the lifetime of a session: entries are never edited,
//! reordered, or removed.
//!
//! Local entries are appended when they are sent and remote entries when they
//! arrive.  There is no global sequence number, so the relative order of a
//! local and a remote entry is simply the order this side saw them in.

use std::path::Path;

use crate::protocol::envelope::{EncodedBytes, PayloadError};

/// Who authored an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Typed or sent on this side.
    Local,
    /// Received from the peer.
    Remote,
}

/// A chat message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: String,
    pub origin: Origin,
}

/// A complete file that was sent or received.
///
/// The content is kept in its encoded wire form and only turned back into
/// bytes when [`bytes`](Self::bytes) is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransferRecord {
    file_name: String,
    file_data: EncodedBytes,
    origin: Origin,
}

impl FileTransferRecord {
    pub fn new(file_name: impl Into<String>, file_data: EncodedBytes, origin: Origin) -> Self {
        Self {
            file_name: file_name.into(),
            file_data,
            origin,
        }
    }

    /// The file name exactly as it appeared on the wire.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The file name with any directory components removed.
    ///
    /// A peer-supplied name such as `../../etc/passwd` becomes `passwd`.
    /// Returns `None` when nothing usable is left (e.g. `""` or `".."`).
    pub fn safe_file_name(&self) -> Option<&str> {
        // Treat both separators as separators regardless of platform, since
        // the name was produced on another machine.
        let last = self.file_name.rsplit(['/', '\\']).next()?;
        let name = Path::new(last).file_name()?.to_str()?;
        (!name.is_empty()).then_some(name)
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// The encoded payload.
    pub fn encoded(&self) -> &EncodedBytes {
        &self.file_data
    }

    /// File size in bytes, computed without decoding.
    pub fn size(&self) -> usize {
        self.file_data.decoded_len()
    }

    /// Reconstructs the original file content.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] if the peer sent invalid base64.
    pub fn bytes(&self) -> Result<Vec<u8>, PayloadError> {
        self.file_data.decode()
    }
}

/// One entry of the conversation timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEntry {
    Chat(ChatMessage),
    File(FileTransferRecord),
}

impl ConversationEntry {
    pub fn origin(&self) -> Origin {
        match self {
            Self::Chat(msg) => msg.origin,
            Self::File(record) => record.origin(),
        }
    }
}

/// Append-only timeline of chat messages and file transfers.
#[derive(Debug, Default)]
pub struct ConversationLog {
    entries: Vec<ConversationEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chat message and returns the new entry.
    pub fn push_chat(&mut self, text: impl Into<String>, origin: Origin) -> &ConversationEntry {
        self.push(ConversationEntry::Chat(ChatMessage {
            text: text.into(),
            origin,
        }))
    }

    /// Appends a file record and returns the new entry.
    pub fn push_file(&mut self, record: FileTransferRecord) -> &ConversationEntry {
        self.push(ConversationEntry::File(record))
    }

    fn push(&mut self, entry: ConversationEntry) -> &ConversationEntry {
        self.entries.push(entry);
        // Just pushed, so the vector is non-empty.
        &self.entries[self.entries.len() - 1]
    }

    /// All entries in arrival order.
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Chat messages only, in arrival order.
    pub fn chat_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter().filter_map(|entry| match entry {
            ConversationEntry::Chat(msg) => Some(msg),
            ConversationEntry::File(_) => None,
        })
    }

    /// File records only, in arrival order.
    pub fn files(&self) -> impl Iterator<Item = &FileTransferRecord> {
        self.entries.iter().filter_map(|entry| match entry {
            ConversationEntry::File(record) => Some(record),
            ConversationEntry::Chat(_) => None,
        })
    }

    /// The `index`-th file record (zero-based, counting files only).
    pub fn file(&self, index: usize) -> Option<&FileTransferRecord> {
        self.files().nth(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, origin: Origin) -> FileTransferRecord {
        FileTransferRecord::new(name, EncodedBytes::from_bytes(b"content"), origin)
    }

    #[test]
    fn test_entries_keep_arrival_order_across_kinds() {
        // Arrange
        let mut log = ConversationLog::new();

        // Act
        log.push_chat("hi", Origin::Local);
        log.push_file(record("a.txt", Origin::Remote));
        log.push_chat("got it", Origin::Local);

        // Assert
        let origins: Vec<Origin> = log.entries().iter().map(ConversationEntry::origin).collect();
        assert_eq!(origins, vec![Origin::Local, Origin::Remote, Origin::Local]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_chat_messages_filters_out_files() {
        let mut log = ConversationLog::new();
        log.push_chat("one", Origin::Remote);
        log.push_file(record("x.bin", Origin::Local));
        log.push_chat("two", Origin::Local);

        let texts: Vec<&str> = log.chat_messages().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn test_file_index_counts_files_only() {
        let mut log = ConversationLog::new();
        log.push_chat("before", Origin::Local);
        log.push_file(record("first.txt", Origin::Remote));
        log.push_chat("between", Origin::Remote);
        log.push_file(record("second.txt", Origin::Local));

        assert_eq!(log.file(0).unwrap().file_name(), "first.txt");
        assert_eq!(log.file(1).unwrap().file_name(), "second.txt");
        assert!(log.file(2).is_none());
    }

    #[test]
    fn test_push_returns_the_new_entry() {
        let mut log = ConversationLog::new();
        let entry = log.push_chat("hello", Origin::Local);
        assert_eq!(
            entry,
            &ConversationEntry::Chat(ChatMessage {
                text: "hello".to_string(),
                origin: Origin::Local
            })
        );
    }

    #[test]
    fn test_record_reconstructs_bytes_and_size() {
        let bytes = vec![0u8, 159, 146, 150, 255];
        let rec = FileTransferRecord::new("blob", EncodedBytes::from_bytes(&bytes), Origin::Remote);
        assert_eq!(rec.bytes().unwrap(), bytes);
        assert_eq!(rec.size(), bytes.len());
    }

    #[test]
    fn test_safe_file_name_strips_directories() {
        assert_eq!(record("report.pdf", Origin::Remote).safe_file_name(), Some("report.pdf"));
        assert_eq!(record("../../etc/passwd", Origin::Remote).safe_file_name(), Some("passwd"));
        assert_eq!(record("C:\\Users\\me\\notes.txt", Origin::Remote).safe_file_name(), Some("notes.txt"));
        assert_eq!(record("/abs/path/x.bin", Origin::Remote).safe_file_name(), Some("x.bin"));
    }

    #[test]
    fn test_safe_file_name_rejects_empty_and_dot_names() {
        assert_eq!(record("", Origin::Remote).safe_file_name(), None);
        assert_eq!(record("..", Origin::Remote).safe_file_name(), None);
        assert_eq!(record("dir/", Origin::Remote).safe_file_name(), None);
    }
}
