//! Envelope types for the viewer ↔ frame source WebSocket protocol.
//!
//! # Message flow
//!
//! ```text
//! Viewer → Source:  {"type":"request_next_frame","seq":7}
//! Source → Viewer:  {"type":"image","data":"/9j/4AAQ...","seq":7}
//! Both directions:  {"type":"message","data":"hello"}
//! Both directions:  {"type":"file","fileName":"report.pdf","fileData":"JVBERi0..."}
//! ```
//!
//! # JSON discriminant
//!
//! Every message is a JSON object with a `"type"` field that identifies the
//! variant.  All other fields are flattened into the same object.  Serde's
//! `#[serde(tag = "type")]` attribute handles this automatically, and because
//! each variant carries its own fields, a `"message"` can never arrive with a
//! `fileName` attached: invalid kind/payload pairs are unrepresentable.
//!
//! # Binary payloads
//!
//! Frames and files are carried as standard (RFC 4648, padded) base64 strings
//! wrapped in [`EncodedBytes`].  The encoded text is kept as-is until a
//! consumer actually needs the bytes; see [`EncodedBytes::decode`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when an encoded payload cannot be turned back into bytes.
#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    /// The payload text is not valid standard base64.
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
}

// ── Encoded payload ───────────────────────────────────────────────────────────

/// A binary payload in its text-safe (base64) wire form.
///
/// Serializes as a plain JSON string.  Decoding is deferred: a received file
/// keeps its encoded form and only reconstructs bytes when somebody asks for
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedBytes(String);

impl EncodedBytes {
    /// Base64-encodes `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(STANDARD.encode(bytes))
    }

    /// Wraps text that is already base64 without validating it.
    ///
    /// Validation happens in [`decode`](Self::decode).
    pub fn from_encoded(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Reconstructs the original bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::InvalidBase64`] if the text is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, PayloadError> {
        STANDARD
            .decode(self.0.as_bytes())
            .map_err(|e| PayloadError::InvalidBase64(e.to_string()))
    }

    /// The encoded text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of bytes the payload decodes to, computed from the text length
    /// and padding without decoding.
    pub fn decoded_len(&self) -> usize {
        let padding = self.0.bytes().rev().take_while(|&b| b == b'=').count();
        (self.0.len() / 4 * 3).saturating_sub(padding)
    }
}

// ── Envelope ──────────────────────────────────────────────────────────────────

/// Every message that can travel over the connection, in either direction.
///
/// # Serde representation
///
/// ```json
/// {"type":"request_next_frame","seq":3}
/// {"type":"image","data":"/9j/4AAQSkZJRg==","seq":3}
/// {"type":"message","data":"hi there"}
/// {"type":"file","fileName":"notes.txt","fileData":"aGVsbG8="}
/// ```
///
/// `seq` is optional on both frame variants.  A peer that never sends it
/// still interoperates; its replies are simply accepted in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope {
    /// Viewer asks the frame source for its latest frame.
    #[serde(rename = "request_next_frame")]
    FrameRequest {
        /// Monotonically increasing request number, echoed in the reply.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
    },

    /// Frame source answers a `request_next_frame` with one JPEG frame.
    #[serde(rename = "image")]
    FrameData {
        /// The image bytes, base64-encoded.
        data: EncodedBytes,
        /// The `seq` of the request this frame answers, if the request had one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
    },

    /// A chat message.
    #[serde(rename = "message")]
    ChatMessage {
        /// The message text, exactly as typed.
        data: String,
    },

    /// A complete file, sent in one piece.
    #[serde(rename = "file")]
    FileTransfer {
        /// The file's name, without any directory component on the sending side.
        #[serde(rename = "fileName")]
        file_name: String,
        /// The whole file content, base64-encoded.
        #[serde(rename = "fileData")]
        file_data: EncodedBytes,
    },
}

impl Envelope {
    /// Builds a frame request carrying `seq`.
    pub fn frame_request(seq: u64) -> Self {
        Self::FrameRequest { seq: Some(seq) }
    }

    /// Builds a chat envelope.
    pub fn chat(text: impl Into<String>) -> Self {
        Self::ChatMessage { data: text.into() }
    }

    /// Builds a file envelope, base64-encoding `bytes`.
    pub fn file(file_name: impl Into<String>, bytes: &[u8]) -> Self {
        Self::FileTransfer {
            file_name: file_name.into(),
            file_data: EncodedBytes::from_bytes(bytes),
        }
    }

    /// The kind of this envelope.
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Self::FrameRequest { .. } => EnvelopeKind::FrameRequest,
            Self::FrameData { .. } => EnvelopeKind::FrameData,
            Self::ChatMessage { .. } => EnvelopeKind::ChatMessage,
            Self::FileTransfer { .. } => EnvelopeKind::FileTransfer,
        }
    }
}

// ── Kind discriminant ─────────────────────────────────────────────────────────

/// Payload-free discriminant of an [`Envelope`].
///
/// Used for classification before full decoding and in log lines, so that
/// chat text or file contents never end up in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    FrameRequest,
    FrameData,
    ChatMessage,
    FileTransfer,
}

impl EnvelopeKind {
    /// All known kinds.
    pub const ALL: [EnvelopeKind; 4] = [
        EnvelopeKind::FrameRequest,
        EnvelopeKind::FrameData,
        EnvelopeKind::ChatMessage,
        EnvelopeKind::FileTransfer,
    ];

    /// The value of the `"type"` field for this kind.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::FrameRequest => "request_next_frame",
            Self::FrameData => "image",
            Self::ChatMessage => "message",
            Self::FileTransfer => "file",
        }
    }

    /// Looks up a kind by its `"type"` field value.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
    }
}

impl std::fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
