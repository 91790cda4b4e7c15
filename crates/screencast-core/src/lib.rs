//! # screencast-core
//!
//! Shared library for the screencast viewer and frame source containing the
//! envelope codec and the pure state the viewer keeps between messages.
//!
//! This crate is used by both the viewer and the server applications.
//! It has zero dependencies on sockets, async runtimes, or the file system.
//!
//! # Architecture overview
//!
//! A single WebSocket connection carries three kinds of traffic at once:
//! still frames of the remote screen (pulled one at a time by the viewer),
//! chat messages, and whole-file transfers.  Every message is a JSON object
//! whose `"type"` field says which kind it is.
//!
//! - **`protocol`** – The wire format.  [`Envelope`] is the tagged union of
//!   all message kinds, [`codec`](protocol::codec) turns envelopes into text
//!   frames and back, and [`SequenceCounter`] numbers frame requests.
//!
//! - **`domain`** – State with no I/O: the [`FrameSlot`] holding the frame
//!   currently on screen, the append-only [`ConversationLog`] of chat and
//!   file entries, and the [`ConnectionState`] lifecycle.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `screencast_core::Envelope` instead of `screencast_core::protocol::envelope::Envelope`.
pub use domain::connection::{ConnectionState, ConnectionStatus};
pub use domain::conversation::{
    ChatMessage, ConversationEntry, ConversationLog, FileTransferRecord, Origin,
};
pub use domain::frame::{Frame, FrameOffer, FrameSlot};
pub use protocol::codec::{decode, encode, DecodeError, Decoded, EncodeError};
pub use protocol::envelope::{EncodedBytes, Envelope, EnvelopeKind, PayloadError};
pub use protocol::sequence::SequenceCounter;
