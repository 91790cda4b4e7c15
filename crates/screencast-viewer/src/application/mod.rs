//! Application layer for the viewer.
//!
//! Each channel is a small use case that validates input, hands envelopes to
//! an [`EnvelopeSink`], and appends to the conversation log it is given.
//! None of them own any state that outlives a call except the frame pacer,
//! which keeps the sequence counter and the current frame.

pub mod chat;
pub mod commands;
pub mod error;
pub mod file_transfer;
pub mod frame_pacing;
pub mod sink;

pub use chat::ChatChannel;
pub use commands::{CommandError, ViewerCommand};
pub use error::ChannelError;
pub use file_transfer::{save_to, FileTransferChannel, PreparedFile};
pub use frame_pacing::FramePacer;
pub use sink::{EnvelopeSink, SendOutcome};
