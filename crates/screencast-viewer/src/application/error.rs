use std::path::PathBuf;

use screencast_core::{ConnectionState, PayloadError};
use thiserror::Error;

/// Error type for the chat and file transfer channels.
///
/// None of these variants affect the connection: a rejected chat message or a
/// failed file read is reported to the user and the session carries on.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("no file selected")]
    NoFileSelected,
    #[error("'{}' has no usable file name", .0.display())]
    InvalidFileName(PathBuf),
    #[error("not connected ({0:?})")]
    NotOpen(ConnectionState),
    #[error("envelope could not be sent")]
    SendFailed,
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode file contents: {0}")]
    Encode(String),
    #[error("file payload is corrupt: {0}")]
    Payload(#[from] PayloadError),
    #[error("no file with number {0}")]
    UnknownFile(usize),
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ChannelError {
    /// `true` for the local validation failures that never reach the wire.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyMessage | Self::NoFileSelected | Self::InvalidFileName(_) | Self::NotOpen(_)
        )
    }
}
