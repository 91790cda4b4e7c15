//! File transfer channel.
//!
//! A file always travels whole, as one `file` envelope.  Sending is split in
//! two halves so the session loop never waits on the disk:
//!
//! ```text
//! check_ready(path)      on the loop: validation only
//! prepare(path).await    on a spawned task: read + base64 encode
//! send_prepared(..)      back on the loop: transmit, then record
//! ```
//!
//! [`FileTransferChannel::send_file`] runs all three in sequence for callers
//! that do not care about blocking.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use screencast_core::{
    ConversationEntry, ConversationLog, EncodedBytes, Envelope, FileTransferRecord, Origin,
};
use tracing::{debug, info};

use super::error::ChannelError;
use super::sink::{EnvelopeSink, SendOutcome};

/// A file that has been read and encoded and is ready to transmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedFile {
    pub file_name: String,
    pub file_data: EncodedBytes,
}

pub struct FileTransferChannel {
    sink: Arc<dyn EnvelopeSink>,
}

impl FileTransferChannel {
    pub fn new(sink: Arc<dyn EnvelopeSink>) -> Self {
        Self { sink }
    }

    /// Rejects a send before any file I/O happens.
    ///
    /// # Errors
    ///
    /// [`ChannelError::NoFileSelected`] for an empty path,
    /// [`ChannelError::NotOpen`] if the connection is not open.
    pub fn check_ready(&self, path: &Path) -> Result<(), ChannelError> {
        if path.as_os_str().is_empty() {
            return Err(ChannelError::NoFileSelected);
        }
        let state = self.sink.state();
        if !state.is_open() {
            return Err(ChannelError::NotOpen(state));
        }
        Ok(())
    }

    /// Reads the whole file and base64-encodes it.
    ///
    /// The encode runs on the blocking pool; a multi-megabyte file takes long
    /// enough to matter at 60 frame requests per second.
    ///
    /// # Errors
    ///
    /// [`ChannelError::InvalidFileName`] if the path has no final component,
    /// [`ChannelError::Read`] if the file cannot be read,
    /// [`ChannelError::Encode`] if the encode task panicked.
    pub async fn prepare(path: PathBuf) -> Result<PreparedFile, ChannelError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_owned)
            .ok_or_else(|| ChannelError::InvalidFileName(path.clone()))?;

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| ChannelError::Read {
                path: path.clone(),
                source,
            })?;
        debug!("read '{}' ({} bytes)", path.display(), bytes.len());

        let file_data = tokio::task::spawn_blocking(move || EncodedBytes::from_bytes(&bytes))
            .await
            .map_err(|e| ChannelError::Encode(e.to_string()))?;

        Ok(PreparedFile {
            file_name,
            file_data,
        })
    }

    /// Transmits a prepared file and records it as a local transfer.
    ///
    /// The record is appended only if the connection accepted the envelope.
    ///
    /// # Errors
    ///
    /// [`ChannelError::NotOpen`] if the connection closed while the file was
    /// being read, [`ChannelError::SendFailed`] if serialisation failed or
    /// the outbound queue was full.
    pub fn send_prepared<'a>(
        &self,
        prepared: PreparedFile,
        log: &'a mut ConversationLog,
    ) -> Result<&'a ConversationEntry, ChannelError> {
        let record = FileTransferRecord::new(prepared.file_name, prepared.file_data, Origin::Local);
        let envelope = Envelope::FileTransfer {
            file_name: record.file_name().to_string(),
            file_data: record.encoded().clone(),
        };

        match self.sink.send(&envelope) {
            SendOutcome::Sent => {
                info!("sent file '{}' ({} bytes)", record.file_name(), record.size());
                Ok(log.push_file(record))
            }
            SendOutcome::Suppressed { state } => Err(ChannelError::NotOpen(state)),
            SendOutcome::Failed => Err(ChannelError::SendFailed),
        }
    }

    /// Validates, reads, encodes and sends `path` in one call.
    ///
    /// # Errors
    ///
    /// Any error from [`check_ready`](Self::check_ready),
    /// [`prepare`](Self::prepare) or [`send_prepared`](Self::send_prepared).
    pub async fn send_file<'a>(
        &self,
        path: &Path,
        log: &'a mut ConversationLog,
    ) -> Result<&'a ConversationEntry, ChannelError> {
        self.check_ready(path)?;
        let prepared = Self::prepare(path.to_path_buf()).await?;
        self.send_prepared(prepared, log)
    }

    /// Records a file received from the peer.  The payload stays encoded.
    pub fn on_file_received<'a>(
        &self,
        file_name: String,
        file_data: EncodedBytes,
        log: &'a mut ConversationLog,
    ) -> &'a ConversationEntry {
        info!(
            "received file '{file_name}' ({} bytes)",
            file_data.decoded_len()
        );
        log.push_file(FileTransferRecord::new(file_name, file_data, Origin::Remote))
    }
}

/// Writes a transferred file into `dir`, creating the directory if needed.
///
/// Only the final component of the record's file name is used, so a peer
/// cannot direct the write outside `dir`.  Returns the path written.
///
/// # Errors
///
/// [`ChannelError::InvalidFileName`] if no usable name remains,
/// [`ChannelError::Payload`] if the payload is not valid base64,
/// [`ChannelError::Write`] on I/O failure.
pub async fn save_to(record: &FileTransferRecord, dir: &Path) -> Result<PathBuf, ChannelError> {
    let name = record
        .safe_file_name()
        .ok_or_else(|| ChannelError::InvalidFileName(PathBuf::from(record.file_name())))?;
    let bytes = record.bytes()?;
    let target = dir.join(name);

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ChannelError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    tokio::fs::write(&target, &bytes)
        .await
        .map_err(|source| ChannelError::Write {
            path: target.clone(),
            source,
        })?;

    info!("saved '{}' ({} bytes)", target.display(), bytes.len());
    Ok(target)
}
