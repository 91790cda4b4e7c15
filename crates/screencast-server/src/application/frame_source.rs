//! Where frames come from.
//!
//! A [`FrameSource`] is asked for a frame every time a viewer sends
//! `request_next_frame`.  It may answer with nothing, in which case the
//! session stays silent and the viewer keeps showing its last frame.
//!
//! Sources are shared by all sessions; per-session memory (what was sent
//! last) is passed in by the caller as a [`FrameVersion`].

use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use screencast_core::EncodedBytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameSourceError {
    #[error("failed to read frame from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("frame encode task failed: {0}")]
    Encode(String),
}

/// Identifies one version of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameVersion(SystemTime);

/// A frame ready to put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFrame {
    pub data: EncodedBytes,
    /// `None` for sources that have no notion of change.
    pub version: Option<FrameVersion>,
}

#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Returns the current frame, or `None` if it is the same version as
    /// `last_sent`.
    async fn next_frame(
        &self,
        last_sent: Option<FrameVersion>,
    ) -> Result<Option<SourceFrame>, FrameSourceError>;
}

// ── FileFrameSource ───────────────────────────────────────────────────────────

/// Serves the JPEG at a path, re-reading it whenever its mtime changes.
pub struct FileFrameSource {
    path: PathBuf,
}

impl FileFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> FrameSourceError {
        FrameSourceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl FrameSource for FileFrameSource {
    async fn next_frame(
        &self,
        last_sent: Option<FrameVersion>,
    ) -> Result<Option<SourceFrame>, FrameSourceError> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        let version = metadata.modified().ok().map(FrameVersion);
        if version.is_some() && version == last_sent {
            return Ok(None);
        }

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        let data = tokio::task::spawn_blocking(move || EncodedBytes::from_bytes(&bytes))
            .await
            .map_err(|e| FrameSourceError::Encode(e.to_string()))?;

        Ok(Some(SourceFrame { data, version }))
    }
}

// ── StaticFrameSource ─────────────────────────────────────────────────────────

/// Serves the same in-memory image on every request.
pub struct StaticFrameSource {
    data: EncodedBytes,
}

impl StaticFrameSource {
    pub fn new(image: &[u8]) -> Self {
        Self {
            data: EncodedBytes::from_bytes(image),
        }
    }
}

#[async_trait]
impl FrameSource for StaticFrameSource {
    async fn next_frame(
        &self,
        _last_sent: Option<FrameVersion>,
    ) -> Result<Option<SourceFrame>, FrameSourceError> {
        Ok(Some(SourceFrame {
            data: self.data.clone(),
            version: None,
        }))
    }
}
