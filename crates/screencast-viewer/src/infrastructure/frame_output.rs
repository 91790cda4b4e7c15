//! Writes the frame on screen to a file, for display by any image viewer.
//!
//! Each frame is written to a hidden staging file next to the target and
//! renamed over it, so a reader never sees a half-written image.  The watch
//! channel only keeps the latest frame: if a write is slower than the frame
//! rate, intermediate frames are skipped instead of queued.

use std::path::{Path, PathBuf};

use anyhow::Context;
use screencast_core::Frame;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Totals of one [`write_frames`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameOutputStats {
    pub written: u64,
    pub failed: u64,
}

/// Writes every new frame to `path` until the session drops its sender.
pub async fn write_frames(
    mut frames: watch::Receiver<Option<Frame>>,
    path: PathBuf,
) -> FrameOutputStats {
    let mut writer = FrameWriter::new(path);

    while frames.changed().await.is_ok() {
        let Some(frame) = frames.borrow_and_update().clone() else {
            continue;
        };
        writer.write(&frame).await;
    }

    debug!(
        "frame output stopped: {} written, {} failed",
        writer.stats.written, writer.stats.failed
    );
    writer.stats
}

/// Writes frames to one target.  A failed frame is logged and counted; the
/// next one is written as usual.
struct FrameWriter {
    staging: PathBuf,
    target: PathBuf,
    stats: FrameOutputStats,
}

impl FrameWriter {
    fn new(target: PathBuf) -> Self {
        Self {
            staging: staging_path(&target),
            target,
            stats: FrameOutputStats::default(),
        }
    }

    async fn write(&mut self, frame: &Frame) {
        match self.try_write(frame).await {
            Ok(()) => self.stats.written += 1,
            Err(e) => {
                warn!("frame output: {e:#}");
                self.stats.failed += 1;
            }
        }
    }

    async fn try_write(&self, frame: &Frame) -> anyhow::Result<()> {
        let bytes = frame
            .bytes()
            .with_context(|| format!("frame {:?} has a corrupt payload", frame.seq()))?;
        tokio::fs::write(&self.staging, &bytes)
            .await
            .with_context(|| format!("failed to write {}", self.staging.display()))?;
        tokio::fs::rename(&self.staging, &self.target)
            .await
            .with_context(|| format!("failed to move frame into {}", self.target.display()))?;
        Ok(())
    }
}

/// `/tmp/screen.jpg` -> `/tmp/.screen.jpg.part`
fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    target.with_file_name(format!(".{name}.part"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use screencast_core::EncodedBytes;

    fn corrupt_frame() -> Frame {
        Frame::new(EncodedBytes::from_encoded("%%%"), Some(1))
    }

    #[test]
    fn test_staging_path_is_hidden_sibling() {
        assert_eq!(
            staging_path(Path::new("/tmp/screen.jpg")),
            PathBuf::from("/tmp/.screen.jpg.part")
        );
    }

    #[tokio::test]
    async fn test_latest_frame_lands_at_target() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("screen.jpg");
        let (tx, rx) = watch::channel(None);
        let writer = tokio::spawn(write_frames(rx, target.clone()));

        // Act: publish a frame, then close the channel so the writer finishes
        tx.send_replace(Some(Frame::new(EncodedBytes::from_bytes(b"\xFF\xD8jpeg"), Some(3))));
        drop(tx);
        let stats = writer.await.unwrap();

        // Assert
        assert_eq!(std::fs::read(&target).unwrap(), b"\xFF\xD8jpeg");
        assert!(!staging_path(&target).exists());
        assert_eq!(stats, FrameOutputStats { written: 1, failed: 0 });
    }

    #[tokio::test]
    async fn test_corrupt_frame_is_counted_and_target_kept() {
        // Arrange: a previous frame is already on disk
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("screen.jpg");
        std::fs::write(&target, b"previous").unwrap();
        let (tx, rx) = watch::channel(None);
        let writer = tokio::spawn(write_frames(rx, target.clone()));

        // Act
        tx.send_replace(Some(corrupt_frame()));
        drop(tx);
        let stats = writer.await.unwrap();

        // Assert
        assert_eq!(stats, FrameOutputStats { written: 0, failed: 1 });
        assert_eq!(std::fs::read(&target).unwrap(), b"previous");
    }

    #[tokio::test]
    async fn test_writer_continues_after_a_corrupt_frame() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("screen.jpg");
        let mut writer = FrameWriter::new(target.clone());

        writer.write(&corrupt_frame()).await;
        writer.write(&Frame::new(EncodedBytes::from_bytes(b"ok"), Some(2))).await;

        assert_eq!(writer.stats, FrameOutputStats { written: 1, failed: 1 });
        assert_eq!(std::fs::read(&target).unwrap(), b"ok");
    }
}
