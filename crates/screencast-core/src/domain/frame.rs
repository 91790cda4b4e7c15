//! The "current frame" slot.
//!
//! The viewer shows exactly one frame at a time.  A newly received frame
//! replaces the old one, which is then discarded; there is no frame history.
//!
//! Because frame requests are pipelined, replies can be processed out of
//! order.  Each reply echoes the `seq` of the request it answers, and the slot
//! accepts a reply only if its `seq` is strictly greater than the last one it
//! accepted.  A reply without a `seq` (from a source that does not echo it)
//! is accepted unconditionally: most recently arrived wins.

use crate::protocol::envelope::{EncodedBytes, PayloadError};

/// One still image of the remote screen, still in its encoded wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: EncodedBytes,
    seq: Option<u64>,
}

impl Frame {
    /// Creates a frame from a received `image` payload.
    pub fn new(data: EncodedBytes, seq: Option<u64>) -> Self {
        Self { data, seq }
    }

    /// The encoded image payload.
    pub fn data(&self) -> &EncodedBytes {
        &self.data
    }

    /// The request number this frame answers, if the source echoed one.
    pub fn seq(&self) -> Option<u64> {
        self.seq
    }

    /// Decodes the image bytes (typically JPEG).
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] if the payload is not valid base64.
    pub fn bytes(&self) -> Result<Vec<u8>, PayloadError> {
        self.data.decode()
    }
}

/// Result of offering a frame to a [`FrameSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOffer {
    /// The frame replaced the previous one.
    Accepted,
    /// The frame answers an older request than the one on screen and was dropped.
    Stale {
        /// `seq` of the frame currently shown.
        last_accepted: u64,
    },
}

/// Holds the frame currently on screen.
#[derive(Debug, Default)]
pub struct FrameSlot {
    current: Option<Frame>,
    last_accepted_seq: Option<u64>,
    accepted: u64,
    stale: u64,
}

impl FrameSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a received frame to the slot.
    pub fn offer(&mut self, frame: Frame) -> FrameOffer {
        if let (Some(seq), Some(last)) = (frame.seq, self.last_accepted_seq) {
            if seq <= last {
                self.stale += 1;
                return FrameOffer::Stale {
                    last_accepted: last,
                };
            }
        }

        if frame.seq.is_some() {
            self.last_accepted_seq = frame.seq;
        }
        self.current = Some(frame);
        self.accepted += 1;
        FrameOffer::Accepted
    }

    /// The frame currently on screen, if any has arrived yet.
    pub fn current(&self) -> Option<&Frame> {
        self.current.as_ref()
    }

    /// `seq` of the newest accepted sequenced frame.
    pub fn last_accepted_seq(&self) -> Option<u64> {
        self.last_accepted_seq
    }

    /// Number of frames accepted so far.
    pub fn accepted_count(&self) -> u64 {
        self.accepted
    }

    /// Number of frames dropped as stale so far.
    pub fn stale_count(&self) -> u64 {
        self.stale
    }
}
