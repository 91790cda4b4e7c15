//! Frame pacing: one pull request per display refresh.
//!
//! The viewer never receives frames it did not ask for.  On every tick it
//! sends `request_next_frame` with the next sequence number, if the
//! connection is open.  Requests are pipelined: a tick does not wait for the
//! previous reply, and an unanswered request simply leaves the last frame on
//! screen.  Replies go through a [`FrameSlot`], which drops any reply older
//! than the frame already shown.

use std::sync::Arc;

use screencast_core::{EncodedBytes, Envelope, Frame, FrameOffer, FrameSlot, SequenceCounter};
use tracing::{debug, trace};

use super::sink::{EnvelopeSink, SendOutcome};

pub struct FramePacer {
    sink: Arc<dyn EnvelopeSink>,
    seq: SequenceCounter,
    slot: FrameSlot,
    requests_sent: u64,
}

impl FramePacer {
    pub fn new(sink: Arc<dyn EnvelopeSink>) -> Self {
        Self {
            sink,
            seq: SequenceCounter::new(),
            slot: FrameSlot::new(),
            requests_sent: 0,
        }
    }

    /// Called once per refresh tick.  Returns `true` if a request went out.
    ///
    /// Sequence numbers are only consumed by requests that are actually sent.
    pub fn tick(&mut self) -> bool {
        let state = self.sink.state();
        if !state.is_open() {
            trace!("frame tick skipped while {state:?}");
            return false;
        }

        let seq = self.seq.next();
        match self.sink.send(&Envelope::frame_request(seq)) {
            SendOutcome::Sent => {
                self.requests_sent += 1;
                true
            }
            outcome => {
                debug!("frame request {seq} not sent: {outcome:?}");
                false
            }
        }
    }

    /// Offers a received `image` payload to the frame slot.
    pub fn on_frame_data(&mut self, data: EncodedBytes, seq: Option<u64>) -> FrameOffer {
        let size = data.decoded_len();
        let offer = self.slot.offer(Frame::new(data, seq));
        match offer {
            FrameOffer::Accepted => trace!("frame {seq:?} accepted ({size} bytes)"),
            FrameOffer::Stale { last_accepted } => {
                debug!("dropping stale frame {seq:?}; showing {last_accepted}")
            }
        }
        offer
    }

    /// The frame currently on screen.
    pub fn current_frame(&self) -> Option<&Frame> {
        self.slot.current()
    }

    pub fn slot(&self) -> &FrameSlot {
        &self.slot
    }

    pub fn requests_sent(&self) -> u64 {
        self.requests_sent
    }
}
