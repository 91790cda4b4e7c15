//! Thread-safe sequence counter for numbering frame requests.
//!
//! # Why number frame requests?
//!
//! The viewer pulls frames: on every display refresh it sends a
//! `request_next_frame`, without waiting for the previous reply.  Several
//! requests can therefore be in flight at once, and nothing in the transport
//! guarantees their replies are processed in the order they were asked for.
//!
//! Each request carries the next number from a [`SequenceCounter`] and the
//! frame source echoes it back in its `image` reply.  The viewer's
//! [`FrameSlot`](crate::domain::frame::FrameSlot) then only accepts a reply
//! whose number is higher than the last one it showed, so a stale frame can
//! never replace a newer one.
//!
//! # Thread safety
//!
//! The counter uses `AtomicU64` internally, so it can be shared through an
//! `Arc` and advanced from any task without a lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe, monotonically increasing counter for frame request numbers.
///
/// Sequence numbers start at 0 and increment by 1 with each call to [`next`].
/// The counter wraps around at `u64::MAX` back to 0 without panicking.
///
/// [`next`]: SequenceCounter::next
///
/// # Examples
///
/// ```rust
/// use screencast_core::protocol::SequenceCounter;
///
/// let counter = SequenceCounter::new();
/// assert_eq!(counter.next(), 0);
/// assert_eq!(counter.next(), 1);
/// ```
#[derive(Debug)]
pub struct SequenceCounter {
    inner: AtomicU64,
}

impl SequenceCounter {
    /// Creates a new counter starting at 0.
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(0),
        }
    }

    /// Returns the next sequence number and atomically increments the counter.
    ///
    /// `Ordering::Relaxed` is enough: the number orders frame replies, it does
    /// not publish any other memory between threads.
    pub fn next(&self) -> u64 {
        // `fetch_add` returns the value before the addition and wraps on overflow.
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the number the next call to [`next`](Self::next) will hand out.
    ///
    /// Useful for logging.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}
