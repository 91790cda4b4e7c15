//! The capability every channel sends through.
//!
//! Channels never hold the connection itself.  They are handed an
//! `Arc<dyn EnvelopeSink>`, which lets unit tests substitute a mock and keeps
//! the channels free of any socket code.

use screencast_core::{ConnectionState, Envelope};

/// What happened to an envelope handed to [`EnvelopeSink::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Queued for transmission on an open connection.
    Sent,
    /// Dropped because the connection was not open.  Nothing is queued.
    Suppressed { state: ConnectionState },
    /// Dropped because the envelope could not be serialised or the outbound
    /// queue was full.
    Failed,
}

/// Something envelopes can be sent through.
///
/// Implementations must never panic or block: a send on a connection that is
/// not open returns [`SendOutcome::Suppressed`] and has no other effect.
#[cfg_attr(test, mockall::automock)]
pub trait EnvelopeSink: Send + Sync {
    /// Current lifecycle state of the underlying connection.
    fn state(&self) -> ConnectionState;

    /// Hands one envelope to the transport.  Sends are transmitted in call order.
    fn send(&self, envelope: &Envelope) -> SendOutcome;
}
