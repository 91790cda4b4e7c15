//! Connection lifecycle states.
//!
//! ```text
//!             connect()
//!   Closed ───────────────► Connecting ──handshake ok──► Open
//!     ▲                        │                          │
//!     │                        │ failure                  │ close()
//!     │                        ▼                          ▼
//!     └──── teardown ────── Errored ◄──── failure ──── Closing ──► Closed
//! ```
//!
//! The connection itself owns the state; everything else only reads it.
//! [`ConnectionState::can_transition_to`] is the single table of legal moves.

/// Lifecycle state of the viewer's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// The WebSocket handshake is in progress.
    Connecting,
    /// Messages can be sent and received.
    Open,
    /// `close()` was called; the close handshake is in progress.
    Closing,
    /// Not connected.  Also the state of a handle that never connected.
    Closed,
    /// The transport failed.
    Errored,
}

impl ConnectionState {
    /// Returns `true` only for [`ConnectionState::Open`].
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Closed, Connecting)
                | (Errored, Connecting)
                | (Errored, Closed)
                | (Connecting, Open)
                | (Connecting, Closing)
                | (Connecting, Closed)
                | (Connecting, Errored)
                | (Open, Closing)
                | (Open, Closed)
                | (Open, Errored)
                | (Closing, Closed)
                | (Closing, Errored)
        )
    }
}

/// What a status indicator shows: the state plus, for failures, why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Human-readable description of the last transport failure.  Kept after
    /// the connection settles in `Closed` and cleared on the next connect.
    pub detail: Option<String>,
}

impl ConnectionStatus {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state,
            detail: None,
        }
    }

    pub fn errored(detail: impl Into<String>) -> Self {
        Self {
            state: ConnectionState::Errored,
            detail: Some(detail.into()),
        }
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new(ConnectionState::Closed)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.state, &self.detail) {
            (ConnectionState::Connecting, _) => f.write_str("Connecting"),
            (ConnectionState::Open, _) => f.write_str("Connected"),
            (ConnectionState::Closing, _) => f.write_str("Closing"),
            (ConnectionState::Closed, None) => f.write_str("Disconnected"),
            (ConnectionState::Closed, Some(detail)) => write!(f, "Disconnected (last error: {detail})"),
            (ConnectionState::Errored, Some(detail)) => write!(f, "Connection error: {detail}"),
            (ConnectionState::Errored, None) => f.write_str("Connection error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    const ALL: [ConnectionState; 5] = [Connecting, Open, Closing, Closed, Errored];

    #[test]
    fn test_only_open_is_open() {
        for state in ALL {
            assert_eq!(state.is_open(), state == Open, "{state:?}");
        }
    }

    #[test]
    fn test_happy_path_transitions_are_legal() {
        assert!(Closed.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Open));
        assert!(Open.can_transition_to(Closing));
        assert!(Closing.can_transition_to(Closed));
    }

    #[test]
    fn test_errored_can_reach_closed_and_reconnect() {
        assert!(Open.can_transition_to(Errored));
        assert!(Errored.can_transition_to(Closed));
        assert!(Errored.can_transition_to(Connecting));
    }

    #[test]
    fn test_open_cannot_be_reached_without_connecting() {
        for from in [Closed, Closing, Errored, Open] {
            assert!(!from.can_transition_to(Open), "{from:?} -> Open must be illegal");
        }
    }

    #[test]
    fn test_closed_only_leads_to_connecting() {
        for next in ALL {
            assert_eq!(Closed.can_transition_to(next), next == Connecting, "{next:?}");
        }
    }

    #[test]
    fn test_self_transitions_are_illegal() {
        for state in ALL {
            assert!(!state.can_transition_to(state), "{state:?}");
        }
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(ConnectionStatus::new(Connecting).to_string(), "Connecting");
        assert_eq!(ConnectionStatus::new(Open).to_string(), "Connected");
        assert_eq!(ConnectionStatus::new(Closed).to_string(), "Disconnected");
        assert_eq!(
            ConnectionStatus::errored("connection refused").to_string(),
            "Connection error: connection refused"
        );
    }

    #[test]
    fn test_closed_after_error_keeps_the_reason() {
        let status = ConnectionStatus {
            state: Closed,
            detail: Some("connection reset".to_string()),
        };
        assert_eq!(status.to_string(), "Disconnected (last error: connection reset)");
    }

    #[test]
    fn test_default_status_is_closed_without_detail() {
        let status = ConnectionStatus::default();
        assert_eq!(status.state, Closed);
        assert!(status.detail.is_none());
    }
}
