//! Domain entities for the screencast viewer.
//!
//! This module contains pure state with no infrastructure dependencies: no
//! sockets, no files, no async runtime.  Everything here can be constructed
//! and tested directly, and the outer layers (the connection, the channels,
//! the session loop) own and mutate these values.

/// Connection lifecycle states and the transitions allowed between them.
pub mod connection;

/// The append-only conversation of chat messages and file transfers.
pub mod conversation;

/// The single "current frame" slot and its sequencing rule.
pub mod frame;
