//! screencast-server library crate.
//!
//! The frame source the viewer connects to.  Every viewer session gets its
//! own task; sessions never see each other's traffic.
//!
//! ```text
//! Viewer  (JSON envelopes over WebSocket)
//!    ↕
//! [screencast-server]
//!   ├── domain/           ServerConfig
//!   ├── application/      FrameSource trait + implementations, PeerSession
//!   └── infrastructure/
//!         └── ws_server/  Accept loop and per-session read/reply loop
//! ```
//!
//! A session answers `request_next_frame` with an `image` envelope that
//! echoes the request's `seq`, or stays silent if the source has nothing new.
//! Chat messages and files from the viewer are logged and recorded.

/// Domain layer: configuration (no I/O).
pub mod domain;

/// Application layer: frame sources and per-session envelope handling.
pub mod application;

/// Infrastructure layer: WebSocket server.
pub mod infrastructure;
