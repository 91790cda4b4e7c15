//! screencast-viewer library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the viewer do?
//!
//! The viewer opens one WebSocket to a frame source and keeps three things
//! going over it at once:
//!
//! 1. **Frames** – on every display refresh it asks for the next frame
//!    (`request_next_frame`) and shows whichever `image` reply is newest.
//! 2. **Chat** – lines typed locally are sent as `message` envelopes and
//!    echoed into the conversation immediately; received messages are
//!    appended as they arrive.
//! 3. **Files** – a whole file is read, base64-encoded, and sent as one
//!    `file` envelope; received files stay in memory until saved.
//!
//! # Layers
//!
//! ```text
//! domain/          ViewerConfig (no I/O)
//! application/     EnvelopeSink capability, chat / file / frame channels,
//!                  console command parsing
//! infrastructure/  Connection (tokio-tungstenite), ViewerSession event loop,
//!                  settings file, frame file output, console I/O
//! ```

/// Domain layer: runtime configuration.
pub mod domain;

/// Application layer: the three channels and the capability they send through.
pub mod application;

/// Infrastructure layer: WebSocket connection, session loop, file and console I/O.
pub mod infrastructure;
