//! Infrastructure layer for the viewer.
//!
//! - [`connection`]: the WebSocket client and its lifecycle state machine.
//! - [`session`]: the event loop tying connection, channels and console together.
//! - [`settings`]: TOML settings file.
//! - [`frame_output`]: writes the current frame to disk.
//! - [`console`]: stdin commands and stdout rendering.

pub mod connection;
pub mod console;
pub mod frame_output;
pub mod session;
pub mod settings;

pub use connection::{Connection, ConnectionError, Inbound};
pub use session::{SessionEvent, SessionHandles, SessionOptions, ViewerSession};
pub use settings::{load_settings, save_settings, SettingsError, ViewerSettings};
