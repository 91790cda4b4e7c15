//! Domain layer for the viewer: configuration only.  The protocol and
//! conversation types live in `screencast-core`.

pub mod config;

pub use config::{ConfigError, ViewerConfig};
