//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

/// All runtime configuration for the frame source server.
///
/// ```rust
/// use screencast_server::domain::ServerConfig;
///
/// let cfg = ServerConfig::default();
/// assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:8765");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: SocketAddr,
    /// JPEG file served as the current frame.  Whatever writes it (a capture
    /// tool, a test) should replace it atomically.
    pub frame_path: PathBuf,
    /// Largest inbound WebSocket message in bytes.  Bounds received files.
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8765)),
            frame_path: PathBuf::from("screen.jpg"),
            max_message_size: 64 * 1024 * 1024,
        }
    }
}
