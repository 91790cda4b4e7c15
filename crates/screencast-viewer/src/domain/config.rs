//! Viewer configuration types.
//!
//! [`ViewerConfig`] holds every runtime setting of the viewer.  The binary
//! builds it from defaults, an optional settings file and CLI flags; tests
//! construct it directly.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Endpoint used when neither the CLI nor the settings file names one.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8765";

/// Frame requests per second when not configured.
pub const DEFAULT_REFRESH_HZ: u32 = 60;

/// Upper bound on the refresh rate.  Anything faster only floods the source.
pub const MAX_REFRESH_HZ: u32 = 240;

/// Largest WebSocket message the viewer accepts, in MiB.  Whole files travel
/// in one message, so this is also the largest file that can be received.
pub const DEFAULT_MAX_MESSAGE_MIB: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("endpoint '{0}' must start with ws:// or wss://")]
    InvalidEndpoint(String),
    #[error("refresh rate must be between 1 and {MAX_REFRESH_HZ} Hz, got {0}")]
    InvalidRefreshRate(u32),
    #[error("maximum message size must be at least 1 MiB")]
    InvalidMessageSize,
}

/// All runtime configuration for the viewer.
///
/// # Example
///
/// ```rust
/// use screencast_viewer::domain::ViewerConfig;
///
/// let cfg = ViewerConfig::default();
/// assert_eq!(cfg.endpoint, "ws://localhost:8765");
/// assert_eq!(cfg.refresh_interval.as_micros(), 16_666);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    /// WebSocket URL of the frame source.
    pub endpoint: String,
    /// Time between frame requests.
    pub refresh_interval: Duration,
    /// Where `/save` writes files when no directory is given.
    pub download_dir: PathBuf,
    /// If set, every accepted frame is written to this path.
    pub frame_out: Option<PathBuf>,
    /// Largest inbound WebSocket message in bytes.
    pub max_message_size: usize,
}

impl ViewerConfig {
    /// Checks the endpoint scheme and converts the remaining raw values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first invalid value.
    pub fn build(
        endpoint: String,
        refresh_hz: u32,
        download_dir: PathBuf,
        frame_out: Option<PathBuf>,
        max_message_mib: usize,
    ) -> Result<Self, ConfigError> {
        if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
            return Err(ConfigError::InvalidEndpoint(endpoint));
        }
        if max_message_mib == 0 {
            return Err(ConfigError::InvalidMessageSize);
        }
        Ok(Self {
            endpoint,
            refresh_interval: refresh_interval_for(refresh_hz)?,
            download_dir,
            frame_out,
            max_message_size: max_message_mib.saturating_mul(1024 * 1024),
        })
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            refresh_interval: Duration::from_secs(1) / DEFAULT_REFRESH_HZ,
            download_dir: PathBuf::from("."),
            frame_out: None,
            max_message_size: DEFAULT_MAX_MESSAGE_MIB * 1024 * 1024,
        }
    }
}

/// Converts a refresh rate in Hz to the interval between ticks.
///
/// # Errors
///
/// [`ConfigError::InvalidRefreshRate`] for 0 or anything above [`MAX_REFRESH_HZ`].
pub fn refresh_interval_for(hz: u32) -> Result<Duration, ConfigError> {
    if hz == 0 || hz > MAX_REFRESH_HZ {
        return Err(ConfigError::InvalidRefreshRate(hz));
    }
    Ok(Duration::from_secs(1) / hz)
}
