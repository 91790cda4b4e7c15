//! TOML settings file for the viewer.
//!
//! ```toml
//! log_level = "info"
//!
//! [connection]
//! endpoint = "ws://localhost:8765"
//! max_message_mib = 64
//!
//! [display]
//! refresh_hz = 60
//! frame_out = "/tmp/screen.jpg"
//!
//! [files]
//! download_dir = "."
//! ```
//!
//! Every field has a default, so a partial file (or none at all) is fine.
//! Command-line flags override whatever the file says.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::config::{
    ConfigError, ViewerConfig, DEFAULT_ENDPOINT, DEFAULT_MAX_MESSAGE_MIB, DEFAULT_REFRESH_HZ,
};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

// ── Schema ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewerSettings {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub files: FileSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_max_message_mib")]
    pub max_message_mib: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplaySettings {
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_out: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileSettings {
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_max_message_mib() -> usize {
    DEFAULT_MAX_MESSAGE_MIB
}
fn default_refresh_hz() -> u32 {
    DEFAULT_REFRESH_HZ
}
fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            connection: ConnectionSettings::default(),
            display: DisplaySettings::default(),
            files: FileSettings::default(),
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            max_message_mib: default_max_message_mib(),
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            refresh_hz: default_refresh_hz(),
            frame_out: None,
        }
    }
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
        }
    }
}

impl ViewerSettings {
    /// Validates the settings and converts them to a [`ViewerConfig`].
    ///
    /// # Errors
    ///
    /// [`SettingsError::Invalid`] if any value is out of range.
    pub fn into_config(self) -> Result<ViewerConfig, SettingsError> {
        Ok(ViewerConfig::build(
            self.connection.endpoint,
            self.display.refresh_hz,
            self.files.download_dir,
            self.display.frame_out,
            self.connection.max_message_mib,
        )?)
    }
}

// ── File access ───────────────────────────────────────────────────────────────

/// Loads settings from `path`, returning defaults if the file does not exist.
///
/// # Errors
///
/// [`SettingsError::Io`] for file-system errors other than "not found",
/// [`SettingsError::Parse`] if the TOML is malformed.
pub fn load_settings(path: &Path) -> Result<ViewerSettings, SettingsError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ViewerSettings::default()),
        Err(source) => Err(SettingsError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `settings` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// [`SettingsError::Io`] for file-system failures,
/// [`SettingsError::Serialize`] if serialization fails.
pub fn save_settings(settings: &ViewerSettings, path: &Path) -> Result<(), SettingsError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(settings)?;
    std::fs::write(path, content).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}
