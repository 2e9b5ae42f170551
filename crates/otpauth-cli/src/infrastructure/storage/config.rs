//! TOML-based configuration persistence.
//!
//! Reads and writes [`AppConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\otpauth\config.toml`
//! - Linux:    `~/.config/otpauth/config.toml`
//! - macOS:    `~/Library/Application Support/otpauth/config.toml`
//!
//! Every field carries a serde default so the app works on first run (before
//! a config file exists) and keeps working when an older file is missing
//! newer fields.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use otpauth_core::protocol::messages::{DEFAULT_DISCOVERY_PORT, DEFAULT_TRANSFER_PORT};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Identity and logging settings for this instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    /// Display name advertised in discovery announcements.
    #[serde(default = "default_device_name")]
    pub name: String,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Ports, timing, and bounds for the sync protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// UDP port for LAN discovery broadcasts.
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,
    /// TCP port the transfer listener binds.
    #[serde(default = "default_transfer_port")]
    pub transfer_port: u16,
    /// Seconds between announcement broadcasts.
    #[serde(default = "default_announce_interval_secs")]
    pub announce_interval_secs: u64,
    /// Total seconds the announcer keeps broadcasting.
    #[serde(default = "default_announce_duration_secs")]
    pub announce_duration_secs: u64,
    /// Seconds a receiver's scan listens for announcements.
    #[serde(default = "default_scan_window_secs")]
    pub scan_window_secs: u64,
    /// Scan stops early after this many distinct devices.
    #[serde(default = "default_max_devices")]
    pub max_devices: usize,
    /// Destination address for announcement broadcasts.
    #[serde(default = "default_broadcast_addr")]
    pub broadcast_addr: String,
    /// Seconds the sender waits for a receiver to connect.
    #[serde(default = "default_accept_timeout_secs")]
    pub accept_timeout_secs: u64,
    /// Seconds the receiver waits for the TCP connect to complete.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Seconds the receiver waits for the payload after submitting the PIN.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_device_name() -> String {
    // Prefer the machine hostname so the receiver's device list is useful
    // when several machines announce at once.
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "otpauth".to_string())
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_discovery_port() -> u16 {
    DEFAULT_DISCOVERY_PORT
}
fn default_transfer_port() -> u16 {
    DEFAULT_TRANSFER_PORT
}
fn default_announce_interval_secs() -> u64 {
    1
}
fn default_announce_duration_secs() -> u64 {
    10
}
fn default_scan_window_secs() -> u64 {
    6
}
fn default_max_devices() -> usize {
    5
}
fn default_broadcast_addr() -> String {
    "255.255.255.255".to_string()
}
fn default_accept_timeout_secs() -> u64 {
    60
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_read_timeout_secs() -> u64 {
    10
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            discovery_port: default_discovery_port(),
            transfer_port: default_transfer_port(),
            announce_interval_secs: default_announce_interval_secs(),
            announce_duration_secs: default_announce_duration_secs(),
            scan_window_secs: default_scan_window_secs(),
            max_devices: default_max_devices(),
            broadcast_addr: default_broadcast_addr(),
            accept_timeout_secs: default_accept_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot
/// be determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    let dir = platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)?;
    Ok(dir.join("config.toml"))
}

/// Loads [`AppConfig`] from disk, returning `AppConfig::default()` if the
/// file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not
/// found", and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = config_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Persists `config` to disk, creating the config directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    let path = config_file_path()?;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config directory for otpauth.
pub(crate) fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("otpauth"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("otpauth"))
    }

    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/otpauth
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("otpauth")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sync_config_uses_reference_values() {
        // Arrange / Act
        let cfg = SyncConfig::default();

        // Assert
        assert_eq!(cfg.discovery_port, 9998);
        assert_eq!(cfg.transfer_port, 9999);
        assert_eq!(cfg.announce_interval_secs, 1);
        assert_eq!(cfg.announce_duration_secs, 10);
        assert_eq!(cfg.scan_window_secs, 6);
        assert_eq!(cfg.max_devices, 5);
        assert_eq!(cfg.broadcast_addr, "255.255.255.255");
    }

    #[test]
    fn test_default_device_config_log_level_is_info() {
        let cfg = DeviceConfig::default();
        assert_eq!(cfg.log_level, "info");
        assert!(!cfg.name.is_empty());
    }

    #[test]
    fn test_app_config_serializes_and_deserializes_round_trip() {
        // Arrange
        let mut cfg = AppConfig::default();
        cfg.sync.transfer_port = 9000;
        cfg.device.name = "test-box".to_string();

        // Act
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: AppConfig = toml::from_str(&toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg.sync.discovery_port, 9998);
        assert_eq!(cfg.device.log_level, "info");
    }

    #[test]
    fn test_deserialize_partial_sync_overrides_defaults() {
        // Arrange
        let toml_str = r#"
[sync]
transfer_port = 12000
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.sync.transfer_port, 12000);
        // Unspecified fields keep their defaults
        assert_eq!(cfg.sync.discovery_port, 9998);
        assert_eq!(cfg.sync.scan_window_secs, 6);
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        let result: Result<AppConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");
        assert!(result.is_err());
    }
}
