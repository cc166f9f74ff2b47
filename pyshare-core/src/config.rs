//! Configuration management for pyshare
//!
//! Config files are stored in platform-appropriate locations:
//! - Linux: ~/.config/pyshare/
//! - macOS: ~/Library/Application Support/pyshare/
//! - Windows: %APPDATA%\pyshare\
//!
//! `PYSHARE_CONFIG` points at an explicit file instead.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "PYSHARE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Config directory not found")]
    NoDirFound,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration (for pyshare-server)
    #[serde(default)]
    pub server: ServerConfig,

    /// Remote listing resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Server-side configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory whose files are shared
    #[serde(default = "default_shared_dir")]
    pub shared_dir: PathBuf,

    /// Request path prefixes recorded in the connection log
    #[serde(default = "default_tracked_prefixes")]
    pub tracked_prefixes: Vec<String>,

    /// Largest accepted upload in MB
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

/// Remote listing resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Maximum simultaneous HEAD probes per resolution
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    crate::DEFAULT_PORT
}
fn default_shared_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("pyshare")
        .join("shared_files")
}
fn default_tracked_prefixes() -> Vec<String> {
    crate::connection_log::DEFAULT_TRACKED_PREFIXES
        .iter()
        .map(|p| p.to_string())
        .collect()
}
fn default_max_upload_mb() -> u64 {
    1024
}
fn default_probe_concurrency() -> usize {
    8
}
fn default_request_timeout() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            shared_dir: default_shared_dir(),
            tracked_prefixes: default_tracked_prefixes(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            probe_concurrency: default_probe_concurrency(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Config {
    /// Get config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join("pyshare"))
            .ok_or(ConfigError::NoDirFound)
    }

    /// Get config file path, honoring `PYSHARE_CONFIG`
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from default location
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load config from specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
