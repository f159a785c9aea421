//! Configuration for the subscriber database and GSUP client links
//!
//! Configuration is read from YAML. Every timing parameter has a default so
//! a minimal file only needs the database path and the peers to connect to:
//!
//! ```yaml
//! database:
//!   path: /var/lib/hlrcore/hlr.db
//! gsup_clients:
//!   - unit_name: EUSE-1
//!     address: 127.0.0.1
//!     port: 4222
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_GSUP_PORT, GSUP_CONNECT_TIMEOUT, GSUP_PING_INTERVAL, GSUP_RECONNECT_INTERVAL,
};
use crate::logging::LogLevel;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Configuration validation error
    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ConfigValidationError),
}

/// Errors that can occur during configuration validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("Invalid database path: {0}")]
    InvalidDbPath(String),

    #[error("Invalid GSUP client configuration: {0}")]
    InvalidGsupClient(String),

    #[error("Duplicate GSUP unit name: {0}")]
    DuplicateUnitName(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HlrConfig {
    pub database: DbConfig,
    /// Outbound GSUP links (e.g. to external USSD entities)
    #[serde(default)]
    pub gsup_clients: Vec<GsupClientConfig>,
    #[serde(default)]
    pub log_level: LogLevel,
}

/// SQLite database configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    /// Database file, created with the HLR schema if missing
    pub path: PathBuf,
    /// How long a statement waits on a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// One outbound GSUP client link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GsupClientConfig {
    /// Name presented to the peer in the IPA identity response
    pub unit_name: String,
    /// Peer host name or IP address
    pub address: String,
    #[serde(default = "default_gsup_port")]
    pub port: u16,
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_gsup_port() -> u16 {
    DEFAULT_GSUP_PORT
}

fn default_reconnect_interval_ms() -> u64 {
    GSUP_RECONNECT_INTERVAL.as_millis() as u64
}

fn default_ping_interval_ms() -> u64 {
    GSUP_PING_INTERVAL.as_millis() as u64
}

fn default_connect_timeout_ms() -> u64 {
    GSUP_CONNECT_TIMEOUT.as_millis() as u64
}

impl GsupClientConfig {
    /// Creates a client configuration with default timers.
    pub fn new(unit_name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            unit_name: unit_name.into(),
            address: address.into(),
            port,
            reconnect_interval_ms: default_reconnect_interval_ms(),
            ping_interval_ms: default_ping_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigValidationError> {
        let invalid = |msg: String| Err(ConfigValidationError::InvalidGsupClient(msg));
        if self.unit_name.is_empty() {
            return invalid("unit_name must not be empty".into());
        }
        if self.address.is_empty() {
            return invalid(format!("{}: address must not be empty", self.unit_name));
        }
        if self.port == 0 {
            return invalid(format!("{}: port must not be 0", self.unit_name));
        }
        if self.reconnect_interval_ms == 0 {
            return invalid(format!("{}: reconnect interval must be > 0", self.unit_name));
        }
        if self.ping_interval_ms <= self.reconnect_interval_ms {
            return invalid(format!(
                "{}: ping interval ({} ms) must exceed reconnect interval ({} ms)",
                self.unit_name, self.ping_interval_ms, self.reconnect_interval_ms
            ));
        }
        Ok(())
    }
}

/// Loads a configuration from a YAML file. Call [`validate_config`] afterwards.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<HlrConfig, ConfigError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    load_config_from_str(&contents)
}

/// Loads a configuration from a YAML string.
pub fn load_config_from_str(yaml: &str) -> Result<HlrConfig, ConfigError> {
    serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Validates a loaded configuration.
pub fn validate_config(config: &HlrConfig) -> Result<(), ConfigValidationError> {
    if config.database.path.as_os_str().is_empty() {
        return Err(ConfigValidationError::InvalidDbPath("path is empty".into()));
    }

    let mut seen = std::collections::HashSet::new();
    for client in &config.gsup_clients {
        client.validate()?;
        if !seen.insert(client.unit_name.as_str()) {
            return Err(ConfigValidationError::DuplicateUnitName(client.unit_name.clone()));
        }
    }
    Ok(())
}
