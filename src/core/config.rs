//! Connector configuration
//!
//! The data file and connection options are an explicit value handed to every
//! [`Connector`](crate::Connector); nothing is kept in process-wide state.

use super::error::{DatabaseError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default busy timeout applied to every handle (5 seconds)
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Default timeout for offloaded operations (30 seconds)
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 30_000;

/// Options used to open database handles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// SQLite database file (or `:memory:`)
    pub data_file: PathBuf,
    /// Enforce foreign key constraints
    pub foreign_keys: bool,
    /// Open the file read-only
    pub read_only: bool,
    /// How long a handle waits on a locked database
    pub busy_timeout_ms: u64,
    /// Upper bound for operations run through the async connector
    pub operation_timeout_ms: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(":memory:"),
            foreign_keys: true,
            read_only: false,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
        }
    }
}

impl ConnectorConfig {
    /// Create a configuration for the given data file
    pub fn new(data_file: impl Into<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
            ..Default::default()
        }
    }

    /// Enable or disable foreign key enforcement
    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Open handles read-only
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Set the busy timeout
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the timeout for async operations
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Parse a JSON configuration; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Render as a `key=value;` connection string
    pub fn connection_string(&self) -> String {
        format!(
            "data source={};foreign keys={};read only={};default timeout={};",
            self.data_file.display(),
            self.foreign_keys,
            self.read_only,
            self.busy_timeout_ms / 1000
        )
    }

    /// Parse a `key=value;` connection string
    ///
    /// Keys are case-insensitive. `data source` is required; unknown keys such as
    /// `version` are ignored.
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut data_source = None;

        for part in connection_string.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                DatabaseError::InvalidConnectionString(format!("expected key=value, got '{}'", part))
            })?;
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "data source" | "datasource" => data_source = Some(PathBuf::from(value)),
                "foreign keys" => config.foreign_keys = parse_flag(key, value)?,
                "read only" => config.read_only = parse_flag(key, value)?,
                "default timeout" => {
                    let seconds: u64 = value.parse().map_err(|_| {
                        DatabaseError::InvalidConnectionString(format!(
                            "invalid timeout '{}'",
                            value
                        ))
                    })?;
                    config.busy_timeout_ms = seconds.checked_mul(1000).ok_or_else(|| {
                        DatabaseError::InvalidConnectionString(format!(
                            "timeout '{}' is out of range",
                            value
                        ))
                    })?;
                }
                other => tracing::debug!(key = other, "ignoring connection string key"),
            }
        }

        config.data_file = data_source.ok_or_else(|| {
            DatabaseError::InvalidConnectionString("missing 'data source'".to_string())
        })?;
        Ok(config)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(DatabaseError::InvalidConnectionString(format!(
            "invalid value '{}' for '{}'",
            value,
            key.trim()
        ))),
    }
}
