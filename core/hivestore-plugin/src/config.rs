//! Plugin configuration read from `hivestore.toml`.
//!
//! ```toml
//! [plugin]
//! schema_checks_count = 10
//! schema_checks_interval_ms = 1000
//! command_updates_storing = false
//!
//! [storage]
//! path = "hivestore.db"
//! schema_file = "schemas/hivestore-schema.json"
//! ```
//!
//! Every key is optional. Selected keys can be overridden through
//! `HIVESTORE_*` environment variables, see [`HivestoreConfig::with_env_overrides`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const ENV_SCHEMA_CHECKS_COUNT: &str = "HIVESTORE_SCHEMA_CHECKS_COUNT";
pub const ENV_SCHEMA_CHECKS_INTERVAL_MS: &str = "HIVESTORE_SCHEMA_CHECKS_INTERVAL_MS";
pub const ENV_COMMAND_UPDATES_STORING: &str = "HIVESTORE_COMMAND_UPDATES_STORING";
pub const ENV_STORAGE_PATH: &str = "HIVESTORE_STORAGE_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("schema_checks_count must be at least 1")]
    InvalidChecksCount,

    #[error("invalid value for {key}: '{value}'")]
    InvalidEnv { key: String, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Readiness and dispatch settings for the storage plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Maximum number of schema probes before the process is terminated.
    #[serde(default = "default_schema_checks_count")]
    pub schema_checks_count: u32,
    /// Wait between consecutive probes.
    #[serde(
        rename = "schema_checks_interval_ms",
        default = "default_schema_checks_interval",
        with = "duration_ms"
    )]
    pub schema_checks_interval: Duration,
    /// Also write updated commands to the commandUpdates tables.
    #[serde(default)]
    pub command_updates_storing: bool,
}

fn default_schema_checks_count() -> u32 {
    10
}

fn default_schema_checks_interval() -> Duration {
    Duration::from_millis(1000)
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            schema_checks_count: default_schema_checks_count(),
            schema_checks_interval: default_schema_checks_interval(),
            command_updates_storing: false,
        }
    }
}

impl PluginConfig {
    pub fn with_schema_checks(mut self, count: u32, interval: Duration) -> Self {
        self.schema_checks_count = count;
        self.schema_checks_interval = interval;
        self
    }

    pub fn with_command_updates_storing(mut self, enabled: bool) -> Self {
        self.command_updates_storing = enabled;
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.schema_checks_count == 0 {
            return Err(ConfigError::InvalidChecksCount);
        }
        Ok(())
    }
}

/// Where data and schema definitions live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite database path, or `:memory:` for the in-process backend.
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// JSON file with table/UDT definitions and table-group assignments.
    #[serde(default = "default_schema_file")]
    pub schema_file: PathBuf,
}

fn default_storage_path() -> String {
    "hivestore.db".to_string()
}

fn default_schema_file() -> PathBuf {
    PathBuf::from("hivestore-schema.json")
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            schema_file: default_schema_file(),
        }
    }
}

impl StorageSettings {
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HivestoreConfig {
    #[serde(default)]
    pub plugin: PluginConfig,
    #[serde(default)]
    pub storage: StorageSettings,
}

impl HivestoreConfig {
    /// Reads and parses a config file. A relative `schema_file` is resolved
    /// against the directory holding the config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;
        if config.storage.schema_file.is_relative() {
            if let Some(dir) = path.parent() {
                config.storage.schema_file = dir.join(&config.storage.schema_file);
            }
        }
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `HIVESTORE_*` overrides looked up through `lookup`.
    ///
    /// The lookup is injected so callers decide where values come from;
    /// the runner passes `std::env::var`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_SCHEMA_CHECKS_COUNT) {
            self.plugin.schema_checks_count = parse_env(ENV_SCHEMA_CHECKS_COUNT, &value)?;
        }
        if let Some(value) = lookup(ENV_SCHEMA_CHECKS_INTERVAL_MS) {
            let millis: u64 = parse_env(ENV_SCHEMA_CHECKS_INTERVAL_MS, &value)?;
            self.plugin.schema_checks_interval = Duration::from_millis(millis);
        }
        if let Some(value) = lookup(ENV_COMMAND_UPDATES_STORING) {
            self.plugin.command_updates_storing = parse_bool(ENV_COMMAND_UPDATES_STORING, &value)?;
        }
        if let Some(value) = lookup(ENV_STORAGE_PATH) {
            debug!(path = %value, "Storage path overridden from environment");
            self.storage.path = value;
        }
        Ok(self)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.plugin.validate()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(super::millis(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
