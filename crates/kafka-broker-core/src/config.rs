//! Configuration types for the broker.
//!
//! Configuration is loaded from YAML files and validated before use. The
//! control-plane metadata log location is discovered once at startup, either
//! from the YAML, from a Kafka `server.properties` file, or from the default
//! KRaft log directories.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Properties file read when none is given on the command line.
pub const DEFAULT_PROPERTIES_PATH: &str = "/tmp/server.properties";

/// Log directories tried, in order, when the properties file names none that exist.
pub const DEFAULT_LOG_DIRS: [&str; 2] = ["/app/kraft-combined-logs", "/tmp/kraft-combined-logs"];

/// Metadata log location relative to a log directory.
const METADATA_LOG_SUFFIX: &str = "__cluster_metadata-0/00000000000000000000.log";

/// Properties keys that name log directories.
const LOG_DIR_KEYS: [&str; 2] = ["log.dirs", "metadata.log.dir"];

/// Root configuration for the broker.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BrokerConfig {
    /// TCP listener configuration.
    #[serde(default)]
    pub listen: ListenConfig,

    /// Metadata and partition log locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// TCP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    /// Address to bind to, e.g., "0.0.0.0:9092".
    #[serde(default = "default_listen_address")]
    pub address: String,

    /// Maximum number of concurrent client connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// On-disk locations.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Explicit control-plane metadata log; skips discovery when set.
    pub metadata_log: Option<PathBuf>,

    /// Root directory of the per-partition data logs.
    pub log_dir: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_listen_address() -> String {
    "0.0.0.0:9092".to_string()
}

fn default_max_connections() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_listen_address(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl ListenConfig {
    /// Split the listen address into host and port.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not `host:port`.
    pub fn parse_address(&self) -> ConfigResult<(String, u16)> {
        let invalid = || ConfigError::InvalidAddress(self.address.clone());
        let (host, port) = self.address.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() {
            return Err(invalid());
        }
        let port: u16 = port.parse().map_err(|_| invalid())?;
        Ok((host.to_string(), port))
    }
}

impl BrokerConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if
    /// validation fails.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&content)
    }

    /// Load configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn from_str(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the listen address is not `host:port`.
    pub fn validate(&self) -> ConfigResult<()> {
        self.listen.parse_address().map(|_| ())
    }

    /// Locate the control-plane metadata log.
    ///
    /// An explicit `storage.metadata_log` wins; otherwise the log directories
    /// named in `properties` are tried, then [`DEFAULT_LOG_DIRS`]. When nothing
    /// exists the last default is returned so a log created later is picked up.
    #[must_use]
    pub fn discover_metadata_log(&self, properties: &Path) -> PathBuf {
        let defaults: Vec<PathBuf> = DEFAULT_LOG_DIRS.iter().map(PathBuf::from).collect();
        self.discover_metadata_log_with(properties, &defaults)
    }

    /// [`discover_metadata_log`](Self::discover_metadata_log) with explicit fallback directories.
    #[must_use]
    pub fn discover_metadata_log_with(&self, properties: &Path, defaults: &[PathBuf]) -> PathBuf {
        if let Some(path) = &self.storage.metadata_log {
            return path.clone();
        }

        let from_properties = std::fs::read_to_string(properties)
            .map(|content| log_dirs_from_properties(&content))
            .unwrap_or_default();

        let candidates = from_properties
            .iter()
            .chain(defaults)
            .map(|dir| dir.join(METADATA_LOG_SUFFIX));

        let mut last = None;
        for candidate in candidates {
            if candidate.exists() {
                debug!(path = %candidate.display(), "found metadata log");
                return candidate;
            }
            last = Some(candidate);
        }

        last.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIRS[1]).join(METADATA_LOG_SUFFIX))
    }

    /// Root directory of the per-partition data logs.
    ///
    /// Defaults to the directory holding the metadata log's partition directory.
    #[must_use]
    pub fn log_root(&self, metadata_log: &Path) -> PathBuf {
        if let Some(dir) = &self.storage.log_dir {
            return dir.clone();
        }
        metadata_log
            .parent()
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_LOG_DIRS[1]), Path::to_path_buf)
    }
}

/// Directories listed under `log.dirs` or `metadata.log.dir`, in file order.
fn log_dirs_from_properties(content: &str) -> Vec<PathBuf> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| LOG_DIR_KEYS.iter().any(|key| line.starts_with(key)))
        .filter_map(|line| line.split_once('=').map(|(_, value)| value))
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .collect()
}
