//! Configuration for the gold ledger

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Gold ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Log output format
    pub log_format: LogFormat,

    /// Queue sizing
    pub queues: QueueConfig,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Synthetic load run by the server binary
    pub demo: DemoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/gold"),
            service_name: "gold-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_format: LogFormat::Text,
            queues: QueueConfig::default(),
            rocksdb: RocksDBConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// Queue sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Capacity of the queue feeding the serializer
    pub mutation_capacity: usize,

    /// Capacity of the queue feeding the audit writer
    pub telemetry_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            mutation_capacity: 1000,
            telemetry_capacity: 1000,
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Enable statistics
    pub enable_statistics: bool,

    /// fsync on every balance and audit write
    pub sync_writes: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 16,
            max_write_buffer_number: 2,
            enable_statistics: false,
            sync_writes: true,
        }
    }
}

/// Synthetic load configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Run the load on startup
    pub enabled: bool,

    /// Number of (+1, -1) producer thread pairs
    pub producer_pairs: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            producer_pairs: 100,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("GOLD_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(capacity) = std::env::var("GOLD_MUTATION_QUEUE_CAPACITY") {
            config.queues.mutation_capacity = parse_env("GOLD_MUTATION_QUEUE_CAPACITY", &capacity)?;
        }

        if let Ok(capacity) = std::env::var("GOLD_TELEMETRY_QUEUE_CAPACITY") {
            config.queues.telemetry_capacity =
                parse_env("GOLD_TELEMETRY_QUEUE_CAPACITY", &capacity)?;
        }

        if let Ok(format) = std::env::var("GOLD_LOG_FORMAT") {
            config.log_format = match format.to_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                other => {
                    return Err(crate::Error::Config(format!(
                        "GOLD_LOG_FORMAT must be text or json, got {}",
                        other
                    )))
                }
            };
        }

        if let Ok(pairs) = std::env::var("GOLD_DEMO_PRODUCER_PAIRS") {
            config.demo.producer_pairs = parse_env("GOLD_DEMO_PRODUCER_PAIRS", &pairs)?;
            config.demo.enabled = true;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.queues.mutation_capacity == 0 {
            return Err(crate::Error::Config(
                "queues.mutation_capacity must be greater than zero".to_string(),
            ));
        }

        if self.queues.telemetry_capacity == 0 {
            return Err(crate::Error::Config(
                "queues.telemetry_capacity must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env(name: &str, value: &str) -> crate::Result<usize> {
    value
        .parse()
        .map_err(|e| crate::Error::Config(format!("Invalid {}={}: {}", name, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "gold-ledger");
        assert_eq!(config.queues.mutation_capacity, 1000);
        assert_eq!(config.queues.telemetry_capacity, 1000);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(!config.demo.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
data_dir = "/var/lib/gold"
log_format = "json"

[queues]
mutation_capacity = 64
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/gold"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.queues.mutation_capacity, 64);
        // Unset fields fall back to defaults
        assert_eq!(config.queues.telemetry_capacity, 1000);
        assert!(config.rocksdb.sync_writes);
    }

    #[test]
    fn test_from_file_rejects_zero_capacity() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[queues]\ntelemetry_capacity = 0").unwrap();

        let result = Config::from_file(file.path());
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_parse_env_invalid() {
        assert_eq!(parse_env("X", "12").unwrap(), 12);
        assert!(parse_env("X", "twelve").is_err());
    }
}
