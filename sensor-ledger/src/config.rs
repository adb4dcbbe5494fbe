//! Configuration for the sensor ledger

use crate::{types::Address, validation::DEFAULT_MAX_PM};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// The single identity allowed to register and revoke sensors
    pub authority: String,

    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Reading validation bounds
    pub validation: ValidationConfig,

    /// Writer actor configuration
    pub actor: ActorConfig,

    /// Sensors the server registers on start-up
    pub bootstrap: Vec<BootstrapSensor>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "sensor-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            authority: String::new(),
            data_dir: PathBuf::from("./data/sensor-ledger"),
            storage: StorageConfig::default(),
            validation: ValidationConfig::default(),
            actor: ActorConfig::default(),
            bootstrap: Vec::new(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Persist to RocksDB; false keeps the ledger in memory only
    pub enabled: bool,

    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            write_buffer_size_mb: 64,
            max_write_buffer_number: 2,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

/// Numeric bounds for submitted readings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// PM2.5 upper bound (inclusive)
    pub max_pm25: u32,

    /// PM10 upper bound (inclusive)
    pub max_pm10: u32,

    /// Optional NO2 upper bound
    pub max_no2: Option<u32>,

    /// Optional SO2 upper bound
    pub max_so2: Option<u32>,

    /// Optional CO upper bound
    pub max_co: Option<u32>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_pm25: DEFAULT_MAX_PM,
            max_pm10: DEFAULT_MAX_PM,
            max_no2: None,
            max_so2: None,
            max_co: None,
        }
    }
}

/// Writer actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox size (backpressure)
    pub mailbox_capacity: usize,

    /// Notification buffer per subscriber
    pub notification_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
            notification_capacity: 1024,
        }
    }
}

/// Sensor registered by the server at start-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapSensor {
    /// Sensor identity
    pub sensor: String,
    /// Location label
    pub location: String,
}

impl Config {
    /// In-memory configuration for `authority`
    pub fn in_memory(authority: impl Into<String>) -> Self {
        let mut config = Config {
            authority: authority.into(),
            ..Config::default()
        };
        config.storage.enabled = false;
        config
    }

    /// Authority identity
    pub fn authority_address(&self) -> Address {
        Address::new(self.authority.clone())
    }

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

        if let Ok(authority) = std::env::var("SENSOR_LEDGER_AUTHORITY") {
            config.authority = authority;
        }

        if let Ok(data_dir) = std::env::var("SENSOR_LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(enabled) = std::env::var("SENSOR_LEDGER_STORAGE_ENABLED") {
            config.storage.enabled = enabled.parse().map_err(|_| {
                crate::Error::Config(format!("Invalid SENSOR_LEDGER_STORAGE_ENABLED: {}", enabled))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the ledger cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.authority.trim().is_empty() {
            return Err(crate::Error::Config("authority must be set".to_string()));
        }

        if self.actor.mailbox_capacity == 0 || self.actor.notification_capacity == 0 {
            return Err(crate::Error::Config(
                "actor capacities must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
