//! Bridge configuration
//!
//! Everything the bridge needs is resolved into a [`BridgeConfig`] before
//! the pipeline starts. The defaults match a water temperature sensor on
//! `COM4` feeding HWiNFO's custom sensor key. A TOML file may override any
//! subset of fields:
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyACM0"
//! baud_rate = 115200
//!
//! [store]
//! root = "/var/lib/sensors"
//! key_path = "Custom/PC Water Sensor/Temp0"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest accepted `pipeline.read_buffer_size`
pub const MAX_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Error type for configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Config file is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A field has an unusable value
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Top-level bridge configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Byte source settings
    pub serial: SerialConfig,
    /// Key-value store settings
    pub store: StoreConfig,
    /// Read loop tuning
    pub pipeline: PipelineConfig,
}

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the bridge cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.port.trim().is_empty() {
            return Err(ConfigError::Validation("serial.port must not be empty".into()));
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Validation("serial.baud_rate must be positive".into()));
        }
        if key_segments(&self.store.key_path).next().is_none() {
            return Err(ConfigError::Validation("store.key_path must not be empty".into()));
        }
        for (name, field) in [
            ("store.name_field", &self.store.name_field),
            ("store.value_field", &self.store.value_field),
        ] {
            if field.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{name} must not be empty")));
            }
        }
        if self.pipeline.read_buffer_size == 0 {
            return Err(ConfigError::Validation(
                "pipeline.read_buffer_size must be positive".into(),
            ));
        }
        if self.pipeline.read_buffer_size > MAX_READ_BUFFER_SIZE {
            return Err(ConfigError::Validation(format!(
                "pipeline.read_buffer_size must be at most {MAX_READ_BUFFER_SIZE}"
            )));
        }
        Ok(())
    }
}

/// Serial port settings
///
/// Framing is fixed at 8 data bits, 1 stop bit, no parity, no flow control.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device identifier (`COM4`, `/dev/ttyUSB0`)
    pub port: String,
    /// Line speed
    pub baud_rate: u32,
    /// Upper bound on a single blocking read (milliseconds)
    ///
    /// Also bounds how long shutdown can take.
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "COM4".to_string(),
            baud_rate: 9600,
            read_timeout_ms: 1000,
        }
    }
}

impl SerialConfig {
    /// Read timeout as a `Duration`
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Key-value store settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory under which key paths are created
    pub root: PathBuf,
    /// Hierarchical key path, segments separated by `/` or `\`
    pub key_path: String,
    /// Field holding the sensor label, written once at startup
    pub name_field: String,
    /// Field holding the latest reading
    pub value_field: String,
    /// Label written to `name_field`
    pub sensor_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            key_path: r"Software\HWiNFO64\Sensors\Custom\PC Water Sensor\Temp0".to_string(),
            name_field: "Name".to_string(),
            value_field: "Value".to_string(),
            sensor_name: "Temperature".to_string(),
        }
    }
}

/// Read loop tuning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bytes requested per read
    pub read_buffer_size: usize,
    /// Pause after a read that returned nothing (milliseconds)
    pub idle_backoff_ms: u64,
    /// Pause after a failed read (milliseconds)
    pub error_backoff_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 256,
            idle_backoff_ms: 10,
            error_backoff_ms: 50,
        }
    }
}

impl PipelineConfig {
    /// Config without any backoff sleeps, for driving the loop in tests
    pub const fn no_backoff() -> Self {
        Self {
            read_buffer_size: 256,
            idle_backoff_ms: 0,
            error_backoff_ms: 0,
        }
    }

    /// Idle backoff as a `Duration`
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    /// Error backoff as a `Duration`
    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

/// Split a key path into its non-empty segments
pub fn key_segments(key_path: &str) -> impl Iterator<Item = &str> {
    key_path
        .split(['/', '\\'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
