//! meterctl configuration
//!
//! Sources, lowest priority first: built-in defaults, the YAML file,
//! `METERLINK_*` environment variables (`__` separates sections, e.g.
//! `METERLINK_CONNECTION__HOST`), then command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use meterlink_registers::constants::{DEFAULT_TCP_PORT, MAX_READ_REGISTERS};
use meterlink_registers::RegisterMap;
use meterlink_sink::sink::validate_identifier;
use meterlink_sink::{fields_from_registers, validate_column, SinkField, SqliteSinkConfig};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/meterctl.yaml";
pub const ENV_PREFIX: &str = "METERLINK_";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Catalog device name, case-insensitive
    pub device: String,
    /// Extra device definitions merged into the built-in catalog
    pub catalog_file: Option<PathBuf>,
    pub connection: ConnectionConfig,
    pub limits: LimitsConfig,
    pub poll: PollConfig,
    pub sink: SinkConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device: "sdm230".to_string(),
            catalog_file: None,
            connection: ConnectionConfig::default(),
            limits: LimitsConfig::default(),
            poll: PollConfig::default(),
            sink: SinkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
    /// Per-request timeout, 0 waits indefinitely
    pub timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_TCP_PORT,
            unit_id: 1,
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Registers per read request (1..=125)
    pub max_read_registers: u16,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_read_registers: MAX_READ_REGISTERS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    /// Apply register factors before printing and storing
    pub factored: bool,
    /// Number of cycles to run, 0 runs until interrupted
    pub cycles: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            factored: true,
            cycles: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub enabled: bool,
    pub database: PathBuf,
    pub table: String,
    pub create_table: bool,
    /// Empty derives one column per register from its description
    pub fields: Vec<SinkField>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            database: PathBuf::from("data/meterlink.db"),
            table: "readings".to_string(),
            create_table: true,
            fields: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: Option<String>,
    /// Also log to a daily rolling file under `dir`
    pub file: bool,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: Some("logs".to_string()),
            file: false,
            json: false,
        }
    }
}

/// Values given on the command line; `None` leaves the configured value
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub device: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub unit_id: Option<u8>,
}

impl AppConfig {
    /// Layered figment for `path`, or the default file when `None`
    pub fn figment(path: Option<&Path>, overrides: &CliOverrides) -> Figment {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let mut figment = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        if let Some(device) = &overrides.device {
            figment = figment.merge(Serialized::default("device", device));
        }
        if let Some(host) = &overrides.host {
            figment = figment.merge(Serialized::default("connection.host", host));
        }
        if let Some(port) = overrides.port {
            figment = figment.merge(Serialized::default("connection.port", port));
        }
        if let Some(unit_id) = overrides.unit_id {
            figment = figment.merge(Serialized::default("connection.unit_id", unit_id));
        }
        figment
    }

    /// Load and validate
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub fn load(path: Option<&Path>, overrides: &CliOverrides) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                bail!("Configuration file not found: {}", path.display());
            }
        }

        let config: AppConfig = Self::figment(path, overrides)
            .extract()
            .context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.trim().is_empty() {
            bail!("device cannot be empty");
        }
        if self.connection.host.trim().is_empty() {
            bail!("connection.host cannot be empty");
        }
        let max_read = self.limits.max_read_registers;
        if max_read == 0 || max_read > MAX_READ_REGISTERS {
            bail!(
                "limits.max_read_registers must be between 1 and {}, got {}",
                MAX_READ_REGISTERS,
                max_read
            );
        }
        if self.sink.enabled {
            // Derived field names are always valid identifiers
            validate_identifier(&self.sink.table).context("Invalid sink.table")?;
            for field in &self.sink.fields {
                validate_column(&field.name).context("Invalid sink field")?;
            }
        }
        Ok(())
    }

    /// Request timeout; `None` when `timeout_ms` is 0
    pub fn timeout(&self) -> Option<Duration> {
        match self.connection.timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }

    /// Sink settings for a device with `registers`
    pub fn sink_config(&self, registers: &RegisterMap) -> SqliteSinkConfig {
        let fields = if self.sink.fields.is_empty() {
            fields_from_registers(registers)
        } else {
            self.sink.fields.clone()
        };
        let mut config = SqliteSinkConfig::new(&self.sink.database, &self.sink.table, fields);
        config.create_table = self.sink.create_table;
        config
    }
}
