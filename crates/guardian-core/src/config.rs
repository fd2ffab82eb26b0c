//! Configuration loading and typed config structures for the Guardian
//! simulator.
//!
//! The configuration lives in `guardian-config.yaml` at the working
//! directory. Every section and field is optional; missing values fall back
//! to the defaults below, which reproduce the stock demo unit.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GuardianConfig {
    /// Tick loop and unit identity.
    #[serde(default)]
    pub simulation: SimulationSettings,

    /// Start-of-process machine readings.
    #[serde(default)]
    pub machine: MachineConfig,

    /// Observer HTTP server settings.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GuardianConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `OBSERVER_PORT` overrides `observer.port` when set to a valid port.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.observer.apply_env_overrides();
        Ok(config)
    }
}

/// Tick loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationSettings {
    /// Real-time milliseconds between ticks. Values below the operator
    /// minimum are raised to it when the loop state is built.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Seed for the sensor noise. Unseeded runs draw from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Identifier published in every snapshot.
    #[serde(default = "default_unit_id")]
    pub unit_id: String,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            seed: None,
            unit_id: default_unit_id(),
        }
    }
}

/// Start-of-process machine readings and fixed electrical values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MachineConfig {
    /// Inverter temperature at startup.
    #[serde(default = "default_initial_temperature")]
    pub initial_temperature: f64,

    /// Hour meter reading at startup.
    #[serde(default = "default_initial_operating_hours")]
    pub initial_operating_hours: f64,

    /// Hybrid DC bus voltage, constant for the simulated unit.
    #[serde(default = "default_hybrid_bus_voltage")]
    pub hybrid_bus_voltage: f64,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            initial_temperature: default_initial_temperature(),
            initial_operating_hours: default_initial_operating_hours(),
            hybrid_bus_voltage: default_hybrid_bus_voltage(),
        }
    }
}

/// Observer HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Frames buffered per observer before that observer starts missing
    /// frames.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Milliseconds a single `WebSocket` write may take before the
    /// observer is disconnected.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

impl ObserverConfig {
    /// Override the port with `OBSERVER_PORT` when it is set and parses.
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = std::env::var("OBSERVER_PORT")
            .ok()
            .and_then(|val| val.parse::<u16>().ok())
        {
            self.port = port;
        }
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            channel_capacity: default_channel_capacity(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_unit_id() -> String {
    String::from("HB-001")
}

const fn default_initial_temperature() -> f64 {
    55.0
}

const fn default_initial_operating_hours() -> f64 {
    4520.0
}

const fn default_hybrid_bus_voltage() -> f64 {
    580.0
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8000
}

const fn default_channel_capacity() -> usize {
    crate::hub::DEFAULT_OBSERVER_CAPACITY
}

const fn default_send_timeout_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    String::from("info")
}
