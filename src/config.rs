//! Configuration System using Figment
//!
//! This module provides strongly-typed configuration loading for the checks.
//! Configuration is merged from (later sources win):
//! 1. Built-in defaults (`config/default.toml`, compiled into the binary)
//! 2. The user configuration file (`<config dir>/icotest/config.toml`)
//! 3. An explicitly given configuration file
//! 4. Environment variables (prefixed with `ICOTEST_`, nesting split on `__`)
//!
//! # Example
//! ```no_run
//! use icotest::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Sensor node: {}", settings.sensor_node.name);
//! # Ok::<(), icotest::error::IcotestError>(())
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::commander::Platform;
use crate::device::Version;
use crate::error::{IcotestError, IcotestResult};

/// Built-in default configuration
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Prefix of environment variables overriding configuration values
pub const ENV_PREFIX: &str = "ICOTEST_";

/// Longest name a sensor node can advertise
pub const MAX_NODE_NAME_LENGTH: usize = 8;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Simplicity Commander settings
    pub commander: CommanderSettings,
    /// Sensor node settings
    pub sensor_node: SensorNodeSettings,
    /// Product data written to the EEPROM of every node
    pub node: NodeSettings,
    /// STH specific settings
    pub sth: SthSettings,
    /// Known acceleration sensors, by name
    pub acceleration_sensors: BTreeMap<String, AccelerationSensorSettings>,
    /// Power usage limits
    pub power: PowerSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Simplicity Commander configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommanderSettings {
    /// Name of the executable
    pub executable: String,
    /// Identifier of the chip on the PCB
    pub chip: String,
    /// Installation directories, per platform
    pub path: PlatformPaths,
}

/// Directories searched for the executable on each platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformPaths {
    /// Linux directories
    #[serde(default)]
    pub linux: Vec<PathBuf>,
    /// macOS directories
    #[serde(default)]
    pub mac: Vec<PathBuf>,
    /// Windows directories
    #[serde(default)]
    pub windows: Vec<PathBuf>,
}

impl PlatformPaths {
    /// Directories for `platform`
    pub fn for_platform(&self, platform: Platform) -> &[PathBuf] {
        match platform {
            Platform::Linux => &self.linux,
            Platform::MacOs => &self.mac,
            Platform::Windows => &self.windows,
        }
    }
}

/// Sensor node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorNodeSettings {
    /// Advertisement name of the node under test
    pub name: String,
    /// Expected supply voltage
    pub battery_voltage: ExpectedValue,
    /// Bluetooth advertisement and sleep times
    pub bluetooth: BluetoothSettings,
}

/// An expected value with symmetric tolerance
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExpectedValue {
    /// Expected value
    pub average: f64,
    /// Accepted deviation in both directions
    pub tolerance: f64,
}

/// Bluetooth timing parameters in milliseconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BluetoothSettings {
    /// Advertisement time of the first reduced energy mode
    pub advertisement_time_1: u64,
    /// Sleep time of the first reduced energy mode
    pub sleep_time_1: u64,
    /// Advertisement time of the second reduced energy mode
    pub advertisement_time_2: u64,
    /// Sleep time of the second reduced energy mode
    pub sleep_time_2: u64,
}

/// Product data stored in the EEPROM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSettings {
    /// Global Trade Item Number
    pub gtin: u64,
    /// Hardware revision
    pub hardware_version: Version,
    /// Firmware version
    pub firmware_version: Version,
    /// Firmware release name
    pub release_name: String,
    /// Serial number
    pub serial_number: String,
    /// Product name
    pub product_name: String,
    /// Production batch
    pub batch_number: u32,
    /// Production date
    pub production_date: NaiveDate,
}

/// STH configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SthSettings {
    /// Acceleration sensor fitted to the STH
    pub acceleration_sensor: SensorSelection,
}

/// Reference into [`Settings::acceleration_sensors`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSelection {
    /// Sensor name
    pub sensor: String,
}

/// Characteristics of an acceleration sensor
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccelerationSensorSettings {
    /// Measurement range
    pub acceleration: AccelerationRange,
    /// Self test expectations
    pub self_test: SelfTestSettings,
}

/// Measurement range of an acceleration sensor
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccelerationRange {
    /// Full scale range in multiples of g (from `-maximum/2` to `maximum/2`)
    pub maximum: f64,
}

/// Self test expectations
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SelfTestSettings {
    /// Voltage difference caused by the self test
    pub voltage: SelfTestVoltage,
}

/// Expected self test voltage difference in millivolts
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SelfTestVoltage {
    /// Expected difference
    pub difference: f64,
    /// Accepted deviation
    pub tolerance: f64,
}

/// Power usage limits
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PowerSettings {
    /// Measurement window in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: f64,
    /// Expected power usage while streaming
    pub expected_milliwatts: f64,
    /// Accepted deviation
    pub tolerance_milliwatts: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level (debug, info, warning, error, critical)
    pub level: String,
    /// Output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_window_seconds() -> f64 {
    1.0
}

fn default_log_format() -> String {
    "compact".to_string()
}

/// Location of the user configuration file
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|directory| directory.join("icotest").join("config.toml"))
}

impl Settings {
    /// Load defaults, user configuration and environment overrides
    pub fn load() -> IcotestResult<Self> {
        Self::load_with(None)
    }

    /// Load configuration with an additional file on top of the user configuration
    pub fn load_from<P: AsRef<Path>>(path: P) -> IcotestResult<Self> {
        Self::load_with(Some(path.as_ref()))
    }

    fn load_with(path: Option<&Path>) -> IcotestResult<Self> {
        let settings: Settings = Self::figment(user_config_path().as_deref(), path).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Layered configuration sources
    ///
    /// Missing files are skipped.
    pub fn figment(user_config: Option<&Path>, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));
        if let Some(user_config) = user_config {
            figment = figment.merge(Toml::file(user_config));
        }
        if let Some(explicit) = explicit {
            figment = figment.merge(Toml::file(explicit));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> IcotestResult<()> {
        let name = &self.sensor_node.name;
        if name.is_empty() || name.chars().count() > MAX_NODE_NAME_LENGTH {
            return Err(IcotestError::Configuration(format!(
                "Sensor node name “{name}” must contain between 1 and {MAX_NODE_NAME_LENGTH} characters"
            )));
        }

        let tolerances = [
            ("sensor_node.battery_voltage.tolerance", self.sensor_node.battery_voltage.tolerance),
            ("power.tolerance_milliwatts", self.power.tolerance_milliwatts),
        ];
        for (key, tolerance) in tolerances {
            check_tolerance(key, tolerance)?;
        }
        for (sensor, settings) in &self.acceleration_sensors {
            check_tolerance(
                &format!("acceleration_sensors.{sensor}.self_test.voltage.tolerance"),
                settings.self_test.voltage.tolerance,
            )?;
        }

        if !(self.power.window_seconds.is_finite() && self.power.window_seconds > 0.0) {
            return Err(IcotestError::Configuration(format!(
                "Invalid power.window_seconds {}. Must be greater than 0",
                self.power.window_seconds
            )));
        }

        self.acceleration_sensor()?;

        let valid_levels = ["debug", "info", "warning", "error", "critical"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(IcotestError::Configuration(format!(
                "Invalid logging.level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(IcotestError::Configuration(format!(
                "Invalid logging.format '{}'. Must be one of: {}",
                self.logging.format,
                valid_formats.join(", ")
            )));
        }

        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> IcotestResult<String> {
        toml::to_string_pretty(self).map_err(|err| {
            IcotestError::Configuration(format!("Unable to serialize configuration: {err}"))
        })
    }

    /// Characteristics of the acceleration sensor fitted to the STH
    pub fn acceleration_sensor(&self) -> IcotestResult<&AccelerationSensorSettings> {
        let sensor = &self.sth.acceleration_sensor.sensor;
        self.acceleration_sensors.get(sensor).ok_or_else(|| {
            IcotestError::Configuration(format!(
                "Unknown acceleration sensor “{sensor}”. Known sensors: {}",
                self.acceleration_sensors
                    .keys()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    }
}

fn check_tolerance(key: &str, tolerance: f64) -> IcotestResult<()> {
    if tolerance.is_finite() && tolerance >= 0.0 {
        Ok(())
    } else {
        Err(IcotestError::Configuration(format!(
            "Invalid {key} {tolerance}. Must be a non-negative number"
        )))
    }
}

/// Open the user configuration file in the default application
///
/// The file is created from the built-in defaults if it does not exist yet.
pub fn open_user_config() -> IcotestResult<PathBuf> {
    let path = user_config_path().ok_or_else(|| {
        IcotestError::Configuration("Unable to determine configuration directory".to_string())
    })?;

    if !path.exists() {
        if let Some(directory) = path.parent() {
            std::fs::create_dir_all(directory)?;
        }
        std::fs::write(&path, DEFAULT_CONFIG)?;
    }

    opener::open(&path).map_err(|err| {
        IcotestError::Configuration(format!(
            "Unable to open configuration file “{}”: {err}",
            path.display()
        ))
    })?;

    Ok(path)
}
