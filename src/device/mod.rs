//! Device Communication Capabilities
//!
//! The checks talk to the hardware through a device communication library.
//! This module defines the shape the checks depend on, split into small
//! capability traits a node implements according to what it supports:
//!
//! - Every node (STU and sensor nodes) implements [`NodeEeprom`]
//! - A sensor node additionally implements [`SensorNodeEeprom`] and [`SensorNode`]
//! - An STH additionally implements [`SthEeprom`] and [`Sth`]
//!
//! Each persisted EEPROM field is exposed as a pair of asynchronous accessors
//! (`write_*` / `read_*`). The transport beneath them (CAN, Bluetooth) is not
//! visible here.
//!
//! # Design Philosophy
//!
//! Each capability trait:
//! - Is async (uses #[async_trait])
//! - Is thread-safe (requires Send + Sync)
//! - Uses anyhow::Result for errors
//!
//! [`mock`] provides in-memory implementations for tests. [`mac`] derives
//! node names from Bluetooth MAC addresses.

pub mod mac;
pub mod mock;

pub use mac::MacAddress;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Hardware or firmware version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
    /// Patch level
    pub patch: u8,
}

impl Version {
    /// Create a version from its components
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(text: &str) -> std::result::Result<Self, Self::Err> {
        let parts = text
            .trim()
            .split('.')
            .map(str::parse::<u8>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| format!("Invalid version “{text}”: {err}"))?;
        match parts.as_slice() {
            [major, minor, patch] => Ok(Version::new(*major, *minor, *patch)),
            _ => Err(format!(
                "Invalid version “{text}”: expected major.minor.patch"
            )),
        }
    }
}

impl TryFrom<String> for Version {
    type Error = String;

    fn try_from(text: String) -> std::result::Result<Self, Self::Error> {
        text.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

/// Axis of the acceleration sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// x axis
    X,
    /// y axis
    Y,
    /// z axis
    Z,
}

impl Axis {
    /// All axes in order
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        })
    }
}

/// Reduced energy mode of the Bluetooth advertisement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnergyMode {
    /// First reduced energy mode
    Reduced,
    /// Second (lowest) energy mode
    Lowest,
}

impl EnergyMode {
    /// Number used in field names (`advertisement time 1`)
    pub fn number(self) -> u8 {
        match self {
            EnergyMode::Reduced => 1,
            EnergyMode::Lowest => 2,
        }
    }
}

/// Measurement channels enabled while streaming
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingConfiguration {
    /// First measurement channel
    pub first: bool,
    /// Second measurement channel
    pub second: bool,
    /// Third measurement channel
    pub third: bool,
}

impl StreamingConfiguration {
    /// Stream only the first channel
    pub fn first_only() -> Self {
        Self {
            first: true,
            ..Default::default()
        }
    }

    /// Number of enabled channels
    pub fn channels(&self) -> usize {
        [self.first, self.second, self.third]
            .into_iter()
            .filter(|enabled| *enabled)
            .count()
    }
}

/// One unit of streaming data
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingData {
    /// Message counter (wraps around)
    pub counter: u8,
    /// Time since the stream was opened
    pub timestamp: Duration,
    /// Raw ADC values of the enabled channels
    pub values: Vec<u16>,
}

/// Supply voltage during an acceleration sensor self test, in millivolts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelfTestVoltages {
    /// Sensor output before the self test
    pub before: f64,
    /// Sensor output while the self test is active
    pub during: f64,
    /// Sensor output after the self test
    pub after: f64,
}

impl SelfTestVoltages {
    /// Absolute change caused by the self test
    pub fn difference(&self) -> f64 {
        (self.during - self.before).abs()
    }

    /// Absolute drift between the readings before and after the self test
    pub fn drift(&self) -> f64 {
        (self.after - self.before).abs()
    }
}

/// Capability: EEPROM fields shared by all nodes
#[async_trait]
pub trait NodeEeprom: Send + Sync {
    /// Write the Global Trade Item Number
    async fn write_gtin(&self, gtin: u64) -> Result<()>;
    /// Read the Global Trade Item Number
    async fn read_gtin(&self) -> Result<u64>;

    /// Write the hardware version
    async fn write_hardware_version(&self, version: Version) -> Result<()>;
    /// Read the hardware version
    async fn read_hardware_version(&self) -> Result<Version>;

    /// Write the firmware version
    async fn write_firmware_version(&self, version: Version) -> Result<()>;
    /// Read the firmware version
    async fn read_firmware_version(&self) -> Result<Version>;

    /// Write the firmware release name
    async fn write_release_name(&self, name: &str) -> Result<()>;
    /// Read the firmware release name
    async fn read_release_name(&self) -> Result<String>;

    /// Write the serial number
    async fn write_serial_number(&self, serial_number: &str) -> Result<()>;
    /// Read the serial number
    async fn read_serial_number(&self) -> Result<String>;

    /// Write the product name
    async fn write_product_name(&self, name: &str) -> Result<()>;
    /// Read the product name
    async fn read_product_name(&self) -> Result<String>;

    /// Write the production batch number
    async fn write_batch_number(&self, batch: u32) -> Result<()>;
    /// Read the production batch number
    async fn read_batch_number(&self) -> Result<u32>;

    /// Write the production date
    async fn write_production_date(&self, date: NaiveDate) -> Result<()>;
    /// Read the production date
    async fn read_production_date(&self) -> Result<NaiveDate>;
}

/// Capability: EEPROM fields of sensor nodes
#[async_trait]
pub trait SensorNodeEeprom: NodeEeprom {
    /// Write the advertisement name
    async fn write_name(&self, name: &str) -> Result<()>;
    /// Read the advertisement name
    async fn read_name(&self) -> Result<String>;

    /// Write the Bluetooth advertisement time of `mode`
    async fn write_advertisement_time(&self, mode: EnergyMode, time: Duration) -> Result<()>;
    /// Read the Bluetooth advertisement time of `mode`
    async fn read_advertisement_time(&self, mode: EnergyMode) -> Result<Duration>;

    /// Write the time before the node switches to `mode`
    async fn write_sleep_time(&self, mode: EnergyMode, time: Duration) -> Result<()>;
    /// Read the time before the node switches to `mode`
    async fn read_sleep_time(&self, mode: EnergyMode) -> Result<Duration>;
}

/// Capability: acceleration calibration constants of the STH
#[async_trait]
pub trait SthEeprom: SensorNodeEeprom {
    /// Write the slope converting ADC values of `axis` into g
    async fn write_acceleration_slope(&self, axis: Axis, slope: f64) -> Result<()>;
    /// Read the slope converting ADC values of `axis` into g
    async fn read_acceleration_slope(&self, axis: Axis) -> Result<f64>;

    /// Write the offset of `axis` in g
    async fn write_acceleration_offset(&self, axis: Axis, offset: f64) -> Result<()>;
    /// Read the offset of `axis` in g
    async fn read_acceleration_offset(&self, axis: Axis) -> Result<f64>;
}

/// An open stream of measurement data
///
/// Dropping the stream closes it; [`close`](DataStream::close) does the same
/// while reporting errors.
#[async_trait]
pub trait DataStream: Send {
    /// Wait for the next unit of data; `None` once the stream has ended
    async fn next_data(&mut self) -> Result<Option<StreamingData>>;

    /// Stop streaming and release the stream
    async fn close(&mut self) -> Result<()>;
}

/// Capability: sensor node measurements
#[async_trait]
pub trait SensorNode: SensorNodeEeprom {
    /// Read the supply (battery) voltage in volts
    async fn supply_voltage(&self) -> Result<f64>;

    /// Start streaming the channels enabled in `config`
    async fn open_data_stream(
        &self,
        config: StreamingConfiguration,
    ) -> Result<Box<dyn DataStream>>;
}

/// Capability: STH measurements
#[async_trait]
pub trait Sth: SensorNode + SthEeprom {
    /// Run the self test of the acceleration sensor
    async fn self_test_voltages(&self) -> Result<SelfTestVoltages>;
}
