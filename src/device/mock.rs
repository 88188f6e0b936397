//! Mock Device Implementations
//!
//! Provides a simulated STH for testing without physical hardware.
//! All mock operations use async-safe primitives (tokio::time::sleep, tokio locks).
//!
//! # Behavior
//!
//! - EEPROM: in-memory, floats are stored with single precision like on the device
//! - Supply voltage and self test voltages: fixed, configurable values
//! - Data stream: endless, one message per stream interval (default 1ms)
//! - Failure injection: corrupted reads, stream loss after a number of messages

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tokio::time::{sleep, Instant};

use crate::config::MAX_NODE_NAME_LENGTH;
use crate::device::{
    Axis, DataStream, EnergyMode, NodeEeprom, SelfTestVoltages, SensorNode, SensorNodeEeprom,
    StreamingConfiguration, StreamingData, Sth, SthEeprom, Version,
};

#[derive(Debug, Clone)]
struct EepromContent {
    gtin: u64,
    hardware_version: Version,
    firmware_version: Version,
    release_name: String,
    serial_number: String,
    product_name: String,
    batch_number: u32,
    production_date: NaiveDate,
    name: String,
    advertisement_times: HashMap<EnergyMode, Duration>,
    sleep_times: HashMap<EnergyMode, Duration>,
    slopes: HashMap<Axis, f32>,
    offsets: HashMap<Axis, f32>,
}

impl Default for EepromContent {
    fn default() -> Self {
        Self {
            gtin: 0,
            hardware_version: Version::new(0, 0, 0),
            firmware_version: Version::new(0, 0, 0),
            release_name: String::new(),
            serial_number: String::new(),
            product_name: String::new(),
            batch_number: 0,
            production_date: NaiveDate::default(),
            name: String::new(),
            advertisement_times: HashMap::new(),
            sleep_times: HashMap::new(),
            slopes: HashMap::new(),
            offsets: HashMap::new(),
        }
    }
}

/// Mock STH with in-memory EEPROM
///
/// # Example
///
/// ```rust,ignore
/// let sth = MockSth::new().with_supply_voltage(3.25);
/// sth.write_gtin(42).await?;
/// assert_eq!(sth.read_gtin().await?, 42);
/// ```
pub struct MockSth {
    eeprom: RwLock<EepromContent>,
    supply_voltage: f64,
    self_test: SelfTestVoltages,
    stream_interval: Duration,
    stream_failure_after: Option<usize>,
    stream_stall_after: Option<usize>,
    corrupt_reads: AtomicBool,
    streaming: Arc<AtomicBool>,
    streams_opened: AtomicUsize,
}

impl MockSth {
    /// Create a mock with a plausible supply voltage and self test result
    pub fn new() -> Self {
        Self {
            eeprom: RwLock::new(EepromContent::default()),
            supply_voltage: 3.3,
            self_test: SelfTestVoltages {
                before: 1650.0,
                during: 1720.0,
                after: 1651.0,
            },
            stream_interval: Duration::from_millis(1),
            stream_failure_after: None,
            stream_stall_after: None,
            corrupt_reads: AtomicBool::new(false),
            streaming: Arc::new(AtomicBool::new(false)),
            streams_opened: AtomicUsize::new(0),
        }
    }

    /// Report `volts` as supply voltage
    pub fn with_supply_voltage(mut self, volts: f64) -> Self {
        self.supply_voltage = volts;
        self
    }

    /// Report `voltages` for the acceleration sensor self test
    pub fn with_self_test(mut self, voltages: SelfTestVoltages) -> Self {
        self.self_test = voltages;
        self
    }

    /// Deliver one streaming message per `interval`
    pub fn with_stream_interval(mut self, interval: Duration) -> Self {
        self.stream_interval = interval;
        self
    }

    /// Let every data stream fail after `messages` messages
    pub fn with_stream_failure_after(mut self, messages: usize) -> Self {
        self.stream_failure_after = Some(messages);
        self
    }

    /// Stop delivering data after `messages` messages without closing the stream
    pub fn with_stream_stall_after(mut self, messages: usize) -> Self {
        self.stream_stall_after = Some(messages);
        self
    }

    /// Return values different from the stored ones on every read
    pub fn corrupt_reads(&self, enabled: bool) {
        self.corrupt_reads.store(enabled, Ordering::SeqCst);
    }

    /// Whether a data stream is currently open
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    /// Number of data streams opened so far
    pub fn streams_opened(&self) -> usize {
        self.streams_opened.load(Ordering::SeqCst)
    }

    fn corrupted(&self) -> bool {
        self.corrupt_reads.load(Ordering::SeqCst)
    }

    fn text(&self, value: &str) -> String {
        if self.corrupted() {
            format!("{value}?")
        } else {
            value.to_string()
        }
    }

    fn float(&self, stored: Option<&f32>, axis: Axis) -> Result<f64> {
        let value = *stored.ok_or_else(|| anyhow!("No value stored for {axis} axis"))?;
        let value = if self.corrupted() { value + 1.0 } else { value };
        Ok(f64::from(value))
    }
}

impl Default for MockSth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeEeprom for MockSth {
    async fn write_gtin(&self, gtin: u64) -> Result<()> {
        self.eeprom.write().await.gtin = gtin;
        Ok(())
    }

    async fn read_gtin(&self) -> Result<u64> {
        let gtin = self.eeprom.read().await.gtin;
        Ok(if self.corrupted() { gtin.wrapping_add(1) } else { gtin })
    }

    async fn write_hardware_version(&self, version: Version) -> Result<()> {
        self.eeprom.write().await.hardware_version = version;
        Ok(())
    }

    async fn read_hardware_version(&self) -> Result<Version> {
        let mut version = self.eeprom.read().await.hardware_version;
        if self.corrupted() {
            version.patch = version.patch.wrapping_add(1);
        }
        Ok(version)
    }

    async fn write_firmware_version(&self, version: Version) -> Result<()> {
        self.eeprom.write().await.firmware_version = version;
        Ok(())
    }

    async fn read_firmware_version(&self) -> Result<Version> {
        let mut version = self.eeprom.read().await.firmware_version;
        if self.corrupted() {
            version.minor = version.minor.wrapping_add(1);
        }
        Ok(version)
    }

    async fn write_release_name(&self, name: &str) -> Result<()> {
        self.eeprom.write().await.release_name = name.to_string();
        Ok(())
    }

    async fn read_release_name(&self) -> Result<String> {
        Ok(self.text(&self.eeprom.read().await.release_name))
    }

    async fn write_serial_number(&self, serial_number: &str) -> Result<()> {
        self.eeprom.write().await.serial_number = serial_number.to_string();
        Ok(())
    }

    async fn read_serial_number(&self) -> Result<String> {
        Ok(self.text(&self.eeprom.read().await.serial_number))
    }

    async fn write_product_name(&self, name: &str) -> Result<()> {
        self.eeprom.write().await.product_name = name.to_string();
        Ok(())
    }

    async fn read_product_name(&self) -> Result<String> {
        Ok(self.text(&self.eeprom.read().await.product_name))
    }

    async fn write_batch_number(&self, batch: u32) -> Result<()> {
        self.eeprom.write().await.batch_number = batch;
        Ok(())
    }

    async fn read_batch_number(&self) -> Result<u32> {
        let batch = self.eeprom.read().await.batch_number;
        Ok(if self.corrupted() { batch.wrapping_add(1) } else { batch })
    }

    async fn write_production_date(&self, date: NaiveDate) -> Result<()> {
        self.eeprom.write().await.production_date = date;
        Ok(())
    }

    async fn read_production_date(&self) -> Result<NaiveDate> {
        let date = self.eeprom.read().await.production_date;
        if self.corrupted() {
            return date
                .succ_opt()
                .ok_or_else(|| anyhow!("Production date out of range"));
        }
        Ok(date)
    }
}

#[async_trait]
impl SensorNodeEeprom for MockSth {
    async fn write_name(&self, name: &str) -> Result<()> {
        if name.chars().count() > MAX_NODE_NAME_LENGTH {
            bail!("Name “{name}” is longer than {MAX_NODE_NAME_LENGTH} characters");
        }
        self.eeprom.write().await.name = name.to_string();
        Ok(())
    }

    async fn read_name(&self) -> Result<String> {
        Ok(self.text(&self.eeprom.read().await.name))
    }

    async fn write_advertisement_time(&self, mode: EnergyMode, time: Duration) -> Result<()> {
        self.eeprom
            .write()
            .await
            .advertisement_times
            .insert(mode, time);
        Ok(())
    }

    async fn read_advertisement_time(&self, mode: EnergyMode) -> Result<Duration> {
        let time = self
            .eeprom
            .read()
            .await
            .advertisement_times
            .get(&mode)
            .copied()
            .unwrap_or_default();
        Ok(if self.corrupted() {
            time + Duration::from_millis(1)
        } else {
            time
        })
    }

    async fn write_sleep_time(&self, mode: EnergyMode, time: Duration) -> Result<()> {
        self.eeprom.write().await.sleep_times.insert(mode, time);
        Ok(())
    }

    async fn read_sleep_time(&self, mode: EnergyMode) -> Result<Duration> {
        let time = self
            .eeprom
            .read()
            .await
            .sleep_times
            .get(&mode)
            .copied()
            .unwrap_or_default();
        Ok(if self.corrupted() {
            time + Duration::from_millis(1)
        } else {
            time
        })
    }
}

#[async_trait]
impl SthEeprom for MockSth {
    async fn write_acceleration_slope(&self, axis: Axis, slope: f64) -> Result<()> {
        self.eeprom.write().await.slopes.insert(axis, slope as f32);
        Ok(())
    }

    async fn read_acceleration_slope(&self, axis: Axis) -> Result<f64> {
        self.float(self.eeprom.read().await.slopes.get(&axis), axis)
    }

    async fn write_acceleration_offset(&self, axis: Axis, offset: f64) -> Result<()> {
        self.eeprom.write().await.offsets.insert(axis, offset as f32);
        Ok(())
    }

    async fn read_acceleration_offset(&self, axis: Axis) -> Result<f64> {
        self.float(self.eeprom.read().await.offsets.get(&axis), axis)
    }
}

#[async_trait]
impl SensorNode for MockSth {
    async fn supply_voltage(&self) -> Result<f64> {
        Ok(self.supply_voltage)
    }

    async fn open_data_stream(
        &self,
        config: StreamingConfiguration,
    ) -> Result<Box<dyn DataStream>> {
        if config.channels() == 0 {
            bail!("Streaming requires at least one enabled channel");
        }
        if self.streaming.swap(true, Ordering::SeqCst) {
            bail!("Data stream already open");
        }
        self.streams_opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockDataStream {
            open: self.streaming.clone(),
            channels: config.channels(),
            interval: self.stream_interval,
            failure_after: self.stream_failure_after,
            stall_after: self.stream_stall_after,
            delivered: 0,
            started: Instant::now(),
        }))
    }
}

#[async_trait]
impl Sth for MockSth {
    async fn self_test_voltages(&self) -> Result<SelfTestVoltages> {
        Ok(self.self_test)
    }
}

/// Endless stream of synthetic acceleration data
struct MockDataStream {
    open: Arc<AtomicBool>,
    channels: usize,
    interval: Duration,
    failure_after: Option<usize>,
    stall_after: Option<usize>,
    delivered: usize,
    started: Instant,
}

#[async_trait]
impl DataStream for MockDataStream {
    async fn next_data(&mut self) -> Result<Option<StreamingData>> {
        if !self.open.load(Ordering::SeqCst) {
            return Ok(None);
        }
        if self.failure_after == Some(self.delivered) {
            bail!("Lost connection to sensor node after {} messages", self.delivered);
        }
        if self.stall_after == Some(self.delivered) {
            std::future::pending::<()>().await;
        }

        sleep(self.interval).await;

        let counter = (self.delivered % 256) as u8;
        self.delivered += 1;
        Ok(Some(StreamingData {
            counter,
            timestamp: self.started.elapsed(),
            values: vec![0x7FFF; self.channels],
        }))
    }

    async fn close(&mut self) -> Result<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MockDataStream {
    fn drop(&mut self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn eeprom_stores_values() {
        let sth = MockSth::new();
        sth.write_gtin(9120071480064).await.unwrap();
        sth.write_name("Test-STH").await.unwrap();
        assert_eq!(sth.read_gtin().await.unwrap(), 9120071480064);
        assert_eq!(sth.read_name().await.unwrap(), "Test-STH");
    }

    #[tokio::test]
    async fn floats_lose_precision() {
        let sth = MockSth::new();
        let slope = 100.0 / 65535.0;
        sth.write_acceleration_slope(Axis::X, slope).await.unwrap();
        let read = sth.read_acceleration_slope(Axis::X).await.unwrap();
        assert_ne!(read, slope);
        assert!((read - slope).abs() < 1e-7);
    }

    #[tokio::test]
    async fn long_names_are_rejected() {
        let sth = MockSth::new();
        assert!(sth.write_name("Much too long").await.is_err());
    }

    #[tokio::test]
    async fn stream_can_only_be_opened_once() {
        let sth = MockSth::new();
        let mut stream = sth
            .open_data_stream(StreamingConfiguration::first_only())
            .await
            .unwrap();
        assert!(sth.is_streaming());
        assert!(sth
            .open_data_stream(StreamingConfiguration::first_only())
            .await
            .is_err());

        let data = stream.next_data().await.unwrap().unwrap();
        assert_eq!(data.counter, 0);
        assert_eq!(data.values.len(), 1);

        stream.close().await.unwrap();
        assert!(!sth.is_streaming());
        assert!(stream.next_data().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dropping_stream_releases_it() {
        let sth = MockSth::new();
        let stream = sth
            .open_data_stream(StreamingConfiguration::first_only())
            .await
            .unwrap();
        drop(stream);
        assert!(!sth.is_streaming());
    }

    #[tokio::test]
    async fn injected_stream_failure() {
        let sth = MockSth::new().with_stream_failure_after(2);
        let mut stream = sth
            .open_data_stream(StreamingConfiguration::first_only())
            .await
            .unwrap();
        assert!(stream.next_data().await.unwrap().is_some());
        assert!(stream.next_data().await.unwrap().is_some());
        assert!(stream.next_data().await.is_err());
    }
}
