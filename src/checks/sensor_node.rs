//! Checks for sensor nodes.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::commander::{Commander, ProcessLauncher};
use crate::config::{PowerSettings, SensorNodeSettings};
use crate::device::{SensorNode, StreamingConfiguration};
use crate::error::IcotestResult;
use crate::measurement_types::{MeasurementSample, Unit};
use crate::streaming::measure_power_while_streaming;
use crate::verification::{ToleranceCheck, VerificationEngine};

/// Fields written by the checks of this module
pub const FIELDS: [&str; 5] = [
    "name",
    "advertisement time 1",
    "sleep time 1",
    "advertisement time 2",
    "sleep time 2",
];

/// Check that the advertisement name survives a round trip
pub async fn check_eeprom_name<D>(
    engine: &VerificationEngine<D>,
    settings: &SensorNodeSettings,
) -> IcotestResult<()>
where
    D: ?Sized + Send + Sync + 'static,
{
    engine.verify("name", settings.name.as_str()).await?;
    Ok(())
}

/// Check that the Bluetooth advertisement and sleep times survive a round trip
pub async fn check_eeprom_bluetooth_times<D>(
    engine: &VerificationEngine<D>,
    settings: &SensorNodeSettings,
) -> IcotestResult<()>
where
    D: ?Sized + Send + Sync + 'static,
{
    let bluetooth = &settings.bluetooth;
    let times = [
        ("advertisement time 1", bluetooth.advertisement_time_1),
        ("sleep time 1", bluetooth.sleep_time_1),
        ("advertisement time 2", bluetooth.advertisement_time_2),
        ("sleep time 2", bluetooth.sleep_time_2),
    ];
    for (field, milliseconds) in times {
        engine
            .verify(field, Duration::from_millis(milliseconds))
            .await?;
    }
    Ok(())
}

/// Check that the supply voltage lies in the configured range
pub async fn check_battery_voltage<N>(
    node: &N,
    settings: &SensorNodeSettings,
) -> IcotestResult<MeasurementSample>
where
    N: SensorNode + ?Sized,
{
    let sample = MeasurementSample::single(node.supply_voltage().await?, Unit::Volts);
    let expected = settings.battery_voltage;
    ToleranceCheck::new("Supply voltage", Unit::Volts, expected.average, expected.tolerance)
        .check_sample(&sample)?;
    info!("Supply voltage: {sample}");
    Ok(sample)
}

/// Check the power usage of `node` while it streams data
///
/// The power usage is read with `commander` over the configured window.
pub async fn check_power_usage_streaming<N, L>(
    node: Arc<N>,
    commander: Arc<Commander<L>>,
    settings: &PowerSettings,
) -> IcotestResult<MeasurementSample>
where
    N: SensorNode + ?Sized + 'static,
    L: ProcessLauncher + 'static,
{
    let window = settings.window_seconds;
    let milliwatts = measure_power_while_streaming(
        node,
        StreamingConfiguration::first_only(),
        move || commander.read_power_usage(window),
    )
    .await?;

    let sample = MeasurementSample::over(
        milliwatts,
        Unit::Milliwatts,
        Duration::from_secs_f64(window),
    );
    ToleranceCheck::new(
        "Power usage",
        Unit::Milliwatts,
        settings.expected_milliwatts,
        settings.tolerance_milliwatts,
    )
    .check_sample(&sample)?;
    info!("Streaming power usage: {sample}");
    Ok(sample)
}
