//! Integration tests for the verification core and the hardware checks
//!
//! The checks run against the in-memory `MockSth`.

use std::sync::Arc;

use figment::providers::{Format, Toml};
use figment::Figment;
use icotest::checks::{node, sensor_node, sth};
use icotest::commander::mock::MockLauncher;
use icotest::commander::{CommandRunner, Commander};
use icotest::config::{Settings, DEFAULT_CONFIG};
use icotest::device::mock::MockSth;
use icotest::device::{MacAddress, SelfTestVoltages};
use icotest::verification::{
    within_tolerance, AccessorTable, FieldValue, ToleranceCheck, VerificationEngine,
};
use icotest::measurement_types::Unit;
use icotest::IcotestError;

fn settings() -> Settings {
    let settings: Settings = Figment::new()
        .merge(Toml::string(DEFAULT_CONFIG))
        .extract()
        .unwrap();
    settings.validate().unwrap();
    settings
}

fn engine(sth: Arc<MockSth>) -> VerificationEngine<MockSth> {
    let fields: Vec<&str> = node::FIELDS
        .iter()
        .chain(sensor_node::FIELDS.iter())
        .chain(sth::FIELDS.iter())
        .copied()
        .collect();
    VerificationEngine::new(sth, AccessorTable::sth(), &fields).unwrap()
}

// =============================================================================
// Round Trips
// =============================================================================

#[tokio::test]
async fn test_all_eeprom_checks_pass_on_healthy_node() {
    let settings = settings();
    let device = Arc::new(MockSth::new());
    let engine = engine(device.clone());

    node::check_eeprom_gtin(&engine, &settings.node).await.unwrap();
    node::check_eeprom_product_data(&engine, &settings.node)
        .await
        .unwrap();
    sensor_node::check_eeprom_name(&engine, &settings.sensor_node)
        .await
        .unwrap();
    sensor_node::check_eeprom_bluetooth_times(&engine, &settings.sensor_node)
        .await
        .unwrap();
    sth::check_eeprom_acceleration(&engine, &settings).await.unwrap();
}

#[tokio::test]
async fn test_corrupted_node_fails_with_written_and_read_value() {
    let settings = settings();
    let device = Arc::new(MockSth::new());
    device.corrupt_reads(true);
    let engine = engine(device);

    let err = node::check_eeprom_gtin(&engine, &settings.node)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Written GTIN \"9120071480064\" does not match read GTIN \"9120071480065\""
    );

    let err = sensor_node::check_eeprom_name(&engine, &settings.sensor_node)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("\"Test-STH\""), "{err}");
    assert!(err.to_string().contains("\"Test-STH?\""), "{err}");

    let err = sth::check_eeprom_acceleration(&engine, &settings)
        .await
        .unwrap_err();
    assert!(matches!(err, IcotestError::Verification { .. }));
}

#[tokio::test]
async fn test_field_names_are_normalized() {
    let device = Arc::new(MockSth::new());
    let engine = engine(device);
    let read = engine.verify("Serial  Number", "0042").await.unwrap();
    assert_eq!(read, FieldValue::Text("0042".to_string()));
}

#[tokio::test]
async fn test_mac_address_name_round_trip() {
    let device = Arc::new(MockSth::new());
    let engine = engine(device);
    let mac: MacAddress = "08:6b:d7:01:de:81".parse().unwrap();

    let read = engine.verify("name", mac.base64_name()).await.unwrap();
    assert_eq!(read, FieldValue::Text("CGvXAd6B".to_string()));
}

#[test]
fn test_unmapped_field_fails_at_startup() {
    let result = VerificationEngine::new(
        Arc::new(MockSth::new()),
        AccessorTable::sensor_node(),
        &sth::FIELDS,
    );
    assert!(matches!(
        result,
        Err(IcotestError::UnknownField { name }) if name == "acceleration slope x"
    ));
}

// =============================================================================
// Tolerances
// =============================================================================

#[test]
fn test_within_tolerance_bounds() {
    assert!(within_tolerance(50.0, 50.0, 10.0));
    assert!(!within_tolerance(61.0, 50.0, 10.0));
    assert!(!within_tolerance(39.9, 50.0, 10.0));
    assert!(within_tolerance(60.0, 50.0, 10.0));
}

#[test]
fn test_violation_reports_violated_bound() {
    let check = ToleranceCheck::new("Supply voltage", Unit::Volts, 3.3, 0.2);

    let high = check.check(3.7).unwrap_err().to_string();
    assert!(high.contains("greater than expected maximum of 3.500 V"), "{high}");

    let low = check.check(2.9).unwrap_err().to_string();
    assert!(low.contains("lower than expected minimum of 3.100 V"), "{low}");
}

#[tokio::test]
async fn test_measurement_checks() {
    let settings = settings();

    let healthy = MockSth::new().with_supply_voltage(3.31);
    sensor_node::check_battery_voltage(&healthy, &settings.sensor_node)
        .await
        .unwrap();
    sth::check_acceleration_sensor_self_test(&healthy, &settings)
        .await
        .unwrap();

    let drained = MockSth::new().with_supply_voltage(2.8);
    assert!(matches!(
        sensor_node::check_battery_voltage(&drained, &settings.sensor_node).await,
        Err(IcotestError::ToleranceViolation(_))
    ));

    let wrong_sensor = MockSth::new().with_self_test(SelfTestVoltages {
        before: 1650.0,
        during: 1790.0,
        after: 1650.0,
    });
    let message = sth::check_acceleration_sensor_self_test(&wrong_sensor, &settings)
        .await
        .unwrap_err()
        .to_string();
    assert!(message.contains("Possible Reason"), "{message}");
}

// =============================================================================
// Power Usage While Streaming
// =============================================================================

#[tokio::test]
async fn test_power_usage_while_streaming() {
    let settings = settings();
    let device = Arc::new(MockSth::new());
    let launcher = MockLauncher::new().respond(0, "Power [mW] : 45.230", "");
    let commander = Arc::new(Commander::with_runner(
        CommandRunner::with_launcher("commander", &[], launcher).unwrap(),
    ));

    let sample = sensor_node::check_power_usage_streaming(
        device.clone(),
        commander.clone(),
        &settings.power,
    )
    .await
    .unwrap();

    assert_eq!(sample.value, 45.23);
    assert_eq!(sample.to_string(), "45.230 mW over 1000 ms");
    assert_eq!(device.streams_opened(), 1);
    assert!(!device.is_streaming());
}

#[tokio::test]
async fn test_power_failure_closes_stream() {
    let settings = settings();
    let device = Arc::new(MockSth::new());
    let launcher = MockLauncher::new().respond(1, "", "ERROR: No adapter found");
    let commander = Arc::new(Commander::with_runner(
        CommandRunner::with_launcher("commander", &[], launcher).unwrap(),
    ));

    let err = sensor_node::check_power_usage_streaming(device.clone(), commander, &settings.power)
        .await
        .unwrap_err();

    assert!(matches!(err, IcotestError::CommandFailed { .. }));
    assert!(!device.is_streaming());
}
