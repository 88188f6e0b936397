//! Integration tests for configuration loading
//!
//! Tests touching `ICOTEST_*` environment variables run serially.

use std::fs;
use std::path::PathBuf;

use icotest::config::{Settings, DEFAULT_CONFIG};
use icotest::device::Version;
use icotest::IcotestError;
use serial_test::serial;
use tempfile::TempDir;

fn write_config(directory: &TempDir, content: &str) -> PathBuf {
    let path = directory.path().join("config.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
#[serial]
fn test_explicit_file_overrides_defaults() {
    let directory = TempDir::new().unwrap();
    let path = write_config(
        &directory,
        r#"
[sensor_node]
name = "STH-42"

[node]
hardware_version = "1.5.0"

[power]
expected_milliwatts = 30.0
"#,
    );

    let settings = Settings::load_from(&path).unwrap();
    assert_eq!(settings.sensor_node.name, "STH-42");
    assert_eq!(settings.node.hardware_version, Version::new(1, 5, 0));
    assert_eq!(settings.power.expected_milliwatts, 30.0);
    // Untouched values keep their defaults
    assert_eq!(settings.power.tolerance_milliwatts, 10.0);
    assert_eq!(settings.commander.executable, "commander");
}

#[test]
#[serial]
fn test_environment_overrides_files() {
    let directory = TempDir::new().unwrap();
    let path = write_config(&directory, "[sensor_node]\nname = \"FromFile\"\n");

    std::env::set_var("ICOTEST_SENSOR_NODE__NAME", "FromEnv");
    let result = Settings::load_from(&path);
    std::env::remove_var("ICOTEST_SENSOR_NODE__NAME");

    assert_eq!(result.unwrap().sensor_node.name, "FromEnv");
}

#[test]
#[serial]
fn test_invalid_values_fail_fast() {
    let directory = TempDir::new().unwrap();

    let path = write_config(&directory, "[sensor_node]\nname = \"Much too long\"\n");
    assert!(matches!(
        Settings::load_from(&path),
        Err(IcotestError::Configuration(_))
    ));

    let path = write_config(&directory, "[sth.acceleration_sensor]\nsensor = \"ADXL356\"\n");
    let message = Settings::load_from(&path).unwrap_err().to_string();
    assert!(message.contains("Unknown acceleration sensor “ADXL356”"), "{message}");

    let path = write_config(&directory, "[node]\nfirmware_version = \"2.1\"\n");
    assert!(matches!(
        Settings::load_from(&path),
        Err(IcotestError::Config(_))
    ));
}

#[test]
#[serial]
fn test_new_acceleration_sensor_can_be_added() {
    let directory = TempDir::new().unwrap();
    let path = write_config(
        &directory,
        r#"
[sth.acceleration_sensor]
sensor = "ADXL356"

[acceleration_sensors.ADXL356.acceleration]
maximum = 80.0

[acceleration_sensors.ADXL356.self_test.voltage]
difference = 50.0
tolerance = 10.0
"#,
    );

    let settings = Settings::load_from(&path).unwrap();
    let sensor = settings.acceleration_sensor().unwrap();
    assert_eq!(sensor.acceleration.maximum, 80.0);
    assert_eq!(settings.acceleration_sensors.len(), 3);
}

#[test]
fn test_defaults_parse_as_toml() {
    let table: toml::Table = toml::from_str(DEFAULT_CONFIG).unwrap();
    assert!(table.contains_key("commander"));
    assert!(table.contains_key("logging"));
}
