//! Checks for the STH (sensory tool holder).

use tracing::info;

use crate::config::{AccelerationSensorSettings, Settings};
use crate::device::{Axis, SelfTestVoltages, Sth};
use crate::error::IcotestResult;
use crate::measurement_types::Unit;
use crate::verification::{Comparison, ToleranceCheck, VerificationEngine};

/// Largest raw value of the analog digital converter
pub const ADC_MAX: u16 = 0xFFFF;

/// Fields written by the checks of this module
pub const FIELDS: [&str; 6] = [
    "acceleration slope x",
    "acceleration offset x",
    "acceleration slope y",
    "acceleration offset y",
    "acceleration slope z",
    "acceleration offset z",
];

/// Calibration constants of an acceleration sensor
///
/// Returns the slope converting raw ADC values into multiples of g and the
/// offset of the (symmetric) measurement range.
pub fn acceleration_calibration(sensor: &AccelerationSensorSettings) -> (f64, f64) {
    let maximum = sensor.acceleration.maximum;
    (maximum / f64::from(ADC_MAX), -(maximum / 2.0))
}

/// Use the self test of the acceleration sensor to check for problems
///
/// The sensor output before and after the self test must not drift by more
/// than the tolerance. The change caused by the self test must match the
/// value configured for the fitted sensor.
pub async fn check_acceleration_sensor_self_test<S>(
    sth: &S,
    settings: &Settings,
) -> IcotestResult<SelfTestVoltages>
where
    S: Sth + ?Sized,
{
    let voltages = sth.self_test_voltages().await?;
    let sensor_name = &settings.sth.acceleration_sensor.sensor;
    let expected = settings.acceleration_sensor()?.self_test.voltage;

    ToleranceCheck::new(
        "Voltage difference before and after self test",
        Unit::Millivolts,
        0.0,
        expected.tolerance,
    )
    .check(voltages.drift())?;

    ToleranceCheck::new(
        "Self test voltage difference",
        Unit::Millivolts,
        expected.difference,
        expected.tolerance,
    )
    .with_hint(format!(
        "\nPossible Reason:\n\n• Acceleration sensor config value “{sensor_name}” is incorrect"
    ))
    .check(voltages.difference())?;

    info!(
        "Self test voltage difference: {}",
        Unit::Millivolts.format(voltages.difference())
    );
    Ok(voltages)
}

/// Check that the acceleration calibration constants survive a round trip
///
/// The EEPROM stores the constants with single precision, so the read values
/// only have to be close to the written ones.
pub async fn check_eeprom_acceleration<D>(
    engine: &VerificationEngine<D>,
    settings: &Settings,
) -> IcotestResult<()>
where
    D: ?Sized + Send + Sync + 'static,
{
    let (slope, offset) = acceleration_calibration(settings.acceleration_sensor()?);

    for axis in Axis::ALL {
        engine
            .verify_with(
                &format!("acceleration slope {axis}"),
                slope,
                Comparison::SINGLE_PRECISION,
            )
            .await?;
        engine
            .verify_with(
                &format!("acceleration offset {axis}"),
                offset,
                Comparison::SINGLE_PRECISION,
            )
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CONFIG;
    use crate::device::mock::MockSth;
    use crate::device::SthEeprom;
    use crate::verification::AccessorTable;
    use figment::providers::{Format, Toml};
    use figment::Figment;
    use std::sync::Arc;

    fn settings() -> Settings {
        Figment::new()
            .merge(Toml::string(DEFAULT_CONFIG))
            .extract()
            .unwrap()
    }

    fn voltages(before: f64, during: f64, after: f64) -> SelfTestVoltages {
        SelfTestVoltages {
            before,
            during,
            after,
        }
    }

    #[test]
    fn calibration_follows_sensor_range() {
        let settings = settings();
        let (slope, offset) = acceleration_calibration(settings.acceleration_sensor().unwrap());
        assert_eq!(slope, 100.0 / 65535.0);
        assert_eq!(offset, -50.0);
    }

    #[tokio::test]
    async fn self_test_within_expectations() {
        let sth = MockSth::new().with_self_test(voltages(1650.0, 1720.0, 1651.0));
        let measured = check_acceleration_sensor_self_test(&sth, &settings())
            .await
            .unwrap();
        assert_eq!(measured.difference(), 70.0);
    }

    #[tokio::test]
    async fn self_test_drift_is_limited() {
        let sth = MockSth::new().with_self_test(voltages(1650.0, 1720.0, 1680.0));
        let message = check_acceleration_sensor_self_test(&sth, &settings())
            .await
            .unwrap_err()
            .to_string();
        assert!(message.starts_with("Voltage difference before and after self test"), "{message}");
    }

    #[tokio::test]
    async fn wrong_sensor_is_hinted() {
        let sth = MockSth::new().with_self_test(voltages(1650.0, 1660.0, 1650.0));
        let message = check_acceleration_sensor_self_test(&sth, &settings())
            .await
            .unwrap_err()
            .to_string();
        assert!(message.contains("lower than expected minimum of 50.00 mV"), "{message}");
        assert!(message.contains("config value “ADXL1002” is incorrect"), "{message}");
    }

    #[tokio::test]
    async fn calibration_constants_are_stored() {
        let sth = Arc::new(MockSth::new());
        let engine = VerificationEngine::new(sth.clone(), AccessorTable::sth(), &FIELDS).unwrap();
        check_eeprom_acceleration(&engine, &settings()).await.unwrap();
        assert_eq!(sth.read_acceleration_offset(Axis::Z).await.unwrap(), -50.0);
    }
}
