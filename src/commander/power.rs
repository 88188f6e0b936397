//! Power usage measurement through the Advanced Energy Monitor of the programming board.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::commander::reasons::PROGRAMMER_NOT_CONNECTED;
use crate::commander::runner::{Invocation, ProcessLauncher};
use crate::commander::Commander;
use crate::error::{IcotestError, IcotestResult};
use crate::measurement_types::{MeasurementSample, Unit};

/// Pattern of the power line printed by `aem measure`
pub const POWER_PATTERN: &str = r"Power\s*\[mW\]\s*:\s*(?P<milliwatts>\d+\.\d+)";

#[allow(clippy::expect_used)]
static POWER: Lazy<Regex> = Lazy::new(|| Regex::new(POWER_PATTERN).expect("valid power pattern"));

/// Convert a window length in seconds to whole milliseconds
fn window_milliseconds(seconds: f64) -> IcotestResult<u64> {
    let milliseconds = (seconds * 1000.0).round();
    if !milliseconds.is_finite() || milliseconds < 1.0 || milliseconds > u64::MAX as f64 {
        return Err(IcotestError::InvalidWindow { seconds });
    }
    Ok(milliseconds as u64)
}

impl<L: ProcessLauncher> Commander<L> {
    /// Read the power usage of the connected hardware
    ///
    /// # Arguments
    /// * `seconds` - Length of the measurement window
    ///
    /// # Returns
    /// The average power usage over the window in milliwatts
    ///
    /// # Errors
    /// Returns [`IcotestError::PowerExtraction`] if the output of the tool does
    /// not contain a power value.
    pub fn read_power_usage(&self, seconds: f64) -> IcotestResult<f64> {
        let window = window_milliseconds(seconds)?;

        let output = self
            .runner()
            .run(
                Invocation::new(
                    "read power usage",
                    [
                        "aem".to_string(),
                        "measure".to_string(),
                        "--windowlength".to_string(),
                        window.to_string(),
                    ],
                )
                .with_reasons([PROGRAMMER_NOT_CONNECTED])
                .expect_output(POWER.clone()),
            )
            .map_err(|err| match err {
                IcotestError::OutputMismatch { output, .. } => {
                    IcotestError::PowerExtraction { output }
                }
                other => other,
            })?;

        let text = output
            .extracted
            .as_ref()
            .and_then(|extracted| extracted.get("milliwatts"))
            .ok_or_else(|| IcotestError::PowerExtraction {
                output: output.stdout.clone(),
            })?;
        let milliwatts = text
            .parse::<f64>()
            .map_err(|_| IcotestError::PowerExtraction {
                output: output.stdout.clone(),
            })?;

        info!("Power usage: {milliwatts} mW over {window} ms");
        Ok(milliwatts)
    }

    /// Read the power usage as a measurement sample
    pub fn power_sample(&self, seconds: f64) -> IcotestResult<MeasurementSample> {
        let window = Duration::from_millis(window_milliseconds(seconds)?);
        let milliwatts = self.read_power_usage(seconds)?;
        Ok(MeasurementSample::over(milliwatts, Unit::Milliwatts, window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commander::mock::MockLauncher;
    use crate::commander::CommandRunner;

    fn commander(launcher: MockLauncher) -> Commander<MockLauncher> {
        Commander::with_runner(CommandRunner::with_launcher("commander", &[], launcher).unwrap())
    }

    #[test]
    fn window_is_rounded_to_milliseconds() {
        assert_eq!(window_milliseconds(1.0).unwrap(), 1000);
        assert_eq!(window_milliseconds(0.0015).unwrap(), 2);
        assert_eq!(window_milliseconds(2.5).unwrap(), 2500);
        assert!(window_milliseconds(0.0).is_err());
        assert!(window_milliseconds(-1.0).is_err());
        assert!(window_milliseconds(f64::NAN).is_err());
    }

    #[test]
    fn measurement_command_uses_window() {
        let commander = commander(MockLauncher::new().respond(0, "Power [mW] : 12.500", ""));
        let milliwatts = commander.read_power_usage(0.5).unwrap();
        assert_eq!(milliwatts, 12.5);

        let calls = commander.runner().launcher().calls();
        assert_eq!(calls[0].arguments, ["aem", "measure", "--windowlength", "500"]);
    }

    #[test]
    fn missing_power_line_is_extraction_error() {
        let commander = commander(MockLauncher::new().respond(0, "Current [mA] : 1.000", ""));
        let err = commander.read_power_usage(1.0).unwrap_err();
        assert!(matches!(err, IcotestError::PowerExtraction { .. }));
        assert!(err.to_string().starts_with("Unable to extract power usage"));
    }

    #[test]
    fn sample_records_window() {
        let commander = commander(MockLauncher::new().respond(0, "Power [mW] : 45.230", ""));
        let sample = commander.power_sample(1.0).unwrap();
        assert_eq!(sample.value, 45.23);
        assert_eq!(sample.unit, Unit::Milliwatts);
        assert_eq!(
            sample.window,
            crate::measurement_types::SampleWindow::Duration(Duration::from_secs(1))
        );
    }
}
