//! Measurement sample types shared between the command wrapper and the checks.
//!
//! A `MeasurementSample` is produced by a measurement operation (power usage
//! read through Simplicity Commander, supply voltage read from a sensor node, ...)
//! and consumed right away by a [`ToleranceCheck`](crate::verification::tolerance::ToleranceCheck).

use std::fmt;
use std::time::Duration;

/// Physical unit of a measured value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Unit {
    /// Volts
    Volts,
    /// Millivolts
    Millivolts,
    /// Milliwatts
    Milliwatts,
    /// Multiples of the standard gravity
    GUnits,
}

impl Unit {
    /// Number of decimals used when a value of this unit is shown to an operator
    pub fn precision(self) -> usize {
        match self {
            Unit::Volts => 3,
            Unit::Millivolts => 2,
            Unit::Milliwatts => 3,
            Unit::GUnits => 3,
        }
    }

    /// Format `value` with the unit symbol and the unit specific precision
    pub fn format(self, value: f64) -> String {
        format!("{:.*} {}", self.precision(), value, self)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Unit::Volts => "V",
            Unit::Millivolts => "mV",
            Unit::Milliwatts => "mW",
            Unit::GUnits => "g",
        };
        f.write_str(symbol)
    }
}

/// Span over which a sample was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleWindow {
    /// Averaged over a time window
    Duration(Duration),
    /// Averaged over a number of readings
    Count(usize),
    /// A single reading
    Single,
}

/// A measured value together with its unit and acquisition window.
///
/// # Fields
/// * `value` - Measured numerical value
/// * `unit` - Physical unit of `value`
/// * `window` - Span the value was obtained over
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeasurementSample {
    /// Measured value
    pub value: f64,
    /// Unit of the value
    pub unit: Unit,
    /// Acquisition window
    pub window: SampleWindow,
}

impl MeasurementSample {
    /// Create a sample from a single reading
    pub fn single(value: f64, unit: Unit) -> Self {
        Self {
            value,
            unit,
            window: SampleWindow::Single,
        }
    }

    /// Create a sample averaged over a time window
    pub fn over(value: f64, unit: Unit, window: Duration) -> Self {
        Self {
            value,
            unit,
            window: SampleWindow::Duration(window),
        }
    }
}

impl fmt::Display for MeasurementSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.unit.format(self.value))?;
        match self.window {
            SampleWindow::Duration(window) => write!(f, " over {} ms", window.as_millis()),
            SampleWindow::Count(count) => write!(f, " over {count} readings"),
            SampleWindow::Single => Ok(()),
        }
    }
}
