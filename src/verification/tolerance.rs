//! Range checks for physical measurements.
//!
//! Measurements are never expected to match exactly. A [`ToleranceCheck`]
//! accepts every value in `expected ± tolerance` (both bounds inclusive) and
//! reports the violated bound together with the distance to it otherwise.

use std::fmt;

use tracing::{debug, warn};

use crate::error::{IcotestError, IcotestResult};
use crate::measurement_types::{MeasurementSample, Unit};

/// Whether `measured` lies in `expected ± tolerance`, bounds included
pub fn within_tolerance(measured: f64, expected: f64, tolerance: f64) -> bool {
    expected - tolerance <= measured && measured <= expected + tolerance
}

/// Bound of an accepted range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// `expected - tolerance`
    Lower,
    /// `expected + tolerance`
    Upper,
}

/// A measurement outside of its accepted range
#[derive(Debug, Clone, PartialEq)]
pub struct ToleranceViolation {
    /// Measured quantity, e.g. `Supply voltage`
    pub quantity: String,
    /// Unit of all values
    pub unit: Unit,
    /// Measured value
    pub measured: f64,
    /// Violated bound
    pub bound: Bound,
    /// Value of the violated bound
    pub limit: f64,
    /// Distance between measured value and bound
    pub excess: f64,
    /// Likely cause shown below the message
    pub hint: Option<String>,
}

impl fmt::Display for ToleranceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (relation, bound) = match self.bound {
            Bound::Lower => ("lower than", "minimum"),
            Bound::Upper => ("greater than", "maximum"),
        };
        if self.measured.is_nan() {
            write!(f, "{} could not be measured (NaN)", self.quantity)?;
        } else {
            write!(
                f,
                "{} of {} is {relation} expected {bound} of {} by {}",
                self.quantity,
                self.unit.format(self.measured),
                self.unit.format(self.limit),
                self.unit.format(self.excess),
            )?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n{hint}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ToleranceViolation {}

/// Accepted range of a measured quantity
#[derive(Debug, Clone, PartialEq)]
pub struct ToleranceCheck {
    quantity: String,
    unit: Unit,
    expected: f64,
    tolerance: f64,
    hint: Option<String>,
}

impl ToleranceCheck {
    /// Accept `expected ± tolerance` for `quantity`
    pub fn new(quantity: impl Into<String>, unit: Unit, expected: f64, tolerance: f64) -> Self {
        Self {
            quantity: quantity.into(),
            unit,
            expected,
            tolerance,
            hint: None,
        }
    }

    /// Show `hint` as likely cause of a violation
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Lowest accepted value
    pub fn minimum(&self) -> f64 {
        self.expected - self.tolerance
    }

    /// Highest accepted value
    pub fn maximum(&self) -> f64 {
        self.expected + self.tolerance
    }

    /// Check a measured value
    ///
    /// # Errors
    /// Returns the violation if `measured` lies outside the accepted range.
    /// `NaN` always violates the lower bound.
    pub fn check(&self, measured: f64) -> Result<(), ToleranceViolation> {
        if within_tolerance(measured, self.expected, self.tolerance) {
            debug!(
                "{} of {} within {} ± {}",
                self.quantity,
                self.unit.format(measured),
                self.unit.format(self.expected),
                self.unit.format(self.tolerance)
            );
            return Ok(());
        }

        let (bound, limit) = if measured > self.maximum() {
            (Bound::Upper, self.maximum())
        } else {
            (Bound::Lower, self.minimum())
        };
        let violation = ToleranceViolation {
            quantity: self.quantity.clone(),
            unit: self.unit,
            measured,
            bound,
            limit,
            excess: (measured - limit).abs(),
            hint: self.hint.clone(),
        };
        warn!("{violation}");
        Err(violation)
    }

    /// Check a measurement sample
    ///
    /// # Errors
    /// Returns [`IcotestError::ToleranceViolation`] for values out of range and
    /// [`IcotestError::Configuration`] for samples in a different unit.
    pub fn check_sample(&self, sample: &MeasurementSample) -> IcotestResult<()> {
        if sample.unit != self.unit {
            return Err(IcotestError::Configuration(format!(
                "{} is checked in {}, but was measured in {}",
                self.quantity, self.unit, sample.unit
            )));
        }
        Ok(self.check(sample.value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        assert!(within_tolerance(50.0, 50.0, 10.0));
        assert!(!within_tolerance(61.0, 50.0, 10.0));
        assert!(!within_tolerance(39.9, 50.0, 10.0));
        assert!(within_tolerance(60.0, 50.0, 10.0));
        assert!(within_tolerance(40.0, 50.0, 10.0));
        assert!(!within_tolerance(f64::NAN, 50.0, 10.0));
    }

    #[test]
    fn upper_violation_reports_maximum() {
        let check = ToleranceCheck::new("Power usage", Unit::Milliwatts, 50.0, 10.0);
        let violation = check.check(61.5).unwrap_err();
        assert_eq!(violation.bound, Bound::Upper);
        assert_eq!(violation.limit, 60.0);
        assert_eq!(violation.excess, 1.5);
        assert_eq!(
            violation.to_string(),
            "Power usage of 61.500 mW is greater than expected maximum of 60.000 mW by 1.500 mW"
        );
    }

    #[test]
    fn lower_violation_reports_minimum() {
        let check = ToleranceCheck::new("Supply voltage", Unit::Volts, 3.3, 0.2);
        let violation = check.check(3.0).unwrap_err();
        assert_eq!(violation.bound, Bound::Lower);
        assert!((violation.limit - 3.1).abs() < 1e-12);
        assert!(violation.to_string().contains("lower than expected minimum of 3.100 V"));
    }

    #[test]
    fn hint_is_appended() {
        let check = ToleranceCheck::new("Self test voltage difference", Unit::Millivolts, 70.0, 20.0)
            .with_hint("Possible Reason: acceleration sensor config value “ADXL1002” is incorrect");
        let message = check.check(5.0).unwrap_err().to_string();
        assert!(message.ends_with("“ADXL1002” is incorrect"), "{message}");
    }

    #[test]
    fn sample_unit_must_match() {
        let check = ToleranceCheck::new("Supply voltage", Unit::Volts, 3.3, 0.2);
        assert!(check
            .check_sample(&MeasurementSample::single(3.3, Unit::Volts))
            .is_ok());
        assert!(matches!(
            check.check_sample(&MeasurementSample::single(3300.0, Unit::Millivolts)),
            Err(IcotestError::Configuration(_))
        ));
        assert!(matches!(
            check.check_sample(&MeasurementSample::single(2.0, Unit::Volts)),
            Err(IcotestError::ToleranceViolation(_))
        ));
    }
}
