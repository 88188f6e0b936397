//! Typed values flowing through round trip checks.

use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;

use crate::device::Version;

/// Value of a persisted field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Free text (names, serial numbers)
    Text(String),
    /// Unsigned integer (GTIN, batch number)
    Number(u64),
    /// Hardware or firmware version
    Version(Version),
    /// Time span (Bluetooth timing)
    Duration(Duration),
    /// Floating point value (calibration constants)
    Float(f64),
    /// Calendar date
    Date(NaiveDate),
}

/// Semantic type of a [`FieldValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`FieldValue::Text`]
    Text,
    /// [`FieldValue::Number`]
    Number,
    /// [`FieldValue::Version`]
    Version,
    /// [`FieldValue::Duration`]
    Duration,
    /// [`FieldValue::Float`]
    Float,
    /// [`FieldValue::Date`]
    Date,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Text => "text",
            ValueKind::Number => "number",
            ValueKind::Version => "version",
            ValueKind::Duration => "duration",
            ValueKind::Float => "floating point",
            ValueKind::Date => "date",
        })
    }
}

impl FieldValue {
    /// Semantic type of the value
    pub fn kind(&self) -> ValueKind {
        match self {
            FieldValue::Text(_) => ValueKind::Text,
            FieldValue::Number(_) => ValueKind::Number,
            FieldValue::Version(_) => ValueKind::Version,
            FieldValue::Duration(_) => ValueKind::Duration,
            FieldValue::Float(_) => ValueKind::Float,
            FieldValue::Date(_) => ValueKind::Date,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Number(number) => write!(f, "{number}"),
            FieldValue::Version(version) => write!(f, "{version}"),
            FieldValue::Duration(duration) => write!(f, "{} ms", duration.as_millis()),
            FieldValue::Float(value) => write!(f, "{value}"),
            FieldValue::Date(date) => write!(f, "{date}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<u64> for FieldValue {
    fn from(number: u64) -> Self {
        FieldValue::Number(number)
    }
}

impl From<u32> for FieldValue {
    fn from(number: u32) -> Self {
        FieldValue::Number(u64::from(number))
    }
}

impl From<Version> for FieldValue {
    fn from(version: Version) -> Self {
        FieldValue::Version(version)
    }
}

impl From<Duration> for FieldValue {
    fn from(duration: Duration) -> Self {
        FieldValue::Duration(duration)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(date: NaiveDate) -> Self {
        FieldValue::Date(date)
    }
}

/// How a read value is compared with the written one
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Comparison {
    /// Values must be equal
    #[default]
    Exact,
    /// Floating point values must agree within the given bounds
    Close {
        /// Maximum difference relative to the larger magnitude
        relative: f64,
        /// Maximum absolute difference (for values near zero)
        absolute: f64,
    },
}

impl Comparison {
    /// Closeness for values stored with single precision
    pub const SINGLE_PRECISION: Comparison = Comparison::Close {
        relative: 1e-6,
        absolute: 1e-9,
    };

    /// Compare two values of the same kind
    ///
    /// `Close` only relaxes the comparison of floating point values; every
    /// other kind is compared exactly.
    pub fn matches(&self, written: &FieldValue, read: &FieldValue) -> bool {
        match (self, written, read) {
            (
                Comparison::Close { relative, absolute },
                FieldValue::Float(written),
                FieldValue::Float(read),
            ) => is_close(*written, *read, *relative, *absolute),
            _ => written == read,
        }
    }
}

/// Whether `a` and `b` differ by at most the relative or the absolute bound
pub fn is_close(a: f64, b: f64, relative: f64, absolute: f64) -> bool {
    if a == b {
        return true;
    }
    let difference = (a - b).abs();
    difference <= (relative * a.abs().max(b.abs())).max(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(FieldValue::from("STH").kind(), ValueKind::Text);
        assert_eq!(FieldValue::from(42_u64).kind(), ValueKind::Number);
        assert_eq!(
            FieldValue::from(Duration::from_millis(5)).kind(),
            ValueKind::Duration
        );
        assert_eq!(ValueKind::Float.to_string(), "floating point");
    }

    #[test]
    fn display_is_operator_readable() {
        assert_eq!(FieldValue::from(Version::new(1, 4, 0)).to_string(), "1.4.0");
        assert_eq!(
            FieldValue::from(Duration::from_millis(1250)).to_string(),
            "1250 ms"
        );
        assert_eq!(FieldValue::from("Valerie").to_string(), "Valerie");
    }

    #[test]
    fn close_comparison_tolerates_single_precision() {
        let slope = 100.0 / 65535.0;
        let stored = f64::from(slope as f32);
        let written = FieldValue::Float(slope);
        let read = FieldValue::Float(stored);

        assert!(!Comparison::Exact.matches(&written, &read));
        assert!(Comparison::SINGLE_PRECISION.matches(&written, &read));
        assert!(!Comparison::SINGLE_PRECISION.matches(&written, &FieldValue::Float(slope * 1.01)));
    }

    #[test]
    fn close_comparison_is_exact_for_other_kinds() {
        let comparison = Comparison::SINGLE_PRECISION;
        assert!(comparison.matches(&FieldValue::from(1_u64), &FieldValue::from(1_u64)));
        assert!(!comparison.matches(&FieldValue::from(1_u64), &FieldValue::from(2_u64)));
    }

    #[test]
    fn absolute_bound_near_zero() {
        assert!(is_close(0.0, 1e-10, 1e-6, 1e-9));
        assert!(!is_close(0.0, 1e-8, 1e-6, 1e-9));
    }
}
