//! Possible reasons for a failed Simplicity Commander command.
//!
//! The catalog is built once and never changes afterwards. Commands name the
//! reasons that apply to them by key; every key is checked against the catalog
//! before the command runs, so a misspelled key fails loudly instead of hiding
//! the real failure.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{IcotestError, IcotestResult};

/// The programming board is not plugged into the computer
pub const PROGRAMMER_NOT_CONNECTED: &str = "programmer not connected";

/// The programming board is not attached to the unit under test
pub const DEVICE_NOT_CONNECTED: &str = "device not connected";

static STANDARD: Lazy<ErrorReasonCatalog> = Lazy::new(|| {
    ErrorReasonCatalog::from_entries([
        (
            PROGRAMMER_NOT_CONNECTED,
            "Programming board is not connected to computer",
        ),
        (
            DEVICE_NOT_CONNECTED,
            "Programming board is not connected to device",
        ),
    ])
});

/// Read-only mapping from reason keys to operator readable explanations.
#[derive(Debug, Clone)]
pub struct ErrorReasonCatalog {
    reasons: HashMap<&'static str, &'static str>,
}

impl ErrorReasonCatalog {
    /// The process wide catalog used by the command runner
    pub fn standard() -> &'static ErrorReasonCatalog {
        &STANDARD
    }

    fn from_entries<const N: usize>(entries: [(&'static str, &'static str); N]) -> Self {
        Self {
            reasons: entries.into_iter().collect(),
        }
    }

    /// Look up the explanation for `key`
    ///
    /// # Errors
    /// Returns [`IcotestError::InvalidReason`] if `key` is not registered.
    pub fn lookup(&self, key: &str) -> IcotestResult<&'static str> {
        self.reasons
            .get(key)
            .copied()
            .ok_or_else(|| IcotestError::InvalidReason {
                key: key.to_string(),
            })
    }

    /// Check that every key in `keys` is registered
    pub fn validate<S: AsRef<str>>(&self, keys: &[S]) -> IcotestResult<()> {
        keys.iter()
            .try_for_each(|key| self.lookup(key.as_ref()).map(|_| ()))
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.reasons.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_reasons_have_text() {
        let catalog = ErrorReasonCatalog::standard();
        for key in catalog.keys() {
            let text = catalog.lookup(key).unwrap();
            assert!(!text.is_empty(), "{key}");
        }
        assert_eq!(
            catalog.lookup(DEVICE_NOT_CONNECTED).unwrap(),
            "Programming board is not connected to device"
        );
    }

    #[test]
    fn unknown_reason_is_rejected() {
        let catalog = ErrorReasonCatalog::standard();
        for key in ["programmer disconnected", "", "Device not connected"] {
            let err = catalog.lookup(key).unwrap_err();
            assert!(matches!(err, IcotestError::InvalidReason { .. }), "{key}");
        }
    }

    #[test]
    fn validate_stops_at_first_unknown_key() {
        let catalog = ErrorReasonCatalog::standard();
        assert!(catalog
            .validate(&[PROGRAMMER_NOT_CONNECTED, DEVICE_NOT_CONNECTED])
            .is_ok());

        let err = catalog
            .validate(&[PROGRAMMER_NOT_CONNECTED, "programer not connected"])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "“programer not connected” is not a valid possible error reason"
        );
    }
}
