//! Round trip checks of persisted fields addressed by name.

use std::sync::Arc;

use crate::error::{IcotestError, IcotestResult};
use crate::verification::accessors::AccessorTable;
use crate::verification::round_trip::verify_round_trip;
use crate::verification::value::{Comparison, FieldValue};

/// Runs round trip checks against one device
///
/// All fields share the same code path: the accessors are looked up by field
/// name, the written value must have the kind of the field and the read value
/// must have it too. A kind mismatch is reported as
/// [`IcotestError::KindMismatch`], never as a verification failure.
///
/// # Example
///
/// ```rust,ignore
/// let engine = VerificationEngine::new(node, AccessorTable::node(), &["GTIN"])?;
/// engine.verify("GTIN", 9120071480064_u64).await?;
/// ```
pub struct VerificationEngine<D: ?Sized> {
    device: Arc<D>,
    accessors: AccessorTable<D>,
}

impl<D: ?Sized + Send + Sync + 'static> VerificationEngine<D> {
    /// Create an engine for `device`
    ///
    /// # Errors
    /// Returns [`IcotestError::UnknownField`] if `accessors` lacks one of the
    /// `required` fields.
    pub fn new<S: AsRef<str>>(
        device: Arc<D>,
        accessors: AccessorTable<D>,
        required: &[S],
    ) -> IcotestResult<Self> {
        accessors.validate(required)?;
        Ok(Self { device, accessors })
    }

    /// Device under test
    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    /// Write `written` to `field_name` and require an identical read value
    pub async fn verify(
        &self,
        field_name: &str,
        written: impl Into<FieldValue>,
    ) -> IcotestResult<FieldValue> {
        self.verify_with(field_name, written, Comparison::Exact).await
    }

    /// Write `written` to `field_name` and compare the read value using `comparison`
    pub async fn verify_with(
        &self,
        field_name: &str,
        written: impl Into<FieldValue>,
        comparison: Comparison,
    ) -> IcotestResult<FieldValue> {
        let written = written.into();
        let accessor = self.accessors.get(field_name)?;
        let expected = accessor.kind();

        if written.kind() != expected {
            return Err(IcotestError::KindMismatch {
                field: field_name.to_string(),
                expected,
                actual: written.kind(),
            });
        }

        verify_round_trip(
            field_name,
            |value| accessor.write(self.device.clone(), value),
            || async {
                let read = accessor.read(self.device.clone()).await?;
                if read.kind() != expected {
                    return Err(IcotestError::KindMismatch {
                        field: field_name.to_string(),
                        expected,
                        actual: read.kind(),
                    });
                }
                Ok(read)
            },
            written,
            |written, read| comparison.matches(written, read),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockSth;
    use crate::device::{Axis, SthEeprom, Version};
    use crate::verification::value::ValueKind;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn engine(device: Arc<MockSth>) -> VerificationEngine<MockSth> {
        VerificationEngine::new(device, AccessorTable::sth(), &["GTIN"]).unwrap()
    }

    #[tokio::test]
    async fn in_memory_round_trips_succeed() {
        let engine = engine(Arc::new(MockSth::new()));
        engine.verify("GTIN", 9120071480064_u64).await.unwrap();
        engine.verify("hardware version", Version::new(1, 4, 0)).await.unwrap();
        engine.verify("name", "Test-STH").await.unwrap();
        engine
            .verify("sleep time 1", Duration::from_millis(300_000))
            .await
            .unwrap();
        engine
            .verify(
                "production date",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn corrupted_reads_fail_with_both_values() {
        let device = Arc::new(MockSth::new());
        device.corrupt_reads(true);
        let engine = engine(device);

        let message = engine
            .verify("release name", "Valerie")
            .await
            .unwrap_err()
            .to_string();
        assert_eq!(
            message,
            "Written release name \"Valerie\" does not match read release name \"Valerie?\""
        );

        let err = engine.verify("batch number", 1_u32).await.unwrap_err();
        assert!(matches!(err, IcotestError::Verification { .. }));
    }

    #[tokio::test]
    async fn float_fields_use_comparison() {
        let device = Arc::new(MockSth::new());
        let engine = engine(device.clone());
        let slope = 100.0 / 65535.0;

        assert!(engine.verify("acceleration slope y", slope).await.is_err());
        let read = engine
            .verify_with("acceleration slope y", slope, Comparison::SINGLE_PRECISION)
            .await
            .unwrap();
        let stored = device.read_acceleration_slope(Axis::Y).await.unwrap();
        assert_eq!(read, FieldValue::Float(stored));
    }

    #[tokio::test]
    async fn kind_mismatch_is_a_defect() {
        let device = Arc::new(MockSth::new());
        let engine = engine(device);
        let err = engine.verify("GTIN", "9120071480064").await.unwrap_err();
        assert!(matches!(
            err,
            IcotestError::KindMismatch {
                expected: ValueKind::Number,
                actual: ValueKind::Text,
                ..
            }
        ));
    }

    #[test]
    fn missing_accessors_fail_at_construction() {
        let result = VerificationEngine::new(
            Arc::new(MockSth::new()),
            AccessorTable::node(),
            &["GTIN", "acceleration slope x"],
        );
        assert!(matches!(result, Err(IcotestError::UnknownField { .. })));
    }
}
