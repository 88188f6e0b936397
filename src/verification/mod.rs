//! Verification of persisted fields and physical measurements
//!
//! Two kinds of checks are supported:
//!
//! - **Round trip checks** ([`engine`], [`round_trip`]): a value is written to
//!   the EEPROM of a node, read back and compared, either exactly or (for
//!   floating point values) within single precision bounds.
//! - **Tolerance checks** ([`tolerance`]): a measured value must lie in
//!   `expected ± tolerance`; violations name the bound and the distance to it.
//!
//! Persisted fields are addressed by name through an [`AccessorTable`] built
//! once per device type.

pub mod accessors;
pub mod engine;
pub mod round_trip;
pub mod tolerance;
pub mod value;

pub use accessors::{accessor_key, AccessorTable};
pub use engine::VerificationEngine;
pub use round_trip::{close, exact, verify_round_trip};
pub use tolerance::{within_tolerance, Bound, ToleranceCheck, ToleranceViolation};
pub use value::{Comparison, FieldValue, ValueKind};
