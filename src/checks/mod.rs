//! Hardware checks
//!
//! Each check is a short sequence of calls into the verification core:
//!
//! - **`node`**: EEPROM product data shared by all nodes (STU and sensor nodes)
//! - **`sensor_node`**: name, Bluetooth timing, supply voltage and power usage
//!   of sensor nodes
//! - **`sth`**: acceleration sensor self test and calibration constants of the STH
//!
//! Round trip checks run on a [`VerificationEngine`](crate::verification::VerificationEngine).
//! Every module exports the names of the fields it needs (`FIELDS`), so an
//! engine can be validated against them before the first check runs.

pub mod node;
pub mod sensor_node;
pub mod sth;
