//! # ICOtest Core Library
//!
//! This crate checks assembled ICOtronic hardware (STU, sensor nodes, STH).
//! It flashes firmware through Simplicity Commander, writes product data to
//! the EEPROM of a node and reads it back, and compares physical measurements
//! (supply voltage, self test voltages, power usage) against expected values.
//! The command line tool (`main.rs`) is a thin frontend over this library.
//!
//! ## Crate Structure
//!
//! - **`commander`**: Wrapper around the Simplicity Commander command line tool. Handles
//!   process invocation, platform dependent exit codes, output extraction and the
//!   possible error reasons shown on failure. Provides debug mode, unlock, flash and
//!   power measurement operations.
//! - **`config`**: Strongly-typed settings loaded with `figment` from built-in defaults,
//!   the user configuration file and `ICOTEST_` environment variables.
//! - **`device`**: Capability traits of the device communication library the checks
//!   depend on, plus in-memory mock devices.
//! - **`error`**: Defines the `IcotestError` enum for centralized error handling.
//! - **`logging`**: `tracing` subscriber setup.
//! - **`measurement_types`**: Measured values with unit and acquisition window.
//! - **`verification`**: Round trip checks of persisted fields and tolerance checks of
//!   measurements.
//! - **`streaming`**: Power measurement while a sensor node streams data.
//! - **`checks`**: The individual hardware checks built on the modules above.

pub mod checks;
pub mod commander;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod measurement_types;
pub mod streaming;
pub mod verification;

pub use error::{IcotestError, IcotestResult};
