//! Custom error types for the hardware checks.
//!
//! This module defines the primary error type, `IcotestError`, for the entire crate.
//! Using the `thiserror` crate, it provides a centralized and consistent way to report
//! everything that can go wrong while flashing, unlocking, measuring or verifying a
//! unit under test.
//!
//! ## Error Hierarchy
//!
//! - **`InvalidReason`**: An unregistered diagnostic key was requested for a command.
//!   This is a programming error and is raised before any process is launched.
//! - **`CommandFailed`**: Simplicity Commander returned a non-zero exit code. The message
//!   already contains the exit code, the captured output and the possible reasons.
//! - **`OutputMismatch`**: The command succeeded, but its output did not contain the
//!   expected pattern.
//! - **`InvalidFirmwareImage`**: A firmware image is missing or not a regular file. Checked
//!   before the hardware is touched.
//! - **`Verification`**: A value written to the EEPROM did not survive the round trip.
//! - **`PowerExtraction`** / **`ToleranceViolation`**: A measurement could not be obtained
//!   or lies outside the accepted range.
//!
//! Every variant renders as a message that can be shown to a test operator as is.

use std::path::PathBuf;

use thiserror::Error;

use crate::verification::tolerance::ToleranceViolation;
use crate::verification::value::ValueKind;

/// Convenience alias for results using the crate error type.
pub type IcotestResult<T> = std::result::Result<T, IcotestError>;

/// Why a firmware image was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProblem {
    /// Nothing exists at the given path
    Missing,
    /// The path exists but is a directory or another non-regular file
    NotAFile,
}

#[derive(Error, Debug)]
pub enum IcotestError {
    #[error("“{key}” is not a valid possible error reason")]
    InvalidReason { key: String },

    #[error("{message}")]
    CommandFailed { code: i32, message: String },

    #[error(
        "Output of Simplicity Commander command to {description}:\n{output}\n\
         did not match the expected regular expression “{pattern}”"
    )]
    OutputMismatch {
        description: String,
        output: String,
        pattern: String,
    },

    #[error("{}", image_message(.path, .problem))]
    InvalidFirmwareImage { path: PathBuf, problem: ImageProblem },

    #[error("Written {field} \"{written}\" does not match read {field} \"{read}\"")]
    Verification {
        field: String,
        written: String,
        read: String,
    },

    #[error("Field “{field}” holds {expected} values, but {actual} value was supplied")]
    KindMismatch {
        field: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("No EEPROM accessors registered for field “{name}”")]
    UnknownField { name: String },

    #[error("Unable to extract power usage from Simplicity Commander output:\n{output}")]
    PowerExtraction { output: String },

    #[error("{0}")]
    ToleranceViolation(ToleranceViolation),

    #[error("Invalid measurement window of {seconds} seconds")]
    InvalidWindow { seconds: f64 },

    #[error("Unable to start “{program}”: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Device communication failed: {0}")]
    Device(String),

    #[error("Data stream ended before the power measurement was finished")]
    StreamEnded,

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Incorrect configuration: {0}")]
    Configuration(String),

    #[error("Unable to load configuration: {0}")]
    Config(#[from] figment::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn image_message(path: &std::path::Path, problem: &ImageProblem) -> String {
    match problem {
        ImageProblem::Missing => format!("Firmware file “{}” does not exist", path.display()),
        ImageProblem::NotAFile => format!("“{}” is not a file", path.display()),
    }
}

impl From<anyhow::Error> for IcotestError {
    fn from(err: anyhow::Error) -> Self {
        IcotestError::Device(format!("{err:#}"))
    }
}

impl From<ToleranceViolation> for IcotestError {
    fn from(violation: ToleranceViolation) -> Self {
        IcotestError::ToleranceViolation(violation)
    }
}

impl From<tokio::task::JoinError> for IcotestError {
    fn from(err: tokio::task::JoinError) -> Self {
        IcotestError::Task(err.to_string())
    }
}
