//! Support code for the Simplicity Commander command line tool
//!
//! Simplicity Commander flashes firmware through the programming board and
//! measures the power usage of the attached hardware. Everything this crate
//! does with the tool goes through [`CommandRunner`], which owns process
//! invocation, exit code interpretation and output matching.
//!
//! ## Module Structure
//!
//! - **`return_code`**: Signed exit codes regardless of the host platform
//! - **`reasons`**: Catalog of possible error reasons shown on failure
//! - **`extract`**: Pattern extraction from command output
//! - **`path`**: Search path augmentation for the executable
//! - **`runner`**: Process invocation and result interpretation
//! - **`debug`**, **`firmware`**, **`power`**: Operations of [`Commander`]
//! - **`mock`**: Scripted launcher for tests without a programming board
//!
//! # Example
//!
//! ```no_run
//! use icotest::commander::Commander;
//! use icotest::config::Settings;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load()?;
//! let commander = Commander::from_settings(&settings.commander)?;
//! commander.upload_flash(&settings.commander.chip, &["firmware/bootloader.s37", "firmware/sth.hex"])?;
//! println!("Power usage: {} mW", commander.read_power_usage(1.0)?);
//! # Ok(())
//! # }
//! ```

pub mod debug;
pub mod extract;
pub mod firmware;
pub mod mock;
pub mod path;
pub mod power;
pub mod reasons;
pub mod return_code;
pub mod runner;

pub use extract::{extract, Extracted};
pub use path::ensure_executable_discoverable;
pub use reasons::{ErrorReasonCatalog, DEVICE_NOT_CONNECTED, PROGRAMMER_NOT_CONNECTED};
pub use return_code::{normalize_return_code, Platform};
pub use runner::{
    CommandOutput, CommandRunner, Invocation, ProcessLauncher, ProcessOutput, SystemLauncher,
};

use crate::config::CommanderSettings;
use crate::error::IcotestResult;

/// Wrapper for the Simplicity Commander command line tool
pub struct Commander<L = SystemLauncher> {
    runner: CommandRunner<L>,
}

impl Commander<SystemLauncher> {
    /// Create a wrapper for the configured executable
    ///
    /// Adds the installation directories configured for the current platform
    /// to `PATH`.
    pub fn from_settings(settings: &CommanderSettings) -> IcotestResult<Self> {
        let directories = settings.path.for_platform(Platform::current());
        Ok(Self::with_runner(CommandRunner::new(
            settings.executable.clone(),
            directories,
        )?))
    }
}

impl<L: ProcessLauncher> Commander<L> {
    /// Create a wrapper around an existing runner
    pub fn with_runner(runner: CommandRunner<L>) -> Self {
        Self { runner }
    }

    /// Runner used for all commands
    pub fn runner(&self) -> &CommandRunner<L> {
        &self.runner
    }
}
