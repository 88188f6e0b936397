//! Debug routing and chip unlocking.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::commander::reasons::{DEVICE_NOT_CONNECTED, PROGRAMMER_NOT_CONNECTED};
use crate::commander::runner::{Invocation, ProcessLauncher};
use crate::commander::Commander;
use crate::error::IcotestResult;

#[allow(clippy::expect_used)]
static DEBUG_MODE_SET: Lazy<Regex> =
    Lazy::new(|| Regex::new("Setting debug mode to OUT").expect("valid debug mode pattern"));

#[allow(clippy::expect_used)]
static CHIP_UNLOCKED: Lazy<Regex> =
    Lazy::new(|| Regex::new("Chip successfully unlocked").expect("valid unlock pattern"));

impl<L: ProcessLauncher> Commander<L> {
    /// Enable debug mode for the external device
    ///
    /// Routes the debug interface of the programming board to the debug
    /// cable, so the attached node is programmed instead of the board's own
    /// microcontroller.
    pub fn enable_debug_mode(&self) -> IcotestResult<()> {
        self.runner().run(
            Invocation::new("enable debug mode", ["adapter", "dbgmode", "OUT"])
                .with_reasons([PROGRAMMER_NOT_CONNECTED])
                .expect_output(DEBUG_MODE_SET.clone()),
        )?;
        Ok(())
    }

    /// Unlock the device for debugging
    ///
    /// **Warning:** unlocking erases the flash of the device.
    ///
    /// # Arguments
    /// * `chip` - Identifier of the chip on the PCB, e.g. “BGM121A256V2”
    pub fn unlock_device(&self, chip: &str) -> IcotestResult<()> {
        self.runner().run(
            Invocation::new("unlock device", ["device", "unlock", "-d", chip])
                .with_reasons([DEVICE_NOT_CONNECTED, PROGRAMMER_NOT_CONNECTED])
                .expect_output(CHIP_UNLOCKED.clone()),
        )?;
        Ok(())
    }
}
