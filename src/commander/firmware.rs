//! Firmware upload.

use std::path::Path;

use tracing::info;

use crate::commander::runner::{Invocation, ProcessLauncher};
use crate::commander::Commander;
use crate::error::{IcotestError, IcotestResult, ImageProblem};

/// Check that every image exists and is a regular file.
///
/// # Errors
/// Returns [`IcotestError::InvalidFirmwareImage`] for the first offending path.
pub fn validate_images<P: AsRef<Path>>(images: &[P]) -> IcotestResult<()> {
    for image in images {
        let path = image.as_ref();
        let problem = match path.metadata() {
            Err(_) => Some(ImageProblem::Missing),
            Ok(metadata) if !metadata.is_file() => Some(ImageProblem::NotAFile),
            Ok(_) => None,
        };
        if let Some(problem) = problem {
            return Err(IcotestError::InvalidFirmwareImage {
                path: path.to_path_buf(),
                problem,
            });
        }
    }
    Ok(())
}

impl<L: ProcessLauncher> Commander<L> {
    /// Upload firmware images into the flash memory of the device
    ///
    /// All images are checked before the hardware is touched. Afterwards debug
    /// mode is enabled, the chip is unlocked (erasing its flash) and the images
    /// are flashed one after another in the given order. The first failing step
    /// aborts the upload.
    ///
    /// # Arguments
    /// * `chip` - Identifier of the chip on the PCB, e.g. “BGM121A256V2”
    /// * `images` - Firmware images, flashed in the given order
    pub fn upload_flash<P: AsRef<Path>>(&self, chip: &str, images: &[P]) -> IcotestResult<()> {
        validate_images(images)?;

        self.enable_debug_mode()?;
        self.unlock_device(chip)?;

        for image in images {
            let path = image.as_ref();
            self.runner().run(Invocation::new(
                format!("upload firmware “{}”", path.display()),
                [
                    "flash".to_string(),
                    path.display().to_string(),
                    "-d".to_string(),
                    chip.to_string(),
                ],
            ))?;
            info!("Uploaded firmware: {}", path.display());
        }

        Ok(())
    }
}
