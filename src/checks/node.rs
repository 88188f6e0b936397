//! EEPROM checks for all nodes.

use crate::config::NodeSettings;
use crate::error::IcotestResult;
use crate::verification::VerificationEngine;

/// Fields written by the checks of this module
pub const FIELDS: [&str; 8] = [
    "GTIN",
    "hardware version",
    "firmware version",
    "release name",
    "serial number",
    "product name",
    "batch number",
    "production date",
];

/// Check that the GTIN survives a round trip
pub async fn check_eeprom_gtin<D>(
    engine: &VerificationEngine<D>,
    settings: &NodeSettings,
) -> IcotestResult<()>
where
    D: ?Sized + Send + Sync + 'static,
{
    engine.verify("GTIN", settings.gtin).await?;
    Ok(())
}

/// Check that the product data survives a round trip
///
/// Fields are written in the order of [`FIELDS`]; the first mismatch ends the check.
pub async fn check_eeprom_product_data<D>(
    engine: &VerificationEngine<D>,
    settings: &NodeSettings,
) -> IcotestResult<()>
where
    D: ?Sized + Send + Sync + 'static,
{
    engine
        .verify("hardware version", settings.hardware_version)
        .await?;
    engine
        .verify("firmware version", settings.firmware_version)
        .await?;
    engine
        .verify("release name", settings.release_name.as_str())
        .await?;
    engine
        .verify("serial number", settings.serial_number.as_str())
        .await?;
    engine
        .verify("product name", settings.product_name.as_str())
        .await?;
    engine.verify("batch number", settings.batch_number).await?;
    engine
        .verify("production date", settings.production_date)
        .await?;
    Ok(())
}
