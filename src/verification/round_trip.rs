//! Write a value, read it back, compare.

use std::fmt::Display;
use std::future::Future;

use tracing::{debug, warn};

use crate::error::{IcotestError, IcotestResult};

/// Write `written`, read the value back and compare both
///
/// # Arguments
/// * `field_name` - Name of the field used in the failure message
/// * `write` - Stores the given value
/// * `read` - Reads the stored value back
/// * `written` - The candidate value
/// * `comparator` - Returns `true` if the read value matches the written one
///
/// # Returns
/// The value read back
///
/// # Errors
/// Errors of the accessors are returned unchanged. A mismatch is reported as
/// [`IcotestError::Verification`]; it is never retried.
///
/// # Example
///
/// ```rust,ignore
/// verify_round_trip(
///     "GTIN",
///     |gtin| node.write_gtin(gtin),
///     || node.read_gtin(),
///     9120071480064,
///     exact,
/// )
/// .await?;
/// ```
pub async fn verify_round_trip<T, E, W, WF, R, RF, C>(
    field_name: &str,
    write: W,
    read: R,
    written: T,
    comparator: C,
) -> IcotestResult<T>
where
    T: Display + Clone,
    E: Into<IcotestError>,
    W: FnOnce(T) -> WF,
    WF: Future<Output = Result<(), E>>,
    R: FnOnce() -> RF,
    RF: Future<Output = Result<T, E>>,
    C: FnOnce(&T, &T) -> bool,
{
    write(written.clone()).await.map_err(Into::into)?;
    let read_value = read().await.map_err(Into::into)?;

    if !comparator(&written, &read_value) {
        warn!("Round trip of {field_name} failed: wrote “{written}”, read “{read_value}”");
        return Err(IcotestError::Verification {
            field: field_name.to_string(),
            written: written.to_string(),
            read: read_value.to_string(),
        });
    }

    debug!("Verified {field_name}: “{read_value}”");
    Ok(read_value)
}

/// Comparator accepting only equal values
pub fn exact<T: PartialEq>(written: &T, read: &T) -> bool {
    written == read
}

/// Comparator accepting floating point values within the given bounds
pub fn close(relative: f64, absolute: f64) -> impl Fn(&f64, &f64) -> bool {
    move |written, read| super::value::is_close(*written, *read, relative, absolute)
}
