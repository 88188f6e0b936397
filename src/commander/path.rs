//! Search path augmentation for the Simplicity Commander executable.
//!
//! Installation directories of `commander` are appended to the process wide
//! `PATH` so the tool can be started without its full path. The augmentation
//! only ever adds entries: nothing is removed again for the lifetime of the
//! process, since every later invocation relies on it. Directories already on
//! the search path are skipped, which makes repeated calls harmless.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IcotestError, IcotestResult};

/// Append the given directories to `PATH`, skipping the ones already present.
///
/// Returns the directories that were actually added.
///
/// # Errors
/// Returns [`IcotestError::Configuration`] if a directory contains a character
/// that cannot be part of a search path entry (e.g. the path separator).
pub fn ensure_executable_discoverable<P: AsRef<Path>>(
    directories: &[P],
) -> IcotestResult<Vec<PathBuf>> {
    let current = env::var_os("PATH").unwrap_or_default();
    let (augmented, added) = augmented_search_path(&current, directories)?;

    if !added.is_empty() {
        debug!(directories = ?added, "Adding Simplicity Commander directories to PATH");
        env::set_var("PATH", augmented);
    }

    Ok(added)
}

fn augmented_search_path<P: AsRef<Path>>(
    current: &OsString,
    directories: &[P],
) -> IcotestResult<(OsString, Vec<PathBuf>)> {
    let mut entries: Vec<PathBuf> = env::split_paths(current).collect();
    let mut added = Vec::new();

    for directory in directories {
        let directory = directory.as_ref().to_path_buf();
        if !entries.contains(&directory) {
            entries.push(directory.clone());
            added.push(directory);
        }
    }

    let joined = env::join_paths(&entries).map_err(|err| {
        IcotestError::Configuration(format!("Invalid Simplicity Commander path: {err}"))
    })?;

    Ok((joined, added))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn existing_entries_are_kept_in_order() {
        let current = env::join_paths(["/usr/bin", "/bin"]).unwrap();
        let (augmented, added) =
            augmented_search_path(&current, &["/opt/commander", "/usr/bin"]).unwrap();

        let entries: Vec<PathBuf> = env::split_paths(&augmented).collect();
        assert_eq!(
            entries,
            vec![
                PathBuf::from("/usr/bin"),
                PathBuf::from("/bin"),
                PathBuf::from("/opt/commander"),
            ]
        );
        assert_eq!(added, vec![PathBuf::from("/opt/commander")]);
    }

    #[cfg(unix)]
    #[test]
    fn separator_in_directory_is_rejected() {
        let current = OsString::from("/usr/bin");
        let result = augmented_search_path(&current, &["/opt/a:b"]);
        assert!(matches!(result, Err(IcotestError::Configuration(_))));
    }

    #[test]
    #[serial]
    fn augmentation_is_idempotent() {
        let directory = env::temp_dir().join("icotest-commander-path-test");

        ensure_executable_discoverable(&[&directory]).unwrap();
        let first = env::var_os("PATH").unwrap();

        let added = ensure_executable_discoverable(&[&directory]).unwrap();
        let second = env::var_os("PATH").unwrap();

        assert!(added.is_empty());
        assert_eq!(first, second);
        assert!(env::split_paths(&second).any(|entry| entry == directory));
    }
}
