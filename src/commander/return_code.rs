//! Platform independent exit codes.
//!
//! Windows reports process exit codes as an unsigned 32 bit `DWORD`, so a tool
//! that exits with `-1` shows up as `4294967295`. The raw value is reinterpreted
//! as a signed 32 bit number to recover the code the tool actually returned.

use std::process::ExitStatus;

/// Operating system family of the host running the checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Linux and other Unix-like systems
    Linux,
    /// macOS
    MacOs,
    /// Windows
    Windows,
}

impl Platform {
    /// Platform this binary was compiled for
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }
}

/// Convert a raw exit status into a signed exit code.
///
/// # Arguments
/// * `raw` - Exit status as reported by the process launcher, possibly in its
///   unsigned representation
/// * `platform` - Platform that produced `raw`
pub fn normalize_return_code(raw: i64, platform: Platform) -> i32 {
    let reinterpreted = raw as u32 as i32;
    match platform {
        Platform::Windows => reinterpreted,
        Platform::Linux | Platform::MacOs => i32::try_from(raw).unwrap_or(reinterpreted),
    }
}

/// Raw exit status of a finished process.
///
/// Processes terminated by a signal have no exit code on Unix; they are
/// reported as the negated signal number.
pub fn raw_exit_status(status: &ExitStatus) -> i64 {
    if let Some(code) = status.code() {
        return i64::from(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -i64::from(signal);
        }
    }

    -1
}
