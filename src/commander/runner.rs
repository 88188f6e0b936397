//! Execution of single Simplicity Commander commands.
//!
//! A [`CommandRunner`] starts the external tool through a [`ProcessLauncher`],
//! interprets the exit code and, when an [`Invocation`] requires it, checks the
//! output for an expected pattern. Failures are never retried: unlocking erases
//! the flash of the device, so blindly repeating a command is not safe.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;

use regex::Regex;
use tracing::{info, warn};

use crate::commander::extract::{extract, Extracted};
use crate::commander::path::ensure_executable_discoverable;
use crate::commander::reasons::ErrorReasonCatalog;
use crate::commander::return_code::{normalize_return_code, raw_exit_status, Platform};
use crate::error::{IcotestError, IcotestResult};

/// One command for the external tool.
///
/// # Example
///
/// ```
/// use icotest::commander::{Invocation, PROGRAMMER_NOT_CONNECTED};
/// use regex::Regex;
///
/// let invocation = Invocation::new("enable debug mode", ["adapter", "dbgmode", "OUT"])
///     .with_reasons([PROGRAMMER_NOT_CONNECTED])
///     .expect_output(Regex::new("Setting debug mode to OUT").unwrap());
/// assert_eq!(invocation.arguments(), ["adapter", "dbgmode", "OUT"]);
/// ```
#[derive(Debug, Clone)]
pub struct Invocation {
    arguments: Vec<String>,
    description: String,
    reasons: Vec<String>,
    pattern: Option<Regex>,
}

impl Invocation {
    /// Create a new invocation
    ///
    /// # Arguments
    /// * `description` - Purpose of the command, e.g. “enable debug mode”
    /// * `arguments` - Subcommand and flags passed to the tool
    pub fn new<I, S>(description: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            arguments: arguments.into_iter().map(Into::into).collect(),
            description: description.into(),
            reasons: Vec::new(),
            pattern: None,
        }
    }

    /// Keys of the [`ErrorReasonCatalog`] entries that explain a failure of this command
    pub fn with_reasons<I, S>(mut self, reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reasons = reasons.into_iter().map(Into::into).collect();
        self
    }

    /// Require the standard output to match `pattern`
    pub fn expect_output(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Arguments passed to the tool
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Purpose of the command
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Requested error reason keys
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Pattern the output has to match, if any
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }
}

/// Captured result of a finished process, before interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Raw exit status in the launcher's native representation
    pub status: i64,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

/// Starts a process and waits for it to finish.
///
/// Implementations must block until the process exits and capture both
/// output streams.
pub trait ProcessLauncher: Send + Sync {
    /// Run `program` with `arguments`
    fn launch(&self, program: &str, arguments: &[String]) -> std::io::Result<ProcessOutput>;

    /// Platform that produced the raw exit status
    fn platform(&self) -> Platform {
        Platform::current()
    }
}

/// Launcher for real processes based on [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, program: &str, arguments: &[String]) -> std::io::Result<ProcessOutput> {
        let output = Command::new(program).args(arguments).output()?;
        Ok(ProcessOutput {
            status: raw_exit_status(&output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Interpreted result of a successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Normalized exit code (always `0` for a returned value)
    pub exit_code: i32,
    /// Fields extracted by the required output pattern
    pub extracted: Option<Extracted>,
}

/// Runs commands of one external executable.
pub struct CommandRunner<L = SystemLauncher> {
    executable: String,
    launcher: L,
    catalog: &'static ErrorReasonCatalog,
    // Held for the whole lifetime of a process: the unit under test can only
    // be in one state at a time.
    hardware: Mutex<()>,
}

impl CommandRunner<SystemLauncher> {
    /// Create a runner for real processes
    ///
    /// # Arguments
    /// * `executable` - Name of the tool, e.g. `commander`
    /// * `search_directories` - Directories appended to `PATH` so `executable` can be found
    pub fn new(executable: impl Into<String>, search_directories: &[PathBuf]) -> IcotestResult<Self> {
        Self::with_launcher(executable, search_directories, SystemLauncher)
    }
}

impl<L: ProcessLauncher> CommandRunner<L> {
    /// Create a runner with a custom process launcher
    pub fn with_launcher(
        executable: impl Into<String>,
        search_directories: &[PathBuf],
        launcher: L,
    ) -> IcotestResult<Self> {
        ensure_executable_discoverable(search_directories)?;
        Ok(Self {
            executable: executable.into(),
            launcher,
            catalog: ErrorReasonCatalog::standard(),
            hardware: Mutex::new(()),
        })
    }

    /// Name of the executable started by this runner
    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Process launcher used by this runner
    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Run `invocation` and wait for it to finish
    ///
    /// # Errors
    /// - [`IcotestError::InvalidReason`] if a requested reason key is unknown (checked before launch)
    /// - [`IcotestError::Launch`] if the process could not be started
    /// - [`IcotestError::CommandFailed`] if the process returned a non-zero exit code
    /// - [`IcotestError::OutputMismatch`] if the required pattern is missing in the output
    pub fn run(&self, invocation: Invocation) -> IcotestResult<CommandOutput> {
        self.catalog.validate(&invocation.reasons)?;

        info!(
            "Running command: “{} {}”",
            self.executable,
            invocation.arguments.join(" ")
        );

        let output = {
            let _hardware = self
                .hardware
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            self.launcher
                .launch(&self.executable, &invocation.arguments)
                .map_err(|source| IcotestError::Launch {
                    program: self.executable.clone(),
                    source,
                })?
        };

        let exit_code = normalize_return_code(output.status, self.launcher.platform());
        if exit_code != 0 {
            let message = self.failure_message(&invocation, exit_code, &output)?;
            warn!(exit_code, "Command to {} failed", invocation.description);
            return Err(IcotestError::CommandFailed {
                code: exit_code,
                message,
            });
        }

        let extracted = invocation
            .pattern
            .as_ref()
            .map(|pattern| extract(&invocation.description, &output.stdout, pattern))
            .transpose()?;

        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code,
            extracted,
        })
    }

    fn failure_message(
        &self,
        invocation: &Invocation,
        exit_code: i32,
        output: &ProcessOutput,
    ) -> IcotestResult<String> {
        let mut message = format!(
            "Execution of Simplicity Commander command to {} failed with return code “{}”",
            invocation.description, exit_code
        );

        if !output.stdout.is_empty() || !output.stderr.is_empty() {
            let combined = format!("{}\n{}", output.stdout, output.stderr);
            message.push_str("\n\nSimplicity Commander output:\n\n");
            message.push_str(combined.trim_end());
        }

        if !invocation.reasons.is_empty() {
            let reasons = invocation
                .reasons
                .iter()
                .map(|key| self.catalog.lookup(key).map(|text| format!("• {text}")))
                .collect::<IcotestResult<Vec<_>>>()?;
            message.push_str("\n\nPossible error reasons:\n\n");
            message.push_str(&reasons.join("\n"));
        }

        Ok(message)
    }
}
