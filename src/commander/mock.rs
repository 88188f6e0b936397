//! Mock process launcher for testing
//!
//! Stands in for the Simplicity Commander executable when no programming
//! board is attached. It provides:
//! - Scripted exit codes and output, one response per launch
//! - Launch failure injection
//! - Call logging for test verification

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::commander::return_code::Platform;
use crate::commander::runner::{ProcessLauncher, ProcessOutput};

/// A recorded process launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCall {
    /// Started executable
    pub program: String,
    /// Arguments passed to the executable
    pub arguments: Vec<String>,
}

#[derive(Debug)]
enum Response {
    Exit(ProcessOutput),
    LaunchFailure(io::ErrorKind),
}

/// Scripted process launcher
///
/// Responses are consumed in the order they were added. Once the script is
/// exhausted every launch succeeds with empty output.
///
/// # Example
///
/// ```
/// use icotest::commander::mock::MockLauncher;
/// use icotest::commander::{CommandRunner, Invocation};
///
/// let launcher = MockLauncher::new().respond(0, "Setting debug mode to OUT", "");
/// let runner = CommandRunner::with_launcher("commander", &[], launcher).unwrap();
/// let output = runner.run(Invocation::new("enable debug mode", ["adapter", "dbgmode", "OUT"])).unwrap();
/// assert_eq!(output.stdout, "Setting debug mode to OUT");
/// assert_eq!(runner.launcher().invocation_count(), 1);
/// ```
#[derive(Debug)]
pub struct MockLauncher {
    platform: Platform,
    responses: Mutex<VecDeque<Response>>,
    call_log: Mutex<Vec<LaunchCall>>,
    invocations: AtomicUsize,
}

impl MockLauncher {
    /// Create a launcher without scripted responses
    pub fn new() -> Self {
        Self {
            platform: Platform::current(),
            responses: Mutex::new(VecDeque::new()),
            call_log: Mutex::new(Vec::new()),
            invocations: AtomicUsize::new(0),
        }
    }

    /// Report exit statuses as `platform` would
    pub fn on_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Queue a response with a signed exit code
    pub fn respond(self, code: i32, stdout: &str, stderr: &str) -> Self {
        self.respond_raw(i64::from(code), stdout, stderr)
    }

    /// Queue a response with a raw exit status
    pub fn respond_raw(self, status: i64, stdout: &str, stderr: &str) -> Self {
        self.push(Response::Exit(ProcessOutput {
            status,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }))
    }

    /// Queue a launch that fails before the process starts
    pub fn fail_launch(self, kind: io::ErrorKind) -> Self {
        self.push(Response::LaunchFailure(kind))
    }

    fn push(self, response: Response) -> Self {
        lock(&self.responses).push_back(response);
        self
    }

    /// Number of launch attempts so far
    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Copy of all recorded launches
    pub fn calls(&self) -> Vec<LaunchCall> {
        lock(&self.call_log).clone()
    }
}

impl Default for MockLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLauncher for MockLauncher {
    fn launch(&self, program: &str, arguments: &[String]) -> io::Result<ProcessOutput> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        lock(&self.call_log).push(LaunchCall {
            program: program.to_string(),
            arguments: arguments.to_vec(),
        });

        match lock(&self.responses).pop_front() {
            Some(Response::Exit(output)) => Ok(output),
            Some(Response::LaunchFailure(kind)) => Err(io::Error::new(
                kind,
                format!("mock launch of “{program}” failed"),
            )),
            None => Ok(ProcessOutput::default()),
        }
    }

    fn platform(&self) -> Platform {
        self.platform
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
