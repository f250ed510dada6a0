//! External tool invocation.
//!
//! Orchestrator and compose updates shell out to the `docker` and
//! compose CLIs. [`ToolRunner`] abstracts that boundary so the executor
//! can be tested with scripted outputs, and [`SystemToolRunner`] runs
//! real processes with a timeout.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::UpdaterError;

/// Captured result of a finished tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Process exit code; -1 when the process was killed by a signal.
    pub status: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr, verbatim.
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the tool exited with status zero.
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// A successful output with empty streams.
    pub fn ok() -> Self {
        Self {
            status: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// A failed output with the given status and stderr.
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs external CLI tools to completion and captures their output.
///
/// A non-zero exit is not an error at this level; the caller inspects
/// [`ToolOutput::success`] and decides what the failure means. Errors are
/// reserved for invocations that never produce an exit status (spawn
/// failure, timeout).
pub trait ToolRunner: Send + Sync + 'static {
    /// Runs `program` with `args` and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns `UpdaterError::ExternalTool` when the process cannot be
    /// spawned or exceeds the runner's timeout.
    fn run(
        &self,
        program: &str,
        args: &[&str],
    ) -> impl Future<Output = Result<ToolOutput, UpdaterError>> + Send;
}

/// Production runner backed by `tokio::process::Command`.
pub struct SystemToolRunner {
    timeout: Duration,
}

impl SystemToolRunner {
    /// Creates a runner that kills invocations exceeding `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ToolRunner for SystemToolRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<ToolOutput, UpdaterError> {
        debug!(program, ?args, "running external tool");

        let output_fut = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            result = output_fut => result.map_err(|e| UpdaterError::ExternalTool {
                tool: program.to_owned(),
                stderr: format!("failed to spawn: {e}"),
            })?,
            _ = tokio::time::sleep(self.timeout) => {
                return Err(UpdaterError::ExternalTool {
                    tool: program.to_owned(),
                    stderr: format!("timed out after {}s", self.timeout.as_secs()),
                });
            }
        };

        Ok(ToolOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Scripted runner for tests.
///
/// Pops pre-programmed results in order and records every invocation.
/// When the script runs dry it returns a successful empty output.
#[cfg(test)]
#[derive(Default)]
pub struct MockToolRunner {
    script: std::sync::Mutex<std::collections::VecDeque<Result<ToolOutput, UpdaterError>>>,
    /// Every (program, args) pair in invocation order.
    pub invocations: std::sync::Mutex<Vec<(String, Vec<String>)>>,
}

#[cfg(test)]
impl MockToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a scripted result for the next invocation.
    pub fn then(self, result: Result<ToolOutput, UpdaterError>) -> Self {
        self.script.lock().unwrap().push_back(result);
        self
    }

    /// Appends a successful invocation.
    pub fn then_ok(self) -> Self {
        self.then(Ok(ToolOutput::ok()))
    }

    /// Appends a failing invocation with the given stderr.
    pub fn then_exit(self, status: i32, stderr: &str) -> Self {
        self.then(Ok(ToolOutput::failed(status, stderr)))
    }

    /// Number of invocations performed so far.
    pub fn call_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }
}

#[cfg(test)]
impl ToolRunner for MockToolRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<ToolOutput, UpdaterError> {
        self.invocations.lock().unwrap().push((
            program.to_owned(),
            args.iter().map(|a| (*a).to_owned()).collect(),
        ));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(ToolOutput::ok()))
    }
}
