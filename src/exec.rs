//! External process execution behind an injectable [`Executor`] seam.
//!
//! Production code uses [`SystemExecutor`]; engine tests use
//! `MockExecutor`, which replays canned outputs and records invocations.
use anyhow::{Context as _, Result};
use std::fmt;
use std::path::Path;
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Runs external programs.
pub trait Executor: Send + Sync + fmt::Debug {
    /// Run `program` with `args` and capture its output.
    ///
    /// A non-zero exit is reported through [`ExecResult::success`], not as
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started.
    fn run(&self, program: &Path, args: &[String]) -> Result<ExecResult>;
}

/// [`Executor`] that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run(&self, program: &Path, args: &[String]) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to execute: {}", program.display()))?;
        Ok(ExecResult::from(output))
    }
}

/// Mock [`Executor`] for unit tests.
///
/// Queue responses with the builder methods; each call pops the next one
/// and records its argument list.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockExecutor {
    responses: std::sync::Mutex<std::collections::VecDeque<ExecResult>>,
    calls: std::sync::Mutex<Vec<Vec<String>>>,
}

#[cfg(test)]
impl MockExecutor {
    /// Create a mock with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful run printing `stdout`.
    #[must_use]
    pub fn with_stdout(self, stdout: impl Into<String>) -> Self {
        self.with_result(ExecResult {
            stdout: stdout.into(),
            success: true,
            code: Some(0),
            ..ExecResult::default()
        })
    }

    /// Queue an arbitrary result.
    #[must_use]
    pub fn with_result(self, result: ExecResult) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(result);
        self
    }

    /// Argument lists of all calls so far.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
impl Executor for MockExecutor {
    fn run(&self, program: &Path, args: &[String]) -> Result<ExecResult> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(args.to_vec());
        self.responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("mock: no response queued for {}", program.display()))
    }
}
