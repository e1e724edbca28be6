//! Remote command execution.
//!
//! This module provides the trait and types for running a single shell
//! command on the management host:
//! - [`RemoteCommand`]: a typed shell command line with escaped arguments
//! - [`CommandResult`]: success flag plus captured output of one command
//! - [`RemoteExecutor`]: the execution seam, faked in tests
//! - [`SshSession`]: the production implementation over the system `ssh`

mod ssh;

use std::fmt;

use anyhow::Result;
use shell_escape::unix::escape;

use crate::executor::{ExecutionResult, OutputMode};

pub use ssh::{SessionContext, SshPolicy, SshSession};

/// A shell command line to run on the remote host.
///
/// Arguments added through [`RemoteCommand::new`] and [`RemoteCommand::arg`]
/// are shell-escaped; [`RemoteCommand::raw`] takes a line verbatim for
/// user-supplied commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    line: String,
}

impl RemoteCommand {
    /// Creates a command from a program and its arguments, escaping each word.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut command = Self { line: String::new() };
        for word in words {
            command = command.arg(word.as_ref());
        }
        command
    }

    /// Wraps a verbatim shell line.
    pub fn raw(line: impl Into<String>) -> Self {
        Self { line: line.into() }
    }

    /// Appends a single escaped argument.
    #[must_use]
    pub fn arg(mut self, word: &str) -> Self {
        if !self.line.is_empty() {
            self.line.push(' ');
        }
        self.line.push_str(&escape(word.into()));
        self
    }

    /// Appends a glob argument: the directory is escaped, the pattern is not,
    /// so the remote shell still expands it.
    #[must_use]
    pub fn glob_arg(mut self, dir: &str, pattern: &str) -> Self {
        if !self.line.is_empty() {
            self.line.push(' ');
        }
        self.line.push_str(&escape(dir.into()));
        self.line.push('/');
        self.line.push_str(pattern);
        self
    }

    /// Chains another command that only runs if this one succeeds.
    #[must_use]
    pub fn and_then(mut self, next: RemoteCommand) -> Self {
        self.line.push_str(" && ");
        self.line.push_str(&next.line);
        self
    }

    /// Returns the shell line sent to the remote host.
    pub fn as_str(&self) -> &str {
        &self.line
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

/// Outcome of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the command exited successfully.
    pub succeeded: bool,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandResult {
    /// A successful result with the given standard output.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed result with the given standard error.
    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

impl From<ExecutionResult> for CommandResult {
    fn from(result: ExecutionResult) -> Self {
        Self {
            succeeded: result.success(),
            stdout: result.stdout,
            stderr: result.stderr,
        }
    }
}

/// Runs single shell commands on a remote host.
///
/// `Err` means the command could not be carried to the host at all;
/// a command that ran and failed is an `Ok` result with `succeeded == false`.
pub trait RemoteExecutor: Send + Sync {
    /// Returns the host this executor talks to, for log context.
    fn host(&self) -> &str;

    /// Runs `command`, surfacing its output according to `output`.
    fn run(&self, command: &RemoteCommand, output: OutputMode) -> Result<CommandResult>;
}
