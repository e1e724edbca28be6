//! Local command execution abstraction for cfystrap.
//!
//! This module provides:
//! - [`CommandSpec`]: Specification for commands to execute
//! - [`ExecutionResult`]: Result of command execution with captured output
//! - [`CommandExecutor`]: Trait for command execution strategies
//! - [`RealCommandExecutor`]: Production implementation using `std::process::Command`
//!
//! Remote commands are carried to the host by running the system `ssh`
//! client through this layer (see [`crate::remote`]).

mod pipe;
mod real;

use anyhow::Result;

pub use real::RealCommandExecutor;

/// Controls how command output is surfaced while it is being captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// stdout is logged at INFO and stderr at WARN as lines arrive.
    Stream,
    /// Lines are only logged at TRACE.
    #[default]
    Quiet,
}

impl OutputMode {
    /// Maps a verbosity flag to the matching output mode.
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose { Self::Stream } else { Self::Quiet }
    }
}

/// Formats string arguments into a space-separated, debug-quoted string.
///
/// Used by error messages to consistently format command arguments
/// (e.g., `"-o" "BatchMode=yes"`).
pub(crate) fn format_command_args(args: &[String]) -> String {
    args.iter()
        .map(|a| format!("{:?}", a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Specification for a command to be executed
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// The command to execute (e.g., "ssh")
    pub command: String,
    /// Command arguments
    pub args: Vec<String>,
    /// How output is surfaced while it is captured
    pub output: OutputMode,
}

impl CommandSpec {
    /// Creates a new CommandSpec with command and args
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            output: OutputMode::default(),
        }
    }

    /// Sets the output mode
    #[must_use]
    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }
}

/// Result of command execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code of the command (None when terminated by a signal)
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl ExecutionResult {
    /// Returns true if the command exited with status zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Trait for command execution.
///
/// Implementations must be `Send + Sync` so the executor can be shared
/// behind an `Arc<dyn CommandExecutor>`.
pub trait CommandExecutor: Send + Sync {
    /// Executes a command with the given specification.
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult>;
}
