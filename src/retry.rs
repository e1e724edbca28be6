//! Retrying command runner.
//!
//! Every remote command issued during a bootstrap goes through
//! [`RetryingRunner::run`], which re-issues a failed command up to a fixed
//! number of attempts with a fixed delay in between.

use std::thread;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::executor::OutputMode;
use crate::remote::{CommandResult, RemoteCommand, RemoteExecutor};

/// Default number of attempts per command.
pub const DEFAULT_RETRIES: u32 = 3;
/// Default delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Bounded, fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Time to wait after a failed attempt before the next one.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt count and delay.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Wraps a [`RemoteExecutor`] with a bounded retry loop.
pub struct RetryingRunner<'a> {
    remote: &'a dyn RemoteExecutor,
    policy: RetryPolicy,
}

impl<'a> RetryingRunner<'a> {
    /// Creates a runner over `remote` using `policy`.
    pub fn new(remote: &'a dyn RemoteExecutor, policy: RetryPolicy) -> Self {
        Self { remote, policy }
    }

    /// Runs `command` with the runner's own policy.
    pub fn run(&self, command: &RemoteCommand, verbose: bool) -> CommandResult {
        self.run_with_retries(command, self.policy.max_attempts, self.policy.delay, verbose)
    }

    /// Runs `command` until it succeeds or `max_attempts` attempts were made.
    ///
    /// Never fails: the result of the final attempt is returned and the
    /// caller inspects [`CommandResult::succeeded`]. A command that could not
    /// be carried to the host counts as a failed attempt whose `stderr`
    /// holds the transport error. At least one attempt is always made.
    pub fn run_with_retries(
        &self,
        command: &RemoteCommand,
        max_attempts: u32,
        delay: Duration,
        verbose: bool,
    ) -> CommandResult {
        let max_attempts = max_attempts.max(1);
        let output = OutputMode::from_verbose(verbose);
        let mut attempt = 1;

        loop {
            debug!(attempt, max_attempts, "running command: {}", command);
            let result = match self.remote.run(command, output) {
                Ok(result) => result,
                Err(e) => CommandResult::failure(format!("{:#}", e)),
            };

            if result.succeeded {
                debug!("successfully ran command: {}", command);
                return result;
            }

            if attempt >= max_attempts {
                error!(
                    host = self.remote.host(),
                    "failed to run: {}, {}",
                    command,
                    result.stderr.trim_end()
                );
                return result;
            }

            warn!(attempt, max_attempts, "retrying command: {}", command);
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            attempt += 1;
        }
    }
}
