//! SSH-backed remote execution.
//!
//! Commands are carried to the host by the system `ssh` client, run through
//! a [`CommandExecutor`] so the transport itself stays swappable in tests.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;

use super::{CommandResult, RemoteCommand, RemoteExecutor};
use crate::executor::{CommandExecutor, CommandSpec, OutputMode};

/// Fixed connection policy for bootstrap sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshPolicy {
    /// Number of connection attempts made by the client.
    pub connection_attempts: u32,
    /// Keepalive interval in seconds; zero disables keepalives.
    pub keepalive: u32,
    /// Connect timeout.
    pub timeout: Duration,
    /// Forward the local SSH agent to the host.
    pub forward_agent: bool,
    /// Verify host keys against known hosts.
    pub check_host_keys: bool,
    /// Allow interactive prompts (passwords, host-key confirmation).
    pub allow_prompts: bool,
}

impl Default for SshPolicy {
    fn default() -> Self {
        Self {
            connection_attempts: 5,
            keepalive: 0,
            timeout: Duration::from_secs(10),
            forward_agent: true,
            check_host_keys: false,
            allow_prompts: false,
        }
    }
}

impl SshPolicy {
    fn options(&self) -> Vec<String> {
        let mut args = Vec::new();
        let mut opt = |value: String| {
            args.push("-o".to_string());
            args.push(value);
        };
        opt(format!("ConnectionAttempts={}", self.connection_attempts));
        opt(format!("ServerAliveInterval={}", self.keepalive));
        opt(format!("ConnectTimeout={}", self.timeout.as_secs()));
        opt(format!("BatchMode={}", yes_no(!self.allow_prompts)));
        opt(format!("ForwardAgent={}", yes_no(self.forward_agent)));
        if !self.check_host_keys {
            opt("StrictHostKeyChecking=no".to_string());
            opt("UserKnownHostsFile=/dev/null".to_string());
        }
        args
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Connection parameters for one bootstrap call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Address used to reach the host.
    pub host: String,
    /// User to log in as.
    pub user: String,
    /// Private key used for authentication.
    pub key_path: Utf8PathBuf,
    /// Connection policy.
    pub policy: SshPolicy,
}

impl SessionContext {
    /// Creates a session context with the default connection policy.
    pub fn new(host: impl Into<String>, user: impl Into<String>, key_path: Utf8PathBuf) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            key_path,
            policy: SshPolicy::default(),
        }
    }
}

/// Remote executor that shells out to the `ssh` client.
pub struct SshSession {
    context: SessionContext,
    executor: Arc<dyn CommandExecutor>,
    ssh_bin: String,
}

impl SshSession {
    /// Creates a session running `ssh` through `executor`.
    pub fn new(context: SessionContext, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            context,
            executor,
            ssh_bin: "ssh".to_string(),
        }
    }

    /// Overrides the `ssh` binary name or path.
    #[must_use]
    pub fn with_ssh_bin(mut self, ssh_bin: impl Into<String>) -> Self {
        self.ssh_bin = ssh_bin.into();
        self
    }

    /// Builds the full `ssh` argument list for `command`.
    pub fn build_args(&self, command: &RemoteCommand) -> Vec<String> {
        let mut args = self.context.policy.options();
        args.push("-i".to_string());
        args.push(self.context.key_path.to_string());
        args.push(format!("{}@{}", self.context.user, self.context.host));
        args.push(command.as_str().to_string());
        args
    }
}

impl RemoteExecutor for SshSession {
    fn host(&self) -> &str {
        &self.context.host
    }

    fn run(&self, command: &RemoteCommand, output: OutputMode) -> Result<CommandResult> {
        let spec = CommandSpec::new(&self.ssh_bin, self.build_args(command)).with_output(output);
        let result = self
            .executor
            .execute(&spec)
            .with_context(|| format!("failed to run `{}` on {}", command, self.context.host))?;
        Ok(result.into())
    }
}
