use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bootstrap the management server on an existing host
    Bootstrap(BootstrapArgs),

    /// Validate the given provider config
    Validate(ValidateArgs),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

/// Arguments shared by commands that read a provider config.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to the YAML provider config
    #[arg(short = 'c', long, default_value = "cloudify-config.yaml")]
    pub config: Utf8PathBuf,

    /// JSON schema (YAML or JSON) the provider config is validated against
    #[arg(short, long)]
    pub schema: Option<Utf8PathBuf>,

    /// Set the log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct BootstrapArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Public address of the management host
    #[arg(long)]
    pub host: String,

    /// Private address the management services bind to (defaults to --host)
    #[arg(long)]
    pub private_ip: Option<String>,

    /// Private key used to connect to the host
    #[arg(long)]
    pub ssh_key: Utf8PathBuf,

    /// User to connect as; the core services also run as this user
    #[arg(long)]
    pub ssh_user: String,

    /// Apply the dev section of the config after bootstrapping
    #[arg(long)]
    pub dev_mode: bool,

    /// Stream remote command output
    #[arg(short, long)]
    pub verbose: bool,

    /// Leave provisioned resources in place if bootstrapping fails
    #[arg(long)]
    pub keep_up_on_failure: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Represents log levels for controlling the verbosity of logging output.
///
/// This enum maps directly to the log levels used by the `tracing` crate.
/// Specifying `--log-level debug` shows every remote command as it is
/// issued and retried.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Commands {
    /// Returns the log level requested for this command.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Bootstrap(opts) => opts.common.log_level,
            Self::Validate(opts) => opts.common.log_level,
            Self::Completions(_) => LogLevel::Warn,
        }
    }
}

pub fn parse_args() -> Result<Cli> {
    Ok(Cli::parse())
}
