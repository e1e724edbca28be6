pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod distro;
pub mod error;
pub mod executor;
pub mod provider;
pub mod remote;
pub mod retry;
pub mod schema;

pub use error::CfystrapError;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::CommandFactory;
use tracing::{error, info, warn};
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

use crate::bootstrap::BootstrapRequest;
use crate::config::ConfigDocument;
use crate::executor::CommandExecutor;
use crate::provider::{ExistingHostProvider, Provider};
use crate::schema::ValidationErrors;

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(filter).finish(),
    )
    .context("failed to set global default tracing subscriber")
}

/// Runs config-level and schema validation for `provider`.
///
/// Every problem is logged; the call fails if any was found.
fn run_validations(provider: &dyn Provider, opts: &cli::CommonArgs) -> Result<()> {
    let mut errors = ValidationErrors::new();
    provider.validate(&mut errors);

    if let Some(schema_path) = &opts.schema {
        let schema = config::load_schema(schema_path)?;
        provider
            .validate_schema(&schema, &mut errors)
            .with_context(|| format!("failed to validate against {}", schema_path))?;
    }

    report_errors(&errors, opts)
}

fn report_errors(errors: &ValidationErrors, opts: &cli::CommonArgs) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    for (category, messages) in errors.iter() {
        for message in messages {
            error!(category, "{}", message);
        }
    }
    Err(CfystrapError::Validation(format!(
        "{} error(s) in {}",
        errors.len(),
        opts.config
    ))
    .into())
}

fn load_document(opts: &cli::CommonArgs) -> Result<ConfigDocument> {
    config::load_config(&opts.config)
        .with_context(|| format!("failed to load provider config from {}", opts.config))
}

pub fn run_bootstrap(opts: &cli::BootstrapArgs, executor: Arc<dyn CommandExecutor>) -> Result<()> {
    let document = load_document(&opts.common)?;
    let host = BootstrapRequest {
        public_ip: opts.host.clone(),
        private_ip: opts.private_ip.clone().unwrap_or_else(|| opts.host.clone()),
        ssh_key: opts.ssh_key.clone(),
        ssh_user: opts.ssh_user.clone(),
        dev_mode: opts.dev_mode,
    };
    let provider = ExistingHostProvider::new(document, host, opts.verbose);
    run_validations(&provider, &opts.common).context("provider config validation failed")?;

    let provisioned = provider.provision().context("failed to provision management host")?;
    let request = &provisioned.request;

    if provider.bootstrap(request, executor) {
        info!("bootstrapping complete. management server is up at {}", request.public_ip);
        return Ok(());
    }

    if opts.keep_up_on_failure {
        warn!("bootstrap failed; leaving provisioned resources in place (--keep-up-on-failure)");
    } else if !provider.teardown(&provisioned.provider_context, true) {
        error!("failed to tear down provisioned resources");
    }
    anyhow::bail!("bootstrap of {} failed", request.public_ip)
}

pub fn run_validate(opts: &cli::ValidateArgs) -> Result<()> {
    let document = load_document(&opts.common)?;
    let mut errors = ValidationErrors::new();
    document.config.validate(&mut errors);

    if let Some(schema_path) = &opts.common.schema {
        let schema = config::load_schema(schema_path)?;
        schema::validate_schema(&schema, &document.raw, &mut errors)
            .with_context(|| format!("failed to validate against {}", schema_path))?;
    }

    report_errors(&errors, &opts.common)?;
    info!("validation successful: {}", opts.common.config);
    Ok(())
}

pub fn run_completions(opts: &cli::CompletionsArgs) -> Result<()> {
    let mut cmd = cli::Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(opts.shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
