//! Package download and unpack stage.

use camino::Utf8Path;
use tracing::error;

use crate::distro::PackageFormat;
use crate::error::CfystrapError;
use crate::remote::CommandResult;
use crate::retry::RetryingRunner;

/// Appended to download failures to point at the likely cause.
pub(super) const PACKAGE_LOCATION_HINT: &str =
    "please ensure package exists in its configured location in the config file";

/// Downloads the package at `url` into `remote_dir`.
pub fn download(
    runner: &RetryingRunner<'_>,
    remote_dir: &Utf8Path,
    url: &str,
    format: PackageFormat,
    verbose: bool,
) -> CommandResult {
    runner.run(&format.download_command(remote_dir.as_str(), url), verbose)
}

/// Installs every package file of `format` found in `remote_dir`.
pub fn unpack(
    runner: &RetryingRunner<'_>,
    remote_dir: &Utf8Path,
    format: PackageFormat,
    verbose: bool,
) -> CommandResult {
    runner.run(&format.install_command(remote_dir.as_str()), verbose)
}

/// Turns a failed result into a stage error, logging `what` and the
/// captured error output.
pub(super) fn require(
    result: CommandResult,
    stage: &str,
    hint: Option<&str>,
) -> Result<CommandResult, CfystrapError> {
    if result.succeeded {
        return Ok(result);
    }
    match hint {
        Some(hint) => error!("failed to {}. {}", stage, hint),
        None => error!("failed to {}.", stage),
    }
    Err(CfystrapError::Stage {
        stage: stage.to_string(),
        message: result.stderr.trim().to_string(),
    })
}
