//! Install script runner.
//!
//! The downloaded packages ship bootstrap scripts that finish configuring
//! the management server. They always run with streamed output since they
//! are the slowest part of a bootstrap.

use camino::Utf8Path;

use super::packages::require;
use crate::error::CfystrapError;
use crate::remote::RemoteCommand;
use crate::retry::RetryingRunner;

const COMPONENTS_SCRIPT: &str = "cloudify-components-bootstrap.sh";
const CORE_SCRIPT: &str = "cloudify-core-bootstrap.sh";

/// Builds the components install command.
pub fn components_command(components_dir: &Utf8Path) -> RemoteCommand {
    RemoteCommand::new(["sudo", components_dir.join(COMPONENTS_SCRIPT).as_str()])
}

/// Builds the core install command.
///
/// `service_user` becomes the user the core services run as, and
/// `private_ip` the address they bind to.
pub fn core_command(core_dir: &Utf8Path, service_user: &str, private_ip: &str) -> RemoteCommand {
    RemoteCommand::new(["sudo", core_dir.join(CORE_SCRIPT).as_str(), service_user, private_ip])
}

/// Runs the components install script.
pub fn install_components(
    runner: &RetryingRunner<'_>,
    components_dir: &Utf8Path,
) -> Result<(), CfystrapError> {
    let result = runner.run(&components_command(components_dir), true);
    require(result, "install cloudify-components package", None)?;
    Ok(())
}

/// Runs the core install script.
pub fn install_core(
    runner: &RetryingRunner<'_>,
    core_dir: &Utf8Path,
    service_user: &str,
    private_ip: &str,
) -> Result<(), CfystrapError> {
    let result = runner.run(&core_command(core_dir, service_user, private_ip), true);
    require(result, "install cloudify-core package", None)?;
    Ok(())
}
