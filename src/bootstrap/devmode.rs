//! Developer-mode installer.
//!
//! Runs after a successful bootstrap and installs extra Python modules into
//! virtualenvs on the management server. Every command is best-effort: a
//! failure is logged by the runner and counted, but never stops the stage.

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::config::DevModule;
use crate::remote::RemoteCommand;
use crate::retry::RetryingRunner;

/// Archive path every dev-mode download is written to. Downloads of one
/// module overwrite each other; each is extracted before the next starts.
pub const DEV_ARCHIVE_PATH: &str = "/tmp/module.tar.gz";

/// Timeout in seconds passed to pip.
const PIP_TIMEOUT_SECS: u32 = 45;

/// Outcome of the dev-mode stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevModeSummary {
    /// Number of module groups processed.
    pub modules: usize,
    /// Number of commands issued.
    pub commands: usize,
    /// Number of commands that failed after retries.
    pub failed: usize,
}

/// Directory the downloads of `virtualenv` are extracted into.
pub fn extract_dir(virtualenv: &str) -> String {
    format!("/tmp/{}", virtualenv)
}

/// Returns the path pip installs for `target`.
///
/// Absolute targets refer to paths inside the extracted archives and are
/// rewritten to `/tmp/<virtualenv><target>`; anything else (a requirement
/// spec, a URL) is used unchanged.
pub fn install_target(virtualenv: &str, target: &str) -> String {
    if target.starts_with('/') {
        format!("{}{}", extract_dir(virtualenv), target)
    } else {
        target.to_string()
    }
}

/// Builds the pip command installing `target` into `virtualenv`.
pub fn pip_install_command(virtualenv: &str, target: &str) -> RemoteCommand {
    let pip = format!("{}/bin/pip", virtualenv.trim_end_matches('/'));
    RemoteCommand::new([
        "sudo".to_string(),
        pip,
        format!("--default-timeout={}", PIP_TIMEOUT_SECS),
        "install".to_string(),
        install_target(virtualenv, target),
        "--upgrade".to_string(),
        "--process-dependency-links".to_string(),
    ])
}

struct DevRun<'r, 'a> {
    runner: &'r RetryingRunner<'a>,
    summary: DevModeSummary,
}

impl DevRun<'_, '_> {
    fn run(&mut self, command: &RemoteCommand) {
        self.summary.commands += 1;
        if !self.runner.run(command, true).succeeded {
            self.summary.failed += 1;
        }
    }

    fn module(&mut self, name: &str, module: &DevModule) {
        let virtualenv = module.virtualenv.as_str();
        debug!(module = name, "virtualenv is: {}", virtualenv);

        for command in &module.preruns {
            self.run(&RemoteCommand::raw(command));
        }

        if !module.downloads.is_empty() {
            let dir = extract_dir(virtualenv);
            self.run(&RemoteCommand::new(["mkdir", "-p", dir.as_str()]));
            for download in &module.downloads {
                debug!("downloading: {}", download);
                self.run(&RemoteCommand::new([
                    "sudo",
                    "wget",
                    download.as_str(),
                    "-O",
                    DEV_ARCHIVE_PATH,
                ]));
                self.run(&RemoteCommand::new([
                    "sudo",
                    "tar",
                    "-C",
                    dir.as_str(),
                    "-xvf",
                    DEV_ARCHIVE_PATH,
                ]));
            }
        }

        for target in &module.installs {
            debug!("installing: {}", target);
            self.run(&pip_install_command(virtualenv, target));
        }

        for command in &module.runs {
            self.run(&RemoteCommand::raw(command));
        }

        self.summary.modules += 1;
    }
}

/// Applies every dev-mode module group in order.
pub fn run_dev_mode(
    runner: &RetryingRunner<'_>,
    modules: &IndexMap<String, DevModule>,
) -> DevModeSummary {
    info!(
        "entering dev-mode. dev configuration will be applied... \
        NOTE: an internet connection might be required..."
    );
    let mut run = DevRun {
        runner,
        summary: DevModeSummary::default(),
    };
    for (name, module) in modules {
        run.module(name, module);
    }
    if run.summary.failed > 0 {
        warn!(
            "dev-mode finished with {} failed command(s) out of {}",
            run.summary.failed, run.summary.commands
        );
    }
    run.summary
}
