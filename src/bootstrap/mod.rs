//! Bootstrap orchestrator.
//!
//! Sequences the stages that turn a freshly provisioned host into a
//! management server:
//!
//! 1. **Distribution detection**: identify the host's distribution
//! 2. **Compatibility check**: every package URL must match its format
//! 3. **Download**: components, core, optional UI, then every agent package
//! 4. **Unpack**: install the core package set
//! 5. **Install scripts**: components, then core
//! 6. **UI and agents**: install the optional UI, then the agent packages
//! 7. **Dev mode**: optional, best-effort module installation
//!
//! Each main stage runs only if the previous one succeeded; the first
//! failure ends the bootstrap.

pub mod devmode;
pub mod packages;
pub mod scripts;

use std::sync::Arc;

use camino::Utf8PathBuf;
use strum::Display;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::distro::{Distribution, check_package_url_typed, detect_distribution};
use crate::error::CfystrapError;
use crate::executor::CommandExecutor;
use crate::remote::{RemoteExecutor, SessionContext, SshSession};
use crate::retry::RetryingRunner;

pub use devmode::DevModeSummary;
use packages::{PACKAGE_LOCATION_HINT, download, require, unpack};

/// Connection details and options for one bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapRequest {
    /// Address used to reach the host.
    pub public_ip: String,
    /// Address the management services bind to.
    pub private_ip: String,
    /// Private key used for SSH.
    pub ssh_key: Utf8PathBuf,
    /// SSH user; also the user the core services run as.
    pub ssh_user: String,
    /// Run the dev-mode stage after the main pipeline.
    pub dev_mode: bool,
}

impl BootstrapRequest {
    /// Builds the SSH session context for this request.
    pub fn session_context(&self) -> SessionContext {
        SessionContext::new(&self.public_ip, &self.ssh_user, self.ssh_key.clone())
    }

    /// Opens an SSH session for this request that runs `ssh` through `executor`.
    pub fn open_session(&self, executor: Arc<dyn CommandExecutor>) -> SshSession {
        SshSession::new(self.session_context(), executor)
    }
}

/// Position of a bootstrap in its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum BootstrapState {
    Idle,
    DetectingDistro,
    CheckingCompatibility,
    Downloading,
    Unpacking,
    InstallingComponents,
    InstallingCore,
    InstallingUi,
    InstallingAgents,
    DevMode,
    Done,
    Failed,
}

/// What a successful bootstrap did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Distribution detected on the host.
    pub distribution: Distribution,
    /// Whether the UI package was installed.
    pub ui_installed: bool,
    /// Number of agent packages installed.
    pub agents_installed: usize,
    /// Dev-mode outcome, if the stage ran.
    pub dev_mode: Option<DevModeSummary>,
}

/// Drives one bootstrap against one host.
pub struct Bootstrapper<'a> {
    config: &'a ProviderConfig,
    remote: &'a dyn RemoteExecutor,
    verbose: bool,
    state: BootstrapState,
    history: Vec<BootstrapState>,
}

impl<'a> Bootstrapper<'a> {
    /// Creates an orchestrator. `verbose` is the caller's output setting;
    /// stages that override it do so per command and never change it.
    pub fn new(config: &'a ProviderConfig, remote: &'a dyn RemoteExecutor, verbose: bool) -> Self {
        Self {
            config,
            remote,
            verbose,
            state: BootstrapState::Idle,
            history: vec![BootstrapState::Idle],
        }
    }

    /// Current state.
    pub fn state(&self) -> BootstrapState {
        self.state
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn history(&self) -> &[BootstrapState] {
        &self.history
    }

    /// The caller's output setting.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Runs the bootstrap, returning `true` only if every stage succeeded.
    pub fn bootstrap(&mut self, request: &BootstrapRequest) -> bool {
        match self.run(request) {
            Ok(_) => true,
            Err(e) if e.is_configuration_error() => {
                error!("bootstrap failed: {}. check the provider config", e);
                false
            }
            Err(e) => {
                error!("bootstrap failed: {}", e);
                false
            }
        }
    }

    /// Runs the bootstrap, returning what it did or why it stopped.
    pub fn run(&mut self, request: &BootstrapRequest) -> Result<BootstrapReport, CfystrapError> {
        let span = info_span!("bootstrap", host = %request.public_ip, run_id = %Uuid::new_v4());
        let _guard = span.enter();

        info!("initializing manager on the machine at {}", request.public_ip);
        let remote = self.remote;
        let runner = RetryingRunner::new(remote, self.config.bootstrap.retry_policy());
        let result = self.run_stages(&runner, request);
        match &result {
            Ok(_) => self.enter(BootstrapState::Done),
            Err(_) => self.enter(BootstrapState::Failed),
        }
        result
    }

    fn enter(&mut self, state: BootstrapState) {
        debug!("bootstrap state: {} -> {}", self.state, state);
        self.state = state;
        self.history.push(state);
    }

    fn run_stages(
        &mut self,
        runner: &RetryingRunner<'_>,
        request: &BootstrapRequest,
    ) -> Result<BootstrapReport, CfystrapError> {
        let config = self.config;
        let settings = &config.bootstrap;
        let server_packages = &config.cloudify.server.packages;
        let agent_packages = &config.cloudify.agents.packages;
        let verbose = self.verbose;

        self.enter(BootstrapState::DetectingDistro);
        let detected = detect_distribution(runner, verbose);
        if !detected.succeeded {
            error!("could not identify distribution.");
            return Err(CfystrapError::DistributionDetection(detected.stderr.trim().to_string()));
        }
        debug!("distribution is: {}", detected.stdout);

        self.enter(BootstrapState::CheckingCompatibility);
        debug!("checking package-distro compatibility");
        for (_, url) in config.package_urls() {
            check_package_url_typed(url, &detected.stdout)?;
        }
        let distribution = Distribution::lookup(&detected.stdout)?;
        let format = distribution.package_format();

        self.enter(BootstrapState::Downloading);
        info!("downloading cloudify-components package...");
        require(
            download(
                runner,
                &settings.packages_dir,
                &server_packages.components_package_url,
                format,
                verbose,
            ),
            "download components package",
            Some(PACKAGE_LOCATION_HINT),
        )?;

        info!("downloading cloudify-core package...");
        require(
            download(
                runner,
                &settings.packages_dir,
                &server_packages.core_package_url,
                format,
                verbose,
            ),
            "download core package",
            Some(PACKAGE_LOCATION_HINT),
        )?;

        match &server_packages.ui_package_url {
            Some(ui_url) => {
                info!("downloading cloudify-ui...");
                require(
                    download(runner, &settings.ui_dir, ui_url, format, verbose),
                    "download ui package",
                    Some(PACKAGE_LOCATION_HINT),
                )?;
            }
            None => debug!("ui url not configured in provider config. skipping ui installation."),
        }

        for (agent, agent_url) in agent_packages {
            info!("downloading agent package {}...", agent);
            require(
                download(runner, &settings.agents_dir, agent_url, format, verbose),
                &format!("download {}", agent_url),
                Some(PACKAGE_LOCATION_HINT),
            )?;
        }

        self.enter(BootstrapState::Unpacking);
        info!("unpacking cloudify-core packages...");
        require(
            unpack(runner, &settings.packages_dir, format, verbose),
            "unpack cloudify-core package",
            None,
        )?;

        self.enter(BootstrapState::InstallingComponents);
        info!("installing cloudify on {}...", request.public_ip);
        scripts::install_components(runner, &settings.components_dir)?;

        self.enter(BootstrapState::InstallingCore);
        scripts::install_core(runner, &settings.core_dir, &request.ssh_user, &request.private_ip)?;

        let ui_installed = server_packages.ui_package_url.is_some();
        if ui_installed {
            self.enter(BootstrapState::InstallingUi);
            info!("installing cloudify-ui...");
            require(unpack(runner, &settings.ui_dir, format, false), "install cloudify-ui", None)?;
            info!("cloudify-ui installation successful.");
        }

        self.enter(BootstrapState::InstallingAgents);
        if agent_packages.is_empty() {
            warn!("no agent packages configured. skipping agents installation.");
        } else {
            info!("deploying cloudify agents");
            require(
                unpack(runner, &settings.agents_dir, format, false),
                "install cloudify agents",
                None,
            )?;
            info!("cloudify agents installation successful.");
        }

        let mut dev_mode = None;
        if request.dev_mode {
            self.enter(BootstrapState::DevMode);
            match &config.dev {
                Some(modules) => dev_mode = Some(devmode::run_dev_mode(runner, modules)),
                None => warn!("dev mode requested but the config has no dev section. skipping."),
            }
            info!("management ip is {}", request.public_ip);
        }

        Ok(BootstrapReport {
            distribution,
            ui_installed,
            agents_installed: agent_packages.len(),
            dev_mode,
        })
    }
}
