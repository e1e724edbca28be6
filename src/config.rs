//! Provider configuration document.
//!
//! The document is YAML (JSON is accepted as well) and has the shape
//!
//! ```yaml
//! cloudify:
//!   server:
//!     packages:
//!       components_package_url: http://.../cloudify-components.deb
//!       core_package_url: http://.../cloudify-core.deb
//!       ui_package_url: http://.../cloudify-ui.deb   # optional
//!   agents:
//!     packages:
//!       ubuntu_agent_url: http://.../ubuntu-agent.deb
//! dev:                                               # optional
//!   manager:
//!     virtualenv: /opt/manager
//!     preruns: [...]
//!     downloads: [...]
//!     installs: [...]
//!     runs: [...]
//! bootstrap:                                         # optional
//!   retries: 3
//!   retry_delay_secs: 3
//! ```
//!
//! Other top-level keys belong to the concrete provider and are ignored here.

use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::CfystrapError;
use crate::retry::{DEFAULT_RETRIES, DEFAULT_RETRY_DELAY, RetryPolicy};
use crate::schema::ValidationErrors;

/// Category under which configuration errors are recorded.
pub const CONFIG_CATEGORY: &str = "config";

/// Typed provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProviderConfig {
    pub cloudify: CloudifyConfig,
    /// Developer-mode modules, in document order.
    #[serde(default)]
    pub dev: Option<IndexMap<String, DevModule>>,
    #[serde(default)]
    pub bootstrap: BootstrapSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CloudifyConfig {
    pub server: ServerConfig,
    pub agents: AgentsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    pub packages: ServerPackages,
}

/// Management server package URLs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerPackages {
    pub components_package_url: String,
    pub core_package_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_package_url: Option<String>,
}

impl ServerPackages {
    /// Returns `(key, url)` pairs for every configured server package.
    pub fn urls(&self) -> Vec<(&'static str, &str)> {
        let mut urls = vec![
            ("components_package_url", self.components_package_url.as_str()),
            ("core_package_url", self.core_package_url.as_str()),
        ];
        if let Some(ui) = &self.ui_package_url {
            urls.push(("ui_package_url", ui.as_str()));
        }
        urls
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AgentsConfig {
    /// Agent package URLs keyed by agent name, in document order.
    pub packages: IndexMap<String, String>,
}

/// One developer-mode module group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DevModule {
    /// Virtualenv the modules are installed into.
    pub virtualenv: String,
    #[serde(default)]
    pub preruns: Vec<String>,
    #[serde(default)]
    pub downloads: Vec<String>,
    #[serde(default)]
    pub installs: Vec<String>,
    #[serde(default)]
    pub runs: Vec<String>,
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_retry_delay_secs() -> u64 {
    DEFAULT_RETRY_DELAY.as_secs()
}

fn default_packages_dir() -> Utf8PathBuf {
    "/cloudify".into()
}

fn default_components_dir() -> Utf8PathBuf {
    "/cloudify-components".into()
}

fn default_core_dir() -> Utf8PathBuf {
    "/cloudify-core".into()
}

fn default_ui_dir() -> Utf8PathBuf {
    "/cloudify-ui".into()
}

fn default_agents_dir() -> Utf8PathBuf {
    "/cloudify-agents".into()
}

/// Retry policy and remote directory layout of a bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BootstrapSettings {
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Download directory of the components and core packages.
    #[serde(default = "default_packages_dir")]
    pub packages_dir: Utf8PathBuf,
    /// Directory holding the components install script.
    #[serde(default = "default_components_dir")]
    pub components_dir: Utf8PathBuf,
    /// Directory holding the core install script.
    #[serde(default = "default_core_dir")]
    pub core_dir: Utf8PathBuf,
    #[serde(default = "default_ui_dir")]
    pub ui_dir: Utf8PathBuf,
    #[serde(default = "default_agents_dir")]
    pub agents_dir: Utf8PathBuf,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            packages_dir: default_packages_dir(),
            components_dir: default_components_dir(),
            core_dir: default_core_dir(),
            ui_dir: default_ui_dir(),
            agents_dir: default_agents_dir(),
        }
    }
}

impl BootstrapSettings {
    /// Returns the retry policy described by these settings.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, Duration::from_secs(self.retry_delay_secs))
    }

    fn remote_dirs(&self) -> [(&'static str, &Utf8Path); 5] {
        [
            ("packages_dir", self.packages_dir.as_path()),
            ("components_dir", self.components_dir.as_path()),
            ("core_dir", self.core_dir.as_path()),
            ("ui_dir", self.ui_dir.as_path()),
            ("agents_dir", self.agents_dir.as_path()),
        ]
    }
}

impl ProviderConfig {
    /// Returns `(name, url)` pairs for every server and agent package.
    pub fn package_urls(&self) -> Vec<(&str, &str)> {
        let mut urls: Vec<(&str, &str)> = self.cloudify.server.packages.urls();
        urls.extend(
            self.cloudify
                .agents
                .packages
                .iter()
                .map(|(name, url)| (name.as_str(), url.as_str())),
        );
        urls
    }

    /// Checks the configuration, recording each problem in `errors`.
    pub fn validate(&self, errors: &mut ValidationErrors) {
        for (name, url) in self.package_urls() {
            if let Err(e) = Url::parse(url) {
                errors.push(
                    CONFIG_CATEGORY,
                    format!("{} is not a valid URL ({}): {}", name, e, url),
                );
            }
        }

        if self.bootstrap.retries == 0 {
            errors.push(CONFIG_CATEGORY, "bootstrap.retries must be at least 1");
        }
        for (name, dir) in self.bootstrap.remote_dirs() {
            if !dir.is_absolute() {
                errors.push(
                    CONFIG_CATEGORY,
                    format!("bootstrap.{} must be an absolute path: {}", name, dir),
                );
            }
        }

        if let Some(dev) = &self.dev {
            for (name, module) in dev {
                if module.virtualenv.trim().is_empty() {
                    errors.push(
                        CONFIG_CATEGORY,
                        format!("dev.{}.virtualenv must not be empty", name),
                    );
                }
                for download in &module.downloads {
                    if let Err(e) = Url::parse(download) {
                        errors.push(
                            CONFIG_CATEGORY,
                            format!(
                                "dev.{} download is not a valid URL ({}): {}",
                                name, e, download
                            ),
                        );
                    }
                }
            }
        }
    }
}

/// A loaded configuration: the typed view plus the raw document used for
/// schema validation.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    pub config: ProviderConfig,
    pub raw: Value,
}

fn read_document(path: &Utf8Path) -> Result<String, CfystrapError> {
    fs::read_to_string(path).map_err(|e| CfystrapError::io(path.as_str(), e))
}

/// Parses a configuration document from YAML or JSON text.
pub fn parse_config(text: &str) -> Result<ConfigDocument, CfystrapError> {
    let raw: Value = serde_yaml::from_str(text)
        .map_err(|e| CfystrapError::Config(format!("failed to parse document: {}", e)))?;
    let config: ProviderConfig = serde_yaml::from_str(text)
        .map_err(|e| CfystrapError::Config(format!("invalid provider config: {}", e)))?;
    Ok(ConfigDocument { config, raw })
}

/// Loads a configuration document from `path`.
pub fn load_config(path: &Utf8Path) -> Result<ConfigDocument, CfystrapError> {
    let text = read_document(path)?;
    parse_config(&text).map_err(|e| match e {
        CfystrapError::Config(msg) => CfystrapError::Config(format!("{}: {}", path, msg)),
        other => other,
    })
}

/// Loads a JSON schema (YAML or JSON) from `path`.
pub fn load_schema(path: &Utf8Path) -> Result<Value, CfystrapError> {
    let text = read_document(path)?;
    serde_yaml::from_str(&text)
        .map_err(|e| CfystrapError::Config(format!("{}: failed to parse schema: {}", path, e)))
}
