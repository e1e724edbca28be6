use std::sync::Mutex;

use camino::Utf8PathBuf;
use cfystrap::bootstrap::BootstrapRequest;
use cfystrap::config::{ProviderConfig, parse_config};
use cfystrap::executor::{CommandExecutor, CommandSpec, ExecutionResult, OutputMode};
use cfystrap::remote::{CommandResult, RemoteCommand, RemoteExecutor};

/// Fake remote host that records every command it is asked to run.
///
/// The distribution probe answers with the configured distribution name;
/// commands containing one of the `failing` needles fail; everything else
/// succeeds with empty output.
#[allow(dead_code)]
pub struct RecordingRemote {
    distro: Option<String>,
    failing: Vec<String>,
    calls: Mutex<Vec<(String, OutputMode)>>,
}

#[allow(dead_code)]
impl RecordingRemote {
    pub fn new(distro: &str) -> Self {
        Self {
            distro: Some(distro.to_string()),
            failing: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A host whose distribution probe always fails.
    pub fn undetectable() -> Self {
        Self {
            distro: None,
            failing: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Makes every command containing `needle` fail.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.failing.push(needle.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, OutputMode)> {
        self.calls.lock().unwrap().clone()
    }

    /// Commands issued after the distribution probe.
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|(cmd, _)| cmd)
            .filter(|cmd| !is_probe(cmd))
            .collect()
    }

    pub fn probe_count(&self) -> usize {
        self.calls().iter().filter(|(cmd, _)| is_probe(cmd)).count()
    }

    /// Output mode the first command containing `needle` ran with.
    pub fn mode_of(&self, needle: &str) -> OutputMode {
        self.calls()
            .into_iter()
            .find(|(cmd, _)| cmd.contains(needle))
            .map(|(_, mode)| mode)
            .unwrap_or_else(|| panic!("no command containing {:?} was run", needle))
    }
}

fn is_probe(command: &str) -> bool {
    command.contains("/etc/os-release")
}

impl RemoteExecutor for RecordingRemote {
    fn host(&self) -> &str {
        "10.0.0.1"
    }

    fn run(&self, command: &RemoteCommand, output: OutputMode) -> anyhow::Result<CommandResult> {
        let line = command.as_str().to_string();
        self.calls.lock().unwrap().push((line.clone(), output));

        if is_probe(&line) {
            return Ok(match &self.distro {
                Some(distro) => CommandResult::success(format!("{}\n", distro)),
                None => CommandResult::failure("python: command not found"),
            });
        }
        if self.failing.iter().any(|needle| line.contains(needle.as_str())) {
            return Ok(CommandResult::failure(format!("failed: {}", line)));
        }
        Ok(CommandResult::success(""))
    }
}

/// Fake local executor standing in for the `ssh` client.
#[allow(dead_code)]
pub struct MockCommandExecutor {
    code: Option<i32>,
    stdout: String,
    specs: Mutex<Vec<CommandSpec>>,
}

#[allow(dead_code)]
impl MockCommandExecutor {
    pub fn succeeding(stdout: &str) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.to_string(),
            specs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(code: i32) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            specs: Mutex::new(Vec::new()),
        }
    }

    pub fn specs(&self) -> Vec<CommandSpec> {
        self.specs.lock().unwrap().clone()
    }
}

impl CommandExecutor for MockCommandExecutor {
    fn execute(&self, spec: &CommandSpec) -> anyhow::Result<ExecutionResult> {
        self.specs.lock().unwrap().push(spec.clone());
        Ok(ExecutionResult {
            code: self.code,
            stdout: self.stdout.clone(),
            stderr: if self.code == Some(0) {
                String::new()
            } else {
                "remote command failed".to_string()
            },
        })
    }
}

/// Builds a provider config YAML with packages of the given extension.
///
/// Retries are limited to one attempt without delay so failing commands
/// are issued exactly once.
#[allow(dead_code)]
pub fn config_yaml(ext: &str, with_ui: bool, agents: &[&str]) -> String {
    let mut yaml = format!(
        "cloudify:
  server:
    packages:
      components_package_url: http://repo.example.com/cloudify-components.{ext}
      core_package_url: http://repo.example.com/cloudify-core.{ext}
"
    );
    if with_ui {
        yaml.push_str(&format!(
            "      ui_package_url: http://repo.example.com/cloudify-ui.{ext}\n"
        ));
    }
    yaml.push_str("  agents:\n    packages:");
    if agents.is_empty() {
        yaml.push_str(" {}\n");
    } else {
        yaml.push('\n');
        for agent in agents {
            yaml.push_str(&format!(
                "      {agent}: http://repo.example.com/{agent}.{ext}\n"
            ));
        }
    }
    yaml.push_str("bootstrap:\n  retries: 1\n  retry_delay_secs: 0\n");
    yaml
}

#[allow(dead_code)]
pub fn provider_config(ext: &str, with_ui: bool, agents: &[&str]) -> ProviderConfig {
    parse_config(&config_yaml(ext, with_ui, agents))
        .expect("test config should parse")
        .config
}

#[allow(dead_code)]
pub fn request(dev_mode: bool) -> BootstrapRequest {
    BootstrapRequest {
        public_ip: "10.0.0.1".to_string(),
        private_ip: "192.168.0.10".to_string(),
        ssh_key: Utf8PathBuf::from("/home/ubuntu/.ssh/id_rsa"),
        ssh_user: "ubuntu".to_string(),
        dev_mode,
    }
}
