mod helpers;

use cfystrap::CfystrapError;
use cfystrap::bootstrap::{BootstrapState, Bootstrapper};
use cfystrap::config::parse_config;
use cfystrap::distro::Distribution;
use cfystrap::executor::OutputMode;
use helpers::{RecordingRemote, config_yaml, provider_config, request};

#[test]
fn ubuntu_bootstrap_issues_commands_in_order() {
    let config = provider_config("deb", true, &["ubuntu_agent"]);
    let remote = RecordingRemote::new("Ubuntu");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    let report = bootstrapper.run(&request(false)).expect("bootstrap should succeed");

    assert_eq!(
        remote.commands(),
        vec![
            "sudo wget 'http://repo.example.com/cloudify-components.deb' -P /cloudify",
            "sudo wget 'http://repo.example.com/cloudify-core.deb' -P /cloudify",
            "sudo wget 'http://repo.example.com/cloudify-ui.deb' -P /cloudify-ui",
            "sudo wget 'http://repo.example.com/ubuntu_agent.deb' -P /cloudify-agents",
            "sudo dpkg -i /cloudify/*.deb",
            "sudo /cloudify-components/cloudify-components-bootstrap.sh",
            "sudo /cloudify-core/cloudify-core-bootstrap.sh ubuntu 192.168.0.10",
            "sudo dpkg -i /cloudify-ui/*.deb",
            "sudo dpkg -i /cloudify-agents/*.deb",
        ]
    );
    assert_eq!(remote.probe_count(), 1);
    assert_eq!(report.distribution, Distribution::Ubuntu);
    assert!(report.ui_installed);
    assert_eq!(report.agents_installed, 1);
    assert!(report.dev_mode.is_none());
    assert_eq!(bootstrapper.state(), BootstrapState::Done);
}

#[test]
fn successful_bootstrap_walks_every_state() {
    let config = provider_config("deb", true, &["ubuntu_agent"]);
    let remote = RecordingRemote::new("Ubuntu");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    assert!(bootstrapper.bootstrap(&request(false)));
    assert_eq!(
        bootstrapper.history(),
        &[
            BootstrapState::Idle,
            BootstrapState::DetectingDistro,
            BootstrapState::CheckingCompatibility,
            BootstrapState::Downloading,
            BootstrapState::Unpacking,
            BootstrapState::InstallingComponents,
            BootstrapState::InstallingCore,
            BootstrapState::InstallingUi,
            BootstrapState::InstallingAgents,
            BootstrapState::Done,
        ]
    );
}

#[test]
fn undetectable_distribution_stops_before_any_install() {
    let config = provider_config("deb", true, &["ubuntu_agent"]);
    let remote = RecordingRemote::undetectable();
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    let err = bootstrapper.run(&request(false)).unwrap_err();

    assert!(matches!(err, CfystrapError::DistributionDetection(_)));
    assert!(remote.commands().is_empty());
    assert_eq!(bootstrapper.state(), BootstrapState::Failed);
}

#[test]
fn distribution_probe_is_retried() {
    let yaml = config_yaml("deb", false, &[]).replace("retries: 1", "retries: 2");
    let config = parse_config(&yaml).unwrap().config;
    let remote = RecordingRemote::undetectable();
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    assert!(!bootstrapper.bootstrap(&request(false)));
    assert_eq!(remote.probe_count(), 2);
}

#[test]
fn incompatible_package_stops_before_downloads() {
    let config = provider_config("rpm", true, &["ubuntu_agent"]);
    let remote = RecordingRemote::new("Ubuntu");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    let err = bootstrapper.run(&request(false)).unwrap_err();

    match err {
        CfystrapError::IncompatiblePackage { url, expected, found } => {
            assert_eq!(url, "http://repo.example.com/cloudify-components.rpm");
            assert_eq!(expected, ".deb");
            assert_eq!(found, ".rpm");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(remote.commands().is_empty());
}

#[test]
fn incompatible_agent_package_stops_before_downloads() {
    let yaml = config_yaml("deb", false, &["centos_agent"])
        .replace("centos_agent.deb", "centos_agent.rpm");
    let config = parse_config(&yaml).unwrap().config;
    let remote = RecordingRemote::new("Ubuntu");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    assert!(!bootstrapper.bootstrap(&request(false)));
    assert!(remote.commands().is_empty());
}

#[test]
fn unknown_distribution_is_rejected() {
    let config = provider_config("deb", false, &[]);
    let remote = RecordingRemote::new("arch");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    let err = bootstrapper.run(&request(false)).unwrap_err();

    assert!(matches!(err, CfystrapError::UnknownDistribution(name) if name == "arch"));
    assert!(remote.commands().is_empty());
}

#[test]
fn missing_ui_url_skips_ui_stage() {
    let config = provider_config("deb", false, &["ubuntu_agent"]);
    let remote = RecordingRemote::new("Ubuntu");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    let report = bootstrapper.run(&request(false)).unwrap();

    assert!(!report.ui_installed);
    assert!(remote.commands().iter().all(|cmd| !cmd.contains("cloudify-ui")));
    assert!(!bootstrapper.history().contains(&BootstrapState::InstallingUi));
}

#[test]
fn centos_uses_curl_and_rpm() {
    let config = provider_config("rpm", true, &["centos_agent"]);
    let remote = RecordingRemote::new("centos");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    let report = bootstrapper.run(&request(false)).unwrap();

    assert_eq!(report.distribution, Distribution::CentOs);
    let commands = remote.commands();
    assert_eq!(
        commands[0],
        "sudo mkdir -p /cloudify && cd /cloudify && \
         sudo curl --fail -O 'http://repo.example.com/cloudify-components.rpm'"
    );
    assert!(commands.contains(&"sudo rpm -i /cloudify/*.rpm".to_string()));
    assert!(commands.contains(&"sudo rpm -i /cloudify-ui/*.rpm".to_string()));
    assert!(commands.contains(&"sudo rpm -i /cloudify-agents/*.rpm".to_string()));
    assert!(commands.iter().all(|cmd| !cmd.contains("wget") && !cmd.contains("dpkg")));
}

#[test]
fn failed_stage_ends_the_pipeline() {
    let config = provider_config("deb", true, &["ubuntu_agent"]);
    let remote = RecordingRemote::new("Ubuntu").failing_on("cloudify-core-bootstrap.sh");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    let err = bootstrapper.run(&request(false)).unwrap_err();

    assert_stage(err, "install cloudify-core package");
    let commands = remote.commands();
    assert!(commands.last().unwrap().contains("cloudify-core-bootstrap.sh"));
    assert!(commands.iter().all(|cmd| !cmd.contains("/cloudify-ui/*.deb")));
    assert_eq!(bootstrapper.state(), BootstrapState::Failed);
    assert_eq!(bootstrapper.history().last(), Some(&BootstrapState::Failed));
}

fn assert_stage(err: CfystrapError, expected: &str) {
    match err {
        CfystrapError::Stage { stage, .. } => assert_eq!(stage, expected),
        other => panic!("unexpected error: {:?}", other),
    }
}

fn run_failing_on(needle: &str) -> (RecordingRemote, CfystrapError) {
    let config = provider_config("deb", true, &["ubuntu_agent"]);
    let remote = RecordingRemote::new("Ubuntu").failing_on(needle);
    let err = Bootstrapper::new(&config, &remote, false)
        .run(&request(false))
        .unwrap_err();
    (remote, err)
}

#[test]
fn failed_ui_download_stops_before_agents() {
    let (remote, err) = run_failing_on("cloudify-ui.deb");

    assert_stage(err, "download ui package");
    let commands = remote.commands();
    assert!(commands.last().unwrap().contains("cloudify-ui.deb"));
    assert!(commands.iter().all(|cmd| !cmd.contains("ubuntu_agent") && !cmd.contains("dpkg")));
}

#[test]
fn failed_agent_download_stops_before_unpack() {
    let (remote, err) = run_failing_on("ubuntu_agent.deb");

    assert_stage(err, "download http://repo.example.com/ubuntu_agent.deb");
    assert!(remote.commands().iter().all(|cmd| !cmd.contains("dpkg")));
}

#[test]
fn failed_unpack_stops_before_install_scripts() {
    let (remote, err) = run_failing_on("sudo dpkg -i /cloudify/*.deb");

    assert_stage(err, "unpack cloudify-core package");
    assert!(remote.commands().iter().all(|cmd| !cmd.contains("bootstrap.sh")));
}

#[test]
fn failed_ui_install_stops_before_agents() {
    let (remote, err) = run_failing_on("/cloudify-ui/*.deb");

    assert_stage(err, "install cloudify-ui");
    let commands = remote.commands();
    assert_eq!(commands.last().unwrap(), "sudo dpkg -i /cloudify-ui/*.deb");
    assert!(commands.iter().all(|cmd| !cmd.contains("/cloudify-agents/*.deb")));
}

#[test]
fn failed_agent_install_fails_the_bootstrap() {
    let (remote, err) = run_failing_on("/cloudify-agents/*.deb");

    assert_stage(err, "install cloudify agents");
    assert_eq!(remote.commands().last().unwrap(), "sudo dpkg -i /cloudify-agents/*.deb");
}

#[test]
fn package_url_with_query_string_is_incompatible() {
    let yaml = config_yaml("deb", false, &[])
        .replace("cloudify-core.deb", "cloudify-core.deb?token=secret");
    let config = parse_config(&yaml).unwrap().config;
    let remote = RecordingRemote::new("Ubuntu");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    let err = bootstrapper.run(&request(false)).unwrap_err();

    assert!(matches!(err, CfystrapError::IncompatiblePackage { .. }), "unexpected: {:?}", err);
    assert!(remote.commands().is_empty());
}

#[test]
fn failed_download_reports_failure() {
    let config = provider_config("deb", false, &[]);
    let remote = RecordingRemote::new("Ubuntu").failing_on("cloudify-core.deb");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    assert!(!bootstrapper.bootstrap(&request(false)));
    assert_eq!(remote.commands().len(), 2);
    assert!(remote.commands().iter().all(|cmd| !cmd.contains("dpkg")));
}

#[test]
fn quiet_caller_still_streams_install_scripts() {
    let config = provider_config("deb", true, &["ubuntu_agent"]);
    let remote = RecordingRemote::new("Ubuntu");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    assert!(bootstrapper.bootstrap(&request(false)));

    assert_eq!(remote.mode_of("/etc/os-release"), OutputMode::Quiet);
    assert_eq!(remote.mode_of("cloudify-components.deb"), OutputMode::Quiet);
    assert_eq!(remote.mode_of("cloudify-components-bootstrap.sh"), OutputMode::Stream);
    assert_eq!(remote.mode_of("cloudify-core-bootstrap.sh"), OutputMode::Stream);
    assert_eq!(remote.mode_of("/cloudify-ui/*.deb"), OutputMode::Quiet);
    assert!(!bootstrapper.verbose());
}

#[test]
fn verbose_caller_is_quiet_for_ui_and_agents() {
    let config = provider_config("deb", true, &["ubuntu_agent"]);
    let remote = RecordingRemote::new("Ubuntu");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, true);

    assert!(bootstrapper.bootstrap(&request(false)));

    assert_eq!(remote.mode_of("cloudify-components.deb"), OutputMode::Stream);
    assert_eq!(remote.mode_of("sudo dpkg -i /cloudify/*.deb"), OutputMode::Stream);
    assert_eq!(remote.mode_of("/cloudify-ui/*.deb"), OutputMode::Quiet);
    assert_eq!(remote.mode_of("/cloudify-agents/*.deb"), OutputMode::Quiet);
    assert!(bootstrapper.verbose());
}

#[test]
fn empty_agent_map_skips_agent_install() {
    let config = provider_config("deb", false, &[]);
    let remote = RecordingRemote::new("Ubuntu");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    let report = bootstrapper.run(&request(false)).unwrap();

    assert_eq!(report.agents_installed, 0);
    assert!(remote.commands().iter().all(|cmd| !cmd.contains("cloudify-agents")));
}

#[test]
fn configured_directories_are_used() {
    let yaml = format!(
        "{}  packages_dir: /opt/pkgs\n  core_dir: /opt/core\n",
        config_yaml("deb", false, &[])
    );
    let config = parse_config(&yaml).unwrap().config;
    let remote = RecordingRemote::new("debian");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    assert!(bootstrapper.bootstrap(&request(false)));

    let commands = remote.commands();
    assert!(commands.contains(&"sudo dpkg -i /opt/pkgs/*.deb".to_string()));
    let core_script = "sudo /opt/core/cloudify-core-bootstrap.sh ubuntu 192.168.0.10";
    assert!(commands.iter().any(|cmd| cmd == core_script));
}

const DEV_SECTION: &str = "dev:
  manager:
    virtualenv: /opt/manager
    preruns:
      - sudo apt-get update
    downloads:
      - http://repo.example.com/plugin.tar.gz
    installs:
      - /plugin
      - requests==2.0
    runs:
      - sudo service manager restart
";

fn dev_config() -> cfystrap::config::ProviderConfig {
    let yaml = format!("{}{}", config_yaml("deb", false, &[]), DEV_SECTION);
    parse_config(&yaml).unwrap().config
}

#[test]
fn dev_mode_runs_module_commands_in_order() {
    let config = dev_config();
    let remote = RecordingRemote::new("Ubuntu");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    let report = bootstrapper.run(&request(true)).unwrap();

    let commands = remote.commands();
    let dev_commands = &commands[commands.len() - 7..];
    assert_eq!(
        dev_commands,
        &[
            "sudo apt-get update",
            "mkdir -p /tmp//opt/manager",
            "sudo wget 'http://repo.example.com/plugin.tar.gz' -O /tmp/module.tar.gz",
            "sudo tar -C /tmp//opt/manager -xvf /tmp/module.tar.gz",
            "sudo /opt/manager/bin/pip --default-timeout=45 install \
             /tmp//opt/manager/plugin --upgrade --process-dependency-links",
            "sudo /opt/manager/bin/pip --default-timeout=45 install \
             requests==2.0 --upgrade --process-dependency-links",
            "sudo service manager restart",
        ]
    );
    let summary = report.dev_mode.expect("dev mode should have run");
    assert_eq!(summary.modules, 1);
    assert_eq!(summary.commands, 7);
    assert_eq!(summary.failed, 0);
    assert!(bootstrapper.history().contains(&BootstrapState::DevMode));
}

#[test]
fn dev_mode_failures_do_not_stop_the_stage() {
    let config = dev_config();
    let remote = RecordingRemote::new("Ubuntu").failing_on("apt-get update");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    let report = bootstrapper.run(&request(true)).expect("dev mode is best-effort");

    let summary = report.dev_mode.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.commands, 7);
    assert_eq!(remote.commands().last().unwrap(), "sudo service manager restart");
    assert_eq!(remote.mode_of("apt-get update"), OutputMode::Stream);
}

#[test]
fn dev_mode_is_skipped_unless_requested() {
    let config = dev_config();
    let remote = RecordingRemote::new("Ubuntu");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    let report = bootstrapper.run(&request(false)).unwrap();

    assert!(report.dev_mode.is_none());
    assert!(remote.commands().iter().all(|cmd| !cmd.contains("pip")));
}

#[test]
fn dev_mode_without_dev_section_is_skipped() {
    let config = provider_config("deb", false, &[]);
    let remote = RecordingRemote::new("Ubuntu");
    let mut bootstrapper = Bootstrapper::new(&config, &remote, false);

    let report = bootstrapper.run(&request(true)).unwrap();

    assert!(report.dev_mode.is_none());
    assert_eq!(bootstrapper.state(), BootstrapState::Done);
}
