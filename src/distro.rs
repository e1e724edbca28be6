//! Distribution identity and distribution-specific package handling.
//!
//! The remote host's distribution is detected once per bootstrap and decides
//! which package format is accepted and which commands download and install
//! packages.

use std::str::FromStr;

use camino::Utf8Path;
use percent_encoding::percent_decode_str;
use strum::{Display, EnumString};
use tracing::{debug, error};

use crate::error::CfystrapError;
use crate::remote::{CommandResult, RemoteCommand};
use crate::retry::RetryingRunner;

/// Shell snippet printing the distribution name of the host.
const DETECT_DISTRIBUTION: &str = "sh -c '. /etc/os-release 2>/dev/null && echo \"$ID\" \
    || python -c \"import platform; print(platform.dist()[0])\"'";

/// Supported operating-system distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Distribution {
    #[strum(serialize = "Ubuntu")]
    Ubuntu,
    #[strum(serialize = "debian")]
    Debian,
    #[strum(serialize = "centos")]
    CentOs,
    #[strum(to_string = "rhel", serialize = "redhat")]
    Rhel,
    #[strum(serialize = "fedora")]
    Fedora,
}

/// Native package format of a distribution family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PackageFormat {
    /// Debian family, installed with `dpkg`.
    #[strum(serialize = "deb")]
    Deb,
    /// RedHat family, installed with `rpm`.
    #[strum(serialize = "rpm")]
    Rpm,
}

impl Distribution {
    /// Returns the package format used by this distribution.
    pub fn package_format(self) -> PackageFormat {
        match self {
            Self::Ubuntu | Self::Debian => PackageFormat::Deb,
            Self::CentOs | Self::Rhel | Self::Fedora => PackageFormat::Rpm,
        }
    }

    /// Looks up a distribution by the name reported by the host.
    pub fn lookup(name: &str) -> Result<Self, CfystrapError> {
        Self::from_str(name.trim())
            .map_err(|_| CfystrapError::UnknownDistribution(name.trim().to_string()))
    }
}

impl PackageFormat {
    /// File extension of packages in this format, including the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Deb => ".deb",
            Self::Rpm => ".rpm",
        }
    }

    /// Builds the command fetching `url` into the remote directory `dir`.
    pub fn download_command(self, dir: &str, url: &str) -> RemoteCommand {
        match self {
            Self::Deb => RemoteCommand::new(["sudo", "wget", url, "-P", dir]),
            Self::Rpm => RemoteCommand::new(["sudo", "mkdir", "-p", dir])
                .and_then(RemoteCommand::new(["cd", dir]))
                .and_then(RemoteCommand::new(["sudo", "curl", "--fail", "-O", url])),
        }
    }

    /// Builds the command installing every package file found in `dir`.
    pub fn install_command(self, dir: &str) -> RemoteCommand {
        let pattern = format!("*{}", self.extension());
        match self {
            Self::Deb => RemoteCommand::new(["sudo", "dpkg", "-i"]).glob_arg(dir, &pattern),
            Self::Rpm => RemoteCommand::new(["sudo", "rpm", "-i"]).glob_arg(dir, &pattern),
        }
    }
}

/// Runs the distribution probe on the host.
///
/// On success the returned result's `stdout` holds the trimmed
/// distribution name.
pub fn detect_distribution(runner: &RetryingRunner<'_>, verbose: bool) -> CommandResult {
    debug!("identifying instance distribution...");
    let mut result = runner.run(&RemoteCommand::raw(DETECT_DISTRIBUTION), verbose);
    if result.succeeded {
        result.stdout = result.stdout.trim().to_string();
        if result.stdout.is_empty() {
            result.succeeded = false;
            result.stderr = "distribution probe printed nothing".to_string();
        }
    }
    result
}

/// Extracts the file extension (with dot) of the last path segment of `url`.
///
/// The segment is percent-decoded and taken verbatim, so a query string or
/// fragment stays part of the extension. Such URLs are rejected because the
/// downloaded file would not keep the package extension. Returns an empty
/// string when the file name has no extension.
pub fn package_extension(url: &str) -> String {
    let decoded = percent_decode_str(url).decode_utf8_lossy();
    let file = decoded.rsplit('/').next().unwrap_or_default();
    Utf8Path::new(file)
        .extension()
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// Checks that `url` points at a package in the format `distribution` expects.
///
/// An unrecognized distribution name is reported as incompatible.
pub fn check_package_url(url: &str, distribution: &str) -> bool {
    check_package_url_typed(url, distribution).is_ok()
}

/// Same as [`check_package_url`], returning the reason on mismatch.
pub fn check_package_url_typed(url: &str, distribution: &str) -> Result<(), CfystrapError> {
    debug!("checking distro-type match for url: {}", url);
    let expected = match Distribution::lookup(distribution) {
        Ok(distro) => distro.package_format().extension(),
        Err(e) => {
            error!("no package type known for distribution {:?} (url: {})", distribution, url);
            return Err(e);
        }
    };
    let found = package_extension(url);
    if found != expected {
        error!("wrong package type: {} required. {} supplied. in url: {}", expected, found, url);
        return Err(CfystrapError::IncompatiblePackage {
            url: url.to_string(),
            expected: expected.to_string(),
            found,
        });
    }
    Ok(())
}
