//! Domain-specific error types for cfystrap.
//!
//! This module defines `CfystrapError`, a `thiserror`-based enum that
//! provides typed error variants for the failure modes of validation and
//! bootstrapping. Public API functions return `Result<T, CfystrapError>`
//! for programmatic error handling, while trait boundaries continue to use
//! `anyhow::Result`.
//!
//! `CfystrapError` implements `Into<anyhow::Error>`, so the `?` operator
//! converts it automatically at trait boundaries that return `anyhow::Result`.

use std::io;

/// Formats an IO error kind into a human-readable message.
///
/// Provides consistent, user-friendly messages for common IO error kinds
/// (e.g., "I/O error: not found") instead of the OS-level messages
/// (e.g., "No such file or directory (os error 2)"). For unrecognized
/// error kinds, falls back to including the OS-level error message.
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        io::ErrorKind::IsADirectory => "I/O error: is a directory".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

/// Domain-specific error type for cfystrap.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CfystrapError {
    /// A validation constraint was violated.
    #[error("validation error: {0}")]
    Validation(String),

    /// A local command execution failed (spawn failure, wait failure, etc.).
    #[error("command execution failed: {command}: {status}")]
    Execution {
        /// The command that was executed.
        command: String,
        /// Human-readable reason for the failure.
        status: String,
    },

    /// A configuration file could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A configured package does not match the package format of the
    /// detected distribution.
    #[error("wrong package type: {expected} required, {found} supplied, in url: {url}")]
    IncompatiblePackage {
        /// The offending package URL.
        url: String,
        /// Extension the distribution requires (e.g. `.deb`).
        expected: String,
        /// Extension found in the URL, possibly empty.
        found: String,
    },

    /// The remote host reported a distribution outside the supported set.
    #[error("unsupported distribution: {0:?}")]
    UnknownDistribution(String),

    /// The remote distribution could not be identified at all.
    #[error("could not identify distribution: {0}")]
    DistributionDetection(String),

    /// A bootstrap pipeline stage exhausted its retries.
    #[error("{stage} failed: {message}")]
    Stage {
        /// The pipeline stage that failed.
        stage: String,
        /// Human-readable description including captured error output.
        message: String,
    },

    /// The JSON schema supplied for validation is itself invalid.
    #[error("schema is invalid. error: {0}")]
    Schema(String),

    /// An I/O operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// What was being done when the error occurred, usually a path.
        context: String,
        /// Message derived from [`io_error_kind_message`].
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl CfystrapError {
    /// Creates an `Io` variant with the `message` field automatically derived
    /// from the `source` via [`io_error_kind_message`].
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }

    /// Returns true for errors caused by the configuration rather than by the
    /// remote host.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Config(_)
                | Self::IncompatiblePackage { .. }
                | Self::UnknownDistribution(_)
                | Self::Schema(_)
        )
    }
}
