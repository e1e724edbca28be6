//! Provider plugin interface.
//!
//! A provider creates and destroys the management host and validates its
//! own configuration. Bootstrapping the host afterwards is the same for
//! every provider, so [`Provider::bootstrap`] and
//! [`Provider::validate_schema`] are provided methods.

use std::sync::Arc;

use anyhow::Result;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::bootstrap::{BootstrapRequest, Bootstrapper};
use crate::config::ConfigDocument;
use crate::error::CfystrapError;
use crate::executor::CommandExecutor;
use crate::schema::{ValidationErrors, validate_schema};

/// Connection details of a provisioned management host.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionResult {
    /// The host to bootstrap. `dev_mode` is left for the caller to decide.
    pub request: BootstrapRequest,
    /// Provider-specific state needed later by `teardown`.
    pub provider_context: Value,
}

/// A cloud provider able to manage the management host's lifecycle.
pub trait Provider {
    /// The provider's configuration document.
    fn provider_config(&self) -> &ConfigDocument;

    /// The caller's output setting, used by [`Provider::bootstrap`].
    fn is_verbose(&self) -> bool;

    /// Creates the resources of the management host.
    fn provision(&self) -> Result<ProvisionResult>;

    /// Runs provider-specific validations, recording problems in `errors`.
    fn validate(&self, errors: &mut ValidationErrors);

    /// Destroys what `provision` created. Returns `true` on success.
    fn teardown(&self, provider_context: &Value, ignore_validation: bool) -> bool;

    /// Validates the configuration document against `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`CfystrapError::Schema`] if `schema` is not a valid schema.
    fn validate_schema(
        &self,
        schema: &Value,
        errors: &mut ValidationErrors,
    ) -> Result<(), CfystrapError> {
        validate_schema(schema, &self.provider_config().raw, errors)
    }

    /// Bootstraps the management software on the host described by
    /// `request`, carrying commands over SSH run through `executor`.
    fn bootstrap(&self, request: &BootstrapRequest, executor: Arc<dyn CommandExecutor>) -> bool {
        let session = request.open_session(executor);
        Bootstrapper::new(&self.provider_config().config, &session, self.is_verbose())
            .bootstrap(request)
    }
}

/// Provider for a host that already exists and is reachable over SSH.
///
/// Nothing is created or destroyed; `provision` hands back the supplied
/// connection details.
pub struct ExistingHostProvider {
    document: ConfigDocument,
    host: BootstrapRequest,
    verbose: bool,
}

impl ExistingHostProvider {
    /// Creates a provider for `host` configured by `document`.
    pub fn new(document: ConfigDocument, host: BootstrapRequest, verbose: bool) -> Self {
        Self {
            document,
            host,
            verbose,
        }
    }
}

impl Provider for ExistingHostProvider {
    fn provider_config(&self) -> &ConfigDocument {
        &self.document
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }

    fn provision(&self) -> Result<ProvisionResult> {
        info!("using existing host at {}", self.host.public_ip);
        Ok(ProvisionResult {
            request: self.host.clone(),
            provider_context: json!({
                "public_ip": self.host.public_ip,
                "private_ip": self.host.private_ip,
            }),
        })
    }

    fn validate(&self, errors: &mut ValidationErrors) {
        self.document.config.validate(errors);
    }

    fn teardown(&self, provider_context: &Value, _ignore_validation: bool) -> bool {
        debug!("nothing to tear down for existing host: {}", provider_context);
        true
    }
}
