//! Schema validation of provider configuration documents.
//!
//! The schema engine is the `jsonschema` crate (Draft 4); this module only
//! adapts its errors into a [`ValidationErrors`] accumulator owned by the
//! caller.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::error::CfystrapError;

/// Category under which schema violations are recorded.
pub const SCHEMA_CATEGORY: &str = "schema";

/// Validation errors grouped by category.
///
/// Created by the caller and passed by `&mut` into every validation step,
/// so errors from several steps accumulate in one place.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` under `category`.
    pub fn push(&mut self, category: impl Into<String>, message: impl Into<String>) {
        self.0.entry(category.into()).or_default().push(message.into());
    }

    /// Returns true if no error has been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of recorded errors across all categories.
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Returns the errors recorded under `category`.
    pub fn get(&self, category: &str) -> &[String] {
        self.0.get(category).map(Vec::as_slice).unwrap_or_default()
    }

    /// Iterates over categories and their errors, in category order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Validates `document` against `schema`, appending violations to `errors`.
///
/// # Errors
///
/// Returns [`CfystrapError::Schema`] if the schema itself cannot be compiled.
/// Violations of a valid schema are not errors; they are recorded in
/// `errors` under [`SCHEMA_CATEGORY`].
pub fn validate_schema(
    schema: &Value,
    document: &Value,
    errors: &mut ValidationErrors,
) -> Result<(), CfystrapError> {
    debug!("validating config file against provided schema...");
    let validator = jsonschema::draft4::new(schema).map_err(|e| {
        error!("schema is invalid. error: {}", e);
        CfystrapError::Schema(e.to_string())
    })?;

    let mut found = Vec::new();
    for violation in validator.iter_errors(document) {
        let key = violation.instance_path.to_string();
        let key = key.trim_start_matches('/').replace('/', ".");
        found.push(format!(
            "config file validation error originating at key: {}, {}",
            key, violation
        ));
    }

    if found.is_empty() {
        info!("schema validated successfully");
        return Ok(());
    }

    error!("VALIDATION ERROR:{}", found.join(";\n"));
    for message in found {
        errors.push(SCHEMA_CATEGORY, message);
    }
    error!("schema validation failed!");
    Ok(())
}
