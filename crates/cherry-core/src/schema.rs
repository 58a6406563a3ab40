//! Static schema descriptors
//!
//! Every resource kind declares its input fields, output fields and the
//! output-to-input dependency edges the orchestration engine needs during
//! previews. Validation and the registry read these tables directly.

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;

/// One field of a resource schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    /// Wire name of the field
    pub name: &'static str,
    /// Whether the caller must supply the field
    pub required: bool,
    /// JSON literal applied when the field is absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    /// Human readable description
    pub description: &'static str,
}

impl FieldSpec {
    /// A required field
    pub const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            required: true,
            default: None,
            description,
        }
    }

    /// An optional field
    pub const fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            required: false,
            default: None,
            description,
        }
    }

    /// Attach a default value (JSON literal)
    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }
}

/// Declares that an output field is derived from some input fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDependency {
    /// Output field
    pub output: &'static str,
    /// Input fields it is derived from
    pub inputs: &'static [&'static str],
}

/// Full schema of one resource kind
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResourceSchema {
    /// Type token (e.g. `cherry-servers:index:Project`)
    pub token: &'static str,
    /// Human readable description
    pub description: &'static str,
    /// Desired input fields
    pub inputs: &'static [FieldSpec],
    /// Observed state fields
    pub outputs: &'static [FieldSpec],
    /// Output-to-input dependency edges
    pub dependencies: &'static [FieldDependency],
}

impl ResourceSchema {
    /// Look up an input field
    pub fn input(&self, name: &str) -> Option<&FieldSpec> {
        self.inputs.iter().find(|field| field.name == name)
    }

    /// Input fields an output field depends on
    pub fn dependencies_of(&self, output: &str) -> Option<&'static [&'static str]> {
        self.dependencies
            .iter()
            .find(|dep| dep.output == output)
            .map(|dep| dep.inputs)
    }

    /// Validate raw inputs against the descriptor
    ///
    /// Rejects non-object inputs, unknown fields, and required fields that
    /// are absent or null.
    pub fn validate(&self, inputs: &serde_json::Value) -> Result<()> {
        let object = inputs.as_object().ok_or_else(|| {
            Error::validation(format!("{}: inputs must be an object", self.token))
        })?;

        if let Some(unknown) = object.keys().find(|key| self.input(key).is_none()) {
            return Err(Error::validation(format!(
                "{}: unknown input field '{}'",
                self.token, unknown
            )));
        }

        let missing: Vec<&str> = self
            .inputs
            .iter()
            .filter(|field| field.required)
            .filter(|field| object.get(field.name).is_none_or(|v| v.is_null()))
            .map(|field| field.name)
            .collect();

        if !missing.is_empty() {
            return Err(Error::validation(format!(
                "{}: missing required field(s): {}",
                self.token,
                missing.join(", ")
            )));
        }

        Ok(())
    }

    /// Check the dependency table against the output fields
    ///
    /// Every output must appear exactly once with at least one dependency,
    /// and every dependency must name a declared input.
    pub fn check_dependencies(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for dep in self.dependencies {
            if !self.outputs.iter().any(|field| field.name == dep.output) {
                return Err(Error::validation(format!(
                    "{}: dependency declared for unknown output '{}'",
                    self.token, dep.output
                )));
            }
            if !seen.insert(dep.output) {
                return Err(Error::validation(format!(
                    "{}: output '{}' declared more than once",
                    self.token, dep.output
                )));
            }
            if dep.inputs.is_empty() {
                return Err(Error::validation(format!(
                    "{}: output '{}' has no dependencies",
                    self.token, dep.output
                )));
            }
            if let Some(input) = dep.inputs.iter().find(|name| self.input(name).is_none()) {
                return Err(Error::validation(format!(
                    "{}: output '{}' depends on unknown input '{}'",
                    self.token, dep.output, input
                )));
            }
        }

        if let Some(field) = self.outputs.iter().find(|field| !seen.contains(field.name)) {
            return Err(Error::validation(format!(
                "{}: output '{}' has no declared dependency",
                self.token, field.name
            )));
        }

        Ok(())
    }
}
