//! Software (app) definitions consumed from the catalog.
//!
//! A `Software` declares the inputs and parameters a job request may carry
//! and the resource defaults blank request values fall back to.

use intake_fields::{FieldSpec, FieldSpecError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

/// Errors for catalog definitions
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{software}: duplicate field key '{key}'")]
    DuplicateKey { software: String, key: String },

    #[error("{software}: {source}")]
    InvalidField {
        software: String,
        #[source]
        source: FieldSpecError,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resource defaults declared by a software definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareDefaults {
    /// `-1` is treated as "no default".
    #[serde(default, rename = "defaultNodeCount", skip_serializing_if = "Option::is_none")]
    pub default_nodes: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_processors_per_node: Option<i64>,

    /// GB per node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_memory_per_node: Option<f64>,

    /// `HH:MM:SS`; checked when a request falls back to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_max_run_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_queue: Option<String>,
}

/// A runnable software definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Software {
    /// Unique id, conventionally `name-version`.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// Execution system the software runs on.
    pub execution_system: String,
    #[serde(default)]
    pub inputs: Vec<FieldSpec>,
    #[serde(default)]
    pub parameters: Vec<FieldSpec>,
    #[serde(flatten)]
    pub defaults: SoftwareDefaults,
}

impl Software {
    pub fn new(id: impl Into<String>, execution_system: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            version: String::new(),
            execution_system: execution_system.into(),
            inputs: Vec::new(),
            parameters: Vec::new(),
            defaults: SoftwareDefaults::default(),
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<FieldSpec>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<FieldSpec>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_defaults(mut self, defaults: SoftwareDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Check every field definition and key uniqueness across inputs and
    /// parameters.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for spec in self.inputs.iter().chain(self.parameters.iter()) {
            spec.validate().map_err(|source| CatalogError::InvalidField {
                software: self.id.clone(),
                source,
            })?;
            if !seen.insert(spec.key.as_str()) {
                return Err(CatalogError::DuplicateKey {
                    software: self.id.clone(),
                    key: spec.key.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let software: Software = serde_json::from_str(json)?;
        software.validate()?;
        Ok(software)
    }

    /// Load and validate a definition from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
