//! Effective intake configuration with provenance
//!
//! The merged JSON document is kept alongside the typed settings so callers
//! can report exactly which sources contributed.

use intake_fields::Normalizer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::resources::RunTime;

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Typed view of the merged configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    pub list_delimiter: String,
    pub serialized_list_delimiter: Option<String>,
    /// Lower-cased URI schemes accepted for inputs.
    pub supported_schemes: Vec<String>,
    pub max_requested_time: RunTime,

    /// The merged configuration object
    pub merged: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            list_delimiter: defaults.list_delimiter.clone(),
            serialized_list_delimiter: None,
            supported_schemes: defaults.supported_schemes.clone(),
            max_requested_time: RunTime::DEFAULT_CEILING,
            merged: defaults.to_value(),
            sources: vec![ConfigSource {
                origin: ConfigOrigin::Builtin,
                path: None,
                digest: None,
            }],
        }
    }
}

impl IntakeConfig {
    /// Build the configuration from built-in defaults, an optional host TOML
    /// file and CLI overrides.
    ///
    /// A host path that does not exist is skipped.
    pub fn build(host_config_path: Option<&Path>, cli_overrides: Option<Value>) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        layers.push(BuiltinDefaults::default().to_value());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        });

        if let Some(path) = host_config_path {
            if path.exists() {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::Host,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            }
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        Self::from_merged(merged, sources)
    }

    fn from_merged(merged: Value, sources: Vec<ConfigSource>) -> Result<Self, ConfigError> {
        let list_delimiter = match merged.pointer("/fields/list_delimiter") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => {
                return Err(ConfigError::ValidationError(
                    "fields.list_delimiter must be a non-empty string".to_string(),
                ))
            }
        };

        let serialized_list_delimiter = match merged.pointer("/fields/serialized_list_delimiter") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(ConfigError::ValidationError(
                    "fields.serialized_list_delimiter must be a string".to_string(),
                ))
            }
        };

        let supported_schemes = match merged.pointer("/inputs/supported_schemes") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .filter(|s| !s.trim().is_empty())
                        .map(|s| s.trim().to_lowercase())
                        .ok_or_else(|| {
                            ConfigError::ValidationError(
                                "inputs.supported_schemes must contain only non-empty strings"
                                    .to_string(),
                            )
                        })
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => {
                return Err(ConfigError::ValidationError(
                    "inputs.supported_schemes must be an array".to_string(),
                ))
            }
        };

        let max_requested_time = match merged.pointer("/resources/max_requested_time") {
            Some(Value::String(s)) => s.parse::<RunTime>().map_err(|e| {
                ConfigError::ValidationError(format!("resources.max_requested_time: {}", e))
            })?,
            _ => {
                return Err(ConfigError::ValidationError(
                    "resources.max_requested_time must be an HH:MM:SS string".to_string(),
                ))
            }
        };

        if max_requested_time.is_zero() {
            return Err(ConfigError::ValidationError(
                "resources.max_requested_time must be greater than 00:00:00".to_string(),
            ));
        }

        Ok(Self {
            list_delimiter,
            serialized_list_delimiter,
            supported_schemes,
            max_requested_time,
            merged,
            sources,
        })
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;

        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((toml_to_json(toml_value), digest))
    }

    /// Normalizer configured with this config's delimiters.
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(
            self.list_delimiter.clone(),
            self.serialized_list_delimiter.clone(),
        )
    }

    /// Ceiling for requested run times.
    pub fn ceiling(&self) -> RunTime {
        self.max_requested_time
    }

    /// Whether `scheme` is accepted for inputs (case-insensitive).
    pub fn supports_scheme(&self, scheme: &str) -> bool {
        let scheme = scheme.to_lowercase();
        self.supported_schemes.iter().any(|s| *s == scheme)
    }

    /// Get a merged config value by path (dot-separated)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.merged;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }
}

/// Convert TOML Value to JSON Value
pub(crate) fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_build_with_defaults_only() {
        let config = IntakeConfig::build(None, None).unwrap();

        assert_eq!(config.list_delimiter, ";");
        assert!(config.serialized_list_delimiter.is_none());
        assert!(config.supports_scheme("AGAVE"));
        assert!(!config.supports_scheme("file"));
        assert_eq!(config.ceiling(), RunTime::DEFAULT_CEILING);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].origin, ConfigOrigin::Builtin);
    }

    #[test]
    fn test_build_with_cli_override() {
        let cli = serde_json::json!({"fields": {"serialized_list_delimiter": ","}});
        let config = IntakeConfig::build(None, Some(cli)).unwrap();

        assert_eq!(config.serialized_list_delimiter.as_deref(), Some(","));
        assert_eq!(config.list_delimiter, ";");
        assert_eq!(config.sources.last().unwrap().origin, ConfigOrigin::Cli);
    }

    #[test]
    fn test_load_host_toml() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[inputs]").unwrap();
        writeln!(temp, "supported_schemes = [\"agave\", \"S3\"]").unwrap();
        writeln!(temp, "[resources]").unwrap();
        writeln!(temp, "max_requested_time = \"48:00:00\"").unwrap();

        let config = IntakeConfig::build(Some(temp.path()), None).unwrap();

        assert_eq!(config.supported_schemes, vec!["agave", "s3"]);
        assert_eq!(config.ceiling().to_string(), "48:00:00");
        assert_eq!(config.sources[1].origin, ConfigOrigin::Host);
        assert_eq!(config.sources[1].digest.as_ref().unwrap().len(), 64);
        assert_eq!(config.get("fields.list_delimiter"), Some(&Value::from(";")));
    }

    #[test]
    fn test_missing_host_file_skipped() {
        let config = IntakeConfig::build(Some(Path::new("/nonexistent/intake.toml")), None).unwrap();
        assert_eq!(config.sources.len(), 1);
    }

    #[test]
    fn test_invalid_toml() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[inputs").unwrap();

        let err = IntakeConfig::build(Some(temp.path()), None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validation_errors() {
        let cli = serde_json::json!({"resources": {"max_requested_time": "1:00:00"}});
        let err = IntakeConfig::build(None, Some(cli)).unwrap_err();
        assert!(err.to_string().contains("max_requested_time"));

        let cli = serde_json::json!({"fields": {"list_delimiter": ""}});
        assert!(IntakeConfig::build(None, Some(cli)).is_err());

        let cli = serde_json::json!({"inputs": {"supported_schemes": "http"}});
        assert!(IntakeConfig::build(None, Some(cli)).is_err());
    }
}
