//! Field validation errors.

use serde::{Deserialize, Serialize};

/// Why a request field was rejected.
///
/// Every variant names the offending key so the message can be shown to the
/// requester as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldError {
    #[error("Invalid value for {key}. {key} is a fixed value that cannot be set manually.")]
    HiddenFieldSupplied { key: String },

    #[error("No value specified for {key}")]
    MissingRequired { key: String },

    #[error("{key} requires at least {min} values")]
    TooFewValues { key: String, min: i64, got: usize },

    #[error("{key} may have at most {max} values")]
    TooManyValues { key: String, max: i64, got: usize },

    #[error("Invalid value for {key}. Boolean and flag parameters do not support multiple values.")]
    MultipleBooleanValues { key: String },

    #[error("Invalid value, '{value}', for {key}. Value must match the regular expression {validator}")]
    ValidatorMismatch {
        key: String,
        value: String,
        validator: String,
    },

    #[error("Unable to validate {key}. The validator {validator} is not a valid regular expression.")]
    InvalidValidator { key: String, validator: String },

    #[error("Invalid value for {key}. Value '{value}' must be a number.")]
    NotANumber { key: String, value: String },

    #[error(
        "Invalid value for {key}. Value {value} must be a case-insensitive truthy value. \
         1, on, or true evaluate to true. 0, off, and false evaluate to false."
    )]
    NotABoolean { key: String, value: String },

    #[error("Invalid value, '{value}', for {key}. Value must be one of: {}", .allowed.join(", "))]
    NotEnumerated {
        key: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("Invalid value for {key}. Value must be one of: (none defined)")]
    EmptyEnumeration { key: String },

    #[error("Unsupported value {value} for {key}. Values must be strings, numbers, booleans or arrays of them.")]
    UnsupportedValue { key: String, value: String },

    #[error("Invalid default value for {key}: {reason}")]
    InvalidDefault { key: String, reason: String },

    #[error("Invalid value for {key}. {reason}")]
    Rejected { key: String, reason: String },
}

impl FieldError {
    /// Key of the field that failed.
    pub fn key(&self) -> &str {
        match self {
            FieldError::HiddenFieldSupplied { key }
            | FieldError::MissingRequired { key }
            | FieldError::TooFewValues { key, .. }
            | FieldError::TooManyValues { key, .. }
            | FieldError::MultipleBooleanValues { key }
            | FieldError::ValidatorMismatch { key, .. }
            | FieldError::InvalidValidator { key, .. }
            | FieldError::NotANumber { key, .. }
            | FieldError::NotABoolean { key, .. }
            | FieldError::NotEnumerated { key, .. }
            | FieldError::EmptyEnumeration { key }
            | FieldError::UnsupportedValue { key, .. }
            | FieldError::InvalidDefault { key, .. }
            | FieldError::Rejected { key, .. } => key,
        }
    }

    /// Whether the failure is a cardinality violation.
    pub fn is_cardinality(&self) -> bool {
        matches!(
            self,
            FieldError::TooFewValues { .. }
                | FieldError::TooManyValues { .. }
                | FieldError::MultipleBooleanValues { .. }
        )
    }
}
