//! Field definitions shared by software inputs and parameters.
//!
//! A `FieldSpec` comes from the software catalog. It describes one key a job
//! request may (or must) carry, how many values it accepts, and how each value
//! is checked and coerced.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Sentinel used by `max_cardinality` for "no upper bound".
pub const UNBOUNDED: i64 = -1;

/// Closed set of field kinds.
///
/// Every kind has exactly one validate-and-coerce routine in
/// [`crate::coerce::TokenCoercer::coerce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text, optionally constrained by a validator regex.
    #[default]
    String,
    /// Integer, decimal or scientific-notation real.
    Number,
    /// Single on/off value.
    Bool,
    /// Single on/off value rendered as a switch by wrappers.
    Flag,
    /// One of a fixed set of values.
    Enumeration,
    /// Reference to a file or folder. Used for software inputs.
    File,
}

impl FieldKind {
    /// Whether this kind only ever carries one value.
    pub fn is_single_valued(&self) -> bool {
        matches!(self, FieldKind::Bool | FieldKind::Flag)
    }

    /// Whether a validator regex applies to tokens of this kind.
    pub fn honors_validator(&self) -> bool {
        matches!(self, FieldKind::String | FieldKind::Number | FieldKind::File)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Bool => "bool",
            FieldKind::Flag => "flag",
            FieldKind::Enumeration => "enumeration",
            FieldKind::File => "file",
        };
        f.write_str(name)
    }
}

/// Errors raised when a catalog field definition is itself inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldSpecError {
    #[error("field key must not be blank")]
    BlankKey,

    #[error("{key} is hidden and required but declares no default value")]
    HiddenRequiredWithoutDefault { key: String },

    #[error("{key} has a negative minCardinality ({min})")]
    NegativeMinCardinality { key: String, min: i64 },

    #[error("{key} has an invalid maxCardinality ({max})")]
    InvalidMaxCardinality { key: String, max: i64 },

    #[error("{key} has maxCardinality {max} below minCardinality {min}")]
    CardinalityInverted { key: String, min: i64, max: i64 },

    #[error("{key} is an enumeration with no enumerated values")]
    EmptyEnumeration { key: String },
}

fn default_visible() -> bool {
    true
}

fn default_max_cardinality() -> i64 {
    1
}

/// Declared shape of one request field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    /// Request key.
    pub key: String,

    /// Value kind.
    #[serde(rename = "type", default)]
    pub kind: FieldKind,

    #[serde(default)]
    pub required: bool,

    #[serde(default = "default_visible")]
    pub visible: bool,

    #[serde(default)]
    pub min_cardinality: i64,

    /// Maximum number of values, or [`UNBOUNDED`].
    #[serde(default = "default_max_cardinality")]
    pub max_cardinality: i64,

    /// Default value. Strings may hold several values separated by the list
    /// delimiter; arrays are taken element by element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    /// Regex every token must match (search semantics). Ignored for
    /// enumeration, bool and flag kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enumerated_values: Vec<String>,
}

impl FieldSpec {
    /// Create a visible, optional, single-valued field of the given kind.
    pub fn new(key: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            kind,
            required: false,
            visible: true,
            min_cardinality: 0,
            max_cardinality: 1,
            default_value: None,
            validator: None,
            enumerated_values: Vec::new(),
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn cardinality(mut self, min: i64, max: i64) -> Self {
        self.min_cardinality = min;
        self.max_cardinality = max;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn validator(mut self, regex: impl Into<String>) -> Self {
        self.validator = Some(regex.into());
        self
    }

    pub fn enumerated_values(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.enumerated_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// True when `max_cardinality` places no upper bound.
    pub fn is_unbounded(&self) -> bool {
        self.max_cardinality == UNBOUNDED
    }

    /// Whether processed output for this field is a scalar rather than a sequence.
    pub fn emits_scalar(&self) -> bool {
        self.kind.is_single_valued() || self.max_cardinality == 1
    }

    /// Check the catalog-side invariants of this definition.
    pub fn validate(&self) -> Result<(), FieldSpecError> {
        if self.key.trim().is_empty() {
            return Err(FieldSpecError::BlankKey);
        }

        if !self.visible && self.required && self.default_value.is_none() {
            return Err(FieldSpecError::HiddenRequiredWithoutDefault {
                key: self.key.clone(),
            });
        }

        if self.min_cardinality < 0 {
            return Err(FieldSpecError::NegativeMinCardinality {
                key: self.key.clone(),
                min: self.min_cardinality,
            });
        }

        if self.max_cardinality < UNBOUNDED {
            return Err(FieldSpecError::InvalidMaxCardinality {
                key: self.key.clone(),
                max: self.max_cardinality,
            });
        }

        if !self.is_unbounded() && self.max_cardinality < self.min_cardinality {
            return Err(FieldSpecError::CardinalityInverted {
                key: self.key.clone(),
                min: self.min_cardinality,
                max: self.max_cardinality,
            });
        }

        if self.kind == FieldKind::Enumeration && self.enumerated_values.is_empty() {
            return Err(FieldSpecError::EmptyEnumeration {
                key: self.key.clone(),
            });
        }

        Ok(())
    }
}
