//! Raw request value normalization.
//!
//! Flattens whatever the requester sent for one key (nothing, null, a scalar,
//! an array, or a delimited string) into an ordered list of trimmed tokens.

use serde_json::Value;

/// Delimiter used to split a single string into several values.
pub const DEFAULT_LIST_DELIMITER: &str = ";";

/// A value of a shape no field kind can hold (objects).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported value {0}")]
pub struct UnsupportedValue(pub String);

/// Result of normalizing one raw request field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedValue {
    /// At least one raw entry was supplied for the key.
    pub present: bool,
    /// Non-blank, trimmed tokens in request order. Duplicates are kept.
    pub tokens: Vec<String>,
    /// Number of null, empty or whitespace-only entries seen.
    pub blanks: usize,
}

impl NormalizedValue {
    /// The key was not in the request at all.
    pub fn absent() -> Self {
        Self::default()
    }

    /// Value count used for cardinality checks.
    ///
    /// Blank entries only count when nothing else was supplied, which is what
    /// separates "present but empty" from "absent".
    pub fn count(&self) -> usize {
        if self.tokens.is_empty() {
            self.blanks
        } else {
            self.tokens.len()
        }
    }

    /// No non-blank token survived normalization.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn push(&mut self, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            self.blanks += 1;
        } else {
            self.tokens.push(trimmed.to_string());
        }
    }
}

/// Splits and trims raw request values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    list_delimiter: String,
    serialized_list_delimiter: Option<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            list_delimiter: DEFAULT_LIST_DELIMITER.to_string(),
            serialized_list_delimiter: None,
        }
    }
}

impl Normalizer {
    /// Create a normalizer.
    ///
    /// `serialized_list_delimiter` is the reserved delimiter front ends use
    /// when they join JSON arrays into one string; when a string contains it,
    /// it takes precedence over `list_delimiter`.
    pub fn new(list_delimiter: impl Into<String>, serialized_list_delimiter: Option<String>) -> Self {
        Self {
            list_delimiter: list_delimiter.into(),
            serialized_list_delimiter: serialized_list_delimiter.filter(|d| !d.is_empty()),
        }
    }

    /// Normalize the raw value stored under one key, `None` meaning absent.
    pub fn normalize(&self, raw: Option<&Value>) -> Result<NormalizedValue, UnsupportedValue> {
        let mut normalized = NormalizedValue::absent();
        let Some(raw) = raw else {
            return Ok(normalized);
        };

        normalized.present = true;
        match raw {
            Value::String(s) => self.split_into(s, &mut normalized),
            Value::Array(items) => Self::flatten_into(items, &mut normalized)?,
            other => Self::push_scalar(other, &mut normalized)?,
        }

        Ok(normalized)
    }

    /// Split a single string on the reserved delimiter, falling back to the
    /// list delimiter.
    fn split_into(&self, s: &str, out: &mut NormalizedValue) {
        if s.trim().is_empty() {
            out.blanks += 1;
            return;
        }

        let delimiter = match &self.serialized_list_delimiter {
            Some(reserved) if s.contains(reserved.as_str()) => reserved.as_str(),
            _ => self.list_delimiter.as_str(),
        };

        if delimiter.is_empty() {
            out.push(s);
            return;
        }

        for piece in s.split(delimiter) {
            out.push(piece);
        }
    }

    fn flatten_into(items: &[Value], out: &mut NormalizedValue) -> Result<(), UnsupportedValue> {
        for item in items {
            match item {
                Value::Array(nested) => Self::flatten_into(nested, out)?,
                Value::String(s) => out.push(s),
                other => Self::push_scalar(other, out)?,
            }
        }
        Ok(())
    }

    fn push_scalar(value: &Value, out: &mut NormalizedValue) -> Result<(), UnsupportedValue> {
        match value {
            Value::Null => out.blanks += 1,
            Value::Bool(b) => out.push(if *b { "true" } else { "false" }),
            Value::Number(n) => out.push(&n.to_string()),
            Value::String(s) => out.push(s),
            Value::Array(_) | Value::Object(_) => {
                return Err(UnsupportedValue(value.to_string()));
            }
        }
        Ok(())
    }
}
