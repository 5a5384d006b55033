//! Per-kind token validation and coercion.

use regex_lite::Regex;
use serde_json::Value;

use crate::error::FieldError;
use crate::spec::{FieldKind, FieldSpec};

const TRUTHY: &[&str] = &["true", "1", "on"];
const FALSY: &[&str] = &["false", "0", "off"];

/// Exponents beyond this are rejected rather than expanded.
const MAX_EXPONENT: i64 = 4096;

/// Parse a case-insensitive truthy/falsy token.
pub fn parse_bool(token: &str) -> Option<bool> {
    let lowered = token.trim().to_ascii_lowercase();
    if TRUTHY.contains(&lowered.as_str()) {
        Some(true)
    } else if FALSY.contains(&lowered.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Render a numeric token in plain decimal form.
///
/// Accepts an optional sign, integer digits, an optional fraction (a leading
/// `.` is allowed) and an optional exponent. Scientific notation is expanded
/// (`2e8` → `200000000`, `.5` → `0.5`). Returns `None` for anything else.
pub fn canonical_decimal(token: &str) -> Option<String> {
    let bytes = token.as_bytes();
    let mut pos = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    let int_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let int_digits = &token[int_start..pos];

    let mut frac_digits = "";
    if pos < bytes.len() && bytes[pos] == b'.' {
        pos += 1;
        let frac_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        frac_digits = &token[frac_start..pos];
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return None;
    }

    let mut exponent: i64 = 0;
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        pos += 1;
        let exp_start = pos;
        if pos < bytes.len() && (bytes[pos] == b'-' || bytes[pos] == b'+') {
            pos += 1;
        }
        let digits_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if digits_start == pos {
            return None;
        }
        exponent = token[exp_start..pos].parse().ok()?;
        if exponent.abs() > MAX_EXPONENT {
            return None;
        }
    }

    if pos != bytes.len() {
        return None;
    }

    let digits = format!("{}{}", int_digits, frac_digits);
    let point = int_digits.len() as i64 + exponent;

    let (int_part, frac_part) = if point <= 0 {
        (
            "0".to_string(),
            format!("{}{}", "0".repeat((-point) as usize), digits),
        )
    } else if point as usize >= digits.len() {
        (
            format!("{}{}", digits, "0".repeat(point as usize - digits.len())),
            String::new(),
        )
    } else {
        let split = point as usize;
        (digits[..split].to_string(), digits[split..].to_string())
    };

    let int_part = match int_part.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };

    let mut rendered = String::new();
    let is_zero = int_part == "0" && frac_part.chars().all(|c| c == '0');
    if negative && !is_zero {
        rendered.push('-');
    }
    rendered.push_str(int_part);
    if !frac_part.is_empty() {
        rendered.push('.');
        rendered.push_str(&frac_part);
    }

    Some(rendered)
}

/// Validates and coerces the tokens of one field.
///
/// The validator regex is compiled once per field. Matching uses search
/// semantics; catalog authors anchor their expressions when they need to.
#[derive(Debug)]
pub struct TokenCoercer<'a> {
    spec: &'a FieldSpec,
    validator: Option<Regex>,
}

impl<'a> TokenCoercer<'a> {
    pub fn new(spec: &'a FieldSpec) -> Result<Self, FieldError> {
        let validator = match spec.validator.as_deref() {
            Some(pattern) if spec.kind.honors_validator() && !pattern.is_empty() => {
                Some(Regex::new(pattern).map_err(|_| FieldError::InvalidValidator {
                    key: spec.key.clone(),
                    validator: pattern.to_string(),
                })?)
            }
            _ => None,
        };

        Ok(Self { spec, validator })
    }

    /// Validate one trimmed, non-blank token and return its output value.
    pub fn coerce(&self, token: &str) -> Result<Value, FieldError> {
        match self.spec.kind {
            FieldKind::String | FieldKind::File => {
                self.check_validator(token)?;
                Ok(Value::String(token.to_string()))
            }
            FieldKind::Number => {
                let canonical =
                    canonical_decimal(token).ok_or_else(|| FieldError::NotANumber {
                        key: self.spec.key.clone(),
                        value: token.to_string(),
                    })?;
                self.check_validator(token)?;
                Ok(Value::String(canonical))
            }
            FieldKind::Bool | FieldKind::Flag => parse_bool(token)
                .map(Value::Bool)
                .ok_or_else(|| FieldError::NotABoolean {
                    key: self.spec.key.clone(),
                    value: token.to_string(),
                }),
            FieldKind::Enumeration => {
                if self.spec.enumerated_values.is_empty() {
                    return Err(FieldError::EmptyEnumeration {
                        key: self.spec.key.clone(),
                    });
                }
                if self.spec.enumerated_values.iter().any(|v| v == token) {
                    Ok(Value::String(token.to_string()))
                } else {
                    Err(FieldError::NotEnumerated {
                        key: self.spec.key.clone(),
                        value: token.to_string(),
                        allowed: self.spec.enumerated_values.clone(),
                    })
                }
            }
        }
    }

    fn check_validator(&self, token: &str) -> Result<(), FieldError> {
        match &self.validator {
            Some(regex) if !regex.is_match(token) => Err(FieldError::ValidatorMismatch {
                key: self.spec.key.clone(),
                value: token.to_string(),
                validator: regex.as_str().to_string(),
            }),
            _ => Ok(()),
        }
    }
}
