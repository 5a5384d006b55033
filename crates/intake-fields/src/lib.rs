//! Declared-field processing for job requests.
//!
//! Software inputs and parameters share one contract: every declared
//! [`FieldSpec`] is looked up in the raw request, normalized into tokens,
//! checked for visibility and cardinality, and coerced token by token into
//! the value stored with the job.

mod coerce;
mod error;
mod normalize;
mod spec;

pub use coerce::{canonical_decimal, parse_bool, TokenCoercer};
pub use error::FieldError;
pub use normalize::{NormalizedValue, Normalizer, UnsupportedValue, DEFAULT_LIST_DELIMITER};
pub use spec::{FieldKind, FieldSpec, FieldSpecError, UNBOUNDED};

use serde_json::{Map, Value};
use tracing::debug;

/// Applies the shared field contract to a list of declared specs.
#[derive(Debug, Clone, Default)]
pub struct FieldProcessor {
    normalizer: Normalizer,
}

impl FieldProcessor {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Process every spec, in declaration order, against `request`.
    ///
    /// `check_token` runs after a visible token has passed its kind's
    /// coercion; callers use it for checks the field kind alone cannot make
    /// (URI syntax, permissions). It never runs for injected defaults.
    ///
    /// The first failure aborts the whole batch.
    pub fn process<E, F>(
        &self,
        specs: &[FieldSpec],
        request: &Map<String, Value>,
        mut check_token: F,
    ) -> Result<Map<String, Value>, E>
    where
        E: From<FieldError>,
        F: FnMut(&FieldSpec, &str) -> Result<(), E>,
    {
        let mut processed = Map::new();
        for spec in specs {
            if let Some(value) = self.process_field(spec, request.get(&spec.key), &mut check_token)? {
                processed.insert(spec.key.clone(), value);
            }
        }
        Ok(processed)
    }

    /// Process one field. `Ok(None)` means the field is omitted from output.
    pub fn process_field<E, F>(
        &self,
        spec: &FieldSpec,
        raw: Option<&Value>,
        check_token: &mut F,
    ) -> Result<Option<Value>, E>
    where
        E: From<FieldError>,
        F: FnMut(&FieldSpec, &str) -> Result<(), E>,
    {
        if !spec.visible {
            if raw.is_some() {
                return Err(FieldError::HiddenFieldSupplied {
                    key: spec.key.clone(),
                }
                .into());
            }
            return Ok(Some(self.hidden_default(spec)?));
        }

        let normalized = self
            .normalizer
            .normalize(raw)
            .map_err(|e| FieldError::UnsupportedValue {
                key: spec.key.clone(),
                value: e.0,
            })?;

        if normalized.is_empty() {
            if spec.required && spec.min_cardinality > 0 {
                return Err(FieldError::MissingRequired {
                    key: spec.key.clone(),
                }
                .into());
            }
            return Ok(None);
        }

        check_cardinality(spec, &normalized)?;

        let coercer = TokenCoercer::new(spec)?;
        let mut values = Vec::with_capacity(normalized.tokens.len());
        for token in &normalized.tokens {
            values.push(coercer.coerce(token)?);
            check_token(spec, token)?;
        }

        debug!(key = %spec.key, kind = %spec.kind, count = values.len(), "accepted field");
        Ok(Some(shape(spec, values)))
    }

    /// Value injected for a hidden field.
    fn hidden_default(&self, spec: &FieldSpec) -> Result<Value, FieldError> {
        let invalid = |reason: String| FieldError::InvalidDefault {
            key: spec.key.clone(),
            reason,
        };

        let Some(default) = &spec.default_value else {
            return Ok(empty_value(spec));
        };

        let normalized = self
            .normalizer
            .normalize(Some(default))
            .map_err(|e| invalid(e.to_string()))?;

        if spec.kind.is_single_valued() && normalized.tokens.len() > 1 {
            return Err(invalid("boolean and flag defaults hold a single value".to_string()));
        }

        let coercer = TokenCoercer::new(spec)?;
        let values = normalized
            .tokens
            .iter()
            .map(|token| coercer.coerce(token))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| invalid(e.to_string()))?;

        if values.is_empty() {
            return Ok(empty_value(spec));
        }
        if spec.emits_scalar() && values.len() > 1 {
            return Err(invalid(format!("{} values given for a single-valued field", values.len())));
        }

        debug!(key = %spec.key, "injected hidden default");
        Ok(shape(spec, values))
    }
}

fn check_cardinality(spec: &FieldSpec, normalized: &NormalizedValue) -> Result<(), FieldError> {
    let got = normalized.count();

    if spec.kind.is_single_valued() && got > 1 {
        return Err(FieldError::MultipleBooleanValues {
            key: spec.key.clone(),
        });
    }

    if (got as i64) < spec.min_cardinality {
        return Err(FieldError::TooFewValues {
            key: spec.key.clone(),
            min: spec.min_cardinality,
            got,
        });
    }

    if !spec.is_unbounded() && (got as i64) > spec.max_cardinality {
        return Err(FieldError::TooManyValues {
            key: spec.key.clone(),
            max: spec.max_cardinality,
            got,
        });
    }

    Ok(())
}

fn empty_value(spec: &FieldSpec) -> Value {
    if spec.kind.is_single_valued() {
        Value::Bool(false)
    } else if spec.emits_scalar() {
        Value::Null
    } else {
        Value::Array(Vec::new())
    }
}

fn shape(spec: &FieldSpec, mut values: Vec<Value>) -> Value {
    if spec.emits_scalar() && values.len() == 1 {
        values.remove(0)
    } else {
        Value::Array(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(spec: &FieldSpec, raw: Option<Value>) -> Result<Option<Value>, FieldError> {
        FieldProcessor::default().process_field(spec, raw.as_ref(), &mut |_: &FieldSpec, _: &str| Ok(()))
    }

    #[test]
    fn test_hidden_field_rejects_any_presence() {
        let spec = FieldSpec::new("fixed", FieldKind::String)
            .visible(false)
            .default_value("abc");
        for raw in [json!(null), json!(""), json!("abc"), json!([])] {
            assert_eq!(
                run(&spec, Some(raw)),
                Err(FieldError::HiddenFieldSupplied {
                    key: "fixed".to_string()
                })
            );
        }
    }

    #[test]
    fn test_hidden_default_is_injected() {
        let spec = FieldSpec::new("fixed", FieldKind::String)
            .visible(false)
            .default_value("abc");
        assert_eq!(run(&spec, None).unwrap(), Some(json!("abc")));

        let spec = FieldSpec::new("list", FieldKind::String)
            .visible(false)
            .cardinality(0, -1)
            .default_value("a;b");
        assert_eq!(run(&spec, None).unwrap(), Some(json!(["a", "b"])));
    }

    #[test]
    fn test_hidden_without_default() {
        let flag = FieldSpec::new("f", FieldKind::Flag).visible(false);
        assert_eq!(run(&flag, None).unwrap(), Some(json!(false)));

        let many = FieldSpec::new("m", FieldKind::String)
            .visible(false)
            .cardinality(0, -1);
        assert_eq!(run(&many, None).unwrap(), Some(json!([])));

        let one = FieldSpec::new("o", FieldKind::String).visible(false);
        assert_eq!(run(&one, None).unwrap(), Some(Value::Null));
    }

    #[test]
    fn test_hidden_default_must_coerce() {
        let spec = FieldSpec::new("n", FieldKind::Number)
            .visible(false)
            .default_value("abc");
        assert!(matches!(run(&spec, None), Err(FieldError::InvalidDefault { .. })));
    }

    #[test]
    fn test_missing_required_and_optional() {
        let required = FieldSpec::new("r", FieldKind::String)
            .required(true)
            .cardinality(1, 1);
        assert!(matches!(run(&required, None), Err(FieldError::MissingRequired { .. })));
        assert!(matches!(
            run(&required, Some(json!("  "))),
            Err(FieldError::MissingRequired { .. })
        ));

        let optional = FieldSpec::new("o", FieldKind::String).default_value("ignored");
        assert_eq!(run(&optional, None).unwrap(), None);
        assert_eq!(run(&optional, Some(json!(null))).unwrap(), None);
    }

    #[test]
    fn test_cardinality_boundaries() {
        let spec = FieldSpec::new("k", FieldKind::String).cardinality(2, 3);
        assert!(matches!(run(&spec, Some(json!(["a"]))), Err(FieldError::TooFewValues { .. })));
        assert_eq!(run(&spec, Some(json!(["a", "b"]))).unwrap(), Some(json!(["a", "b"])));
        assert_eq!(
            run(&spec, Some(json!(["a", "b", "c"]))).unwrap(),
            Some(json!(["a", "b", "c"]))
        );
        assert!(matches!(
            run(&spec, Some(json!(["a", "b", "c", "d"]))),
            Err(FieldError::TooManyValues { .. })
        ));
    }

    #[test]
    fn test_unbounded_max() {
        let spec = FieldSpec::new("k", FieldKind::String).cardinality(0, -1);
        let many: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        let out = run(&spec, Some(json!(many))).unwrap().unwrap();
        assert_eq!(out.as_array().map(Vec::len), Some(50));
    }

    #[test]
    fn test_boolean_rejects_multiple_before_cardinality() {
        let spec = FieldSpec::new("b", FieldKind::Bool).cardinality(0, -1);
        assert!(matches!(
            run(&spec, Some(json!(["true", "true"]))),
            Err(FieldError::MultipleBooleanValues { .. })
        ));
        assert_eq!(run(&spec, Some(json!("ON"))).unwrap(), Some(json!(true)));
    }

    #[test]
    fn test_concrete_string_scenario() {
        let spec = FieldSpec::new("url", FieldKind::String)
            .required(true)
            .cardinality(1, 1);
        assert_eq!(
            run(&spec, Some(json!(["https://x"]))).unwrap(),
            Some(json!("https://x"))
        );
        assert!(matches!(
            run(&spec, Some(json!(["a", "b"]))),
            Err(FieldError::TooManyValues { .. })
        ));
    }

    #[test]
    fn test_extra_check_runs_per_token() {
        let spec = FieldSpec::new("in", FieldKind::File).cardinality(0, -1);
        let mut seen = Vec::new();
        let out: Result<Option<Value>, FieldError> = FieldProcessor::default().process_field(
            &spec,
            Some(&json!(["a", "b"])),
            &mut |_: &FieldSpec, token: &str| {
                seen.push(token.to_string());
                Ok(())
            },
        );
        assert!(out.is_ok());
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn test_process_coerces_declared_and_omits_absent() {
        let specs = vec![
            FieldSpec::new("b", FieldKind::Number),
            FieldSpec::new("a", FieldKind::String),
            FieldSpec::new("c", FieldKind::Flag),
        ];
        let request = json!({"a": " x ", "b": "2e8", "unknown": 1});
        let out: Map<String, Value> = FieldProcessor::default()
            .process(&specs, request.as_object().unwrap(), |_: &FieldSpec, _: &str| {
                Ok::<(), FieldError>(())
            })
            .unwrap();
        assert_eq!(out.get("a"), Some(&json!("x")));
        assert_eq!(out.get("b"), Some(&json!("200000000")));
        assert!(!out.contains_key("c"));
        assert!(!out.contains_key("unknown"));
    }

    #[test]
    fn test_object_values_are_rejected() {
        let spec = FieldSpec::new("k", FieldKind::String);
        assert!(matches!(
            run(&spec, Some(json!({"nested": true}))),
            Err(FieldError::UnsupportedValue { .. })
        ));
    }
}
