//! Software input processing.
//!
//! Inputs follow the shared field contract with every value treated as a
//! file reference. Each visible value must also be a well-formed URI (or
//! relative path) with a supported scheme that the requesting user can read.

use intake_fields::{FieldKind, FieldProcessor, FieldSpec};
use serde_json::{Map, Value};
use tracing::warn;

use crate::collaborators::PermissionChecker;
use crate::config::IntakeConfig;
use crate::error::JobProcessingError;

/// Characters a URI may never contain unescaped.
const ILLEGAL_URI_CHARS: &[char] = &['"', '<', '>', '\\', '^', '`', '{', '|', '}'];

/// Scheme of `uri`, if it has one.
///
/// A scheme is a letter followed by letters, digits, `+`, `-` or `.`, and
/// terminated by `:`. Relative paths have none.
pub fn uri_scheme(uri: &str) -> Option<&str> {
    let end = uri.find(':')?;
    let scheme = &uri[..end];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(scheme)
    } else {
        None
    }
}

/// Check that `uri` parses as a URI reference.
pub fn check_uri_syntax(uri: &str) -> Result<(), String> {
    if let Some(c) = uri
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || ILLEGAL_URI_CHARS.contains(c))
    {
        return Err(format!("Illegal character {:?} in URI", c));
    }

    let bytes = uri.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escaped = bytes.get(i + 1..i + 3);
            if !matches!(escaped, Some(pair) if pair.iter().all(u8::is_ascii_hexdigit)) {
                return Err("Malformed percent-escape in URI".to_string());
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    if let Some(scheme) = uri_scheme(uri) {
        if uri[scheme.len() + 1..].is_empty() {
            return Err("Expected scheme-specific part".to_string());
        }
    } else if uri.starts_with(':') {
        return Err("Expected scheme name".to_string());
    }
    Ok(())
}

fn usage_hint(schemes: &[String]) -> String {
    format!(
        "Please specify your input as a relative path, an Agave resource URL, \
         or a URL with one of the following schemes: {}.",
        schemes.join(", ")
    )
}

/// Validates the inputs section of a job request.
pub struct InputProcessor<'a> {
    permissions: &'a dyn PermissionChecker,
    username: String,
    internal_username: Option<String>,
    supported_schemes: Vec<String>,
    fields: FieldProcessor,
}

impl<'a> InputProcessor<'a> {
    pub fn new(
        config: &IntakeConfig,
        permissions: &'a dyn PermissionChecker,
        username: impl Into<String>,
        internal_username: Option<String>,
    ) -> Self {
        Self {
            permissions,
            username: username.into(),
            internal_username,
            supported_schemes: config.supported_schemes.clone(),
            fields: FieldProcessor::new(config.normalizer()),
        }
    }

    /// Process the declared `inputs` against `request`.
    ///
    /// Injected defaults for hidden inputs are not permission-checked.
    pub fn process(
        &self,
        inputs: &[FieldSpec],
        request: &Map<String, Value>,
    ) -> Result<Map<String, Value>, JobProcessingError> {
        let specs: Vec<FieldSpec> = inputs
            .iter()
            .cloned()
            .map(|mut spec| {
                spec.kind = FieldKind::File;
                spec
            })
            .collect();

        self.fields
            .process(&specs, request, |spec, token| self.check_uri(&spec.key, token))
            .map_err(|err| {
                warn!(username = %self.username, error = %err, "rejected job inputs");
                err
            })
    }

    /// Syntax, then scheme, then permission.
    fn check_uri(&self, key: &str, uri: &str) -> Result<(), JobProcessingError> {
        let invalid = |reason: String| JobProcessingError::InvalidInput {
            key: key.to_string(),
            value: uri.to_string(),
            reason,
        };

        check_uri_syntax(uri)
            .map_err(|e| invalid(format!("{}. {}", e, usage_hint(&self.supported_schemes))))?;

        if let Some(scheme) = uri_scheme(uri) {
            let scheme = scheme.to_lowercase();
            if !self.supported_schemes.iter().any(|s| *s == scheme) {
                return Err(invalid(format!(
                    "URI with the {} scheme are not currently supported. {}",
                    scheme,
                    usage_hint(&self.supported_schemes)
                )));
            }
        }

        let readable = self
            .permissions
            .can_read(&self.username, self.internal_username.as_deref(), uri)
            .map_err(|source| JobProcessingError::PermissionCheck {
                key: key.to_string(),
                source,
            })?;

        if !readable {
            return Err(JobProcessingError::PermissionDenied {
                key: key.to_string(),
                uri: uri.to_string(),
            });
        }
        Ok(())
    }
}
