//! Prefix-based read permissions.

use super::{PermissionChecker, PermissionError};
use crate::inputs::uri_scheme;

/// Grants read access to URIs under a fixed set of prefixes.
///
/// Relative paths (no scheme) resolve against the user's own storage and
/// are allowed unless disabled.
#[derive(Debug, Clone, Default)]
pub struct PrefixPermissions {
    prefixes: Vec<String>,
    deny_relative: bool,
}

impl PrefixPermissions {
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            deny_relative: false,
        }
    }

    pub fn deny_relative(mut self, deny: bool) -> Self {
        self.deny_relative = deny;
        self
    }
}

impl PermissionChecker for PrefixPermissions {
    fn can_read(
        &self,
        _username: &str,
        _internal_username: Option<&str>,
        uri: &str,
    ) -> Result<bool, PermissionError> {
        if uri_scheme(uri).is_none() {
            return Ok(!self.deny_relative);
        }
        Ok(self.prefixes.iter().any(|prefix| uri.starts_with(prefix.as_str())))
    }
}
