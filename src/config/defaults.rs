//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// URI schemes accepted for job inputs unless the host narrows the list.
pub const DEFAULT_SUPPORTED_SCHEMES: &[&str] = &[
    "http", "https", "sftp", "agave", "ftp", "gridftp", "irods", "irods4", "s3", "azure",
];

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Delimiter splitting a single string into several values (default: ";")
    pub list_delimiter: String,

    /// Delimiter used by serialized list strings, checked before the list
    /// delimiter (default: none)
    pub serialized_list_delimiter: Option<String>,

    pub supported_schemes: Vec<String>,

    /// Ceiling for requested run time (default: "999:59:59")
    pub max_requested_time: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            list_delimiter: intake_fields::DEFAULT_LIST_DELIMITER.to_string(),
            serialized_list_delimiter: None,
            supported_schemes: DEFAULT_SUPPORTED_SCHEMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_requested_time: "999:59:59".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to the nested JSON layout used for merging.
    pub fn to_value(&self) -> Value {
        json!({
            "fields": {
                "list_delimiter": self.list_delimiter,
                "serialized_list_delimiter": self.serialized_list_delimiter,
            },
            "inputs": {
                "supported_schemes": self.supported_schemes,
            },
            "resources": {
                "max_requested_time": self.max_requested_time,
            }
        })
    }
}
