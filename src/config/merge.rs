//! Merge of the config layers: builtin defaults, then the host TOML file,
//! then CLI overrides. Objects merge by key; arrays and scalars are replaced.

use serde_json::Value;

/// Deep merge `overlay` onto `base`. A null overlay clears the base value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = if let Some(base_value) = base_map.remove(&key) {
                    deep_merge(base_value, overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Fold layers in precedence order, lowest first.
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_override() {
        let base = json!({"fields": {"list_delimiter": ";"}});
        let overlay = json!({"fields": {"list_delimiter": ","}});
        let result = deep_merge(base, overlay);
        assert_eq!(result["fields"]["list_delimiter"], ",");
    }

    #[test]
    fn test_object_deep_merge() {
        let base = json!({
            "fields": {
                "list_delimiter": ";",
                "serialized_list_delimiter": null
            }
        });
        let overlay = json!({
            "fields": {
                "serialized_list_delimiter": "|"
            }
        });
        let result = deep_merge(base, overlay);

        assert_eq!(result["fields"]["serialized_list_delimiter"], "|");
        assert_eq!(result["fields"]["list_delimiter"], ";");
    }

    #[test]
    fn test_array_replace() {
        let base = json!({"inputs": {"supported_schemes": ["http", "https", "sftp"]}});
        let overlay = json!({"inputs": {"supported_schemes": ["agave"]}});
        let result = deep_merge(base, overlay);

        let schemes = result["inputs"]["supported_schemes"].as_array().unwrap();
        assert_eq!(schemes.len(), 1);
        assert_eq!(schemes[0], "agave");
    }

    #[test]
    fn test_null_override() {
        let base = json!({"value": 100});
        let overlay = json!({"value": null});
        let result = deep_merge(base, overlay);

        assert!(result["value"].is_null());
    }

    #[test]
    fn test_merge_layers() {
        let builtin = json!({
            "resources": {"max_requested_time": "999:59:59"},
            "fields": {"list_delimiter": ";"}
        });
        let host = json!({"resources": {"max_requested_time": "48:00:00"}});
        let cli = json!({"fields": {"list_delimiter": ","}});

        let result = merge_layers(vec![builtin, host, cli]);

        assert_eq!(result["resources"]["max_requested_time"], "48:00:00");
        assert_eq!(result["fields"]["list_delimiter"], ",");
    }
}
