//! Config validation - warns about unknown fields

use serde_json::Value;
use tracing::warn;

const KNOWN_KEYS: &[&str] = &[
    "apiBaseUrl",
    "requestTimeoutSecs",
    "defaultTopK",
    "refreshInterval",
    "healthPollSecs",
    "exportDir",
];

/// Validate JSON config and warn about unknown fields.
pub fn warn_unknown_fields(content: &str, config_name: &str) {
    for key in find_unknown_keys(content) {
        warn!("Unknown config field in {config_name}: {key}");
    }
}

fn find_unknown_keys(content: &str) -> Vec<String> {
    let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(content) else {
        return Vec::new();
    };

    obj.keys()
        .filter(|key| !KNOWN_KEYS.contains(&key.as_str()))
        .cloned()
        .collect()
}
