//! Tolerant navigation over untyped FHIR JSON.

use serde_json::Value;

/// View a field as a list: arrays yield their items, a lone value yields
/// itself, and absent or null fields yield nothing.
pub(crate) fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    }
}

/// A non-empty string field.
pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

pub(crate) fn resource_type(value: &Value) -> Option<&str> {
    str_field(value, "resourceType")
}
