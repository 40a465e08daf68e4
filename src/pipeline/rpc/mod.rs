pub mod requests;
pub mod responses;

use serde_json::Value;

/// String form of a JSON field; missing and null become "".
pub(crate) fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// JSON-RPC ids are compared by their JSON text, so `1` and `"1"` stay distinct.
pub(crate) fn id_key(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(other) => Some(other.to_string()),
    }
}
