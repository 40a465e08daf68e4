use serde_json::{Map, Value};

use crate::models::datasets::calls::CallFields;
use crate::models::datasets::captures::RequestEvent;
use crate::pipeline::rpc::{id_key, text};

/// RPC method whose batch elements carry contract reads.
pub const CALL_METHOD: &str = "eth_call";

/// Shape of a captured request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEnvelope {
    /// `{"method": m, "params": {...}}` or `{"method": m, "params": [{...}, ...]}`
    SingleCall {
        id: Option<String>,
        method: String,
        calls: Vec<CallFields>,
    },
    /// `[{"method": "eth_call", "to": ..., "data": ...}, ...]`
    BatchCall(Vec<CallFields>),
    /// Not JSON, or JSON that is not shaped like a contract call
    Unrecognized,
}

impl CallEnvelope {
    /// Rows this request contributes to the dataset. Never empty.
    pub fn into_rows(self) -> Vec<CallFields> {
        let rows = match self {
            CallEnvelope::SingleCall { method, calls, .. } if calls.is_empty() => {
                vec![CallFields {
                    rpc_method: method,
                    ..CallFields::default()
                }]
            }
            CallEnvelope::SingleCall { calls, .. } => calls,
            CallEnvelope::BatchCall(calls) => calls,
            CallEnvelope::Unrecognized => vec![],
        };

        if rows.is_empty() {
            vec![CallFields::default()]
        } else {
            rows
        }
    }
}

pub trait RequestParser {
    fn parse_calls(&self) -> CallEnvelope;
}

impl RequestParser for RequestEvent {
    fn parse_calls(&self) -> CallEnvelope {
        decode_request(self.body.as_deref())
    }
}

pub fn decode_request(body: Option<&str>) -> CallEnvelope {
    let Some(body) = body else {
        return CallEnvelope::Unrecognized;
    };
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return CallEnvelope::Unrecognized;
    };

    match parsed {
        Value::Object(envelope) => decode_single(&envelope),
        Value::Array(elements) => CallEnvelope::BatchCall(
            elements
                .iter()
                .filter_map(Value::as_object)
                .filter(|element| element.get("method").and_then(Value::as_str) == Some(CALL_METHOD))
                .flat_map(decode_batch_element)
                .collect(),
        ),
        _ => CallEnvelope::Unrecognized,
    }
}

fn decode_single(envelope: &Map<String, Value>) -> CallEnvelope {
    let method = text(envelope.get("method"));
    let id = id_key(envelope.get("id"));

    match envelope.get("params") {
        Some(Value::Object(params)) => CallEnvelope::SingleCall {
            id,
            calls: vec![call_fields(params, &method)],
            method,
        },
        Some(Value::Array(params)) => CallEnvelope::SingleCall {
            id,
            calls: params
                .iter()
                .filter_map(Value::as_object)
                .map(|param| call_fields(param, &method))
                .collect(),
            method,
        },
        _ => CallEnvelope::Unrecognized,
    }
}

fn decode_batch_element(element: &Map<String, Value>) -> Vec<CallFields> {
    let method = text(element.get("method"));

    if element.contains_key("to") || element.contains_key("data") {
        return vec![call_fields(element, &method)];
    }

    // Standard batch elements nest the call object inside their own params
    match element.get("params") {
        Some(Value::Object(params)) => vec![call_fields(params, &method)],
        Some(Value::Array(params)) => params
            .iter()
            .filter_map(Value::as_object)
            .map(|param| call_fields(param, &method))
            .collect(),
        _ => vec![CallFields {
            rpc_method: method,
            ..CallFields::default()
        }],
    }
}

fn call_fields(object: &Map<String, Value>, method: &str) -> CallFields {
    CallFields {
        contract_address: text(object.get("to")),
        call_data: text(object.get("data").or_else(|| object.get("input"))),
        rpc_method: method.to_string(),
    }
}
