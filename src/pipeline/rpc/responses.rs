use serde_json::Value;

use crate::models::datasets::captures::{BODY_UNAVAILABLE, ResponseEvent};
use crate::pipeline::rpc::{id_key, text};

/// Joins the results of a batched response.
///
/// Each fragment is escaped first (`%` as `%25`, `;` as `%3B`), so a batch of
/// n elements always joins to exactly n fragments. [`split_results`] reverses it.
pub const RESULT_SEPARATOR: &str = ";";

fn escape_fragment(result: &str) -> String {
    result.replace('%', "%25").replace(';', "%3B")
}

fn unescape_fragment(fragment: &str) -> String {
    fragment.replace("%3B", ";").replace("%25", "%")
}

/// Original per-element results of a joined batch result, in batch order.
pub fn split_results(joined: &str) -> Vec<String> {
    joined.split(RESULT_SEPARATOR).map(unescape_fragment).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultEnvelope {
    Single { id: Option<String>, result: String },
    Batch(Vec<String>),
    // Binary body recorded as the unavailable sentinel
    Unavailable,
    Unrecognized,
}

impl ResultEnvelope {
    pub fn result_text(&self) -> String {
        match self {
            ResultEnvelope::Single { result, .. } => result.clone(),
            ResultEnvelope::Batch(results) => results
                .iter()
                .map(|result| escape_fragment(result))
                .collect::<Vec<_>>()
                .join(RESULT_SEPARATOR),
            ResultEnvelope::Unavailable | ResultEnvelope::Unrecognized => String::new(),
        }
    }
}

pub trait ResponseParser {
    fn parse_results(&self) -> ResultEnvelope;
}

impl ResponseParser for ResponseEvent {
    fn parse_results(&self) -> ResultEnvelope {
        decode_response(self.body.as_deref())
    }
}

pub fn decode_response(body: Option<&str>) -> ResultEnvelope {
    let Some(body) = body else {
        return ResultEnvelope::Unrecognized;
    };
    if body == BODY_UNAVAILABLE {
        return ResultEnvelope::Unavailable;
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(envelope)) => ResultEnvelope::Single {
            id: id_key(envelope.get("id")),
            result: text(envelope.get("result")),
        },
        Ok(Value::Array(elements)) => ResultEnvelope::Batch(
            elements
                .iter()
                .map(|element| text(element.get("result")))
                .collect(),
        ),
        _ => ResultEnvelope::Unrecognized,
    }
}
