use std::collections::HashMap;

use crate::models::datasets::calls::{CallFields, DecodedCall, EventType};
use crate::models::datasets::captures::{CaptureMap, TrafficEvent};
use crate::pipeline::rpc::requests::{CallEnvelope, RequestParser};
use crate::pipeline::rpc::responses::{ResponseParser, ResultEnvelope};

pub trait CallNormalizer {
    fn normalize_calls(&self, scanned_url: &str) -> Vec<DecodedCall>;
}

impl CallNormalizer for [TrafficEvent] {
    fn normalize_calls(&self, scanned_url: &str) -> Vec<DecodedCall> {
        normalize(scanned_url, self)
    }
}

/// Decode one page's events in wire order.
///
/// Every event yields at least one row. A request whose body holds several
/// calls yields one row per call. A single-object response inherits the call
/// fields of the earlier request to the same URL with the same JSON-RPC id.
pub fn normalize(scanned_url: &str, events: &[TrafficEvent]) -> Vec<DecodedCall> {
    // (target url, json-rpc id) -> call fields of the request awaiting its response
    let mut pending: HashMap<(String, String), CallFields> = HashMap::new();
    let mut rows = Vec::with_capacity(events.len());

    for event in events {
        match event {
            TrafficEvent::Request(request) => {
                let envelope = request.parse_calls();

                if let CallEnvelope::SingleCall {
                    id: Some(id),
                    calls,
                    ..
                } = &envelope
                {
                    if let [call] = calls.as_slice() {
                        pending.insert((request.url.clone(), id.clone()), call.clone());
                    }
                }

                for call in envelope.into_rows() {
                    rows.push(decoded(scanned_url, event, EventType::Request, call, String::new()));
                }
            }
            TrafficEvent::Response(response) => {
                let envelope = response.parse_results();

                let call = match &envelope {
                    ResultEnvelope::Single { id: Some(id), .. } => pending
                        .remove(&(response.url.clone(), id.clone()))
                        .unwrap_or_default(),
                    _ => CallFields::default(),
                };

                rows.push(decoded(
                    scanned_url,
                    event,
                    EventType::Response,
                    call,
                    envelope.result_text(),
                ));
            }
        }
    }

    rows
}

/// Decode every page of a (filtered) capture map, pages in map order.
pub fn normalize_captures(captures: &CaptureMap) -> Vec<DecodedCall> {
    captures
        .pages()
        .flat_map(|(_, page_url, events)| events.normalize_calls(page_url))
        .collect()
}

fn decoded(
    scanned_url: &str,
    event: &TrafficEvent,
    event_type: EventType,
    call: CallFields,
    result: String,
) -> DecodedCall {
    DecodedCall {
        scanned_url: scanned_url.to_string(),
        scanned_domain: event.scanned_domain().to_string(),
        domain: event.domain().to_string(),
        url: event.url().to_string(),
        event_type,
        contract_address: call.contract_address,
        call_data: call.call_data,
        rpc_method: call.rpc_method,
        result,
    }
}
