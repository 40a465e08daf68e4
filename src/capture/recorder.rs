use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::capture::browser::{RequestInfo, ResponseBody, ResponseInfo};
use crate::capture::domain::registrable_domain;
use crate::models::datasets::captures::{
    BODY_UNAVAILABLE, CapturedEvent, RequestEvent, ResponseEvent, TrafficEvent,
};

#[derive(Debug, Default)]
struct RecorderState {
    // Page the session most recently navigated to
    active_page: Option<String>,
    // Unanswered request id -> (page active when it was issued, request method)
    issued: HashMap<String, (String, String)>,
    log: Vec<CapturedEvent>,
}

/// Append-only event log for one capture session.
///
/// Requests are attributed to the page active when they were issued. Responses
/// inherit the page of their request, so a response landing after the next
/// navigation started still belongs to the page that asked for it.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    state: Arc<Mutex<RecorderState>>,
    verbose: bool,
}

impl EventRecorder {
    pub fn new(verbose: bool) -> Self {
        Self {
            state: Arc::default(),
            verbose,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn begin_page(&self, page_url: &str) {
        self.lock().active_page = Some(page_url.to_string());
    }

    pub fn record_request(&self, request: RequestInfo) {
        let mut state = self.lock();
        let Some(page_url) = state.active_page.clone() else {
            debug!("Dropping request issued before the first navigation: {}", request.url);
            return;
        };

        if self.verbose {
            debug!("[REQUEST] {} {}", request.method, request.url);
        }

        state.issued.insert(
            request.request_id.clone(),
            (page_url.clone(), request.method.clone()),
        );

        let domain = registrable_domain(&request.url);
        let event = TrafficEvent::Request(RequestEvent {
            method: request.method,
            url: request.url,
            scanned_domain: registrable_domain(&page_url),
            domain: domain.clone(),
            headers: request.headers,
            body: request.body,
        });
        state.log.push(CapturedEvent {
            domain,
            page_url,
            event,
        });
    }

    pub fn record_response(&self, response: ResponseInfo) {
        let mut state = self.lock();
        let (page_url, issued_method) = match state.issued.remove(&response.request_id) {
            Some((page, method)) => (page, Some(method)),
            None => match state.active_page.clone() {
                Some(page) => (page, None),
                None => {
                    debug!("Dropping response without a page: {}", response.url);
                    return;
                }
            },
        };

        let request_method = response
            .request_method
            .or(issued_method)
            .unwrap_or_default();

        if self.verbose {
            debug!("[RESPONSE] {} {} {}", response.status, request_method, response.url);
        }

        let body = match response.body {
            ResponseBody::Text(text) => Some(text),
            ResponseBody::Unavailable => Some(BODY_UNAVAILABLE.to_string()),
        };

        let domain = registrable_domain(&response.url);
        let event = TrafficEvent::Response(ResponseEvent {
            status: response.status,
            url: response.url,
            scanned_domain: registrable_domain(&page_url),
            domain: domain.clone(),
            headers: response.headers,
            body,
            request_method,
        });
        state.log.push(CapturedEvent {
            domain,
            page_url,
            event,
        });
    }

    /// Hand over everything recorded so far, leaving the log empty.
    pub fn take_log(&self) -> Vec<CapturedEvent> {
        std::mem::take(&mut self.lock().log)
    }
}

/// Flatten a header object as reported by the engine into string pairs.
pub fn header_map(headers: Value) -> BTreeMap<String, String> {
    match headers {
        Value::Object(map) => map
            .into_iter()
            .map(|(name, value)| match value {
                Value::String(s) => (name, s),
                other => (name, other.to_string()),
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}
