use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stored in place of a response body the browser could not read as text.
pub const BODY_UNAVAILABLE: &str = "<not available>";

////////////////////////////////////// Wire Events ///////////////////////////////////////
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEvent {
    pub method: String,
    pub url: String,
    pub scanned_domain: String,
    pub domain: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEvent {
    pub status: u16,
    pub url: String,
    pub scanned_domain: String,
    pub domain: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub request_method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TrafficEvent {
    Request(RequestEvent),
    Response(ResponseEvent),
}

impl TrafficEvent {
    pub fn url(&self) -> &str {
        match self {
            TrafficEvent::Request(r) => &r.url,
            TrafficEvent::Response(r) => &r.url,
        }
    }

    pub fn domain(&self) -> &str {
        match self {
            TrafficEvent::Request(r) => &r.domain,
            TrafficEvent::Response(r) => &r.domain,
        }
    }

    pub fn scanned_domain(&self) -> &str {
        match self {
            TrafficEvent::Request(r) => &r.scanned_domain,
            TrafficEvent::Response(r) => &r.scanned_domain,
        }
    }
}

/// One entry of a worker's append-only event log.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedEvent {
    pub domain: String,
    pub page_url: String,
    pub event: TrafficEvent,
}

///////////////////////////////////// Capture Map ////////////////////////////////////////
pub type PageCaptures = IndexMap<String, Vec<TrafficEvent>>;

/// domain -> page URL -> events in wire order.
///
/// Both levels keep first-insertion order so merged shards stay in shard order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureMap(IndexMap<String, PageCaptures>);

impl CaptureMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, domain: &str, page_url: &str, event: TrafficEvent) {
        self.0
            .entry(domain.to_string())
            .or_default()
            .entry(page_url.to_string())
            .or_default()
            .push(event);
    }

    /// Append another map, concatenating event lists for keys present in both.
    pub fn merge(&mut self, other: CaptureMap) {
        for (domain, pages) in other.0 {
            let target = self.0.entry(domain).or_default();
            for (page_url, events) in pages {
                target.entry(page_url).or_default().extend(events);
            }
        }
    }

    pub fn get(&self, domain: &str, page_url: &str) -> Option<&[TrafficEvent]> {
        self.0
            .get(domain)
            .and_then(|pages| pages.get(page_url))
            .map(Vec::as_slice)
    }

    pub fn domains(&self) -> impl Iterator<Item = (&String, &PageCaptures)> {
        self.0.iter()
    }

    /// Every `(domain, page URL, events)` triple in map order.
    pub fn pages(&self) -> impl Iterator<Item = (&str, &str, &[TrafficEvent])> {
        self.0.iter().flat_map(|(domain, pages)| {
            pages
                .iter()
                .map(move |(page, events)| (domain.as_str(), page.as_str(), events.as_slice()))
        })
    }

    /// Number of `(domain, page URL)` keys.
    pub fn page_count(&self) -> usize {
        self.0.values().map(|pages| pages.len()).sum()
    }

    pub fn event_count(&self) -> usize {
        self.pages().map(|(_, _, events)| events.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Build a capture map from a worker's event log, keeping log order inside each page.
pub fn group_events(log: Vec<CapturedEvent>) -> CaptureMap {
    let mut map = CaptureMap::new();
    for CapturedEvent {
        domain,
        page_url,
        event,
    } in log
    {
        map.push(&domain, &page_url, event);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str, domain: &str) -> TrafficEvent {
        TrafficEvent::Request(RequestEvent {
            method: "POST".to_string(),
            url: url.to_string(),
            scanned_domain: "phish.example".to_string(),
            domain: domain.to_string(),
            headers: BTreeMap::new(),
            body: None,
        })
    }

    fn captured(domain: &str, page: &str, url: &str) -> CapturedEvent {
        CapturedEvent {
            domain: domain.to_string(),
            page_url: page.to_string(),
            event: request(url, domain),
        }
    }

    #[test]
    fn test_group_events_preserves_wire_order() {
        let log = vec![
            captured("rpc.example", "https://phish.example/", "https://rpc.example/1"),
            captured("cdn.example", "https://phish.example/", "https://cdn.example/a.js"),
            captured("rpc.example", "https://phish.example/", "https://rpc.example/2"),
        ];

        let map = group_events(log);

        assert_eq!(map.page_count(), 2);
        assert_eq!(map.event_count(), 3);
        let urls: Vec<_> = map
            .get("rpc.example", "https://phish.example/")
            .unwrap()
            .iter()
            .map(|e| e.url().to_string())
            .collect();
        assert_eq!(urls, vec!["https://rpc.example/1", "https://rpc.example/2"]);

        // First-seen domain comes first
        let domains: Vec<_> = map.domains().map(|(d, _)| d.clone()).collect();
        assert_eq!(domains, vec!["rpc.example", "cdn.example"]);
    }

    #[test]
    fn test_merge_concatenates_shared_keys() {
        let mut left = group_events(vec![captured("rpc.example", "https://a/", "https://rpc.example/1")]);
        let right = group_events(vec![
            captured("rpc.example", "https://a/", "https://rpc.example/2"),
            captured("rpc.example", "https://b/", "https://rpc.example/3"),
        ]);

        left.merge(right);

        assert_eq!(left.page_count(), 2);
        assert_eq!(left.get("rpc.example", "https://a/").unwrap().len(), 2);
    }

    #[test]
    fn test_serialized_shape() {
        let map = group_events(vec![captured("rpc.example", "https://a/", "https://rpc.example/1")]);
        let value = serde_json::to_value(&map).unwrap();

        let event = &value["rpc.example"]["https://a/"][0];
        assert_eq!(event["type"], "request");
        assert_eq!(event["scanned_domain"], "phish.example");
        assert!(event["body"].is_null());

        let back: CaptureMap = serde_json::from_value(value).unwrap();
        assert_eq!(back, map);
    }
}
