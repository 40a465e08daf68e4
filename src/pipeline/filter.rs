use crate::models::common::FilterTarget;
use crate::models::datasets::captures::CaptureMap;

/// Keep only the pages whose key contains `keyword`.
///
/// Matching is plain case-sensitive substring containment so operators can
/// predict exactly which captures a campaign keyword selects.
pub fn filter_captures(captures: &CaptureMap, keyword: &str, target: FilterTarget) -> CaptureMap {
    let mut filtered = CaptureMap::new();
    for (domain, page_url, events) in captures.pages() {
        let matched = match target {
            FilterTarget::Page => page_url.contains(keyword),
            FilterTarget::Domain => domain.contains(keyword),
        };
        if !matched {
            continue;
        }
        for event in events {
            filtered.push(domain, page_url, event.clone());
        }
    }
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::datasets::captures::{RequestEvent, TrafficEvent};
    use std::collections::BTreeMap;

    fn captures() -> CaptureMap {
        let mut map = CaptureMap::new();
        for (domain, page) in [
            ("binance.org", "https://binance-claim.example/"),
            ("binance.org", "https://airdrop.example/"),
            ("google.com", "https://binance-claim.example/"),
            ("google.com", "https://news.example/"),
        ] {
            map.push(
                domain,
                page,
                TrafficEvent::Request(RequestEvent {
                    method: "GET".to_string(),
                    url: format!("https://{}/", domain),
                    scanned_domain: String::new(),
                    domain: domain.to_string(),
                    headers: BTreeMap::new(),
                    body: None,
                }),
            );
        }
        map
    }

    #[test]
    fn test_filter_by_page_url() {
        let filtered = filter_captures(&captures(), "binance", FilterTarget::Page);
        let pages: Vec<_> = filtered.pages().map(|(d, p, _)| (d.to_string(), p.to_string())).collect();
        assert_eq!(
            pages,
            vec![
                ("binance.org".to_string(), "https://binance-claim.example/".to_string()),
                ("google.com".to_string(), "https://binance-claim.example/".to_string()),
            ]
        );
    }

    #[test]
    fn test_filter_by_domain() {
        let filtered = filter_captures(&captures(), "binance", FilterTarget::Domain);
        assert_eq!(filtered.page_count(), 2);
        assert!(filtered.pages().all(|(d, _, _)| d == "binance.org"));
    }

    #[test]
    fn test_filter_is_case_sensitive() {
        let filtered = filter_captures(&captures(), "Binance", FilterTarget::Page);
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        for target in [FilterTarget::Page, FilterTarget::Domain] {
            for keyword in ["binance", "example", "", "nothing"] {
                let once = filter_captures(&captures(), keyword, target);
                let twice = filter_captures(&once, keyword, target);
                assert_eq!(once, twice);
            }
        }
    }
}
