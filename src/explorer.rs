use anyhow::Result;
use opentelemetry::KeyValue;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::metrics::Metrics;
use crate::models::datasets::calls::WalletRecord;
use crate::models::errors::ExplorerError;
use crate::utils::rate_limiter::RateLimiter;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

////////////////////////////////////// Wire Format ///////////////////////////////////////
#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    // An array on success, an error string otherwise
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractCreation {
    contract_creator: Option<String>,
}

////////////////////////////////////// Resolver ///////////////////////////////////////
/// Maps contract addresses to the account that deployed them using an
/// etherscan-compatible `getcontractcreation` endpoint.
pub struct WalletResolver {
    client: Client,
    endpoint: String,
    api_token: String,
    limiter: RateLimiter,
}

impl WalletResolver {
    pub fn new(endpoint: &str, api_token: &str, requests_per_second: u32) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_token: api_token.to_string(),
            limiter: RateLimiter::per_second(requests_per_second),
        })
    }

    /// Number of lookups issued so far.
    pub fn requests_issued(&self) -> u64 {
        self.limiter.issued()
    }

    /// Resolve the creator of every distinct, non-empty address.
    ///
    /// Lookups run one after another behind the rate limiter. A failed lookup is
    /// logged and skipped; only successful pairs are returned.
    pub async fn resolve(
        &self,
        addresses: &[String],
        chain_id: u64,
        metrics: Option<&Metrics>,
    ) -> Vec<WalletRecord> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        info!(
            "Looking up {} addresses on chain {}, one every {:?}",
            addresses.len(),
            chain_id,
            self.limiter.interval()
        );

        for address in addresses {
            if address.is_empty() || !seen.insert(address.as_str()) {
                continue;
            }

            self.limiter.acquire().await;
            let start = Instant::now();
            let outcome = self.lookup_creator(address, chain_id).await;

            if let Some(metrics) = metrics {
                let labels = [KeyValue::new("chain_id", chain_id as i64)];
                metrics.explorer_requests.add(1, &labels);
                metrics
                    .explorer_latency
                    .record(start.elapsed().as_secs_f64(), &labels);
                if outcome.is_err() {
                    metrics.explorer_errors.add(1, &labels);
                }
            }

            match outcome {
                Ok(creator) => {
                    debug!("{} was deployed by {}", address, creator);
                    records.push(WalletRecord {
                        contract_address: address.clone(),
                        creator_wallet: creator,
                    });
                }
                Err(e) => warn!("Skipping wallet lookup: {}", e),
            }
        }

        info!(
            "Resolved {} of {} contract creators on chain {}",
            records.len(),
            seen.len(),
            chain_id
        );
        records
    }

    pub async fn lookup_creator(&self, address: &str, chain_id: u64) -> Result<String, ExplorerError> {
        let chain_id = chain_id.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("chainid", chain_id.as_str()),
                ("module", "contract"),
                ("action", "getcontractcreation"),
                ("contractaddresses", address),
                ("apikey", self.api_token.as_str()),
            ])
            .send()
            .await
            .map_err(|source| ExplorerError::Transport {
                address: address.to_string(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ExplorerError::HttpStatus {
                address: address.to_string(),
                status: status.as_u16(),
            });
        }

        let body: ExplorerResponse =
            response
                .json()
                .await
                .map_err(|e| ExplorerError::Malformed {
                    address: address.to_string(),
                    reason: e.to_string(),
                })?;

        parse_creator(address, body)
    }
}

fn parse_creator(address: &str, body: ExplorerResponse) -> Result<String, ExplorerError> {
    let entries = match body.result {
        Value::Array(entries) => entries,
        other => {
            let detail = match other {
                Value::String(s) => s,
                Value::Null => body.message.clone(),
                v => v.to_string(),
            };
            return Err(ExplorerError::Api {
                address: address.to_string(),
                message: format!("status {}: {}", body.status, detail),
            });
        }
    };

    let first = entries.into_iter().next().ok_or_else(|| ExplorerError::Malformed {
        address: address.to_string(),
        reason: "empty result".to_string(),
    })?;

    serde_json::from_value::<ContractCreation>(first)
        .ok()
        .and_then(|creation| creation.contract_creator)
        .filter(|creator| !creator.is_empty())
        .ok_or_else(|| ExplorerError::Malformed {
            address: address.to_string(),
            reason: "missing contractCreator".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn creation_body(address: &str, creator: &str) -> String {
        format!(
            r#"{{"status":"1","message":"OK","result":[{{"contractAddress":"{}","contractCreator":"{}","txHash":"0x01"}}]}}"#,
            address, creator
        )
    }

    #[tokio::test]
    async fn test_failed_lookup_is_skipped() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/")
            .match_query(Matcher::UrlEncoded("contractaddresses".into(), "0xAAA".into()))
            .with_status(500)
            .create_async()
            .await;
        let succeeding = server
            .mock("GET", "/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("contractaddresses".into(), "0xBBB".into()),
                Matcher::UrlEncoded("chainid".into(), "56".into()),
                Matcher::UrlEncoded("module".into(), "contract".into()),
                Matcher::UrlEncoded("action".into(), "getcontractcreation".into()),
                Matcher::UrlEncoded("apikey".into(), "token".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(creation_body("0xBBB", "0xCREATOR"))
            .create_async()
            .await;

        let resolver = WalletResolver::new(&server.url(), "token", 5).unwrap();
        let records = resolver
            .resolve(&["0xAAA".to_string(), "0xBBB".to_string()], 56, None)
            .await;

        assert_eq!(
            records,
            vec![WalletRecord {
                contract_address: "0xBBB".to_string(),
                creator_wallet: "0xCREATOR".to_string(),
            }]
        );
        failing.assert_async().await;
        succeeding.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_errors_and_malformed_bodies_are_skipped() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .match_query(Matcher::UrlEncoded("contractaddresses".into(), "0x1".into()))
            .with_status(200)
            .with_body(r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/")
            .match_query(Matcher::UrlEncoded("contractaddresses".into(), "0x2".into()))
            .with_status(200)
            .with_body("<html>rate limited</html>")
            .create_async()
            .await;
        server
            .mock("GET", "/")
            .match_query(Matcher::UrlEncoded("contractaddresses".into(), "0x3".into()))
            .with_status(200)
            .with_body(r#"{"status":"1","message":"OK","result":[]}"#)
            .create_async()
            .await;

        let resolver = WalletResolver::new(&server.url(), "token", 5).unwrap();

        assert!(matches!(
            resolver.lookup_creator("0x1", 1).await,
            Err(ExplorerError::Api { .. })
        ));
        assert!(matches!(
            resolver.lookup_creator("0x2", 1).await,
            Err(ExplorerError::Malformed { .. })
        ));
        assert!(matches!(
            resolver.lookup_creator("0x3", 1).await,
            Err(ExplorerError::Malformed { .. })
        ));

        let addresses = vec!["0x1".to_string(), "0x2".to_string(), "0x3".to_string()];
        assert!(resolver.resolve(&addresses, 1, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_and_empty_addresses_are_not_looked_up() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::UrlEncoded("contractaddresses".into(), "0xC".into()))
            .with_status(200)
            .with_body(creation_body("0xC", "0xW"))
            .expect(1)
            .create_async()
            .await;

        let resolver = WalletResolver::new(&server.url(), "token", 5).unwrap();
        let addresses = vec!["0xC".to_string(), String::new(), "0xC".to_string()];
        let records = resolver.resolve(&addresses, 1, None).await;

        assert_eq!(records.len(), 1);
        assert_eq!(resolver.requests_issued(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_lookups_stay_under_five_per_second() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(creation_body("0x0", "0xW"))
            .expect(11)
            .create_async()
            .await;

        let resolver = WalletResolver::new(&server.url(), "token", 5).unwrap();
        let addresses: Vec<_> = (0..11).map(|i| format!("0x{:040x}", i)).collect();

        let start = Instant::now();
        let records = resolver.resolve(&addresses, 1, None).await;

        assert_eq!(records.len(), 11);
        // 11 calls at 200ms spacing need at least 10 gaps
        assert!(start.elapsed() >= Duration::from_millis(2000));
    }
}
