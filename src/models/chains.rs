use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::common::DEFAULT_EXPLORER_ENDPOINT;
use crate::models::errors::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
    pub name: String,
    pub chain_id: u64,
    pub explorer_endpoint: String,
    pub domain_fragments: BTreeSet<String>,
}

impl ChainEntry {
    fn new(name: &str, chain_id: u64, fragments: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            chain_id,
            explorer_endpoint: DEFAULT_EXPLORER_ENDPOINT.to_string(),
            domain_fragments: fragments.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Name usable inside a file name.
    pub fn file_label(&self) -> String {
        self.name.replace(' ', "-")
    }

    fn matches(&self, query: &str) -> bool {
        self.domain_fragments
            .iter()
            .any(|fragment| fragment.contains(query) || query.contains(fragment.as_str()))
    }
}

/// Immutable table of known chains, built once at startup and passed by reference.
///
/// Lookups are a heuristic: a query is matched by substring against each entry's
/// domain fragments in registry order and the first hit wins, so a domain that
/// looks like several chains' front-ends is classified as the earliest one.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    entries: Vec<ChainEntry>,
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::with_entries(vec![
            ChainEntry::new(
                "Ethereum",
                1,
                &[
                    "etherscan.io",
                    "infura.io",
                    "alchemy.com",
                    "llamarpc.com",
                    "cloudflare-eth.com",
                    "ethereum.org",
                ],
            ),
            ChainEntry::new(
                "BNB Smart Chain",
                56,
                &[
                    "bsc-dataseed.binance.org",
                    "binance.org",
                    "bnbchain.org",
                    "bscscan.com",
                ],
            ),
            ChainEntry::new(
                "Polygon",
                137,
                &["polygon-rpc.com", "polygonscan.com", "polygon.technology"],
            ),
            ChainEntry::new("Arbitrum One", 42161, &["arbitrum.io", "arbiscan.io"]),
            ChainEntry::new("OP Mainnet", 10, &["optimism.io"]),
            ChainEntry::new("Base", 8453, &["mainnet.base.org", "basescan.org"]),
            ChainEntry::new("Avalanche C-Chain", 43114, &["avax.network", "snowtrace.io"]),
        ])
    }
}

impl ChainRegistry {
    pub fn with_entries(entries: Vec<ChainEntry>) -> Self {
        Self { entries }
    }

    /// Point every entry at `endpoint`, e.g. a self-hosted explorer proxy.
    pub fn with_explorer_endpoint(mut self, endpoint: &str) -> Self {
        for entry in &mut self.entries {
            entry.explorer_endpoint = endpoint.to_string();
        }
        self
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    pub fn lookup(&self, domain_fragment: &str) -> Option<&ChainEntry> {
        let query = domain_fragment.trim();
        if query.is_empty() {
            return None;
        }
        self.entries.iter().find(|entry| entry.matches(query))
    }

    pub fn by_id(&self, chain_id: u64) -> Option<&ChainEntry> {
        self.entries.iter().find(|entry| entry.chain_id == chain_id)
    }

    /// Chain used for wallet resolution.
    ///
    /// An explicit chain id wins; an id missing from the registry is queried on
    /// `fallback_endpoint`. Without an id the keyword is matched against the
    /// registry's front-end domains.
    pub fn resolve(
        &self,
        chain_id: Option<u64>,
        keyword: &str,
        fallback_endpoint: &str,
    ) -> Result<ChainEntry, ConfigError> {
        if let Some(chain_id) = chain_id {
            return Ok(self.by_id(chain_id).cloned().unwrap_or_else(|| ChainEntry {
                name: format!("chain-{}", chain_id),
                chain_id,
                explorer_endpoint: fallback_endpoint.to_string(),
                domain_fragments: BTreeSet::new(),
            }));
        }

        self.lookup(keyword)
            .cloned()
            .ok_or_else(|| ConfigError::UnresolvableChain {
                keyword: keyword.to_string(),
            })
    }
}
