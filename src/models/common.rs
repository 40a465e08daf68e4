use serde::{Deserialize, Serialize};

use crate::models::chains::ChainEntry;

pub const DEFAULT_EXPLORER_ENDPOINT: &str = "https://api.etherscan.io/v2/api";
pub const DEFAULT_URLSCAN_ENDPOINT: &str = "https://urlscan.io/api/v1/search/";

// Free tier explorer keys allow 5 calls per second
pub const MAX_EXPLORER_REQUESTS_PER_SECOND: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub address: String,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0".to_string(),
            port: 9100,
        }
    }
}

/// Which key of the capture map the operator keyword is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterTarget {
    /// The page URL that was being visited
    #[default]
    Page,
    /// The registrable domain the traffic was sent to
    Domain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub temp_profiles_path: String,
    pub results_path: String,
    pub chromium_flags: Vec<String>,
    pub headless: bool,
    pub page_timeout_secs: u64,
    pub urlscan_endpoint: String,
    pub urlscan_query: String,
    pub explorer_endpoint: String,
    pub explorer_requests_per_second: u32,
    pub filter_target: FilterTarget,
    pub metrics: MetricsConfig,
    // Replaces the built-in chain registry when present
    pub chains: Option<Vec<ChainEntry>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            temp_profiles_path: "mock_data".to_string(),
            results_path: "results".to_string(),
            chromium_flags: vec![
                "--disable-blink-features=AutomationControlled".to_string(),
                "--disable-client-side-phishing-detection".to_string(),
                "--safebrowsing-disable-download-protection".to_string(),
                "--safebrowsing-disable-auto-update".to_string(),
                "--disable-popup-blocking".to_string(),
            ],
            headless: true,
            page_timeout_secs: 30,
            urlscan_endpoint: DEFAULT_URLSCAN_ENDPOINT.to_string(),
            urlscan_query: "page.domain:* AND task.tags:phishing".to_string(),
            explorer_endpoint: DEFAULT_EXPLORER_ENDPOINT.to_string(),
            explorer_requests_per_second: MAX_EXPLORER_REQUESTS_PER_SECOND,
            filter_target: FilterTarget::Page,
            metrics: MetricsConfig::default(),
            chains: None,
        }
    }
}

impl Config {
    /// Explorer rate actually used: never above the published ceiling, never zero.
    pub fn explorer_rate(&self) -> u32 {
        self.explorer_requests_per_second
            .clamp(1, MAX_EXPLORER_REQUESTS_PER_SECOND)
    }
}
