use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pipeline::{CallStats, ShardFailure};

/// Written next to the datasets so a partial run is visible without reading logs.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub keyword: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub urls_requested: usize,
    pub shards: usize,
    pub failed_shards: Vec<ShardFailure>,
    pub pages_captured: usize,
    pub pages_matched: usize,
    pub events_captured: usize,
    pub rows: usize,
    pub distinct_contracts: usize,
    pub chain: Option<String>,
    pub wallets_resolved: Option<usize>,
    pub calls: CallStats,
}

impl RunSummary {
    pub fn new(run_id: &str, keyword: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            keyword: keyword.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            urls_requested: 0,
            shards: 0,
            failed_shards: Vec::new(),
            pages_captured: 0,
            pages_matched: 0,
            events_captured: 0,
            rows: 0,
            distinct_contracts: 0,
            chain: None,
            wallets_resolved: None,
            calls: CallStats::default(),
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.failed_shards.is_empty()
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}
