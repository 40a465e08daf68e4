use anyhow::{Result, anyhow};
use opentelemetry::KeyValue;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::capture::{Browser, SessionSettings, run_session};
use crate::metrics::Metrics;
use crate::models::datasets::captures::CaptureMap;
use crate::models::errors::ConfigError;

/// Split `urls` into `shard_count` order-preserving parts whose lengths differ by at most one.
///
/// The first `len % shard_count` shards carry the extra element.
pub fn split_urls(urls: &[String], shard_count: usize) -> Result<Vec<Vec<String>>> {
    if shard_count == 0 {
        return Err(ConfigError::InvalidJobCount { jobs: shard_count }.into());
    }

    let base = urls.len() / shard_count;
    let remainder = urls.len() % shard_count;

    let mut shards = Vec::with_capacity(shard_count);
    let mut start = 0;
    for index in 0..shard_count {
        let size = base + usize::from(index < remainder);
        shards.push(urls[start..start + size].to_vec());
        start += size;
    }
    Ok(shards)
}

#[derive(Debug, Clone, Serialize)]
pub struct ShardFailure {
    pub shard: usize,
    pub url_count: usize,
    pub reason: String,
}

/// Outcome of a distributed capture run.
#[derive(Debug, Default)]
pub struct ShardReport {
    // Completed shards' maps in shard order
    pub captures: Vec<CaptureMap>,
    pub failures: Vec<ShardFailure>,
}

impl ShardReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Concatenate every completed shard's map, shard 0 first.
    pub fn merged(&self) -> CaptureMap {
        merge_captures(self.captures.iter().cloned())
    }
}

pub fn merge_captures(maps: impl IntoIterator<Item = CaptureMap>) -> CaptureMap {
    let mut merged = CaptureMap::new();
    for map in maps {
        merged.merge(map);
    }
    merged
}

/// Run one capture session per shard on its own blocking worker and wait for all of them.
///
/// A shard that errors or panics is reported in `failures`; the others' results are kept.
/// Empty shards complete with an empty map without launching a browser.
pub async fn run_shards<B: Browser>(
    browser: Arc<B>,
    shards: Vec<Vec<String>>,
    settings: &SessionSettings,
    metrics: Option<&Metrics>,
) -> ShardReport {
    let url_counts: Vec<usize> = shards.iter().map(Vec::len).collect();

    let handles = shards
        .into_iter()
        .enumerate()
        .map(|(index, urls)| {
            if urls.is_empty() {
                debug!("Shard {} has no URLs, not launching a browser", index);
                return None;
            }
            let browser = browser.clone();
            let settings = settings.clone();
            let metrics = metrics.cloned();
            Some(tokio::task::spawn_blocking(move || {
                info!("Shard {} starting with {} URLs", index, urls.len());
                run_session(browser.as_ref(), &urls, &settings, metrics.as_ref())
            }))
        })
        .collect::<Vec<_>>();

    let outcomes = futures::future::join_all(handles.into_iter().map(|handle| async move {
        match handle {
            Some(handle) => handle
                .await
                .map_err(|e| anyhow!("worker crashed: {}", e))
                .and_then(|session| session),
            None => Ok(CaptureMap::new()),
        }
    }))
    .await;

    let mut report = ShardReport::default();
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(captures) => report.captures.push(captures),
            Err(e) => {
                error!("Shard {} failed, its results are missing: {:#}", index, e);
                if let Some(metrics) = metrics {
                    metrics
                        .shard_failures
                        .add(1, &[KeyValue::new("shard", index as i64)]);
                }
                report.failures.push(ShardFailure {
                    shard: index,
                    url_count: url_counts[index],
                    reason: format!("{:#}", e),
                });
            }
        }
    }

    info!(
        "{} of {} shards completed",
        report.captures.len(),
        url_counts.len()
    );
    report
}
