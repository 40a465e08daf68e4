use anyhow::{Context, Result};
use indexmap::IndexSet;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::models::errors::SourceError;
use crate::utils::retry::{RetryConfig, retry_if};

// urlscan caps a single search page at this many results
const URLSCAN_PAGE_SIZE: &str = "10000";

/// URLs from one column of a CSV file with a header row.
///
/// Empty cells are dropped and duplicates removed, first occurrence kept.
pub fn from_csv_file<P: AsRef<Path>>(path: P, column: &str) -> Result<Vec<String>> {
    let path = path.as_ref();
    let path_label = path.to_string_lossy().to_string();
    let csv_error = |source: csv::Error| SourceError::Csv {
        path: path_label.clone(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    let index = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .position(|header| header.trim() == column)
        .ok_or_else(|| SourceError::MissingColumn {
            path: path_label.clone(),
            column: column.to_string(),
        })?;

    let mut urls = IndexSet::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        if let Some(cell) = record.get(index).map(str::trim).filter(|c| !c.is_empty()) {
            urls.insert(cell.to_string());
        }
    }

    info!("Read {} URLs from {}", urls.len(), path_label);
    Ok(urls.into_iter().collect())
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    task: Option<SearchTask>,
}

#[derive(Debug, Deserialize)]
struct SearchTask {
    url: Option<String>,
}

/// URLs of scans matching `query` on urlscan.io (or a compatible endpoint).
pub async fn from_urlscan(
    endpoint: &str,
    api_key: &str,
    query: &str,
    retry_config: &RetryConfig,
) -> Result<Vec<String>> {
    let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
    let client = &client;

    let response = retry_if(
        move || async move {
            let response = client
                .get(endpoint)
                .header("API-Key", api_key)
                .query(&[("q", query), ("size", URLSCAN_PAGE_SIZE)])
                .send()
                .await?;

            let status = response.status();
            if status != StatusCode::OK {
                return Err(anyhow::Error::from(SourceError::UrlscanStatus {
                    status: status.as_u16(),
                }));
            }

            Ok::<_, anyhow::Error>(response.json::<SearchResponse>().await?)
        },
        is_transient,
        retry_config,
        "urlscan search",
    )
    .await
    .context("failed to fetch URLs from urlscan")?;

    let urls: IndexSet<String> = response
        .results
        .into_iter()
        .filter_map(|result| result.task.and_then(|task| task.url))
        .filter(|url| !url.is_empty())
        .collect();

    info!("urlscan returned {} distinct URLs for '{}'", urls.len(), query);
    Ok(urls.into_iter().collect())
}

// Client errors other than throttling will not improve on retry
fn is_transient(error: &anyhow::Error) -> bool {
    match error.downcast_ref::<SourceError>() {
        Some(SourceError::UrlscanStatus { status }) => {
            *status == 429 || !(400..500).contains(status)
        }
        _ => true,
    }
}
