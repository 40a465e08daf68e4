pub mod summary;

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::chains::ChainEntry;
use crate::models::datasets::calls::{DatasetRow, WalletRow};
use crate::models::datasets::captures::CaptureMap;
use crate::storage::summary::RunSummary;

pub const CAPTURES_FILE: &str = "results.json";
pub const RAW_CAPTURES_FILE: &str = "raw.json";
pub const DATASET_FILE: &str = "results.csv";
pub const SUMMARY_FILE: &str = "summary.json";
pub const METRICS_FILE: &str = "metrics.prom";

pub const DATASET_HEADER: [&str; 9] = [
    "scanned_url",
    "scanned_domain",
    "type",
    "domain",
    "url",
    "contract_address",
    "data",
    "method",
    "result",
];

pub const WALLET_HEADER: [&str; 5] = ["scanned_domain", "type", "contract_address", "wallet", "domain"];

pub fn wallets_file_name(chain: &ChainEntry) -> String {
    format!("results_with_wallets-{}.csv", chain.file_label())
}

/// Output directory of one run. Every artifact is written once, after all
/// capture workers have joined.
pub struct ResultsWriter {
    dir: PathBuf,
}

impl ResultsWriter {
    pub fn create<P: AsRef<Path>>(results_root: P, output: &str) -> Result<Self> {
        let dir = results_root.as_ref().join(output);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        info!("Writing results to {}", dir.display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn write_captures(&self, captures: &CaptureMap) -> Result<PathBuf> {
        self.write_json(CAPTURES_FILE, captures)
    }

    pub fn write_raw_captures(&self, captures: &CaptureMap) -> Result<PathBuf> {
        self.write_json(RAW_CAPTURES_FILE, captures)
    }

    pub fn write_summary(&self, summary: &RunSummary) -> Result<PathBuf> {
        self.write_json(SUMMARY_FILE, summary)
    }

    pub fn write_dataset(&self, rows: &[DatasetRow]) -> Result<PathBuf> {
        self.write_csv(DATASET_FILE, &DATASET_HEADER, rows)
    }

    pub fn write_wallets(&self, chain: &ChainEntry, rows: &[WalletRow]) -> Result<PathBuf> {
        self.write_csv(&wallets_file_name(chain), &WALLET_HEADER, rows)
    }

    pub fn write_metrics(&self, exposition: &str) -> Result<PathBuf> {
        let path = self.dir.join(METRICS_FILE);
        fs::write(&path, exposition)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.dir.join(name);
        let file =
            File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)
            .with_context(|| format!("failed to serialize {}", name))?;
        writer.flush()?;
        info!("Wrote {}", path.display());
        Ok(path)
    }

    // Header is written explicitly so an empty table still has one
    fn write_csv<T: Serialize>(&self, name: &str, header: &[&str], rows: &[T]) -> Result<PathBuf> {
        let path = self.dir.join(name);
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        writer.write_record(header)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        info!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chains::ChainRegistry;
    use crate::models::datasets::captures::{RequestEvent, TrafficEvent};
    use std::collections::BTreeMap;

    fn row(result: &str) -> DatasetRow {
        DatasetRow {
            scanned_url: "https://phish.example/".to_string(),
            scanned_domain: "phish.example".to_string(),
            event_type: "response".to_string(),
            domain: "binance.org".to_string(),
            url: "https://bsc-dataseed.binance.org/".to_string(),
            contract_address: "0xABC".to_string(),
            call_data: "0x70a08231".to_string(),
            rpc_method: "eth_call".to_string(),
            result: result.to_string(),
        }
    }

    #[test]
    fn test_dataset_csv_column_order() {
        let root = tempfile::tempdir().unwrap();
        let writer = ResultsWriter::create(root.path(), "run").unwrap();

        let path = writer.write_dataset(&[row("0x01;0x02")]).unwrap();
        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<_> = content.lines().collect();

        assert_eq!(
            lines[0],
            "scanned_url,scanned_domain,type,domain,url,contract_address,data,method,result"
        );
        assert_eq!(
            lines[1],
            "https://phish.example/,phish.example,response,binance.org,https://bsc-dataseed.binance.org/,0xABC,0x70a08231,eth_call,0x01;0x02"
        );
    }

    #[test]
    fn test_empty_dataset_still_has_header() {
        let root = tempfile::tempdir().unwrap();
        let writer = ResultsWriter::create(root.path(), "empty").unwrap();

        let path = writer.write_dataset(&[]).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_wallets_file_named_after_chain() {
        let root = tempfile::tempdir().unwrap();
        let writer = ResultsWriter::create(root.path(), "run").unwrap();
        let registry = ChainRegistry::default();
        let chain = registry.by_id(56).unwrap();

        let path = writer
            .write_wallets(
                chain,
                &[WalletRow {
                    scanned_domain: "phish.example".to_string(),
                    event_type: "request".to_string(),
                    contract_address: "0xABC".to_string(),
                    wallet: "0xW".to_string(),
                    domain: "binance.org".to_string(),
                }],
            )
            .unwrap();

        assert!(path.ends_with("results_with_wallets-BNB-Smart-Chain.csv"));
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(
            content.lines().next(),
            Some("scanned_domain,type,contract_address,wallet,domain")
        );
        assert!(content.contains("phish.example,request,0xABC,0xW,binance.org"));
    }

    #[test]
    fn test_captures_json_shape() {
        let root = tempfile::tempdir().unwrap();
        let writer = ResultsWriter::create(root.path(), "run").unwrap();

        let mut captures = CaptureMap::new();
        captures.push(
            "binance.org",
            "https://phish.example/",
            TrafficEvent::Request(RequestEvent {
                method: "POST".to_string(),
                url: "https://bsc-dataseed.binance.org/".to_string(),
                scanned_domain: "phish.example".to_string(),
                domain: "binance.org".to_string(),
                headers: BTreeMap::new(),
                body: Some("{}".to_string()),
            }),
        );

        let path = writer.write_captures(&captures).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();

        let event = &parsed["binance.org"]["https://phish.example/"][0];
        assert_eq!(event["type"], "request");
        assert_eq!(event["method"], "POST");
        assert_eq!(event["scanned_domain"], "phish.example");
    }
}
