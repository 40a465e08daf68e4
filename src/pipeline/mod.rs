pub mod abi;
pub mod distributor;
pub mod filter;
pub mod rpc;
pub mod transformations;

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::datasets::calls::DatasetRow;
use crate::models::datasets::captures::CaptureMap;
use crate::pipeline::abi::{decode_string_result, embedded_payload, selector_label};
use crate::pipeline::rpc::responses::split_results;
use crate::pipeline::transformations::calls::normalize_captures;
use crate::pipeline::transformations::dataset::assemble;

pub use distributor::{ShardFailure, ShardReport, merge_captures, run_shards, split_urls};
pub use filter::filter_captures;

/// Decode a filtered capture map into the persisted table.
pub fn build_dataset(filtered: &CaptureMap) -> Vec<DatasetRow> {
    let rows = assemble(normalize_captures(filtered));
    debug!(
        "Decoded {} events from {} pages into {} rows",
        filtered.event_count(),
        filtered.page_count(),
        rows.len()
    );
    rows
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CallStats {
    // Known function name -> number of request rows calling it
    pub selector_labels: BTreeMap<String, usize>,
    // Response rows whose decoded result carries a gzipped base64 script
    pub embedded_payloads: usize,
}

pub fn call_stats(rows: &[DatasetRow]) -> CallStats {
    let mut stats = CallStats::default();

    for row in rows {
        if let Some(label) = selector_label(&row.call_data) {
            *stats.selector_labels.entry(label.to_string()).or_default() += 1;
        }

        let carries_payload = split_results(&row.result)
            .iter()
            .filter_map(|result| decode_string_result(result))
            .any(|text| embedded_payload(&text).is_some());
        if carries_payload {
            stats.embedded_payloads += 1;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::hex;
    use alloy_sol_types::SolValue;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn row(call_data: &str, result: &str) -> DatasetRow {
        DatasetRow {
            scanned_url: String::new(),
            scanned_domain: String::new(),
            event_type: "request".to_string(),
            domain: String::new(),
            url: String::new(),
            contract_address: String::new(),
            call_data: call_data.to_string(),
            rpc_method: String::new(),
            result: result.to_string(),
        }
    }

    fn abi_string(value: &str) -> String {
        format!("0x{}", hex::encode(value.to_string().abi_encode()))
    }

    fn gzip_base64(script: &str) -> String {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(script.as_bytes()).unwrap();
        STANDARD.encode(encoder.finish().unwrap())
    }

    #[test]
    fn test_call_stats() {
        let rows = vec![
            row("0x70a08231000000000000000000000000000000000000000000000000000000000000dead", ""),
            row("0x70a08231", ""),
            row("0x095ea7b3", ""),
            row("", &format!("0x01;{}", abi_string(&format!("x=\"{}\"", gzip_base64("alert(1)"))))),
            // Gzip header with no stream behind it
            row("", &abi_string("x=\"H4sIAAAAAAAA\"")),
            row("", &abi_string("no payload here")),
        ];

        let stats = call_stats(&rows);
        assert_eq!(stats.selector_labels.get("balanceOf"), Some(&2));
        assert_eq!(stats.selector_labels.get("approve"), Some(&1));
        assert_eq!(stats.embedded_payloads, 1);
    }
}
