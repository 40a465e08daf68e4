use indexmap::IndexSet;
use std::collections::HashMap;

use crate::models::datasets::calls::{DatasetRow, DecodedCall, WalletRecord, WalletRow};

pub trait DatasetTransformer {
    fn into_dataset_row(self) -> DatasetRow;
}

impl DatasetTransformer for DecodedCall {
    fn into_dataset_row(self) -> DatasetRow {
        DatasetRow {
            scanned_url: self.scanned_url,
            scanned_domain: self.scanned_domain,
            event_type: self.event_type.as_str().to_string(),
            domain: self.domain,
            url: self.url,
            contract_address: self.contract_address,
            call_data: self.call_data,
            rpc_method: self.rpc_method,
            result: self.result,
        }
    }
}

/// One table row per decoded call, input order kept.
pub fn assemble(calls: Vec<DecodedCall>) -> Vec<DatasetRow> {
    calls
        .into_iter()
        .map(DatasetTransformer::into_dataset_row)
        .collect()
}

/// Non-empty contract addresses in order of first appearance.
pub fn distinct_contracts(rows: &[DatasetRow]) -> Vec<String> {
    rows.iter()
        .map(|row| row.contract_address.as_str())
        .filter(|address| !address.is_empty())
        .collect::<IndexSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Join resolved creators onto the dataset. Unmatched rows get an empty wallet;
/// if an address was resolved twice the later record wins.
pub fn attach_wallets(rows: &[DatasetRow], wallets: &[WalletRecord]) -> Vec<WalletRow> {
    let creators: HashMap<&str, &str> = wallets
        .iter()
        .map(|record| (record.contract_address.as_str(), record.creator_wallet.as_str()))
        .collect();

    rows.iter()
        .map(|row| WalletRow {
            scanned_domain: row.scanned_domain.clone(),
            event_type: row.event_type.clone(),
            contract_address: row.contract_address.clone(),
            wallet: creators
                .get(row.contract_address.as_str())
                .map(|w| w.to_string())
                .unwrap_or_default(),
            domain: row.domain.clone(),
        })
        .collect()
}
