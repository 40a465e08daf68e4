use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Request,
    Response,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Request => "request",
            EventType::Response => "response",
        }
    }
}

/// Call fields pulled out of a JSON-RPC envelope. Empty strings mean "not a call".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallFields {
    pub contract_address: String,
    pub call_data: String,
    pub rpc_method: String,
}

impl CallFields {
    pub fn is_empty(&self) -> bool {
        self.contract_address.is_empty() && self.call_data.is_empty() && self.rpc_method.is_empty()
    }
}

////////////////////////////////////// Decoded Data //////////////////////////////////////
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCall {
    pub scanned_url: String,
    pub scanned_domain: String,
    pub domain: String,
    pub url: String,
    pub event_type: EventType,
    pub contract_address: String,
    pub call_data: String,
    pub rpc_method: String,
    pub result: String,
}

/////////////////////////////////// Transformed Data ///////////////////////////////////
// Column order is the persisted CSV order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetRow {
    pub scanned_url: String,
    pub scanned_domain: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub domain: String,
    pub url: String,
    pub contract_address: String,
    #[serde(rename = "data")]
    pub call_data: String,
    #[serde(rename = "method")]
    pub rpc_method: String,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletRecord {
    pub contract_address: String,
    pub creator_wallet: String,
}

// Compact view written alongside the resolved chain's name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletRow {
    pub scanned_domain: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub contract_address: String,
    pub wallet: String,
    pub domain: String,
}
