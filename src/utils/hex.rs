use alloy::primitives::{Address, B256};
use std::str::FromStr;

/// Clean a hex string by removing "0x" prefix and whitespace
pub fn clean_hex(s: &str) -> &str {
    let s = s.trim();
    if let Some(stripped) = s.strip_prefix("0x") {
        stripped
    } else {
        s
    }
}

/// Lowercase `0x`-prefixed rendering used for every persisted hex value.
pub fn to_hex_lower(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn parse_b256(s: &str) -> Option<B256> {
    let cleaned = clean_hex(s);
    if cleaned.len() != 64 {
        return None;
    }
    B256::from_str(cleaned).ok()
}

pub fn parse_address(s: &str) -> Option<Address> {
    let cleaned = clean_hex(s);
    if cleaned.len() != 40 {
        return None;
    }
    Address::from_str(cleaned).ok()
}
