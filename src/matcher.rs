//! Vanity pattern derivation.
//!
//! A [`Matcher`] is built from a prefix and suffix and derives the three
//! shapes the rest of the crate works with: the secret shape emitted by the
//! miners, the anchored address shape, and the wildcard string passed on the
//! miner command line.

use crate::error::PatternError;
use crate::utils::hex::clean_hex;
use alloy::primitives::{Address, B256};
use std::str::FromStr;

pub const ADDRESS_HEX_LEN: usize = 40;
pub const SECRET_HEX_LEN: usize = 64;
const COMMAND_WILDCARD: char = 'X';

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Matcher {
    prefix: String,
    suffix: String,
}

/// `0x` followed by exactly 64 hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecretPattern;

/// `0x` followed by exactly 40 hex digits, anchored by prefix and suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPattern<'a> {
    prefix: &'a str,
    suffix: &'a str,
}

/// 40-character wildcard string understood by `eradicate2` and `profanity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPattern(String);

impl Matcher {
    pub fn new(prefix: &str, suffix: &str) -> Result<Self, PatternError> {
        let prefix = normalize(prefix)?;
        let suffix = normalize(suffix)?;
        let len = prefix.len() + suffix.len();
        if len > ADDRESS_HEX_LEN {
            return Err(PatternError::TooLong { len });
        }
        Ok(Self { prefix, suffix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn secret_pattern(&self) -> SecretPattern {
        SecretPattern
    }

    pub fn address_pattern(&self) -> AddressPattern<'_> {
        AddressPattern {
            prefix: &self.prefix,
            suffix: &self.suffix,
        }
    }

    pub fn command_pattern(&self) -> CommandPattern {
        let width = ADDRESS_HEX_LEN - self.suffix.len();
        let mut pattern = String::with_capacity(ADDRESS_HEX_LEN);
        pattern.push_str(&self.prefix);
        while pattern.len() < width {
            pattern.push(COMMAND_WILDCARD);
        }
        pattern.push_str(&self.suffix);
        CommandPattern(pattern)
    }

    pub fn matches_address(&self, address: &Address) -> bool {
        let hex = hex::encode(address.as_slice());
        self.address_pattern().is_match(&hex)
    }
}

fn normalize(raw: &str) -> Result<String, PatternError> {
    let cleaned = clean_hex(raw);
    if !cleaned.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PatternError::NotHex {
            value: raw.to_string(),
        });
    }
    Ok(cleaned.to_ascii_lowercase())
}

impl SecretPattern {
    /// First 32-byte secret token on the line.
    pub fn find_in(&self, line: &str) -> Option<B256> {
        hex_tokens(line)
            .find(|token| token.len() == SECRET_HEX_LEN)
            .and_then(|token| B256::from_str(token).ok())
    }
}

impl AddressPattern<'_> {
    /// `candidate` is bare hex without the `0x` prefix.
    pub fn is_match(&self, candidate: &str) -> bool {
        candidate.len() == ADDRESS_HEX_LEN
            && candidate.chars().all(|c| c.is_ascii_hexdigit())
            && candidate[..self.prefix.len()].eq_ignore_ascii_case(self.prefix)
            && candidate[ADDRESS_HEX_LEN - self.suffix.len()..].eq_ignore_ascii_case(self.suffix)
    }

    /// First address token on the line satisfying the pattern.
    pub fn find_in<'l>(&self, line: &'l str) -> Option<&'l str> {
        hex_tokens(line).find(|token| self.is_match(token))
    }
}

impl CommandPattern {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommandPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maximal hex runs that follow a `0x` marker.
fn hex_tokens(line: &str) -> impl Iterator<Item = &str> {
    let bytes = line.as_bytes();
    let mut idx = 0usize;
    std::iter::from_fn(move || {
        while idx + 1 < bytes.len() {
            if bytes[idx] == b'0' && (bytes[idx + 1] == b'x' || bytes[idx + 1] == b'X') {
                let start = idx + 2;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_hexdigit() {
                    end += 1;
                }
                idx = end;
                if end > start {
                    return Some(&line[start..end]);
                }
            } else {
                idx += 1;
            }
        }
        None
    })
}
