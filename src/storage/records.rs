use crate::artifacts::ConstructorArgument;
use crate::utils::constants::DEFAULT_CONFIRMATIONS;
use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContractType {
    /// The bootstrap implementation contract itself.
    VanityDeployer,
    /// An EIP-1967 proxy; verified together with its implementation link.
    Proxy,
    #[default]
    Default,
}

/// One pending (or partially completed) explorer verification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRecord {
    #[serde(default)]
    pub contract_type: ContractType,
    pub contract_name: String,
    pub contract_address: Address,
    #[serde(default)]
    pub constructor_arguments: Vec<ConstructorArgument>,
    pub deploy_transaction_hash: B256,
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    #[serde(default)]
    pub verified_chain_ids: Vec<u64>,
}

fn default_confirmations() -> u64 {
    DEFAULT_CONFIRMATIONS
}

impl VerifyRecord {
    pub fn new(
        contract_type: ContractType,
        contract_name: impl Into<String>,
        contract_address: Address,
        constructor_arguments: Vec<ConstructorArgument>,
        deploy_transaction_hash: B256,
    ) -> Self {
        Self {
            contract_type,
            contract_name: contract_name.into(),
            contract_address,
            constructor_arguments,
            deploy_transaction_hash,
            confirmations: DEFAULT_CONFIRMATIONS,
            verified_chain_ids: Vec::new(),
        }
    }

    pub fn is_verified_on(&self, chain_id: u64) -> bool {
        self.verified_chain_ids.contains(&chain_id)
    }

    /// Returns `false` if the chain was already recorded.
    pub fn mark_verified(&mut self, chain_id: u64) -> bool {
        if self.is_verified_on(chain_id) {
            return false;
        }
        self.verified_chain_ids.push(chain_id);
        true
    }

    pub fn storage_key(&self) -> String {
        verification_key(&self.contract_address)
    }
}

pub fn verification_key(address: &Address) -> String {
    format!("{address:#x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_verified_never_duplicates_a_chain() {
        let mut record = VerifyRecord::new(
            ContractType::Default,
            "Token",
            Address::repeat_byte(0x11),
            Vec::new(),
            B256::repeat_byte(0x22),
        );
        assert!(record.mark_verified(1));
        assert!(!record.mark_verified(1));
        assert!(record.mark_verified(10));
        assert_eq!(record.verified_chain_ids, vec![1, 10]);
    }

    #[test]
    fn test_missing_optional_fields_take_defaults() {
        let raw = r#"{
            "contractName": "Token",
            "contractAddress": "0x1111111111111111111111111111111111111111",
            "deployTransactionHash": "0x2222222222222222222222222222222222222222222222222222222222222222"
        }"#;
        let record: VerifyRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.contract_type, ContractType::Default);
        assert_eq!(record.confirmations, DEFAULT_CONFIRMATIONS);
        assert!(record.verified_chain_ids.is_empty());
    }
}
