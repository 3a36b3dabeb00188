//! What the deployment flows need from a node, behind a trait so the flows
//! run unchanged against a live RPC endpoint or an in-memory chain.

pub mod rpc;

use crate::error::{ChainError, Result};
use crate::utils::hex::parse_b256;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;

pub use rpc::RpcChainClient;

/// Legacy-priced transaction about to be signed. `to == None` is a
/// contract creation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxPlan {
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    pub gas_price: u128,
    /// Estimated by the node when absent.
    pub gas_limit: Option<u64>,
}

impl TxPlan {
    pub fn transfer(to: Address, value: U256, gas_price: u128, gas_limit: u64) -> Self {
        Self {
            to: Some(to),
            value,
            input: Bytes::new(),
            gas_price,
            gas_limit: Some(gas_limit),
        }
    }

    pub fn call(to: Address, input: Bytes, gas_price: u128) -> Self {
        Self {
            to: Some(to),
            input,
            gas_price,
            ..Self::default()
        }
    }

    pub fn create(init_code: Bytes, gas_price: u128) -> Self {
        Self {
            input: init_code,
            gas_price,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: B256,
    pub contract_address: Option<Address>,
    pub block_number: u64,
    pub status: bool,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;

    async fn gas_price(&self) -> Result<u128>;

    async fn balance_of(&self, account: Address) -> Result<U256>;

    async fn code_at(&self, address: Address) -> Result<Bytes>;

    async fn storage_at(&self, address: Address, slot: U256) -> Result<U256>;

    /// Signs and broadcasts; returns the transaction hash without waiting.
    async fn send_transaction(&self, signer: &PrivateKeySigner, plan: TxPlan) -> Result<B256>;

    /// Resolves once the transaction has `confirmations` blocks on top of
    /// (and including) its own. Reverted transactions are an error.
    async fn wait_for_confirmations(&self, tx: B256, confirmations: u64) -> Result<TxReceipt>;
}

pub fn signer_from_secret(secret: &B256) -> Result<PrivateKeySigner> {
    PrivateKeySigner::from_bytes(secret)
        .map_err(|e| ChainError::InvalidKey(e.to_string()).into())
}

pub fn parse_signer(raw: &str) -> Result<PrivateKeySigner> {
    let secret = parse_b256(raw)
        .ok_or_else(|| ChainError::InvalidKey("expected 32 bytes of hex".to_string()))?;
    signer_from_secret(&secret)
}
