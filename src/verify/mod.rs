//! Post-deployment source verification on a block explorer.

pub mod etherscan;
pub mod queue;

use crate::artifacts::VerificationArtifact;
use crate::error::Result;
use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;

pub use etherscan::EtherscanClient;
pub use queue::{VerifyQueue, VerifySummary};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceVerification {
    pub address: Address,
    /// ABI-encoded constructor arguments, without selector.
    pub constructor_arguments: Bytes,
    pub artifact: VerificationArtifact,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
    /// The explorer has not indexed the contract code yet.
    BytecodeMissing,
    Failed(String),
}

impl VerifyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, VerifyOutcome::Verified | VerifyOutcome::AlreadyVerified)
    }
}

#[async_trait]
pub trait VerificationBackend: Send + Sync {
    async fn verify_source(&self, request: &SourceVerification) -> Result<VerifyOutcome>;

    async fn link_proxy(&self, proxy: Address, implementation: Address) -> Result<VerifyOutcome>;
}
