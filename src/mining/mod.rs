//! External vanity search processes (`eradicate2` for CREATE2 salts,
//! `profanity` for deployer keys).

pub mod installer;
pub mod runner;

use crate::error::Result;
use crate::matcher::Matcher;
use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use std::path::PathBuf;

pub use installer::ExecutableInstaller;
pub use runner::ProcessMiner;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MiningJob {
    /// Salt such that `CREATE2(deployer, salt, keccak(init code))` matches.
    Salt {
        deployer: Address,
        init_code_path: PathBuf,
    },
    /// Private key whose nonce-0 contract deployment address matches.
    PrivateKey,
}

impl MiningJob {
    pub fn label(&self) -> &'static str {
        match self {
            MiningJob::Salt { .. } => "salt",
            MiningJob::PrivateKey => "private-key",
        }
    }
}

#[async_trait]
pub trait SaltMiner: Send + Sync {
    /// Runs a search to completion and returns the 32-byte secret.
    async fn mine(&self, job: &MiningJob, matcher: &Matcher) -> Result<B256>;
}
