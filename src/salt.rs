//! CREATE2 salt and deployer-key lookup, mining on a cache miss.

use crate::error::Result;
use crate::matcher::Matcher;
use crate::mining::{MiningJob, SaltMiner};
use crate::storage::VanityStore;
use crate::utils::constants::SALT_SUFFIX;
use crate::utils::hex::to_hex_lower;
use alloy::primitives::{keccak256, Address, B256};

/// `keccak256(0xff ++ deployer ++ salt ++ init_code_hash)[12..]`, per EIP-1014.
pub fn compute_create2_address(deployer: Address, salt: B256, init_code_hash: B256) -> Address {
    let mut preimage = [0u8; 85];
    preimage[0] = 0xff;
    preimage[1..21].copy_from_slice(deployer.as_slice());
    preimage[21..53].copy_from_slice(salt.as_slice());
    preimage[53..85].copy_from_slice(init_code_hash.as_slice());
    Address::from_slice(&keccak256(preimage)[12..])
}

pub fn salt_key(key: &str) -> String {
    format!("{key}{SALT_SUFFIX}")
}

/// Looks up stored salts and keys. Anything already in the store is
/// returned as-is, without re-checking it against the current pattern.
pub struct SaltCalculator<'a, M: SaltMiner + ?Sized> {
    store: &'a VanityStore,
    miner: &'a M,
    matcher: &'a Matcher,
}

impl<'a, M: SaltMiner + ?Sized> SaltCalculator<'a, M> {
    pub fn new(store: &'a VanityStore, miner: &'a M, matcher: &'a Matcher) -> Self {
        Self {
            store,
            miner,
            matcher,
        }
    }

    pub async fn get_or_mine_salt(&self, key: &str, deployer: Address, init_code: &[u8]) -> Result<B256> {
        let secret_key = salt_key(key);
        if let Some(salt) = self.store.find_secret(&secret_key)? {
            tracing::debug!("[MINER] reusing stored salt for {}", key);
            return Ok(salt);
        }

        let init_code_path = self
            .store
            .save_bytecode(key, to_hex_lower(init_code).as_bytes())?;
        let job = MiningJob::Salt {
            deployer,
            init_code_path,
        };
        let salt = self.miner.mine(&job, self.matcher).await?;

        let predicted = compute_create2_address(deployer, salt, keccak256(init_code));
        if !self.matcher.matches_address(&predicted) {
            tracing::warn!(
                "[MINER] salt for {} yields {:#x}, which does not match {}",
                key,
                predicted,
                self.matcher.command_pattern()
            );
        }
        self.store.save_secret(&secret_key, &salt)?;
        Ok(salt)
    }

    pub async fn get_or_mine_private_key(&self, secret_key: &str) -> Result<B256> {
        if let Some(key) = self.store.find_secret(secret_key)? {
            return Ok(key);
        }
        let key = self.miner.mine(&MiningJob::PrivateKey, self.matcher).await?;
        self.store.save_secret(secret_key, &key)?;
        Ok(key)
    }
}
