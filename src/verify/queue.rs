use crate::artifacts::ArtifactProvider;
use crate::chain::ChainClient;
use crate::error::{Result, VerificationError};
use crate::storage::{ContractType, VanityStore, VerifyRecord};
use crate::utils::config::VerifyConfig;
use crate::utils::constants::{BYTECODE_RETRY_CONFIRMATION_STEP, EIP1967_IMPL_SLOT};
use crate::verify::{SourceVerification, VerificationBackend, VerifyOutcome};
use alloy::primitives::{Address, B256, U256};
use std::time::Duration;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VerifySummary {
    pub verified: usize,
    /// Already verified on the current chain.
    pub skipped: usize,
}

/// Drains the persisted verification records for the connected chain.
///
/// Records are processed in address order. The first hard failure stops the
/// batch; records after it stay pending for the next run.
#[derive(Clone, Debug)]
pub struct VerifyQueue {
    confirmation_step: u64,
    max_bytecode_retries: u32,
    settle_delay: Duration,
}

impl Default for VerifyQueue {
    fn default() -> Self {
        Self::new(&VerifyConfig::default())
    }
}

impl VerifyQueue {
    pub fn new(config: &VerifyConfig) -> Self {
        Self {
            confirmation_step: BYTECODE_RETRY_CONFIRMATION_STEP,
            max_bytecode_retries: config.max_bytecode_retries,
            settle_delay: config.settle_delay,
        }
    }

    /// Upserts by address, keeping chains the address was already verified on.
    pub fn add(&self, store: &VanityStore, mut record: VerifyRecord) -> Result<()> {
        if let Some(existing) = store.find_verification(&record.contract_address)? {
            for chain_id in existing.verified_chain_ids {
                record.mark_verified(chain_id);
            }
        }
        tracing::debug!(
            "[VERIFY] queued {} at {:#x}",
            record.contract_name,
            record.contract_address
        );
        store.save_verification(&record)
    }

    pub async fn execute<C, B, A>(
        &self,
        store: &VanityStore,
        chain: &C,
        backend: &B,
        artifacts: &A,
    ) -> Result<VerifySummary>
    where
        C: ChainClient + ?Sized,
        B: VerificationBackend + ?Sized,
        A: ArtifactProvider + ?Sized,
    {
        let chain_id = chain.chain_id().await?;
        let mut summary = VerifySummary::default();

        for (_, mut record) in store.read_verifications()? {
            if record.is_verified_on(chain_id) {
                summary.skipped += 1;
                continue;
            }
            self.verify_record(store, chain, backend, artifacts, &mut record)
                .await?;
            record.mark_verified(chain_id);
            store.save_verification(&record)?;
            summary.verified += 1;
        }

        if summary.verified > 0 {
            tracing::info!(
                "[VERIFY] chain {}: {} verified, {} already done",
                chain_id,
                summary.verified,
                summary.skipped
            );
        }
        Ok(summary)
    }

    async fn verify_record<C, B, A>(
        &self,
        store: &VanityStore,
        chain: &C,
        backend: &B,
        artifacts: &A,
        record: &mut VerifyRecord,
    ) -> Result<()>
    where
        C: ChainClient + ?Sized,
        B: VerificationBackend + ?Sized,
        A: ArtifactProvider + ?Sized,
    {
        let mut retries = 0u32;
        loop {
            chain
                .wait_for_confirmations(record.deploy_transaction_hash, record.confirmations)
                .await?;
            let outcome = self.submit(chain, backend, artifacts, record).await;
            if !self.settle_delay.is_zero() {
                tokio::time::sleep(self.settle_delay).await;
            }

            match outcome? {
                VerifyOutcome::Verified => {
                    tracing::info!(
                        "[VERIFY] {} verified at {:#x}",
                        record.contract_name,
                        record.contract_address
                    );
                    return Ok(());
                }
                VerifyOutcome::AlreadyVerified => {
                    tracing::info!("[VERIFY] {:#x} already verified", record.contract_address);
                    return Ok(());
                }
                VerifyOutcome::BytecodeMissing if retries < self.max_bytecode_retries => {
                    retries += 1;
                    record.confirmations += self.confirmation_step;
                    store.save_verification(record)?;
                    tracing::warn!(
                        "[VERIFY] no bytecode yet for {:#x}, retrying at {} confirmations ({}/{})",
                        record.contract_address,
                        record.confirmations,
                        retries,
                        self.max_bytecode_retries
                    );
                }
                VerifyOutcome::BytecodeMissing => {
                    return Err(VerificationError::BytecodeNeverVisible {
                        address: record.contract_address,
                        attempts: retries,
                        confirmations: record.confirmations,
                    }
                    .into());
                }
                VerifyOutcome::Failed(reason) => {
                    return Err(VerificationError::Rejected {
                        address: record.contract_address,
                        reason,
                    }
                    .into());
                }
            }
        }
    }

    async fn submit<C, B, A>(
        &self,
        chain: &C,
        backend: &B,
        artifacts: &A,
        record: &VerifyRecord,
    ) -> Result<VerifyOutcome>
    where
        C: ChainClient + ?Sized,
        B: VerificationBackend + ?Sized,
        A: ArtifactProvider + ?Sized,
    {
        let request = SourceVerification {
            address: record.contract_address,
            constructor_arguments: artifacts
                .encode_constructor_args(&record.contract_name, &record.constructor_arguments)?,
            artifact: artifacts.verification_artifact(&record.contract_name)?,
        };
        if record.contract_type != ContractType::Proxy {
            return backend.verify_source(&request).await;
        }

        let Some(implementation) = implementation_of(chain, record.contract_address).await? else {
            return Ok(VerifyOutcome::BytecodeMissing);
        };
        let outcome = backend.verify_source(&request).await?;
        if !outcome.is_success() {
            return Ok(outcome);
        }
        tracing::info!(
            "[VERIFY] linking proxy {:#x} to {:#x}",
            record.contract_address,
            implementation
        );
        backend.link_proxy(record.contract_address, implementation).await
    }
}

/// Reads the EIP-1967 implementation slot; `None` while it is still empty.
pub async fn implementation_of<C: ChainClient + ?Sized>(
    chain: &C,
    proxy: Address,
) -> Result<Option<Address>> {
    let slot = U256::from_be_bytes(EIP1967_IMPL_SLOT);
    let word = chain.storage_at(proxy, slot).await?;
    if word.is_zero() {
        return Ok(None);
    }
    Ok(Some(Address::from_word(B256::from(word.to_be_bytes::<32>()))))
}
