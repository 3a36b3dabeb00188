use crate::chain::{ChainClient, TxPlan, TxReceipt};
use crate::error::{ChainError, ConfigError, Result};
use crate::utils::config::RpcConfig;
use crate::utils::rpc::{run_with_retry, HttpProvider, DEFAULT_RPC_RETRIES};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::eth::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use std::time::Duration;

/// [`ChainClient`] over JSON-RPC (HTTP).
pub struct RpcChainClient {
    provider: HttpProvider,
    poll_interval: Duration,
}

impl RpcChainClient {
    pub fn connect(rpc_url: &str, poll_interval: Duration) -> Result<Self> {
        let url = rpc_url
            .parse::<reqwest::Url>()
            .map_err(|e| ConfigError::Invalid(format!("ETH_RPC_URL `{rpc_url}`: {e}")))?;
        Ok(Self {
            provider: ProviderBuilder::new().on_http(url),
            poll_interval,
        })
    }

    pub fn from_config(config: &RpcConfig) -> Result<Self> {
        Self::connect(&config.rpc_url, config.poll_interval)
    }

    pub fn provider(&self) -> &HttpProvider {
        &self.provider
    }

    async fn build_request(&self, from: Address, plan: TxPlan) -> Result<TransactionRequest> {
        let chain_id = self.chain_id().await?;
        let nonce = run_with_retry(DEFAULT_RPC_RETRIES, "eth_getTransactionCount", move || async move {
            self.provider
                .get_transaction_count(from)
                .await
                .map_err(anyhow::Error::from)
        })
        .await
        .map_err(|e| rpc_error("eth_getTransactionCount", e))?;

        let mut tx = TransactionRequest::default()
            .with_from(from)
            .with_value(plan.value)
            .with_nonce(nonce)
            .with_chain_id(chain_id)
            .with_gas_price(plan.gas_price);
        tx = match plan.to {
            Some(to) => tx.with_to(to).with_input(plan.input),
            None => tx.with_deploy_code(plan.input),
        };

        tx = match plan.gas_limit {
            Some(limit) => tx.with_gas_limit(limit.into()),
            None => {
                let estimated = self
                    .provider
                    .estimate_gas(&tx)
                    .await
                    .map_err(|e| rpc_error("eth_estimateGas", e))?;
                // 20% headroom over the estimate.
                tx.with_gas_limit(estimated + estimated / 5)
            }
        };
        Ok(tx)
    }

    async fn poll_receipt(&self, tx: B256) -> Result<TxReceipt> {
        loop {
            let receipt = run_with_retry(DEFAULT_RPC_RETRIES, "eth_getTransactionReceipt", move || async move {
                self.provider
                    .get_transaction_receipt(tx)
                    .await
                    .map_err(anyhow::Error::from)
            })
            .await
            .map_err(|e| rpc_error("eth_getTransactionReceipt", e))?;
            if let Some(receipt) = receipt {
                let block_number = receipt.block_number.ok_or_else(|| ChainError::Rpc {
                    context: "eth_getTransactionReceipt".to_string(),
                    reason: format!("receipt for {tx:#x} has no block number"),
                })?;
                return Ok(TxReceipt {
                    hash: tx,
                    contract_address: receipt.contract_address,
                    block_number,
                    status: receipt.status(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> Result<u64> {
        run_with_retry(DEFAULT_RPC_RETRIES, "eth_chainId", move || async move {
            self.provider.get_chain_id().await.map_err(anyhow::Error::from)
        })
        .await
        .map_err(|e| rpc_error("eth_chainId", e))
    }

    async fn gas_price(&self) -> Result<u128> {
        run_with_retry(DEFAULT_RPC_RETRIES, "eth_gasPrice", move || async move {
            self.provider.get_gas_price().await.map_err(anyhow::Error::from)
        })
        .await
        .map_err(|e| rpc_error("eth_gasPrice", e))
    }

    async fn balance_of(&self, account: Address) -> Result<U256> {
        run_with_retry(DEFAULT_RPC_RETRIES, "eth_getBalance", move || async move {
            self.provider
                .get_balance(account)
                .await
                .map_err(anyhow::Error::from)
        })
        .await
        .map_err(|e| rpc_error("eth_getBalance", e))
    }

    async fn code_at(&self, address: Address) -> Result<Bytes> {
        run_with_retry(DEFAULT_RPC_RETRIES, "eth_getCode", move || async move {
            self.provider
                .get_code_at(address)
                .await
                .map_err(anyhow::Error::from)
        })
        .await
        .map_err(|e| rpc_error("eth_getCode", e))
    }

    async fn storage_at(&self, address: Address, slot: U256) -> Result<U256> {
        run_with_retry(DEFAULT_RPC_RETRIES, "eth_getStorageAt", move || async move {
            self.provider
                .get_storage_at(address, slot)
                .await
                .map_err(anyhow::Error::from)
        })
        .await
        .map_err(|e| rpc_error("eth_getStorageAt", e))
    }

    async fn send_transaction(&self, signer: &PrivateKeySigner, plan: TxPlan) -> Result<B256> {
        let tx = self.build_request(signer.address(), plan).await?;
        let wallet = EthereumWallet::from(signer.clone());
        let signed = tx
            .build(&wallet)
            .await
            .map_err(|e| rpc_error("transaction signing", e))?;
        let raw = signed.encoded_2718();
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| rpc_error("eth_sendRawTransaction", e))?;
        let hash = *pending.tx_hash();
        tracing::debug!("[CHAIN] broadcast {:#x} from {:#x}", hash, signer.address());
        Ok(hash)
    }

    async fn wait_for_confirmations(&self, tx: B256, confirmations: u64) -> Result<TxReceipt> {
        let receipt = self.poll_receipt(tx).await?;
        if !receipt.status {
            return Err(ChainError::Reverted {
                tx: format!("{tx:#x}"),
            }
            .into());
        }
        let target = receipt.block_number + confirmations.saturating_sub(1);
        loop {
            let head = run_with_retry(DEFAULT_RPC_RETRIES, "eth_blockNumber", move || async move {
                self.provider.get_block_number().await.map_err(anyhow::Error::from)
            })
            .await
            .map_err(|e| rpc_error("eth_blockNumber", e))?;
            if head >= target {
                return Ok(receipt);
            }
            tracing::debug!(
                "[CHAIN] {:#x} at block {}, waiting for {} (head {})",
                tx,
                receipt.block_number,
                target,
                head
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn rpc_error(context: &str, err: impl std::fmt::Display) -> crate::error::VanityError {
    ChainError::Rpc {
        context: context.to_string(),
        reason: crate::utils::rpc::compact_rpc_error_message(&err.to_string()),
    }
    .into()
}
