use crate::chain::{ChainClient, TxPlan};
use crate::error::{ChainError, Result};
use crate::utils::constants::{FUNDS_TRANSFER_CONFIRMATIONS, GAS_PRICE_BUMP_PERCENT, TRANSFER_GAS};
use alloy::primitives::{Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;

/// Network gas price plus [`GAS_PRICE_BUMP_PERCENT`].
pub async fn bumped_gas_price<C: ChainClient + ?Sized>(chain: &C) -> Result<u128> {
    let base = chain.gas_price().await?;
    Ok(base.saturating_add(base.saturating_mul(GAS_PRICE_BUMP_PERCENT) / 100))
}

/// Sends `from`'s whole balance minus the exact cost of this transfer, so
/// nothing is left behind that could not pay for another transaction.
pub async fn transfer_all_funds<C: ChainClient + ?Sized>(
    chain: &C,
    from: &PrivateKeySigner,
    to: Address,
) -> Result<B256> {
    let gas_price = bumped_gas_price(chain).await?;
    let balance = chain.balance_of(from.address()).await?;
    let gas_cost = U256::from(gas_price) * U256::from(TRANSFER_GAS);
    if balance <= gas_cost {
        return Err(ChainError::InsufficientFunds {
            account: from.address(),
            balance: balance.to_string(),
            gas_cost: gas_cost.to_string(),
        }
        .into());
    }

    let value = balance - gas_cost;
    tracing::info!(
        "[FUNDS] moving {} wei from {:#x} to {:#x}",
        value,
        from.address(),
        to
    );
    let tx = chain
        .send_transaction(from, TxPlan::transfer(to, value, gas_price, TRANSFER_GAS))
        .await?;
    chain
        .wait_for_confirmations(tx, FUNDS_TRANSFER_CONFIRMATIONS)
        .await?;
    Ok(tx)
}
