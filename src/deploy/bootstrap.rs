use crate::artifacts::{ArtifactProvider, ConstructorArgument};
use crate::chain::{signer_from_secret, ChainClient, TxPlan};
use crate::deploy::contracts::IInitializable;
use crate::deploy::funds::{bumped_gas_price, transfer_all_funds};
use crate::deploy::DeploymentSession;
use crate::error::{ChainError, Result, VanityError};
use crate::mining::SaltMiner;
use crate::salt::SaltCalculator;
use crate::storage::{ContractType, VanityStore, VerifyRecord};
use crate::utils::constants::{
    DEPLOYER_KEY, DEPLOYER_PROXY_KEY, DEPLOY_CONFIRMATIONS, ERC1967_PROXY_CONTRACT,
    PRIVATE_KEY_SUFFIX, VANITY_DEPLOYER_CONTRACT,
};
use crate::verify::VerifyQueue;
use alloy::primitives::{Address, Bytes};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapState {
    NoDeployer,
    DeployerDeployed,
    ProxyDeployed,
}

impl BootstrapState {
    fn next_stage(self) -> Option<Stage> {
        match self {
            BootstrapState::NoDeployer => Some(Stage::Implementation),
            BootstrapState::DeployerDeployed => Some(Stage::Proxy),
            BootstrapState::ProxyDeployed => None,
        }
    }

    fn advance(self) -> Self {
        match self {
            BootstrapState::NoDeployer => BootstrapState::DeployerDeployed,
            _ => BootstrapState::ProxyDeployed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Implementation,
    Proxy,
}

impl Stage {
    fn address_key(self) -> &'static str {
        match self {
            Stage::Implementation => DEPLOYER_KEY,
            Stage::Proxy => DEPLOYER_PROXY_KEY,
        }
    }

    fn secret_key(self) -> String {
        format!("{}{PRIVATE_KEY_SUFFIX}", self.address_key())
    }

    fn contract_type(self) -> ContractType {
        match self {
            Stage::Implementation => ContractType::VanityDeployer,
            Stage::Proxy => ContractType::Proxy,
        }
    }
}

/// Derived from the store and on-chain code; a stored address without code
/// (e.g. a reset local chain) counts as not deployed.
pub async fn detect_state<C: ChainClient + ?Sized>(
    store: &VanityStore,
    chain: &C,
) -> Result<BootstrapState> {
    let Some(deployer) = store.find_address(DEPLOYER_KEY)? else {
        return Ok(BootstrapState::NoDeployer);
    };
    let Some(proxy) = store.find_address(DEPLOYER_PROXY_KEY)? else {
        return Ok(BootstrapState::DeployerDeployed);
    };
    if chain.code_at(deployer).await?.is_empty() {
        return Ok(BootstrapState::NoDeployer);
    }
    if chain.code_at(proxy).await?.is_empty() {
        return Ok(BootstrapState::DeployerDeployed);
    }
    Ok(BootstrapState::ProxyDeployed)
}

/// One bootstrap run. Each stage mines (or reuses) a key whose first
/// contract address matches the pattern, funds it from the main signer,
/// deploys from it and sends the remainder back.
pub struct Bootstrap<'a, C: ?Sized, A: ?Sized, M: ?Sized> {
    pub chain: &'a C,
    pub artifacts: &'a A,
    pub miner: &'a M,
    pub store: &'a VanityStore,
    pub queue: &'a VerifyQueue,
    pub session: &'a DeploymentSession,
}

impl<C, A, M> Bootstrap<'_, C, A, M>
where
    C: ChainClient + ?Sized,
    A: ArtifactProvider + ?Sized,
    M: SaltMiner + ?Sized,
{
    /// Runs every remaining stage. Fails with `AlreadyDeployed` if there is
    /// nothing left to do.
    pub async fn run(&self) -> Result<()> {
        let mut state = detect_state(self.store, self.chain).await?;
        if state == BootstrapState::ProxyDeployed {
            return Err(self.already_deployed()?);
        }
        while let Some(stage) = state.next_stage() {
            self.transition(stage).await?;
            state = state.advance();
        }
        Ok(())
    }

    fn already_deployed(&self) -> Result<VanityError> {
        let deployer = self.store.find_address(DEPLOYER_KEY)?.unwrap_or_default();
        let proxy = self.store.find_address(DEPLOYER_PROXY_KEY)?.unwrap_or_default();
        Ok(VanityError::AlreadyDeployed { deployer, proxy })
    }

    async fn transition(&self, stage: Stage) -> Result<()> {
        let secret = SaltCalculator::new(self.store, self.miner, &self.session.matcher)
            .get_or_mine_private_key(&stage.secret_key())
            .await?;
        let wallet = signer_from_secret(&secret)?;
        tracing::info!(
            "[DEPLOY] bootstrapping {} from {:#x}",
            stage.address_key(),
            wallet.address()
        );

        match self.deploy_from(stage, &wallet).await {
            Ok(address) => {
                tracing::info!("[DEPLOY] {} deployed at {:#x}", stage.address_key(), address);
                Ok(())
            }
            Err(err) => {
                tracing::error!(
                    "[DEPLOY] {} failed, returning funds to main signer: {}",
                    stage.address_key(),
                    err
                );
                let main = self.session.main_address();
                if let Err(recovery) = transfer_all_funds(self.chain, &wallet, main).await {
                    tracing::error!(
                        "[FUNDS] could not return funds from {:#x}: {}",
                        wallet.address(),
                        recovery
                    );
                }
                Err(err)
            }
        }
    }

    async fn deploy_from(&self, stage: Stage, wallet: &PrivateKeySigner) -> Result<Address> {
        let main = &self.session.main_signer;
        transfer_all_funds(self.chain, main, wallet.address()).await?;

        let (contract, constructor_args) = match stage {
            Stage::Implementation => (VANITY_DEPLOYER_CONTRACT, Vec::new()),
            Stage::Proxy => {
                let implementation = self.store.find_address(DEPLOYER_KEY)?.ok_or_else(|| {
                    VanityError::DeployerNotFound(
                        "deploying the deployer proxy but its implementation is not stored".to_string(),
                    )
                })?;
                let init_data = IInitializable::initializeCall {
                    owner: main.address(),
                }
                .abi_encode();
                (
                    ERC1967_PROXY_CONTRACT,
                    vec![
                        ConstructorArgument::from(implementation),
                        ConstructorArgument::from(Bytes::from(init_data)),
                    ],
                )
            }
        };
        let init_code = self.artifacts.init_code(contract, &constructor_args)?;
        let gas_price = bumped_gas_price(self.chain).await?;
        let tx = self
            .chain
            .send_transaction(wallet, TxPlan::create(init_code, gas_price))
            .await?;
        let receipt = self.chain.wait_for_confirmations(tx, DEPLOY_CONFIRMATIONS).await?;
        let address = receipt.contract_address.ok_or_else(|| ChainError::NoContractCreated {
            tx: format!("{tx:#x}"),
        })?;

        self.store.save_address(stage.address_key(), &address)?;
        self.queue.add(
            self.store,
            VerifyRecord::new(stage.contract_type(), contract, address, constructor_args, tx),
        )?;

        // The stage is done once its address is stored; leftover funds stay
        // on the wallet and can be swept later with the stored key.
        if let Err(err) = transfer_all_funds(self.chain, wallet, main.address()).await {
            tracing::error!(
                "[FUNDS] {} deployed but funds on {:#x} were not returned: {}",
                stage.address_key(),
                wallet.address(),
                err
            );
        }
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_walk_forward_to_terminal() {
        let mut state = BootstrapState::NoDeployer;
        let mut stages = Vec::new();
        while let Some(stage) = state.next_stage() {
            stages.push(stage);
            state = state.advance();
        }
        assert_eq!(stages, vec![Stage::Implementation, Stage::Proxy]);
        assert_eq!(state, BootstrapState::ProxyDeployed);
        assert_eq!(BootstrapState::DeployerDeployed.next_stage(), Some(Stage::Proxy));
    }

    #[test]
    fn test_stage_keys() {
        assert_eq!(Stage::Implementation.secret_key(), "Deployer:PrivateKey");
        assert_eq!(Stage::Proxy.secret_key(), "DeployerProxy:PrivateKey");
        assert_eq!(Stage::Proxy.contract_type(), ContractType::Proxy);
    }
}
