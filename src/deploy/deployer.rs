use crate::artifacts::{ArtifactProvider, ConstructorArgument};
use crate::chain::{ChainClient, TxPlan};
use crate::deploy::bootstrap::{Bootstrap, BootstrapState};
use crate::deploy::contracts::IVanityDeployer;
use crate::deploy::funds::bumped_gas_price;
use crate::deploy::{detect_state, Deployment, DeploymentSession, ProxyDeployment};
use crate::error::{ChainError, Result, VanityError};
use crate::mining::SaltMiner;
use crate::salt::{compute_create2_address, SaltCalculator};
use crate::storage::{ContractType, VanityStore, VerifyRecord};
use crate::utils::constants::{
    DEPLOYER_PROXY_KEY, DEPLOY_CONFIRMATIONS, ERC1967_PROXY_CONTRACT, PROXY_ALIAS_SUFFIX,
};
use crate::verify::{VerificationBackend, VerifyQueue, VerifySummary};
use alloy::primitives::{keccak256, Address, Bytes};
use alloy::sol_types::SolCall;

/// Deploys contracts at pattern-matching addresses through the on-chain
/// deployer, bootstrapping it on first use.
pub struct VanityDeployer<C, A, M, B> {
    chain: C,
    artifacts: A,
    miner: M,
    backend: B,
    store: VanityStore,
    queue: VerifyQueue,
    session: DeploymentSession,
}

impl<C, A, M, B> VanityDeployer<C, A, M, B>
where
    C: ChainClient,
    A: ArtifactProvider,
    M: SaltMiner,
    B: VerificationBackend,
{
    pub fn new(
        chain: C,
        artifacts: A,
        miner: M,
        backend: B,
        store: VanityStore,
        session: DeploymentSession,
    ) -> Self {
        Self {
            chain,
            artifacts,
            miner,
            backend,
            store,
            queue: VerifyQueue::default(),
            session,
        }
    }

    pub fn with_verify_queue(mut self, queue: VerifyQueue) -> Self {
        self.queue = queue;
        self
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn artifacts(&self) -> &A {
        &self.artifacts
    }

    pub fn miner(&self) -> &M {
        &self.miner
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn store(&self) -> &VanityStore {
        &self.store
    }

    pub fn session(&self) -> &DeploymentSession {
        &self.session
    }

    fn bootstrap(&self) -> Bootstrap<'_, C, A, M> {
        Bootstrap {
            chain: &self.chain,
            artifacts: &self.artifacts,
            miner: &self.miner,
            store: &self.store,
            queue: &self.queue,
            session: &self.session,
        }
    }

    /// Runs the bootstrap from wherever it stopped, then drains the
    /// verification queue.
    pub async fn initialize(&self) -> Result<VerifySummary> {
        self.bootstrap().run().await?;
        self.verify_pending().await
    }

    /// Bootstraps only when the deployer proxy is missing or has no code.
    pub async fn ensure_initialized(&self) -> Result<()> {
        if detect_state(&self.store, &self.chain).await? == BootstrapState::ProxyDeployed {
            return Ok(());
        }
        self.initialize().await.map(|_| ())
    }

    pub fn deployer_contract(&self) -> Result<Address> {
        self.store
            .find_address(DEPLOYER_PROXY_KEY)?
            .ok_or_else(|| VanityError::DeployerNotFound(DEPLOYER_PROXY_KEY.to_string()))
    }

    pub async fn deploy(&self, name: &str, save_as: Option<&str>) -> Result<Deployment> {
        let alias = save_as.unwrap_or(name);
        self.deploy_deterministic(name, alias, Vec::new(), None, ContractType::Default)
            .await
    }

    /// Deploys and calls `initialize(init_args)` in the same transaction.
    pub async fn deploy_and_initialize(
        &self,
        name: &str,
        init_args: &[ConstructorArgument],
        save_as: Option<&str>,
    ) -> Result<Deployment> {
        let alias = save_as.unwrap_or(name);
        let init_data = self.artifacts.encode_function_call(name, "initialize", init_args)?;
        self.deploy_deterministic(name, alias, Vec::new(), Some(init_data), ContractType::Default)
            .await
    }

    /// Deploys `name` (unless `implementation` is given) and an ERC-1967
    /// proxy in front of it stored as `<alias>Proxy`, initialised with
    /// `init_args` during construction.
    pub async fn deploy_proxy(
        &self,
        name: &str,
        init_args: &[ConstructorArgument],
        save_as: Option<&str>,
        implementation: Option<Address>,
    ) -> Result<ProxyDeployment> {
        let alias = save_as.unwrap_or(name);
        let implementation = match implementation {
            Some(address) => address,
            None => self.deploy(name, Some(alias)).await?.address,
        };

        let init_data = self.artifacts.encode_function_call(name, "initialize", init_args)?;
        let proxy_alias = format!("{alias}{PROXY_ALIAS_SUFFIX}");
        let constructor_args = vec![
            ConstructorArgument::from(implementation),
            ConstructorArgument::from(Bytes::new()),
        ];
        let proxy = self
            .deploy_deterministic(
                ERC1967_PROXY_CONTRACT,
                &proxy_alias,
                constructor_args,
                Some(init_data),
                ContractType::Proxy,
            )
            .await?;
        Ok(ProxyDeployment {
            implementation,
            proxy,
        })
    }

    /// Plain `CREATE` from the main signer. Needs no bootstrap and no salt.
    pub async fn deploy_without_vanity(
        &self,
        name: &str,
        constructor_args: &[ConstructorArgument],
        save_as: Option<&str>,
    ) -> Result<Deployment> {
        let alias = save_as.unwrap_or(name);
        let init_code = self.artifacts.init_code(name, constructor_args)?;
        let gas_price = bumped_gas_price(&self.chain).await?;
        let tx = self
            .chain
            .send_transaction(&self.session.main_signer, TxPlan::create(init_code, gas_price))
            .await?;
        let receipt = self.chain.wait_for_confirmations(tx, DEPLOY_CONFIRMATIONS).await?;
        let address = receipt.contract_address.ok_or_else(|| ChainError::NoContractCreated {
            tx: format!("{tx:#x}"),
        })?;

        self.store.save_address(alias, &address)?;
        self.queue.add(
            &self.store,
            VerifyRecord::new(
                ContractType::Default,
                name,
                address,
                constructor_args.to_vec(),
                tx,
            ),
        )?;
        tracing::info!("[DEPLOY] {} deployed at {:#x} (no vanity)", alias, address);
        Ok(Deployment {
            alias: alias.to_string(),
            address,
            transaction: tx,
            salt: None,
        })
    }

    pub async fn verify_pending(&self) -> Result<VerifySummary> {
        self.queue
            .execute(&self.store, &self.chain, &self.backend, &self.artifacts)
            .await
    }

    async fn deploy_deterministic(
        &self,
        contract: &str,
        alias: &str,
        constructor_args: Vec<ConstructorArgument>,
        init_data: Option<Bytes>,
        contract_type: ContractType,
    ) -> Result<Deployment> {
        tracing::info!("[DEPLOY] deploying {} as {}", contract, alias);
        self.ensure_initialized().await?;
        let deployer = self.deployer_contract()?;
        let init_code = self.artifacts.init_code(contract, &constructor_args)?;
        let salt = SaltCalculator::new(&self.store, &self.miner, &self.session.matcher)
            .get_or_mine_salt(alias, deployer, &init_code)
            .await?;
        let address = compute_create2_address(deployer, salt, keccak256(&init_code));

        let input = match init_data {
            Some(init_data) => IVanityDeployer::deployContractAndInitializeCall {
                bytecode: init_code,
                salt,
                initData: init_data,
            }
            .abi_encode(),
            None => IVanityDeployer::deployContractCall {
                bytecode: init_code,
                salt,
            }
            .abi_encode(),
        };
        let gas_price = bumped_gas_price(&self.chain).await?;
        let tx = self
            .chain
            .send_transaction(
                &self.session.main_signer,
                TxPlan::call(deployer, Bytes::from(input), gas_price),
            )
            .await?;
        self.chain.wait_for_confirmations(tx, DEPLOY_CONFIRMATIONS).await?;

        self.store.save_address(alias, &address)?;
        self.queue.add(
            &self.store,
            VerifyRecord::new(contract_type, contract, address, constructor_args, tx),
        )?;
        tracing::info!("[DEPLOY] {} deployed at {:#x} (salt {:#x})", alias, address, salt);
        Ok(Deployment {
            alias: alias.to_string(),
            address,
            transaction: tx,
            salt: Some(salt),
        })
    }
}
