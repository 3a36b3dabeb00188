#![allow(dead_code)]

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use vanity_deployer::artifacts::{
    to_sol_values, ArtifactProvider, ConstructorArgument, VerificationArtifact,
};
use vanity_deployer::chain::{parse_signer, ChainClient, TxPlan, TxReceipt};
use vanity_deployer::deploy::contracts::IVanityDeployer;
use vanity_deployer::deploy::{DeploymentSession, VanityDeployer};
use vanity_deployer::error::{ChainError, Result};
use vanity_deployer::matcher::Matcher;
use vanity_deployer::mining::{MiningJob, SaltMiner};
use vanity_deployer::storage::VanityStore;
use vanity_deployer::utils::config::VerifyConfig;
use vanity_deployer::utils::constants::{EIP1967_IMPL_SLOT, ERC1967_PROXY_CONTRACT, TRANSFER_GAS};
use vanity_deployer::verify::{
    SourceVerification, VerificationBackend, VerifyOutcome, VerifyQueue,
};

pub const CHAIN_ID: u64 = 31337;
pub const GAS_PRICE: u128 = 1_000_000_000;
/// Flat gas charged for anything that is not a plain transfer.
pub const CONTRACT_GAS: u64 = 300_000;

pub fn ether(amount: u64) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(18))
}

pub type TestDeployer = VanityDeployer<MockChain, MockArtifacts, MockMiner, MockBackend>;

pub fn quick_verify_config(max_bytecode_retries: u32) -> VerifyConfig {
    VerifyConfig {
        max_bytecode_retries,
        settle_delay: Duration::ZERO,
    }
}

/// Deployer over mocks with the main signer holding 100 ether.
pub fn test_deployer(root: &Path, backend: MockBackend) -> TestDeployer {
    let chain = MockChain::new();
    chain.fund(main_signer().address(), ether(100));
    VanityDeployer::new(
        chain,
        MockArtifacts,
        MockMiner::new(),
        backend,
        VanityStore::new(root.join(".vanity")),
        DeploymentSession::new(Matcher::default(), main_signer()),
    )
    .with_verify_queue(VerifyQueue::new(&quick_verify_config(3)))
}

pub fn main_signer() -> PrivateKeySigner {
    parse_signer("0x4f3edf983ac636a65a842ce7c78d9aa706d3b113bce9c46f30d7d21715b23b1d").unwrap()
}

#[derive(Default)]
struct ChainState {
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    code: HashMap<Address, Bytes>,
    storage: HashMap<(Address, U256), U256>,
    receipts: HashMap<B256, TxReceipt>,
    block: u64,
    creates: usize,
    fail_create: Option<usize>,
    sends: usize,
    fail_send: Option<usize>,
    confirmation_requests: Vec<(B256, u64)>,
    sent: Vec<(Address, TxPlan)>,
}

/// In-memory chain: one block per transaction, flat gas accounting,
/// `CREATE` / `CREATE2` through the vanity deployer's call surface, and the
/// EIP-1967 slot populated for `ERC1967Proxy` init code.
#[derive(Default)]
pub struct MockChain {
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fund(&self, account: Address, amount: U256) {
        *self.state.lock().unwrap().balances.entry(account).or_default() += amount;
    }

    pub fn balance(&self, account: Address) -> U256 {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(&account)
            .copied()
            .unwrap_or_default()
    }

    /// Makes the `n`-th contract creation (1-based) revert.
    pub fn fail_create(&self, n: Option<usize>) {
        let mut state = self.state.lock().unwrap();
        let done = state.creates;
        state.fail_create = n.map(|n| done + n);
    }

    /// Makes the `n`-th `send_transaction` call (1-based) fail at the
    /// transport, before anything reaches the chain.
    pub fn fail_send(&self, n: Option<usize>) {
        let mut state = self.state.lock().unwrap();
        let done = state.sends;
        state.fail_send = n.map(|n| done + n);
    }

    pub fn wipe_code(&self, address: Address) {
        self.state.lock().unwrap().code.remove(&address);
    }

    pub fn set_storage(&self, address: Address, slot: U256, value: U256) {
        self.state.lock().unwrap().storage.insert((address, slot), value);
    }

    /// Puts code at `address` with a mined receipt, as if deployed earlier.
    pub fn seed_contract(&self, address: Address) -> B256 {
        let mut state = self.state.lock().unwrap();
        state.block += 1;
        let hash = keccak256([address.as_slice(), &state.block.to_be_bytes()].concat());
        state.code.insert(address, Bytes::from_static(&[0xfe]));
        let receipt = TxReceipt {
            hash,
            contract_address: Some(address),
            block_number: state.block,
            status: true,
        };
        state.receipts.insert(hash, receipt);
        hash
    }

    pub fn confirmation_requests(&self, tx: B256) -> Vec<u64> {
        self.state
            .lock()
            .unwrap()
            .confirmation_requests
            .iter()
            .filter(|(hash, _)| *hash == tx)
            .map(|(_, n)| *n)
            .collect()
    }

    pub fn last_plan(&self) -> Option<TxPlan> {
        self.state.lock().unwrap().sent.last().map(|(_, plan)| plan.clone())
    }

    pub fn sent_from(&self, from: Address) -> usize {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|(sender, _)| *sender == from)
            .count()
    }
}

fn install_code(state: &mut ChainState, address: Address, init_code: &Bytes) {
    state.code.insert(address, init_code.clone());
    if init_code.starts_with(&artifact_marker(ERC1967_PROXY_CONTRACT)) {
        let implementation = Address::from_slice(&init_code[4 + 12..4 + 32]);
        state.storage.insert(
            (address, U256::from_be_bytes(EIP1967_IMPL_SLOT)),
            U256::from_be_slice(implementation.as_slice()),
        );
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn chain_id(&self) -> Result<u64> {
        Ok(CHAIN_ID)
    }

    async fn gas_price(&self) -> Result<u128> {
        Ok(GAS_PRICE)
    }

    async fn balance_of(&self, account: Address) -> Result<U256> {
        Ok(self.balance(account))
    }

    async fn code_at(&self, address: Address) -> Result<Bytes> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .code
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }

    async fn storage_at(&self, address: Address, slot: U256) -> Result<U256> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .storage
            .get(&(address, slot))
            .copied()
            .unwrap_or_default())
    }

    async fn send_transaction(&self, signer: &PrivateKeySigner, plan: TxPlan) -> Result<B256> {
        let from = signer.address();
        let mut state = self.state.lock().unwrap();
        state.sends += 1;
        if state.fail_send == Some(state.sends) {
            return Err(ChainError::Rpc {
                context: "eth_sendRawTransaction".to_string(),
                reason: "connection reset by peer".to_string(),
            }
            .into());
        }
        state.sent.push((from, plan.clone()));

        let gas_used = if plan.to.is_some() && plan.input.is_empty() {
            TRANSFER_GAS
        } else {
            CONTRACT_GAS
        };
        let fee = U256::from(gas_used) * U256::from(plan.gas_price);
        let balance = state.balances.get(&from).copied().unwrap_or_default();
        if balance < fee + plan.value {
            return Err(ChainError::Rpc {
                context: "eth_sendRawTransaction".to_string(),
                reason: format!("insufficient funds for gas * price + value: have {balance}"),
            }
            .into());
        }
        let nonce = state.nonces.get(&from).copied().unwrap_or_default();
        state.nonces.insert(from, nonce + 1);
        state.block += 1;
        let block = state.block;
        let hash = keccak256([from.as_slice(), &nonce.to_be_bytes()].concat());

        let mut status = true;
        let mut contract_address = None;
        match plan.to {
            None => {
                state.creates += 1;
                if state.fail_create == Some(state.creates) {
                    status = false;
                } else {
                    let created = from.create(nonce);
                    install_code(&mut state, created, &plan.input);
                    contract_address = Some(created);
                }
            }
            Some(to) => {
                if let Ok(call) = IVanityDeployer::deployContractCall::abi_decode(&plan.input, true) {
                    let created = to.create2(call.salt, keccak256(&call.bytecode));
                    install_code(&mut state, created, &call.bytecode);
                } else if let Ok(call) =
                    IVanityDeployer::deployContractAndInitializeCall::abi_decode(&plan.input, true)
                {
                    let created = to.create2(call.salt, keccak256(&call.bytecode));
                    install_code(&mut state, created, &call.bytecode);
                }
            }
        }

        let debit = if status { fee + plan.value } else { fee };
        *state.balances.entry(from).or_default() -= debit;
        if status {
            if let Some(to) = plan.to {
                *state.balances.entry(to).or_default() += plan.value;
            }
        }
        state.receipts.insert(
            hash,
            TxReceipt {
                hash,
                contract_address,
                block_number: block,
                status,
            },
        );
        Ok(hash)
    }

    async fn wait_for_confirmations(&self, tx: B256, confirmations: u64) -> Result<TxReceipt> {
        let mut state = self.state.lock().unwrap();
        state.confirmation_requests.push((tx, confirmations));
        let receipt = state.receipts.get(&tx).cloned().ok_or_else(|| ChainError::Rpc {
            context: "eth_getTransactionReceipt".to_string(),
            reason: format!("unknown transaction {tx:#x}"),
        })?;
        if !receipt.status {
            return Err(ChainError::Reverted {
                tx: format!("{tx:#x}"),
            }
            .into());
        }
        state.block = state.block.max(receipt.block_number + confirmations.saturating_sub(1));
        Ok(receipt)
    }
}

/// Hands out fresh valid secrets and counts jobs.
#[derive(Default)]
pub struct MockMiner {
    jobs: Mutex<Vec<MiningJob>>,
}

impl MockMiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<MiningJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn key_jobs(&self) -> usize {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|job| **job == MiningJob::PrivateKey)
            .count()
    }
}

#[async_trait]
impl SaltMiner for MockMiner {
    async fn mine(&self, job: &MiningJob, _matcher: &Matcher) -> Result<B256> {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.push(job.clone());
        let mut secret = [0u8; 32];
        secret[0] = 0x11;
        secret[31] = jobs.len() as u8;
        Ok(B256::from(secret))
    }
}

/// First four bytes of every init code this provider builds.
pub fn artifact_marker(contract: &str) -> [u8; 4] {
    let hash = keccak256(contract.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn encode_params(args: &[ConstructorArgument]) -> Vec<u8> {
    if args.is_empty() {
        return Vec::new();
    }
    DynSolValue::Tuple(to_sol_values(args)).abi_encode_params()
}

/// Init code is `marker(contract) ++ abi.encode(args)`.
pub struct MockArtifacts;

impl ArtifactProvider for MockArtifacts {
    fn init_code(&self, contract: &str, args: &[ConstructorArgument]) -> Result<Bytes> {
        let mut code = artifact_marker(contract).to_vec();
        code.extend_from_slice(&encode_params(args));
        Ok(Bytes::from(code))
    }

    fn encode_constructor_args(&self, _contract: &str, args: &[ConstructorArgument]) -> Result<Bytes> {
        Ok(Bytes::from(encode_params(args)))
    }

    fn encode_function_call(
        &self,
        _contract: &str,
        function: &str,
        args: &[ConstructorArgument],
    ) -> Result<Bytes> {
        let mut data = artifact_marker(function).to_vec();
        data.extend_from_slice(&encode_params(args));
        Ok(Bytes::from(data))
    }

    fn verification_artifact(&self, contract: &str) -> Result<VerificationArtifact> {
        Ok(VerificationArtifact {
            source_name: format!("contracts/{contract}.sol"),
            contract_name: contract.to_string(),
            compiler_version: "v0.8.20+commit.a1b79de6".to_string(),
            standard_json_input: "{}".to_string(),
        })
    }
}

/// Replays scripted outcomes; `Verified` once a script runs dry.
#[derive(Default)]
pub struct MockBackend {
    source_script: Mutex<VecDeque<VerifyOutcome>>,
    link_script: Mutex<VecDeque<VerifyOutcome>>,
    pub requests: Mutex<Vec<SourceVerification>>,
    pub links: Mutex<Vec<(Address, Address)>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(outcomes: Vec<VerifyOutcome>) -> Self {
        let backend = Self::default();
        backend.source_script.lock().unwrap().extend(outcomes);
        backend
    }

    pub fn script_links(&self, outcomes: Vec<VerifyOutcome>) {
        self.link_script.lock().unwrap().extend(outcomes);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl VerificationBackend for MockBackend {
    async fn verify_source(&self, request: &SourceVerification) -> Result<VerifyOutcome> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self
            .source_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(VerifyOutcome::Verified))
    }

    async fn link_proxy(&self, proxy: Address, implementation: Address) -> Result<VerifyOutcome> {
        self.links.lock().unwrap().push((proxy, implementation));
        Ok(self
            .link_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(VerifyOutcome::Verified))
    }
}
