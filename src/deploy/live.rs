use crate::artifacts::HardhatArtifacts;
use crate::chain::{parse_signer, RpcChainClient};
use crate::deploy::{DeploymentSession, VanityDeployer};
use crate::error::Result;
use crate::matcher::Matcher;
use crate::mining::ProcessMiner;
use crate::storage::VanityStore;
use crate::utils::config::{Config, EtherscanConfig, RpcConfig};
use crate::utils::env_guard::harden_env_setup;
use crate::verify::{EtherscanClient, VerifyQueue};

/// JSON-RPC chain, Hardhat artifacts on disk, GPU miners and Etherscan.
pub type LiveDeployer = VanityDeployer<RpcChainClient, HardhatArtifacts, ProcessMiner, EtherscanClient>;

impl LiveDeployer {
    /// Reads `./.env` and the process environment.
    pub fn from_env() -> Result<Self> {
        harden_env_setup();
        let config = Config::load()?;
        let rpc = RpcConfig::load()?;
        let explorer = EtherscanConfig::load()?;
        Self::from_configs(&config, &rpc, &explorer)
    }

    pub fn from_configs(config: &Config, rpc: &RpcConfig, explorer: &EtherscanConfig) -> Result<Self> {
        let matcher = Matcher::new(&config.prefix, &config.suffix)?;
        let main_signer = parse_signer(&rpc.private_key)?;
        tracing::info!(
            "[DEPLOY] main signer {:#x}, pattern {}",
            main_signer.address(),
            matcher.command_pattern()
        );
        let deployer = VanityDeployer::new(
            RpcChainClient::from_config(rpc)?,
            HardhatArtifacts::new(&config.artifacts_dir),
            ProcessMiner::new(&config.mining),
            EtherscanClient::new(explorer)?,
            VanityStore::new(&config.storage_dir),
            DeploymentSession::new(matcher, main_signer),
        );
        Ok(deployer.with_verify_queue(VerifyQueue::new(&config.verify)))
    }
}
