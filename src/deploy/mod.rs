//! Deterministic deployment: the two-stage bootstrap of the on-chain
//! deployer and the per-contract operations built on top of it.

pub mod bootstrap;
pub mod contracts;
pub mod deployer;
pub mod funds;
pub mod live;

use crate::matcher::Matcher;
use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;

pub use bootstrap::{detect_state, Bootstrap, BootstrapState};
pub use deployer::VanityDeployer;
pub use funds::{bumped_gas_price, transfer_all_funds};
pub use live::LiveDeployer;

/// Per-run context: the active pattern and the account that pays for and
/// owns everything deployed.
#[derive(Clone, Debug)]
pub struct DeploymentSession {
    pub matcher: Matcher,
    pub main_signer: PrivateKeySigner,
}

impl DeploymentSession {
    pub fn new(matcher: Matcher, main_signer: PrivateKeySigner) -> Self {
        Self {
            matcher,
            main_signer,
        }
    }

    pub fn main_address(&self) -> Address {
        self.main_signer.address()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deployment {
    /// Key the address was stored under.
    pub alias: String,
    pub address: Address,
    pub transaction: B256,
    /// `None` for plain `CREATE` deployments.
    pub salt: Option<B256>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyDeployment {
    pub implementation: Address,
    pub proxy: Deployment,
}
