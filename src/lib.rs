//! Vanity address mining and deterministic deployment.
//!
//! The on-chain `VanityDeployer` is bootstrapped once per chain from mined
//! keys whose first contract address matches the configured pattern. Every
//! later contract goes through it with a mined CREATE2 salt, so the same
//! contract lands at the same pattern-matching address on every chain.
//! Deployed contracts are queued for explorer verification.

pub mod artifacts;
pub mod chain;
pub mod deploy;
pub mod error;
pub mod matcher;
pub mod mining;
pub mod salt;
pub mod storage;
pub mod utils;
pub mod verify;

pub use deploy::{Deployment, DeploymentSession, ProxyDeployment, VanityDeployer};
pub use error::{Result, VanityError};
pub use matcher::Matcher;
pub use storage::VanityStore;
