use alloy::primitives::Address;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VanityError>;

#[derive(Debug, Error)]
pub enum VanityError {
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] PatternError),
    #[error("mining process error: {0}")]
    MiningProcess(#[from] MiningError),
    #[error("deployer not found: {0}")]
    DeployerNotFound(String),
    #[error("vanity deployer already deployed at {deployer:#x} (proxy {proxy:#x})")]
    AlreadyDeployed { deployer: Address, proxy: Address },
    #[error("storage io error: {0}")]
    StorageIo(#[from] StorageError),
    #[error("verification error: {0}")]
    Verification(#[from] VerificationError),
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),
    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("prefix and suffix together are {len} characters, at most 40 are allowed")]
    TooLong { len: usize },
    #[error("`{value}` is not a hex string")]
    NotHex { value: String },
}

#[derive(Debug, Error)]
pub enum MiningError {
    #[error("failed to prepare executable environment at {path}: {reason}")]
    Environment { path: PathBuf, reason: String },
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited before producing a match (status: {status})")]
    ExitedWithoutMatch { program: String, status: String },
    #[error("unreadable miner output: {0}")]
    Unreadable(#[source] std::io::Error),
    #[error("matching line carries no 32-byte secret: `{line}`")]
    MissingSecret { line: String },
    #[error("gave up after {attempts} mining attempts: {last}")]
    AttemptsExhausted { attempts: u32, last: Box<MiningError> },
}

impl MiningError {
    /// Whether a fresh process invocation may succeed where this one failed.
    pub fn is_restartable(&self) -> bool {
        matches!(self, MiningError::ExitedWithoutMatch { .. })
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not a valid document: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("stored value for `{key}` is malformed: {reason}")]
    MalformedValue { key: String, reason: String },
}

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("verification of {address:#x} rejected: {reason}")]
    Rejected { address: Address, reason: String },
    #[error("bytecode for {address:#x} still not visible after {attempts} retries ({confirmations} confirmations)")]
    BytecodeNeverVisible {
        address: Address,
        attempts: u32,
        confirmations: u64,
    },
    #[error("verification backend transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("rpc failure during {context}: {reason}")]
    Rpc { context: String, reason: String },
    #[error("insufficient funds on {account:#x}: balance {balance} does not cover gas cost {gas_cost}")]
    InsufficientFunds {
        account: Address,
        balance: String,
        gas_cost: String,
    },
    #[error("transaction {tx} did not create a contract")]
    NoContractCreated { tx: String },
    #[error("transaction {tx} reverted")]
    Reverted { tx: String },
    #[error("invalid private key: {0}")]
    InvalidKey(String),
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact for `{contract}` not found under {path}")]
    NotFound { contract: String, path: PathBuf },
    #[error("artifact for `{contract}` is malformed: {reason}")]
    Malformed { contract: String, reason: String },
    #[error("`{contract}` has no function `{function}`")]
    UnknownFunction { contract: String, function: String },
    #[error("failed to encode arguments for `{context}`: {reason}")]
    Encoding { context: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
