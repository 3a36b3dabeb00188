use crate::error::{ConfigError, Result};
use crate::utils::constants::MIN_MINING_DURATION;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_STORAGE_DIR: &str = ".vanity";
const DEFAULT_EXECUTABLES_DIR: &str = "./executables";
const DEFAULT_ARTIFACTS_DIR: &str = "./artifacts";
const DEFAULT_MINING_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_CONFIRMATION_POLL_MS: u64 = 2_000;
const DEFAULT_VERIFY_MAX_BYTECODE_RETRIES: u32 = 10;
const DEFAULT_VERIFY_SETTLE_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub prefix: String,
    pub suffix: String,
    pub storage_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub mining: MiningConfig,
    pub verify: VerifyConfig,
}

#[derive(Debug, Clone)]
pub struct MiningConfig {
    /// Where the bundled miner binaries and OpenCL kernels live.
    pub executables_dir: PathBuf,
    /// Directory the miners run in; kernels must sit next to them.
    pub work_dir: PathBuf,
    pub min_duration: Duration,
    pub max_attempts: u32,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            executables_dir: PathBuf::from(DEFAULT_EXECUTABLES_DIR),
            work_dir: PathBuf::from("."),
            min_duration: MIN_MINING_DURATION,
            max_attempts: DEFAULT_MINING_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub max_bytecode_retries: u32,
    pub settle_delay: Duration,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            max_bytecode_retries: DEFAULT_VERIFY_MAX_BYTECODE_RETRIES,
            settle_delay: Duration::from_millis(DEFAULT_VERIFY_SETTLE_MS),
        }
    }
}

#[derive(Clone)]
pub struct RpcConfig {
    pub rpc_url: String,
    pub private_key: String,
    pub poll_interval: Duration,
}

impl std::fmt::Debug for RpcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcConfig")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct EtherscanConfig {
    pub api_url: String,
    pub api_key: String,
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn lookup_trimmed(lookup: Lookup<'_>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn lookup_required(lookup: Lookup<'_>, key: &str) -> Result<String> {
    lookup_trimmed(lookup, key)
        .ok_or_else(|| ConfigError::Missing(format!("{key} must be set")).into())
}

fn lookup_u64(lookup: Lookup<'_>, key: &str, range: std::ops::RangeInclusive<u64>) -> Option<u64> {
    lookup_trimmed(lookup, key)
        .and_then(|raw| raw.parse::<u64>().ok())
        .filter(|v| range.contains(v))
}

fn validate_http_url(name: &str, raw: &str) -> Result<()> {
    let parsed = raw.parse::<reqwest::Url>().map_err(|e| {
        ConfigError::Invalid(format!("{name} must be a valid URL, got `{raw}`: {e}"))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid(format!(
            "{name} must use http(s) scheme, got `{other}`"
        ))
        .into()),
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let prefix = lookup_trimmed(lookup, "VANITY_PREFIX").unwrap_or_default();
        let suffix = lookup_trimmed(lookup, "VANITY_SUFFIX").unwrap_or_default();
        let storage_dir = lookup_trimmed(lookup, "VANITY_STORAGE_DIR")
            .unwrap_or_else(|| DEFAULT_STORAGE_DIR.to_string());
        let artifacts_dir = lookup_trimmed(lookup, "HARDHAT_ARTIFACTS_DIR")
            .unwrap_or_else(|| DEFAULT_ARTIFACTS_DIR.to_string());

        let mut mining = MiningConfig::default();
        if let Some(dir) = lookup_trimmed(lookup, "VANITY_EXECUTABLES_DIR") {
            mining.executables_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup_trimmed(lookup, "VANITY_WORK_DIR") {
            mining.work_dir = PathBuf::from(dir);
        }
        if let Some(ms) = lookup_u64(lookup, "VANITY_MIN_MINING_MS", 0..=600_000) {
            mining.min_duration = Duration::from_millis(ms).max(MIN_MINING_DURATION);
        }
        if let Some(attempts) = lookup_u64(lookup, "VANITY_MINING_MAX_ATTEMPTS", 1..=50) {
            mining.max_attempts = attempts as u32;
        }

        let mut verify = VerifyConfig::default();
        if let Some(retries) = lookup_u64(lookup, "VERIFY_MAX_BYTECODE_RETRIES", 1..=100) {
            verify.max_bytecode_retries = retries as u32;
        }
        if let Some(ms) = lookup_u64(lookup, "VERIFY_SETTLE_MS", 0..=120_000) {
            verify.settle_delay = Duration::from_millis(ms);
        }

        Ok(Self {
            prefix,
            suffix,
            storage_dir: PathBuf::from(storage_dir),
            artifacts_dir: PathBuf::from(artifacts_dir),
            mining,
            verify,
        })
    }
}

impl RpcConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let rpc_url = lookup_required(lookup, "ETH_RPC_URL")?;
        validate_http_url("ETH_RPC_URL", &rpc_url)?;
        let private_key = lookup_required(lookup, "DEPLOYER_PRIVATE_KEY")?;
        let poll_ms = lookup_u64(lookup, "CONFIRMATION_POLL_MS", 100..=60_000)
            .unwrap_or(DEFAULT_CONFIRMATION_POLL_MS);
        Ok(Self {
            rpc_url,
            private_key,
            poll_interval: Duration::from_millis(poll_ms),
        })
    }
}

impl EtherscanConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let api_url = lookup_required(lookup, "ETHERSCAN_API_URL")?;
        validate_http_url("ETHERSCAN_API_URL", &api_url)?;
        let api_key = lookup_required(lookup, "ETHERSCAN_API_KEY")?;
        Ok(Self { api_url, api_key })
    }
}
