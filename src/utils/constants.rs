use std::time::Duration;

/// EIP-1967 implementation storage slot (`keccak256("eip1967.proxy.implementation") - 1`).
pub const EIP1967_IMPL_SLOT: [u8; 32] = [
    0x36, 0x08, 0x94, 0xa1, 0x3b, 0xa1, 0xa3, 0x21, 0x06, 0x67, 0xc8, 0x28, 0x49, 0x2d, 0xb9,
    0x8d, 0xca, 0x3e, 0x20, 0x76, 0xcc, 0x37, 0x35, 0xa9, 0x20, 0xa3, 0xca, 0x50, 0x5d, 0x38,
    0x2b, 0xbc,
];

/// Floor for a single mining call, whatever the search difficulty.
pub const MIN_MINING_DURATION: Duration = Duration::from_millis(3_500);

/// Gas of a plain value transfer.
pub const TRANSFER_GAS: u64 = 21_000;

/// Percent added on top of the network gas price.
pub const GAS_PRICE_BUMP_PERCENT: u128 = 10;

pub const DEFAULT_CONFIRMATIONS: u64 = 2;
pub const FUNDS_TRANSFER_CONFIRMATIONS: u64 = 2;
pub const DEPLOY_CONFIRMATIONS: u64 = 1;

/// Confirmations added each time an explorer has not indexed the bytecode yet.
pub const BYTECODE_RETRY_CONFIRMATION_STEP: u64 = 3;

pub const DEPLOYER_KEY: &str = "Deployer";
pub const DEPLOYER_PROXY_KEY: &str = "DeployerProxy";
pub const PRIVATE_KEY_SUFFIX: &str = ":PrivateKey";
pub const SALT_SUFFIX: &str = ":salt";
pub const PROXY_ALIAS_SUFFIX: &str = "Proxy";

pub const VANITY_DEPLOYER_CONTRACT: &str = "VanityDeployer";
pub const ERC1967_PROXY_CONTRACT: &str = "ERC1967Proxy";
