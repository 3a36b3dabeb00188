//! Call surfaces of the on-chain deployer and of the initializer every
//! vanity-deployed upgradeable contract exposes.

alloy::sol! {
    interface IVanityDeployer {
        function deployContract(bytes memory bytecode, bytes32 salt) external returns (address);
        function deployContractAndInitialize(bytes memory bytecode, bytes32 salt, bytes memory initData) external returns (address);
    }

    interface IInitializable {
        function initialize(address owner) external;
    }
}
