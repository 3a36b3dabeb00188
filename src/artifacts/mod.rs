//! Compiled-contract access: init code, ABI encoding and the descriptor an
//! explorer needs to verify sources. Compilation itself happens elsewhere.

pub mod hardhat;

use crate::error::Result;
use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{Address, Bytes, B256, I256, U256};
use serde::{Deserialize, Serialize};

pub use hardhat::HardhatArtifacts;

/// ABI argument as persisted alongside verification records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ConstructorArgument {
    Address(Address),
    Uint(U256),
    Int(I256),
    Bool(bool),
    String(String),
    Bytes(Bytes),
    Bytes32(B256),
    Array(Vec<ConstructorArgument>),
}

impl ConstructorArgument {
    pub fn to_sol_value(&self) -> DynSolValue {
        match self {
            ConstructorArgument::Address(a) => DynSolValue::Address(*a),
            ConstructorArgument::Uint(v) => DynSolValue::Uint(*v, 256),
            ConstructorArgument::Int(v) => DynSolValue::Int(*v, 256),
            ConstructorArgument::Bool(b) => DynSolValue::Bool(*b),
            ConstructorArgument::String(s) => DynSolValue::String(s.clone()),
            ConstructorArgument::Bytes(b) => DynSolValue::Bytes(b.to_vec()),
            ConstructorArgument::Bytes32(b) => DynSolValue::FixedBytes(*b, 32),
            ConstructorArgument::Array(items) => {
                DynSolValue::Array(items.iter().map(Self::to_sol_value).collect())
            }
        }
    }
}

impl ConstructorArgument {
    /// Converts against the declared ABI type, so `Uint(18)` can feed a
    /// `uint8` and a left-aligned `Bytes32` can feed a `bytes4`.
    pub fn coerce_to(&self, ty: &DynSolType) -> std::result::Result<DynSolValue, String> {
        match (self, ty) {
            (ConstructorArgument::Uint(v), DynSolType::Uint(bits)) => {
                if v.bit_len() > *bits {
                    return Err(format!("{v} does not fit in uint{bits}"));
                }
                Ok(DynSolValue::Uint(*v, *bits))
            }
            (ConstructorArgument::Int(v), DynSolType::Int(bits)) => {
                let min = I256::MIN.asr(256 - *bits);
                let max = I256::MAX.asr(256 - *bits);
                if *v < min || *v > max {
                    return Err(format!("{v} does not fit in int{bits}"));
                }
                Ok(DynSolValue::Int(*v, *bits))
            }
            (ConstructorArgument::Bytes32(b), DynSolType::FixedBytes(size)) => {
                if b[*size..].iter().any(|byte| *byte != 0) {
                    return Err(format!("{b:#x} does not fit in bytes{size}"));
                }
                Ok(DynSolValue::FixedBytes(*b, *size))
            }
            (ConstructorArgument::Bytes(raw), DynSolType::FixedBytes(size)) => {
                if raw.len() != *size {
                    return Err(format!("{} bytes given for bytes{size}", raw.len()));
                }
                Ok(DynSolValue::FixedBytes(B256::right_padding_from(raw), *size))
            }
            (ConstructorArgument::Array(items), DynSolType::Array(inner)) => items
                .iter()
                .map(|item| item.coerce_to(inner))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(DynSolValue::Array),
            (ConstructorArgument::Array(items), DynSolType::FixedArray(inner, len)) => {
                if items.len() != *len {
                    return Err(format!("{} items given for a fixed array of {len}", items.len()));
                }
                items
                    .iter()
                    .map(|item| item.coerce_to(inner))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map(DynSolValue::FixedArray)
            }
            _ => Ok(self.to_sol_value()),
        }
    }
}

impl From<Address> for ConstructorArgument {
    fn from(value: Address) -> Self {
        ConstructorArgument::Address(value)
    }
}

impl From<U256> for ConstructorArgument {
    fn from(value: U256) -> Self {
        ConstructorArgument::Uint(value)
    }
}

impl From<bool> for ConstructorArgument {
    fn from(value: bool) -> Self {
        ConstructorArgument::Bool(value)
    }
}

impl From<Bytes> for ConstructorArgument {
    fn from(value: Bytes) -> Self {
        ConstructorArgument::Bytes(value)
    }
}

impl From<&str> for ConstructorArgument {
    fn from(value: &str) -> Self {
        ConstructorArgument::String(value.to_string())
    }
}

pub fn to_sol_values(args: &[ConstructorArgument]) -> Vec<DynSolValue> {
    args.iter().map(ConstructorArgument::to_sol_value).collect()
}

/// What an explorer needs to rebuild and compare a contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationArtifact {
    pub source_name: String,
    pub contract_name: String,
    /// `v`-prefixed long solc version, e.g. `v0.8.20+commit.a1b79de6`.
    pub compiler_version: String,
    /// Standard-JSON compiler input, serialised.
    pub standard_json_input: String,
}

impl VerificationArtifact {
    /// Fully qualified name in the `source:Contract` form explorers expect.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }
}

pub trait ArtifactProvider: Send + Sync {
    /// Creation code with the ABI-encoded constructor arguments appended.
    fn init_code(&self, contract: &str, args: &[ConstructorArgument]) -> Result<Bytes>;

    fn encode_constructor_args(&self, contract: &str, args: &[ConstructorArgument]) -> Result<Bytes>;

    /// Selector-prefixed call data.
    fn encode_function_call(
        &self,
        contract: &str,
        function: &str,
        args: &[ConstructorArgument],
    ) -> Result<Bytes>;

    fn verification_artifact(&self, contract: &str) -> Result<VerificationArtifact>;
}
