use crate::artifacts::{ArtifactProvider, ConstructorArgument, VerificationArtifact};
use crate::error::{ArtifactError, Result};
use alloy::dyn_abi::{DynSolValue, JsonAbiExt, Specifier};
use alloy::json_abi::{JsonAbi, Param};
use alloy::primitives::Bytes;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const BUILD_INFO_DIR: &str = "build-info";
const DEBUG_SUFFIX: &str = ".dbg.json";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    contract_name: String,
    source_name: String,
    abi: JsonAbi,
    bytecode: String,
}

#[derive(Deserialize)]
struct RawDebugFile {
    #[serde(rename = "buildInfo")]
    build_info: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBuildInfo {
    solc_long_version: String,
    input: serde_json::Value,
}

#[derive(Debug)]
struct LoadedArtifact {
    path: PathBuf,
    contract_name: String,
    source_name: String,
    abi: JsonAbi,
    bytecode: Bytes,
}

/// Reads Hardhat's `artifacts/` tree: `<source>.sol/<Name>.json`, the sibling
/// `<Name>.dbg.json`, and the `build-info/` document it points at.
pub struct HardhatArtifacts {
    root: PathBuf,
    cache: Mutex<HashMap<String, Arc<LoadedArtifact>>>,
}

impl HardhatArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn load(&self, contract: &str) -> Result<Arc<LoadedArtifact>> {
        if let Ok(cache) = self.cache.lock() {
            if let Some(hit) = cache.get(contract) {
                return Ok(Arc::clone(hit));
            }
        }

        let path = find_artifact_file(&self.root, contract).ok_or_else(|| ArtifactError::NotFound {
            contract: contract.to_string(),
            path: self.root.clone(),
        })?;
        let raw: RawArtifact = read_json(&path, contract)?;
        if raw.bytecode.contains("__$") {
            return Err(malformed(contract, "bytecode has unlinked library placeholders"));
        }
        let bytecode = hex::decode(crate::utils::hex::clean_hex(&raw.bytecode))
            .map_err(|e| malformed(contract, &format!("bytecode is not hex: {e}")))?;

        let loaded = Arc::new(LoadedArtifact {
            path,
            contract_name: raw.contract_name,
            source_name: raw.source_name,
            abi: raw.abi,
            bytecode: Bytes::from(bytecode),
        });
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(contract.to_string(), Arc::clone(&loaded));
        }
        Ok(loaded)
    }
}

impl ArtifactProvider for HardhatArtifacts {
    fn init_code(&self, contract: &str, args: &[ConstructorArgument]) -> Result<Bytes> {
        let artifact = self.load(contract)?;
        if artifact.bytecode.is_empty() {
            return Err(malformed(contract, "abstract contract or interface has no bytecode"));
        }
        let encoded = self.encode_constructor_args(contract, args)?;
        let mut code = artifact.bytecode.to_vec();
        code.extend_from_slice(&encoded);
        Ok(Bytes::from(code))
    }

    fn encode_constructor_args(&self, contract: &str, args: &[ConstructorArgument]) -> Result<Bytes> {
        let artifact = self.load(contract)?;
        let context = format!("{contract} constructor");
        match &artifact.abi.constructor {
            Some(constructor) => {
                let values = coerce_args(&context, &constructor.inputs, args)?;
                constructor
                    .abi_encode_input(&values)
                    .map(Bytes::from)
                    .map_err(|e| encoding(&context, e))
            }
            None if args.is_empty() => Ok(Bytes::new()),
            None => Err(ArtifactError::Encoding {
                context,
                reason: format!("no constructor but {} arguments given", args.len()),
            }
            .into()),
        }
    }

    fn encode_function_call(
        &self,
        contract: &str,
        function: &str,
        args: &[ConstructorArgument],
    ) -> Result<Bytes> {
        let artifact = self.load(contract)?;
        let overloads = artifact
            .abi
            .function(function)
            .ok_or_else(|| ArtifactError::UnknownFunction {
                contract: contract.to_string(),
                function: function.to_string(),
            })?;
        let candidate = overloads
            .iter()
            .find(|f| f.inputs.len() == args.len())
            .ok_or_else(|| ArtifactError::Encoding {
                context: format!("{contract}.{function}"),
                reason: format!("no overload takes {} arguments", args.len()),
            })?;
        let context = format!("{contract}.{function}");
        let values = coerce_args(&context, &candidate.inputs, args)?;
        candidate
            .abi_encode_input(&values)
            .map(Bytes::from)
            .map_err(|e| encoding(&context, e))
    }

    fn verification_artifact(&self, contract: &str) -> Result<VerificationArtifact> {
        let artifact = self.load(contract)?;
        let debug_path = debug_file_for(&artifact.path, &artifact.contract_name);
        let debug: RawDebugFile = read_json(&debug_path, contract)?;
        let base = debug_path.parent().unwrap_or(Path::new("."));
        let build_info: RawBuildInfo = read_json(&base.join(&debug.build_info), contract)?;
        let standard_json_input = serde_json::to_string(&build_info.input)
            .map_err(|e| malformed(contract, &format!("build info input: {e}")))?;

        Ok(VerificationArtifact {
            source_name: artifact.source_name.clone(),
            contract_name: artifact.contract_name.clone(),
            compiler_version: format!("v{}", build_info.solc_long_version),
            standard_json_input,
        })
    }
}

/// Matches each argument to its declared parameter type.
fn coerce_args(context: &str, params: &[Param], args: &[ConstructorArgument]) -> Result<Vec<DynSolValue>> {
    if params.len() != args.len() {
        return Err(encoding(
            context,
            format!("expected {} arguments, got {}", params.len(), args.len()),
        ));
    }
    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = param.resolve().map_err(|e| encoding(context, e))?;
            arg.coerce_to(&ty)
                .map_err(|reason| encoding(context, format!("`{}`: {reason}", param.name)))
        })
        .collect()
}

fn find_artifact_file(dir: &Path, contract: &str) -> Option<PathBuf> {
    let wanted = format!("{contract}.json");
    let entries = fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if path.file_name().and_then(|n| n.to_str()) != Some(BUILD_INFO_DIR) {
                subdirs.push(path);
            }
            continue;
        }
        if path.file_name().and_then(|n| n.to_str()) == Some(wanted.as_str()) {
            return Some(path);
        }
    }
    subdirs.sort();
    subdirs
        .iter()
        .find_map(|sub| find_artifact_file(sub, contract))
}

fn debug_file_for(artifact_path: &Path, contract_name: &str) -> PathBuf {
    artifact_path.with_file_name(format!("{contract_name}{DEBUG_SUFFIX}"))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, contract: &str) -> Result<T> {
    let raw = fs::read(path).map_err(|_| ArtifactError::NotFound {
        contract: contract.to_string(),
        path: path.to_path_buf(),
    })?;
    serde_json::from_slice(&raw)
        .map_err(|e| malformed(contract, &format!("{}: {e}", path.display())))
}

fn malformed(contract: &str, reason: &str) -> crate::error::VanityError {
    ArtifactError::Malformed {
        contract: contract.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

fn encoding(context: &str, err: impl std::fmt::Display) -> crate::error::VanityError {
    ArtifactError::Encoding {
        context: context.to_string(),
        reason: err.to_string(),
    }
    .into()
}
