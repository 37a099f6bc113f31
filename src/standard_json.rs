//! The Solidity compiler's standard-JSON input/output contract (spec.md
//! §6). The core never interprets the wire format beyond the fields listed
//! there, so these structs carry exactly those fields plus
//! `#[serde(default)]` tolerance for anything a future compiler version
//! adds — mirroring the teacher's `artifacts` module, which never assumes
//! it has seen every field solc might emit.

use crate::selector::GasTables;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Top-level standard-JSON request body.
#[derive(Debug, Clone, Serialize)]
pub struct StandardJsonInput {
    pub language: String,
    pub sources: HashMap<String, SourceInput>,
    pub settings: StandardJsonSettings,
}

impl StandardJsonInput {
    /// Builds the request for a single in-memory source buffer, with the
    /// output selection spec.md §4.5 step 5c mandates.
    pub fn single_source(
        path: impl Into<String>,
        content: impl Into<String>,
        settings: StandardJsonSettings,
    ) -> Self {
        let mut sources = HashMap::new();
        sources.insert(path.into(), SourceInput { content: content.into() });
        Self { language: "Solidity".to_string(), sources, settings }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceInput {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StandardJsonSettings {
    pub optimizer: OptimizerSettings,
    #[serde(rename = "evmVersion")]
    pub evm_version: String,
    #[serde(rename = "viaIR")]
    pub via_ir: bool,
    #[serde(rename = "outputSelection")]
    pub output_selection: OutputSelection,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizerSettings {
    pub enabled: bool,
    pub runs: u32,
}

/// `{"*": {"*": [...contract-level...], "": [...file-level...]}}`,
/// fixed to the fields the core reads: `abi`, `evm.gasEstimates`,
/// `evm.bytecode.object`, `evm.deployedBytecode.object`, `metadata` at the
/// contract level, `ast` at the file level (spec.md §4.5 step 5c).
#[derive(Debug, Clone, Serialize)]
pub struct OutputSelection(HashMap<String, HashMap<String, Vec<String>>>);

impl Default for OutputSelection {
    fn default() -> Self {
        let mut per_contract = HashMap::new();
        per_contract.insert(
            "*".to_string(),
            vec![
                "abi".to_string(),
                "evm.gasEstimates".to_string(),
                "evm.bytecode.object".to_string(),
                "evm.deployedBytecode.object".to_string(),
                "metadata".to_string(),
            ],
        );
        per_contract.insert("".to_string(), vec!["ast".to_string()]);
        let mut outer = HashMap::new();
        outer.insert("*".to_string(), per_contract);
        Self(outer)
    }
}

/// Standard-JSON response, parsed leniently: any field this crate doesn't
/// read is simply absent from the struct, and every field we do read
/// tolerates being missing from the compiler's actual output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StandardJsonOutput {
    #[serde(default)]
    pub errors: Vec<OutputError>,
    #[serde(default)]
    pub sources: HashMap<String, SourceOutput>,
    #[serde(default)]
    pub contracts: HashMap<String, HashMap<String, ContractOutput>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputError {
    pub severity: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "formattedMessage", default)]
    pub formatted_message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceOutput {
    #[serde(default)]
    pub ast: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractOutput {
    #[serde(default)]
    pub abi: Option<Value>,
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(default)]
    pub evm: Option<EvmOutput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvmOutput {
    #[serde(rename = "gasEstimates", default)]
    pub gas_estimates: Option<GasEstimatesOutput>,
    #[serde(default)]
    pub bytecode: Option<BytecodeOutput>,
    #[serde(rename = "deployedBytecode", default)]
    pub deployed_bytecode: Option<BytecodeOutput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BytecodeOutput {
    pub object: Option<String>,
}

/// `evm.gasEstimates` as reported by solc: `{ creation: {...}, external:
/// {sig: value}, internal: {sig: value} }`. Only `external`/`internal` are
/// used by [`crate::selector`]; `creation` is whole-contract deployment
/// cost and out of scope here (spec.md §1 non-goals).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GasEstimatesOutput {
    #[serde(default)]
    pub external: HashMap<String, String>,
    #[serde(default)]
    pub internal: HashMap<String, String>,
}

impl From<GasEstimatesOutput> for GasTables {
    fn from(value: GasEstimatesOutput) -> Self {
        GasTables { external: value.external, internal: value.internal }
    }
}
