use serde::{Deserialize, Serialize};

/// How the toolkit should render manifest instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ManifestOutputFormat {
    #[default]
    String,
    Parsed,
}

/// Request body for `decompile_unknown_transaction_intent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompileUnknownIntentRequest {
    /// 编译后 intent 的小写十六进制编码
    pub compiled_unknown_intent: String,
    pub manifest_instructions_output_format: ManifestOutputFormat,
}

impl DecompileUnknownIntentRequest {
    pub fn new(compiled_intent: &[u8], format: ManifestOutputFormat) -> Self {
        Self {
            compiled_unknown_intent: hex::encode(compiled_intent),
            manifest_instructions_output_format: format,
        }
    }
}
