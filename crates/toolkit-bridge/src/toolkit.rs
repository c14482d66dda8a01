use serde_json::Value;

use crate::bridge::CallBridge;
use crate::error::Result;
use crate::extract::ManifestExtractor;
use crate::guest::Guest;
use crate::request::{DecompileUnknownIntentRequest, ManifestOutputFormat};

pub const DEFAULT_DECOMPILE_OPERATION: &str = "decompile_unknown_transaction_intent";

/// Domain-level wrapper: compiled intent bytes in, manifest text out.
pub struct ToolkitClient<G> {
    bridge: CallBridge<G>,
    operation: String,
    output_format: ManifestOutputFormat,
    extractor: ManifestExtractor,
}

impl<G: Guest> ToolkitClient<G> {
    pub fn new(guest: G) -> Self {
        Self {
            bridge: CallBridge::new(guest),
            operation: DEFAULT_DECOMPILE_OPERATION.to_string(),
            output_format: ManifestOutputFormat::String,
            extractor: ManifestExtractor::default(),
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }

    pub fn with_output_format(mut self, format: ManifestOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_extractor(mut self, extractor: ManifestExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn bridge(&self) -> &CallBridge<G> {
        &self.bridge
    }

    /// Decompile `compiled_intent` and pull the manifest text out of the response.
    ///
    /// `Ok(None)` means the toolkit answered but no known response shape
    /// carried a manifest; bridge failures are `Err`.
    pub fn decompile_unknown_intent(&mut self, compiled_intent: &[u8]) -> Result<Option<String>> {
        let request = DecompileUnknownIntentRequest::new(compiled_intent, self.output_format);
        let response = self.bridge.invoke(&request, &self.operation)?;

        let manifest = self.extractor.extract(&response);
        if manifest.is_none() {
            tracing::warn!(
                operation = %self.operation,
                "Toolkit response carried no manifest instructions"
            );
        }
        Ok(manifest)
    }

    /// Send an arbitrary JSON request to the configured operation.
    pub fn invoke_raw(&mut self, request: &Value) -> Result<Value> {
        self.bridge.invoke(request, &self.operation)
    }
}
