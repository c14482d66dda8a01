use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use crate::error::{BridgeError, Result};
use crate::extract::ManifestExtractor;
use crate::request::ManifestOutputFormat;
use crate::toolkit::{ToolkitClient, DEFAULT_DECOMPILE_OPERATION};
use crate::wasm_host::{HostConfig, WasmGuest, WasmHost};

/// Per-instance settings applied when a toolkit module is loaded.
#[derive(Debug, Clone)]
pub struct ToolkitOptions {
    pub operation: String,
    pub output_format: ManifestOutputFormat,
    pub extractor: ManifestExtractor,
}

impl Default for ToolkitOptions {
    fn default() -> Self {
        Self {
            operation: DEFAULT_DECOMPILE_OPERATION.to_string(),
            output_format: ManifestOutputFormat::String,
            extractor: ManifestExtractor::default(),
        }
    }
}

/// Named toolkit instances sharing one engine.
///
/// Each instance sits behind its own `Mutex`: guest linear memory and the
/// guest allocator are not safe for overlapping calls, so callers on the
/// same id are serialized while different ids run independently.
pub struct ToolkitManager {
    host: WasmHost,
    options: ToolkitOptions,
    instances: RwLock<HashMap<String, Mutex<ToolkitClient<WasmGuest>>>>,
}

impl ToolkitManager {
    pub fn new(config: &HostConfig, options: ToolkitOptions) -> Result<Self> {
        Ok(Self {
            host: WasmHost::new(config)?,
            options,
            instances: RwLock::new(HashMap::new()),
        })
    }

    pub fn host(&self) -> &WasmHost {
        &self.host
    }

    /// Instantiate `wasm_bytes` under `toolkit_id`, replacing any previous instance.
    pub fn load_toolkit(&self, toolkit_id: &str, wasm_bytes: &[u8]) -> Result<()> {
        let guest = self
            .host
            .instantiate(wasm_bytes, &[self.options.operation.as_str()])?;

        let client = ToolkitClient::new(guest)
            .with_operation(self.options.operation.clone())
            .with_output_format(self.options.output_format)
            .with_extractor(self.options.extractor.clone());

        // 获取写锁，如果锁被污染则返回错误
        let mut instances = self
            .instances
            .write()
            .map_err(|e| BridgeError::Internal(format!("Failed to acquire write lock: {}", e)))?;
        if instances
            .insert(toolkit_id.to_string(), Mutex::new(client))
            .is_some()
        {
            tracing::info!(toolkit_id, "Replaced toolkit instance");
        } else {
            tracing::info!(toolkit_id, "Loaded toolkit instance");
        }
        Ok(())
    }

    pub fn unload(&self, toolkit_id: &str) -> Result<bool> {
        let mut instances = self
            .instances
            .write()
            .map_err(|e| BridgeError::Internal(format!("Failed to acquire write lock: {}", e)))?;
        Ok(instances.remove(toolkit_id).is_some())
    }

    pub fn toolkit_ids(&self) -> Result<Vec<String>> {
        let instances = self
            .instances
            .read()
            .map_err(|e| BridgeError::Internal(format!("Failed to acquire read lock: {}", e)))?;
        let mut ids: Vec<String> = instances.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    /// Run the decompile operation on one instance.
    pub fn decompile(&self, toolkit_id: &str, compiled_intent: &[u8]) -> Result<Option<String>> {
        let instances = self
            .instances
            .read()
            .map_err(|e| BridgeError::Internal(format!("Failed to acquire read lock: {}", e)))?;
        let slot = instances
            .get(toolkit_id)
            .ok_or_else(|| BridgeError::NotFound(format!("Toolkit not found: {}", toolkit_id)))?;

        let mut client = slot
            .lock()
            .map_err(|e| BridgeError::Internal(format!("Toolkit instance poisoned: {}", e)))?;
        client.decompile_unknown_intent(compiled_intent)
    }
}
