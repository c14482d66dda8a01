use std::collections::HashMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use wasmtime::{Caller, Config, Engine, Instance, Linker, Memory, Module, Store, TypedFunc};

use crate::error::{BridgeError, Result};
use crate::guest::{Guest, GuestPtr};

pub const MEMORY_EXPORT: &str = "memory";
pub const ALLOC_EXPORT: &str = "alloc";
pub const FREE_EXPORT: &str = "free_c_string";

/// Target used when re-emitting guest log lines.
pub const GUEST_LOG_TARGET: &str = "toolkit_guest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptLevel {
    None,
    #[default]
    Speed,
    SpeedAndSize,
}

impl From<OptLevel> for wasmtime::OptLevel {
    fn from(level: OptLevel) -> Self {
        match level {
            OptLevel::None => wasmtime::OptLevel::None,
            OptLevel::Speed => wasmtime::OptLevel::Speed,
            OptLevel::SpeedAndSize => wasmtime::OptLevel::SpeedAndSize,
        }
    }
}

/// Engine settings for hosting toolkit modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub opt_level: OptLevel,
    /// Enable epoch interruption so an external watchdog can stop a hung call.
    pub epoch_interruption: bool,
    /// Ticks each store may run before trapping, when epoch interruption is on.
    pub epoch_deadline: u64,
    /// 单条 guest 日志的最大长度
    pub max_guest_log_len: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            opt_level: OptLevel::Speed,
            epoch_interruption: false,
            epoch_deadline: 1_000,
            max_guest_log_len: 4096,
        }
    }
}

/// Names exported by an instantiated toolkit module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    pub memory: String,
    pub alloc: String,
    pub free: String,
    pub operations: Vec<String>,
}

pub struct WasmHost {
    engine: Engine,
    config: HostConfig,
}

impl WasmHost {
    pub fn new(config: &HostConfig) -> Result<Self> {
        let mut wasm_config = Config::new();
        wasm_config.epoch_interruption(config.epoch_interruption);
        wasm_config.cranelift_opt_level(config.opt_level.into());

        let engine = Engine::new(&wasm_config)
            .map_err(|e| BridgeError::Instantiation(format!("Failed to create engine: {:#}", e)))?;
        Ok(Self {
            engine,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Advance the engine epoch; stores past their deadline trap on their next check.
    pub fn increment_epoch(&self) {
        self.engine.increment_epoch();
    }

    pub fn load_module(&self, wasm_bytes: &[u8]) -> Result<Module> {
        Module::new(&self.engine, wasm_bytes)
            .map_err(|e| BridgeError::Instantiation(format!("Invalid module image: {:#}", e)))
    }

    /// prepare a fresh store for a new instance
    pub fn create_store(&self) -> Store<()> {
        let mut store = Store::new(&self.engine, ());
        if self.config.epoch_interruption {
            store.set_epoch_deadline(self.config.epoch_deadline);
        }
        store
    }

    /// Linker with the guest logging imports
    pub fn create_linker(&self) -> Linker<()> {
        let mut linker = Linker::new(&self.engine);
        self.register_log_functions(&mut linker);
        linker
    }

    /// Compile and instantiate `wasm_bytes`, resolving the bridge exports and
    /// each name in `operations`.
    pub fn instantiate(&self, wasm_bytes: &[u8], operations: &[&str]) -> Result<WasmGuest> {
        let module = self.load_module(wasm_bytes)?;
        let linker = self.create_linker();
        let mut store = self.create_store();

        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| BridgeError::Instantiation(format!("Failed to instantiate: {:#}", e)))?;

        let epoch_deadline = self
            .config
            .epoch_interruption
            .then_some(self.config.epoch_deadline);
        WasmGuest::from_instance(store, instance, operations, epoch_deadline)
    }

    // 注册所有日志级别的导入函数
    fn register_log_functions(&self, linker: &mut Linker<()>) {
        let max_len = self.config.max_guest_log_len;

        macro_rules! register_log {
            ($name:literal, $level:expr) => {
                if let Err(e) = linker.func_wrap(
                    "env",
                    $name,
                    move |mut caller: Caller<'_, ()>, ptr: i32, len: i32| {
                        handle_guest_log(&mut caller, ptr, len, max_len, $level);
                    },
                ) {
                    tracing::error!("Failed to register {}: {}", $name, e);
                }
            };
        }

        register_log!("log_trace", tracing::Level::TRACE);
        register_log!("log_debug", tracing::Level::DEBUG);
        register_log!("log_info", tracing::Level::INFO);
        register_log!("log_warn", tracing::Level::WARN);
        register_log!("log_error", tracing::Level::ERROR);
    }
}

fn handle_guest_log(
    caller: &mut Caller<'_, ()>,
    ptr: i32,
    len: i32,
    max_len: usize,
    level: tracing::Level,
) {
    let memory = match caller.get_export(MEMORY_EXPORT) {
        Some(wasmtime::Extern::Memory(mem)) => mem,
        _ => {
            tracing::error!("Toolkit guest: failed to get memory export");
            return;
        }
    };

    let start = ptr as u32 as usize;
    let Some(range) = guest_log_range(start, len as u32 as usize, max_len) else {
        return;
    };
    let len = range.len();

    let data = memory.data(caller);
    let slice = match data.get(range) {
        Some(s) => s,
        None => {
            tracing::error!(
                "Invalid memory range in guest log: ptr={}, len={}, memory_size={}",
                start,
                len,
                data.len()
            );
            return;
        }
    };

    match std::str::from_utf8(slice) {
        Ok(msg) => match level {
            tracing::Level::TRACE => tracing::trace!(target: GUEST_LOG_TARGET, "{}", msg),
            tracing::Level::DEBUG => tracing::debug!(target: GUEST_LOG_TARGET, "{}", msg),
            tracing::Level::INFO => tracing::info!(target: GUEST_LOG_TARGET, "{}", msg),
            tracing::Level::WARN => tracing::warn!(target: GUEST_LOG_TARGET, "{}", msg),
            tracing::Level::ERROR => tracing::error!(target: GUEST_LOG_TARGET, "{}", msg),
        },
        Err(e) => {
            tracing::warn!("Invalid UTF-8 in guest log (len={}): {}", len, e);
        }
    }
}

/// Byte range of a guest log line, truncated to `max_len`.
///
/// `None` for an empty line or when the end would overflow `usize`.
fn guest_log_range(start: usize, len: usize, max_len: usize) -> Option<Range<usize>> {
    let len = len.min(max_len);
    if len == 0 {
        return None;
    }
    let end = start.checked_add(len)?;
    Some(start..end)
}

/// A live toolkit instance with its bridge exports resolved.
pub struct WasmGuest {
    store: Store<()>,
    memory: Memory,
    alloc_fn: TypedFunc<u32, u32>,
    free_fn: TypedFunc<u32, ()>,
    operations: HashMap<String, TypedFunc<u32, u32>>,
    epoch_deadline: Option<u64>,
}

impl WasmGuest {
    fn from_instance(
        mut store: Store<()>,
        instance: Instance,
        operations: &[&str],
        epoch_deadline: Option<u64>,
    ) -> Result<Self> {
        let memory = instance
            .get_memory(&mut store, MEMORY_EXPORT)
            .ok_or_else(|| missing_export(MEMORY_EXPORT, "memory"))?;

        let alloc_fn = instance
            .get_typed_func::<u32, u32>(&mut store, ALLOC_EXPORT)
            .map_err(|e| missing_export(ALLOC_EXPORT, &format!("{:#}", e)))?;

        let free_fn = instance
            .get_typed_func::<u32, ()>(&mut store, FREE_EXPORT)
            .map_err(|e| missing_export(FREE_EXPORT, &format!("{:#}", e)))?;

        if operations.is_empty() {
            return Err(BridgeError::Instantiation(
                "At least one toolkit operation must be requested".to_string(),
            ));
        }

        let mut resolved = HashMap::with_capacity(operations.len());
        for &name in operations {
            let func = instance
                .get_typed_func::<u32, u32>(&mut store, name)
                .map_err(|e| missing_export(name, &format!("{:#}", e)))?;
            resolved.insert(name.to_string(), func);
        }

        tracing::debug!(operations = ?operations, "Toolkit module instantiated");

        Ok(Self {
            store,
            memory,
            alloc_fn,
            free_fn,
            operations: resolved,
            epoch_deadline,
        })
    }

    pub fn export_table(&self) -> ExportTable {
        let mut operations: Vec<String> = self.operations.keys().cloned().collect();
        operations.sort();
        ExportTable {
            memory: MEMORY_EXPORT.to_string(),
            alloc: ALLOC_EXPORT.to_string(),
            free: FREE_EXPORT.to_string(),
            operations,
        }
    }
}

fn missing_export(name: &str, detail: &str) -> BridgeError {
    BridgeError::Instantiation(format!("Toolkit must export '{}': {}", name, detail))
}

impl Guest for WasmGuest {
    fn alloc(&mut self, capacity: u32) -> Result<GuestPtr> {
        self.alloc_fn
            .call(&mut self.store, capacity)
            .map_err(|e| BridgeError::Allocation {
                requested: capacity,
                message: format!("{:#}", e),
            })
    }

    fn free_c_string(&mut self, ptr: GuestPtr) -> Result<()> {
        self.free_fn
            .call(&mut self.store, ptr)
            .map_err(|e| BridgeError::Release {
                ptr,
                message: format!("{:#}", e),
            })
    }

    fn call(&mut self, operation: &str, request: GuestPtr) -> Result<GuestPtr> {
        let func = self
            .operations
            .get(operation)
            .ok_or_else(|| BridgeError::UnknownOperation(operation.to_string()))?;

        func.call(&mut self.store, request)
            .map_err(|e| BridgeError::Trap {
                operation: operation.to_string(),
                message: format!("{:#}", e),
            })
    }

    fn has_operation(&self, operation: &str) -> bool {
        self.operations.contains_key(operation)
    }

    fn memory(&self) -> &[u8] {
        self.memory.data(&self.store)
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        self.memory.data_mut(&mut self.store)
    }

    // 每个调用周期重新计算 epoch 预算，空闲期间的 tick 不计入
    fn begin_cycle(&mut self) {
        if let Some(deadline) = self.epoch_deadline {
            self.store.set_epoch_deadline(deadline);
        }
    }
}
