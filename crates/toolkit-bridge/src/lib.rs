//! Host-side bridge into a sandboxed transaction toolkit module.
//!
//! Requests travel as null-terminated UTF-8 JSON through the guest's own
//! linear memory: the host allocates with the guest's `alloc`, calls an
//! operation `(request_ptr) -> response_ptr`, decodes the response and
//! hands both regions back through `free_c_string`.

pub mod allocator;
pub mod bridge;
pub mod error;
pub mod extract;
pub mod guest;
pub mod manager;
pub mod memory;
pub mod request;
pub mod toolkit;
pub mod wasm_host;

pub use allocator::GuestAllocation;
pub use bridge::CallBridge;
pub use error::{BridgeError, Result};
pub use extract::{extract_manifest_text, resolve_path, ManifestExtractor};
pub use guest::{Guest, GuestPtr};
pub use manager::{ToolkitManager, ToolkitOptions};
pub use request::{DecompileUnknownIntentRequest, ManifestOutputFormat};
pub use toolkit::{ToolkitClient, DEFAULT_DECOMPILE_OPERATION};
pub use wasm_host::{ExportTable, HostConfig, OptLevel, WasmGuest, WasmHost};
