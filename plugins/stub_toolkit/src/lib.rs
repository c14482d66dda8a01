//! Stand-in toolkit module for exercising the host bridge.
//!
//! Build with `cargo build --target wasm32-unknown-unknown --release` and
//! point `toolkit.module_path` at the resulting `stub_toolkit.wasm`. It does
//! not decode intents; it answers with a fixed manifest in the
//! `intent.manifest.instructions` shape.

use std::os::raw::c_char;

use serde::Deserialize;
use serde_json::{json, Value};
use toolkit_guest_sdk::{
    debug, export_toolkit_alloc, info, into_host_c_string, read_c_string_from_host, trace, warn,
};

export_toolkit_alloc!();

#[derive(Debug, Deserialize)]
struct DecompileRequest {
    compiled_unknown_intent: String,
    manifest_instructions_output_format: String,
}

/// 入口函数：`(request_ptr) -> response_ptr`
///
/// # Safety
///
/// `request` must be a null-terminated string written by the host.
#[no_mangle]
pub unsafe extern "C" fn decompile_unknown_transaction_intent(
    request: *const c_char,
) -> *mut c_char {
    let input = read_c_string_from_host(request);
    trace!("decompile request: {} bytes", input.len());

    let response = match serde_json::from_str::<DecompileRequest>(&input) {
        Ok(request) => decompile(&request),
        Err(e) => {
            warn!("Malformed decompile request: {}", e);
            error_response(format!("Malformed request: {}", e))
        }
    };

    into_host_c_string(response.to_string())
}

fn decompile(request: &DecompileRequest) -> Value {
    let hex = &request.compiled_unknown_intent;
    if hex.len() % 2 != 0 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return error_response("compiled_unknown_intent is not valid hex".to_string());
    }
    let intent_len = hex.len() / 2;
    debug!("compiled intent: {} bytes", intent_len);

    let instructions = match request.manifest_instructions_output_format.as_str() {
        "String" => json!({
            "kind": "String",
            "value": format!(
                "CALL_METHOD\n    Address(\"component_stub\")\n    \"lock_fee\"\n    Decimal(\"{}\")\n;\n",
                intent_len
            ),
        }),
        "Parsed" => json!({
            "kind": "Parsed",
            "value": [{
                "instruction": "CALL_METHOD",
                "method_name": "lock_fee",
                "arguments": [intent_len],
            }],
        }),
        other => {
            warn!("Unknown manifest output format: {}", other);
            return error_response(format!("Unknown output format: {}", other));
        }
    };

    info!("Decompiled intent of {} bytes", intent_len);
    json!({
        "intent": {
            "header": { "network_id": 242, "intent_len": intent_len },
            "manifest": { "instructions": instructions, "blobs": [] },
        }
    })
}

fn error_response(message: String) -> Value {
    json!({ "error": message })
}
