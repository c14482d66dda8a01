use thiserror::Error;

use crate::guest::GuestPtr;

/// Toolkit Bridge 统一错误类型
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Instantiation error: {0}")]
    Instantiation(String),

    #[error("Guest allocation of {requested} bytes failed: {message}")]
    Allocation { requested: u32, message: String },

    #[error("Payload too large for guest memory: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Guest memory access out of bounds: ptr={ptr}, len={len}, memory_size={memory_size}")]
    MemoryAccess {
        ptr: GuestPtr,
        len: usize,
        memory_size: usize,
    },

    /// `alloc` handed back a region that does not fit in linear memory.
    #[error("Guest alloc returned out-of-bounds region: ptr={ptr}, len={len}, memory_size={memory_size}")]
    AllocationOutOfBounds {
        ptr: GuestPtr,
        len: usize,
        memory_size: usize,
    },

    #[error("No null terminator after ptr={ptr} before end of guest memory")]
    Unterminated { ptr: GuestPtr },

    #[error("Invalid UTF-8 in guest string: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to parse guest response: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Operation '{operation}' returned a null pointer")]
    NullResponse { operation: String },

    #[error("Guest trapped in '{operation}': {message}")]
    Trap { operation: String, message: String },

    #[error("Failed to release guest pointer {ptr}: {message}")]
    Release { ptr: GuestPtr, message: String },

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// Bytes came back from the guest but could not be turned into a JSON value.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            BridgeError::Utf8(_)
                | BridgeError::Parse(_)
                | BridgeError::Unterminated { .. }
                | BridgeError::MemoryAccess { .. }
                | BridgeError::NullResponse { .. }
        )
    }

    /// 实例或分配级别的失败，调用方应放弃整个会话
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::Instantiation(_)
                | BridgeError::Allocation { .. }
                | BridgeError::AllocationOutOfBounds { .. }
                | BridgeError::PayloadTooLarge(_)
        )
    }
}
