//! Guest-side surface the bridge depends on.
//!
//! A guest is anything that exposes a flat linear memory, an `alloc`
//! export, a `free_c_string` export and a set of named `u32 -> u32`
//! operations. [`crate::WasmGuest`] is the wasmtime implementation; tests
//! use an in-memory mock.

use crate::error::Result;

/// Offset into the guest's linear memory.
pub type GuestPtr = u32;

pub trait Guest {
    /// `alloc(capacity) -> ptr`
    fn alloc(&mut self, capacity: u32) -> Result<GuestPtr>;

    /// `free_c_string(ptr)`; the guest finds the extent by scanning for the first zero byte.
    fn free_c_string(&mut self, ptr: GuestPtr) -> Result<()>;

    /// Invoke a domain operation `(request_ptr) -> response_ptr`.
    fn call(&mut self, operation: &str, request: GuestPtr) -> Result<GuestPtr>;

    fn has_operation(&self, operation: &str) -> bool;

    fn memory(&self) -> &[u8];

    fn memory_mut(&mut self) -> &mut [u8];

    /// Called once at the start of every call cycle, before the first allocation.
    fn begin_cycle(&mut self) {}
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use crate::error::BridgeError;

    /// What the mock's operations do when called.
    pub(crate) enum MockResponse {
        /// Allocate and return these bytes verbatim (the caller adds the terminator).
        Bytes(Vec<u8>),
        Trap(String),
        Null,
        /// Return the request pointer as the response.
        Echo,
    }

    /// Bump allocator over a `Vec<u8>` that records every call.
    pub(crate) struct MockGuest {
        memory: Vec<u8>,
        next: GuestPtr,
        operations: Vec<String>,
        pub response: MockResponse,
        pub allocations: Vec<(GuestPtr, u32)>,
        pub freed: Vec<GuestPtr>,
        pub calls: Vec<(String, GuestPtr)>,
        pub fail_free: bool,
        /// `alloc` hands out a pointer past the end of memory.
        pub alloc_out_of_bounds: bool,
        pub cycles: usize,
    }

    impl MockGuest {
        pub fn new() -> Self {
            Self::with_memory_size(64 * 1024)
        }

        pub fn with_memory_size(size: usize) -> Self {
            Self {
                memory: vec![0; size],
                // 0 保留为空指针
                next: 8,
                operations: vec!["decompile_unknown_transaction_intent".to_string()],
                response: MockResponse::Null,
                allocations: Vec::new(),
                freed: Vec::new(),
                calls: Vec::new(),
                fail_free: false,
                alloc_out_of_bounds: false,
                cycles: 0,
            }
        }

        pub fn responding(response: &str) -> Self {
            let mut guest = Self::new();
            guest.response = MockResponse::Bytes(response.as_bytes().to_vec());
            guest
        }

        pub fn with_operation(mut self, name: &str) -> Self {
            self.operations.push(name.to_string());
            self
        }

        /// Write a terminated byte string at a fresh offset without going through `alloc`.
        pub fn place(&mut self, bytes: &[u8]) -> GuestPtr {
            let ptr = self.next;
            let start = ptr as usize;
            self.memory[start..start + bytes.len()].copy_from_slice(bytes);
            self.memory[start + bytes.len()] = 0;
            self.next += bytes.len() as u32 + 1;
            ptr
        }
    }

    impl Guest for MockGuest {
        fn alloc(&mut self, capacity: u32) -> Result<GuestPtr> {
            if self.alloc_out_of_bounds {
                let ptr = self.memory.len() as GuestPtr + 8;
                self.allocations.push((ptr, capacity));
                return Ok(ptr);
            }
            let end = self.next as usize + capacity as usize;
            if end > self.memory.len() {
                return Err(BridgeError::Allocation {
                    requested: capacity,
                    message: "mock heap exhausted".to_string(),
                });
            }
            let ptr = self.next;
            self.next = end as GuestPtr;
            self.allocations.push((ptr, capacity));
            Ok(ptr)
        }

        fn free_c_string(&mut self, ptr: GuestPtr) -> Result<()> {
            self.freed.push(ptr);
            if self.fail_free {
                return Err(BridgeError::Release {
                    ptr,
                    message: "mock free failure".to_string(),
                });
            }
            Ok(())
        }

        fn call(&mut self, operation: &str, request: GuestPtr) -> Result<GuestPtr> {
            self.calls.push((operation.to_string(), request));
            let bytes = match &self.response {
                MockResponse::Bytes(bytes) => bytes.clone(),
                MockResponse::Trap(message) => {
                    return Err(BridgeError::Trap {
                        operation: operation.to_string(),
                        message: message.clone(),
                    })
                }
                MockResponse::Null => return Ok(0),
                MockResponse::Echo => return Ok(request),
            };
            let ptr = self.alloc(bytes.len() as u32 + 1)?;
            let start = ptr as usize;
            self.memory[start..start + bytes.len()].copy_from_slice(&bytes);
            self.memory[start + bytes.len()] = 0;
            Ok(ptr)
        }

        fn has_operation(&self, operation: &str) -> bool {
            self.operations.iter().any(|name| name == operation)
        }

        fn memory(&self) -> &[u8] {
            &self.memory
        }

        fn memory_mut(&mut self) -> &mut [u8] {
            &mut self.memory
        }

        fn begin_cycle(&mut self) {
            self.cycles += 1;
        }
    }
}
