use serde::Serialize;
use serde_json::Value;

use crate::allocator::{self, GuestAllocation};
use crate::error::{BridgeError, Result};
use crate::guest::Guest;
use crate::memory;

/// One request/response cycle at a time against a single guest instance.
///
/// `invoke` takes `&mut self`, so two cycles can never overlap on the same
/// guest. Wrap the bridge in a `Mutex` (see [`crate::ToolkitManager`]) to
/// share it between threads.
pub struct CallBridge<G> {
    guest: G,
}

impl<G: Guest> CallBridge<G> {
    pub fn new(guest: G) -> Self {
        Self { guest }
    }

    pub fn guest(&self) -> &G {
        &self.guest
    }

    pub fn into_inner(self) -> G {
        self.guest
    }

    /// Marshal `request`, call `operation` once, decode the response, then
    /// free both regions.
    ///
    /// Both the request and the response region are released before this
    /// returns, including when the response fails to decode. A guest trap
    /// still releases the request region. Nothing is retried.
    pub fn invoke<T>(&mut self, request: &T, operation: &str) -> Result<Value>
    where
        T: Serialize + ?Sized,
    {
        if !self.guest.has_operation(operation) {
            return Err(BridgeError::UnknownOperation(operation.to_string()));
        }
        self.guest.begin_cycle();

        // 1. 写入请求
        let request_allocation = memory::write_object(&mut self.guest, request)?;
        let request_ptr = request_allocation.ptr();

        // 2. 调用 Guest 函数
        let response_ptr = match self.guest.call(operation, request_ptr) {
            Ok(ptr) => ptr,
            Err(e) => {
                self.release_after_failure(request_allocation);
                return Err(e);
            }
        };
        tracing::debug!(operation, request_ptr, response_ptr, "guest call returned");

        if response_ptr == 0 {
            self.release_after_failure(request_allocation);
            return Err(BridgeError::NullResponse {
                operation: operation.to_string(),
            });
        }

        // 3. 解码响应
        let decoded = memory::read_object(&self.guest, response_ptr);

        // 4. 释放两块内存（无论解码成功与否）
        let release_result = if response_ptr == request_ptr {
            // Guest 原样返回了请求指针，同一块区域只释放一次
            allocator::release(&mut self.guest, request_allocation)
        } else {
            let request_release = allocator::release(&mut self.guest, request_allocation);
            let response_release =
                allocator::release(&mut self.guest, GuestAllocation::adopt(response_ptr));
            request_release.and(response_release)
        };

        // 优先返回解码错误，但记录释放失败
        match (decoded, release_result) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => {
                tracing::error!(operation, "Failed to release guest memory: {}", e);
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Err(decode_err), Err(release_err)) => {
                tracing::error!(
                    operation,
                    "Failed to release guest memory after decode error ({}): {}",
                    decode_err,
                    release_err
                );
                Err(decode_err)
            }
        }
    }

    fn release_after_failure(&mut self, allocation: GuestAllocation) {
        let ptr = allocation.ptr();
        if let Err(e) = allocator::release(&mut self.guest, allocation) {
            tracing::warn!(ptr, "Failed to release request after failed call: {}", e);
        }
    }
}
