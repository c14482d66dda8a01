//! Null-terminated UTF-8 JSON codec over guest linear memory.
//!
//! There is no length prefix anywhere in this protocol: writers append a
//! single zero byte and readers scan for it. JSON text never contains a raw
//! NUL (serde_json escapes it as `\u0000`), so objects are always safe to
//! send; plain strings must not carry one.

use serde::Serialize;
use serde_json::Value;

use crate::allocator::{self, GuestAllocation};
use crate::error::{BridgeError, Result};
use crate::guest::{Guest, GuestPtr};

/// Copy `value` plus a terminating zero into freshly allocated guest memory.
///
/// `value` must not contain an embedded NUL; the guest would free a
/// truncated region otherwise.
pub fn write_string<G: Guest + ?Sized>(guest: &mut G, value: &str) -> Result<GuestAllocation> {
    let bytes = value.as_bytes();
    let capacity = bytes
        .len()
        .checked_add(1)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(BridgeError::PayloadTooLarge(bytes.len()))?;

    let allocation = allocator::allocate(guest, capacity)?;
    let start = allocation.ptr() as usize;

    let memory = guest.memory_mut();
    let memory_size = memory.len();
    let region = start
        .checked_add(capacity as usize)
        .and_then(|end| memory.get_mut(start..end));
    let dest = match region {
        Some(dest) => dest,
        None => {
            // 区域内没有终止符，不能交给 free_c_string
            tracing::warn!(
                ptr = allocation.ptr(),
                capacity,
                memory_size,
                "guest alloc returned a region outside linear memory; leaking it"
            );
            return Err(BridgeError::AllocationOutOfBounds {
                ptr: allocation.ptr(),
                len: capacity as usize,
                memory_size,
            });
        }
    };
    dest[..bytes.len()].copy_from_slice(bytes);
    dest[bytes.len()] = 0;

    Ok(allocation)
}

/// Read the string at `ptr` up to (not including) the first zero byte.
pub fn read_string<G: Guest + ?Sized>(guest: &G, ptr: GuestPtr) -> Result<String> {
    let memory = guest.memory();
    let tail = memory
        .get(ptr as usize..)
        .ok_or(BridgeError::MemoryAccess {
            ptr,
            len: 0,
            memory_size: memory.len(),
        })?;

    let len = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(BridgeError::Unterminated { ptr })?;

    Ok(String::from_utf8(tail[..len].to_vec())?)
}

/// Serialize `value` to JSON and write it as a terminated string.
pub fn write_object<G, T>(guest: &mut G, value: &T) -> Result<GuestAllocation>
where
    G: Guest + ?Sized,
    T: Serialize + ?Sized,
{
    let text = serde_json::to_string(value).map_err(BridgeError::Encode)?;
    write_string(guest, &text)
}

/// Read a terminated string at `ptr` and parse it as JSON.
pub fn read_object<G: Guest + ?Sized>(guest: &G, ptr: GuestPtr) -> Result<Value> {
    let text = read_string(guest, ptr)?;
    serde_json::from_str(&text).map_err(BridgeError::Parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guest::mock::MockGuest;
    use serde_json::json;

    #[test]
    fn test_write_string_appends_terminator() {
        let mut guest = MockGuest::new();
        let allocation = write_string(&mut guest, "héllo").unwrap();
        let ptr = allocation.ptr() as usize;

        // "héllo" 为 6 字节 UTF-8，加 1 字节终止符
        assert_eq!(guest.allocations, vec![(allocation.ptr(), 7)]);
        assert_eq!(&guest.memory()[ptr..ptr + 7], "héllo\0".as_bytes());

        allocator::release(&mut guest, allocation).unwrap();
    }

    #[test]
    fn test_write_empty_string() {
        let mut guest = MockGuest::new();
        let allocation = write_string(&mut guest, "").unwrap();
        assert_eq!(guest.allocations, vec![(allocation.ptr(), 1)]);
        assert_eq!(read_string(&guest, allocation.ptr()).unwrap(), "");
        allocator::release(&mut guest, allocation).unwrap();
    }

    #[test]
    fn test_read_string_stops_at_first_zero() {
        let mut guest = MockGuest::new();
        let ptr = guest.place(b"CALL_METHOD\0garbage after terminator");
        assert_eq!(read_string(&guest, ptr).unwrap(), "CALL_METHOD");
    }

    #[test]
    fn test_read_string_invalid_utf8() {
        let mut guest = MockGuest::new();
        let ptr = guest.place(&[0x7b, 0xff, 0xfe, 0x7d]);
        let err = read_string(&guest, ptr).unwrap_err();
        assert!(matches!(err, BridgeError::Utf8(_)));
        assert!(err.is_decode());
    }

    #[test]
    fn test_read_string_unterminated() {
        let mut guest = MockGuest::with_memory_size(16);
        let ptr = 8;
        guest.memory_mut()[8..].copy_from_slice(b"abcdefgh");
        let err = read_string(&guest, ptr).unwrap_err();
        assert!(matches!(err, BridgeError::Unterminated { ptr: 8 }));
    }

    #[test]
    fn test_read_string_out_of_bounds() {
        let guest = MockGuest::with_memory_size(16);
        let err = read_string(&guest, 4096).unwrap_err();
        assert!(matches!(err, BridgeError::MemoryAccess { ptr: 4096, .. }));
    }

    #[test]
    fn test_object_round_trip() {
        let mut guest = MockGuest::new();
        let value = json!({
            "compiled_unknown_intent": "4d220d01",
            "manifest_instructions_output_format": "String",
            "nested": { "list": [1, 2.5, null, true], "text": "多字节 ✓" },
            "escaped": "quote \" backslash \\ newline \n",
        });

        let allocation = write_object(&mut guest, &value).unwrap();
        let decoded = read_object(&guest, allocation.ptr()).unwrap();
        assert_eq!(decoded, value);

        allocator::release(&mut guest, allocation).unwrap();
    }

    #[test]
    fn test_write_object_escapes_nul() {
        let mut guest = MockGuest::new();
        let value = json!({ "text": "a\u{0}b" });

        let allocation = write_object(&mut guest, &value).unwrap();
        let (ptr, capacity) = guest.allocations[0];
        let region = &guest.memory()[ptr as usize..(ptr + capacity) as usize];
        assert_eq!(region.iter().filter(|&&b| b == 0).count(), 1);
        assert_eq!(read_object(&guest, allocation.ptr()).unwrap(), value);

        allocator::release(&mut guest, allocation).unwrap();
    }

    #[test]
    fn test_read_object_malformed_json() {
        let mut guest = MockGuest::new();
        let ptr = guest.place(b"{\"intent\": ");
        let err = read_object(&guest, ptr).unwrap_err();
        assert!(matches!(err, BridgeError::Parse(_)));
    }

    #[test]
    fn test_write_string_guest_out_of_memory() {
        let mut guest = MockGuest::with_memory_size(16);
        let err = write_string(&mut guest, &"x".repeat(64)).unwrap_err();
        assert!(matches!(err, BridgeError::Allocation { requested: 65, .. }));
        assert!(guest.freed.is_empty());
    }

    #[test]
    fn test_write_string_alloc_out_of_bounds() {
        let mut guest = MockGuest::with_memory_size(64);
        guest.alloc_out_of_bounds = true;

        let err = write_string(&mut guest, "{}").unwrap_err();
        assert!(err.is_fatal());
        assert!(!err.is_decode());
        assert!(matches!(
            err,
            BridgeError::AllocationOutOfBounds {
                ptr: 72,
                len: 3,
                memory_size: 64
            }
        ));
        // 区域里没有终止符，不能调用 free_c_string
        assert!(guest.freed.is_empty());
    }
}
