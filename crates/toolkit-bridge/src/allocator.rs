use crate::error::Result;
use crate::guest::{Guest, GuestPtr};

/// Ownership of one region of guest linear memory.
///
/// Not `Clone`/`Copy`: [`release`] takes it by value, so a pointer obtained
/// during a call cycle can be handed back to the guest at most once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "guest allocations must be passed to allocator::release"]
pub struct GuestAllocation {
    ptr: GuestPtr,
}

impl GuestAllocation {
    /// Take ownership of a pointer the guest produced itself (e.g. a response).
    pub fn adopt(ptr: GuestPtr) -> Self {
        Self { ptr }
    }

    pub fn ptr(&self) -> GuestPtr {
        self.ptr
    }
}

/// Request `capacity` bytes from the guest's `alloc` export.
///
/// Guest faults propagate unchanged; nothing is retried here.
pub fn allocate<G: Guest + ?Sized>(guest: &mut G, capacity: u32) -> Result<GuestAllocation> {
    let ptr = guest.alloc(capacity)?;
    tracing::trace!(ptr, capacity, "guest alloc");
    Ok(GuestAllocation { ptr })
}

/// Hand a region back through `free_c_string`.
///
/// The guest scans from `ptr` to the first zero byte to find the extent, so
/// the region must hold a terminated string written by this bridge or by
/// the guest.
pub fn release<G: Guest + ?Sized>(guest: &mut G, allocation: GuestAllocation) -> Result<()> {
    let ptr = allocation.ptr;
    guest.free_c_string(ptr)?;
    tracing::trace!(ptr, "guest free_c_string");
    Ok(())
}
