use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Copy the request string the host wrote at `ptr`.
///
/// # Safety
///
/// `ptr` must point to a null-terminated byte string in this module's
/// memory that stays valid for the duration of the call. Invalid UTF-8 is
/// replaced with U+FFFD.
pub unsafe fn read_c_string_from_host(ptr: *const c_char) -> String {
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

/// Hand a response to the host. Ownership passes to the host, which frees it
/// through `free_c_string`.
///
/// A value with an embedded NUL cannot cross the boundary and becomes a
/// null pointer, which the host reports as an empty response.
pub fn into_host_c_string(value: String) -> *mut c_char {
    CString::new(value)
        .map(CString::into_raw)
        .unwrap_or(std::ptr::null_mut())
}
