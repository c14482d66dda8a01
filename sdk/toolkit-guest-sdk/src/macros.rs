/// Export the `alloc` / `free_c_string` pair the host bridge requires.
///
/// The host always allocates exactly `strlen + 1` bytes and writes a
/// terminator at the end, and responses are produced by
/// `CString::into_raw`, so `CString::from_raw` frees every region with the
/// layout it was allocated with.
#[macro_export]
macro_rules! export_toolkit_alloc {
    () => {
        #[no_mangle]
        pub extern "C" fn alloc(capacity: usize) -> *mut u8 {
            let mut buf = Vec::<u8>::with_capacity(capacity);
            let ptr = buf.as_mut_ptr();
            std::mem::forget(buf);
            ptr
        }

        /// # Safety
        ///
        /// `ptr` must come from `alloc` (fully written, terminated) or from
        /// `CString::into_raw`, and must not be freed twice.
        #[no_mangle]
        pub unsafe extern "C" fn free_c_string(ptr: *mut std::os::raw::c_char) {
            if !ptr.is_null() {
                drop(std::ffi::CString::from_raw(ptr));
            }
        }
    };
}
