//! Guest-side helpers for building toolkit modules the host bridge can call.
//!
//! A module built with this crate exports `alloc` and `free_c_string` (via
//! [`export_toolkit_alloc!`]) and one or more `extern "C" fn(*const c_char)
//! -> *mut c_char` operations that exchange null-terminated JSON text.

pub mod logging;
mod macros;
pub mod strings;

pub use strings::{into_host_c_string, read_c_string_from_host};
