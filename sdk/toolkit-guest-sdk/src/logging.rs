//! 通过 Host 的 `env.log_*` 导入输出日志
//!
//! Lines end up in the host's `tracing` output under target `toolkit_guest`.

#[cfg(target_arch = "wasm32")]
#[link(wasm_import_module = "env")]
extern "C" {
    fn log_trace(ptr: *const u8, len: usize);
    fn log_debug(ptr: *const u8, len: usize);
    fn log_info(ptr: *const u8, len: usize);
    fn log_warn(ptr: *const u8, len: usize);
    fn log_error(ptr: *const u8, len: usize);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Forward one line to the host.
#[cfg(target_arch = "wasm32")]
pub fn log(level: Level, msg: &str) {
    let (ptr, len) = (msg.as_ptr(), msg.len());
    // Host 只在调用期间读取 [ptr, ptr + len)
    unsafe {
        match level {
            Level::Trace => log_trace(ptr, len),
            Level::Debug => log_debug(ptr, len),
            Level::Info => log_info(ptr, len),
            Level::Warn => log_warn(ptr, len),
            Level::Error => log_error(ptr, len),
        }
    }
}

/// Native builds (unit tests of guest code) have no host; print instead.
#[cfg(not(target_arch = "wasm32"))]
pub fn log(level: Level, msg: &str) {
    eprintln!("[{:?}] {}", level, msg);
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::logging::log($crate::logging::Level::Trace, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::logging::log($crate::logging::Level::Debug, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::logging::log($crate::logging::Level::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::logging::log($crate::logging::Level::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::logging::log($crate::logging::Level::Error, &format!($($arg)*))
    };
}
