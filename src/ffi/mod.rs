//! C FFI - stable ABI for generated code
//!
//! Design: thin `extern "C"` wrappers over the Rust API with:
//! 1. Runtime lifecycle (init, cleanup)
//! 2. Object allocation and reference counting
//! 3. Type identity and names
//! 4. Strings
//! 5. Call frames and backtraces
//!
//! Every entry point taking a pointer is null-safe: null is a no-op (or a
//! null/zero/false result). Broken ownership is not reported through return
//! values; it is fatal, exactly as on the Rust side.

mod frame;
mod object;
mod string;
mod types;

#[cfg(test)]
mod tests;

pub use frame::{beagle_backtrace_print, beagle_frame_enter, beagle_frame_leave, beagle_frame_line};
pub use object::{beagle_acquire, beagle_object_new, beagle_refcount, beagle_release};
pub use string::{
    beagle_string_acquire, beagle_string_content, beagle_string_length, beagle_string_new,
    beagle_string_release, beagle_string_type,
};
pub use types::{beagle_is_instance_of, beagle_type_name_u16, beagle_type_name_u8};

/// Initialize the runtime (called once at program start).
///
/// Returns 0 on success and -1 if the configuration could not be loaded;
/// the reason is logged and written to stderr.
#[no_mangle]
pub extern "C" fn beagle_runtime_init() -> i32 {
    match crate::runtime_init() {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!(target: "beagle::ffi", error = %err, "runtime initialization failed");
            eprintln!("beagle: runtime initialization failed: {}", err);
            -1
        }
    }
}

/// Cleanup the runtime (called at program exit)
#[no_mangle]
pub extern "C" fn beagle_runtime_cleanup() {
    crate::runtime_cleanup();
}
