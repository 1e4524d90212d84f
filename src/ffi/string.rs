//! Strings - C API
//!
//! Generated code holds `const beagle_dynamic_string*`, the instance inside
//! a `StringObject`. Acquire and release act on the enclosing object.

use core::ffi::c_char;
use core::ptr::{self, NonNull};

use crate::builtins::{string_type, StringObject, StringType, StringValue};
use crate::gc::{self, Handle};

/// The process-wide string descriptor
#[no_mangle]
pub extern "C" fn beagle_string_type() -> *const StringType {
    string_type()
}

/// Copy `length` bytes into a new string with one reference.
///
/// Returns null if `bytes` is null with a non-zero length or the length does
/// not fit the instance's 32-bit length field.
///
/// # Safety
/// `bytes` must be valid for `length` reads (or null when `length` is 0).
#[no_mangle]
pub unsafe extern "C" fn beagle_string_new(bytes: *const u8, length: usize) -> *const StringValue {
    let bytes = match (bytes.is_null(), length) {
        (_, 0) => &[][..],
        (true, _) => return ptr::null(),
        (false, _) => core::slice::from_raw_parts(bytes, length),
    };

    match StringObject::new(bytes) {
        Ok(object) => {
            let value = StringObject::instance_ptr(&object);
            // The reference now belongs to the caller
            let _ = Handle::into_raw(object);
            value
        }
        Err(err) => {
            tracing::warn!(target: "beagle::ffi", error = %err, "string creation failed");
            ptr::null()
        }
    }
}

/// Length in bytes, 0 for null
///
/// # Safety
/// `s` must be null or a live string instance.
#[no_mangle]
pub unsafe extern "C" fn beagle_string_length(s: *const StringValue) -> u32 {
    match s.as_ref() {
        Some(s) => s.len() as u32,
        None => 0,
    }
}

/// Pointer to the first content byte. Not NUL-terminated; null for null.
///
/// # Safety
/// `s` must be null or a live string instance.
#[no_mangle]
pub unsafe extern "C" fn beagle_string_content(s: *const StringValue) -> *const c_char {
    match s.as_ref() {
        Some(s) => s.content().as_ptr() as *const c_char,
        None => ptr::null(),
    }
}

/// # Safety
/// `s` must be null or a live string instance whose reference the caller
/// holds.
#[no_mangle]
pub unsafe extern "C" fn beagle_string_acquire(s: *const StringValue) {
    if let Some(value) = NonNull::new(s as *mut StringValue) {
        gc::acquire(StringObject::from_instance_ptr(value).cast());
    }
}

/// # Safety
/// `s` must be null or a live string instance; the caller gives up one
/// reference.
#[no_mangle]
pub unsafe extern "C" fn beagle_string_release(s: *const StringValue) {
    if let Some(value) = NonNull::new(s as *mut StringValue) {
        gc::release(StringObject::from_instance_ptr(value).cast());
    }
}
