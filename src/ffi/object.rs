//! Objects and reference counting - C API
//!
//! Hot path. `obj` is the start of the object, where its `ObjectHeader`
//! lives.

use core::ffi::c_void;
use core::ptr::NonNull;

use crate::allocator::{self, no_op_destructor, Destructor, ObjectHeader};
use crate::gc;

/// Allocate a `size`-byte object with one reference. The header is
/// initialized; the rest is left for the caller. A null `dtor` means the
/// object owns nothing.
#[no_mangle]
pub extern "C" fn beagle_object_new(size: usize, dtor: Option<Destructor>) -> *mut c_void {
    let header = allocator::alloc_object(size, dtor.unwrap_or(no_op_destructor));
    header.as_ptr() as *mut c_void
}

/// Add a reference (no-op for null)
///
/// # Safety
/// `obj` must be null or a live object whose reference the caller holds.
#[no_mangle]
pub unsafe extern "C" fn beagle_acquire(obj: *mut c_void) {
    if let Some(obj) = NonNull::new(obj as *mut ObjectHeader) {
        gc::acquire(obj);
    }
}

/// Drop a reference, destroying the object on the last one (no-op for null)
///
/// # Safety
/// `obj` must be null or a live object; the caller gives up one reference.
#[no_mangle]
pub unsafe extern "C" fn beagle_release(obj: *mut c_void) {
    if let Some(obj) = NonNull::new(obj as *mut ObjectHeader) {
        gc::release(obj);
    }
}

/// Current count, 0 for null (debugging and tests)
///
/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn beagle_refcount(obj: *const c_void) -> usize {
    match NonNull::new(obj as *mut ObjectHeader) {
        Some(obj) => gc::ref_count(obj),
        None => 0,
    }
}

