//! Type identity - C API

use core::ffi::c_char;
use core::ptr;

use crate::types::{is_instance_of, TypeInfo};

/// True if `candidate` is `type_info` or derives from it. False if either
/// is null.
///
/// # Safety
/// Non-null arguments must point to live descriptors.
#[no_mangle]
pub unsafe extern "C" fn beagle_is_instance_of(type_info: *const TypeInfo, candidate: *const TypeInfo) -> bool {
    match (type_info.as_ref(), candidate.as_ref()) {
        (Some(type_info), Some(candidate)) => is_instance_of(type_info, candidate),
        _ => false,
    }
}

/// NUL-terminated UTF-8 name, null for null
///
/// # Safety
/// `type_info` must be null or a live descriptor.
#[no_mangle]
pub unsafe extern "C" fn beagle_type_name_u8(type_info: *const TypeInfo) -> *const c_char {
    match type_info.as_ref() {
        Some(info) => info.name_cstr().as_ptr(),
        None => ptr::null(),
    }
}

/// NUL-terminated UTF-16 name, null for null
///
/// # Safety
/// `type_info` must be null or a live descriptor.
#[no_mangle]
pub unsafe extern "C" fn beagle_type_name_u16(type_info: *const TypeInfo) -> *const u16 {
    match type_info.as_ref() {
        Some(info) => info.name_utf16().as_ptr(),
        None => ptr::null(),
    }
}
