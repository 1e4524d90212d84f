//! C API tests, driven through the exported functions

use super::*;
use core::ffi::c_void;
use core::ptr;
use std::ffi::CStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::allocator::ObjectHeader;
use crate::builtins::string_type_info;
use crate::frames::FrameRecord;
use crate::types::TypeInfo;

static DESTROYED: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn count_destroy(_obj: *mut ObjectHeader) {
    DESTROYED.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn object_lifecycle() {
    let before = DESTROYED.load(Ordering::SeqCst);
    let obj = beagle_object_new(32, Some(count_destroy));

    unsafe {
        assert_eq!(beagle_refcount(obj), 1);
        beagle_acquire(obj);
        assert_eq!(beagle_refcount(obj), 2);

        beagle_release(obj);
        assert_eq!(DESTROYED.load(Ordering::SeqCst), before);
        beagle_release(obj);
    }
    assert_eq!(DESTROYED.load(Ordering::SeqCst), before + 1);
}

#[test]
fn objects_without_destructor() {
    let obj = beagle_object_new(0, None);
    unsafe {
        assert_eq!(beagle_refcount(obj), 1);
        beagle_release(obj);
    }
}

#[test]
fn null_is_tolerated() {
    unsafe {
        beagle_acquire(ptr::null_mut::<c_void>());
        beagle_release(ptr::null_mut::<c_void>());
        assert_eq!(beagle_refcount(ptr::null()), 0);

        assert!(!beagle_is_instance_of(ptr::null(), string_type_info()));
        assert!(beagle_type_name_u8(ptr::null()).is_null());
        assert!(beagle_type_name_u16(ptr::null()).is_null());

        assert_eq!(beagle_string_length(ptr::null()), 0);
        assert!(beagle_string_content(ptr::null()).is_null());
        beagle_string_acquire(ptr::null());
        beagle_string_release(ptr::null());

        beagle_frame_enter(ptr::null_mut(), ptr::null(), ptr::null(), 0);
    }
    assert!(crate::frames::is_empty());
}

#[test]
fn type_queries() {
    static BASE: TypeInfo = TypeInfo::root(crate::type_name!("base"), 8, 0);
    static DERIVED: TypeInfo = TypeInfo::derived(&BASE, crate::type_name!("derivé"), 16, 0);

    unsafe {
        assert!(beagle_is_instance_of(&BASE, &DERIVED));
        assert!(!beagle_is_instance_of(&DERIVED, &BASE));

        let utf8 = CStr::from_ptr(beagle_type_name_u8(&DERIVED));
        assert_eq!(utf8.to_str().unwrap(), "derivé");

        let utf16 = beagle_type_name_u16(&DERIVED);
        let units: Vec<u16> = (0..).map(|i| *utf16.add(i)).take_while(|&u| u != 0).collect();
        assert_eq!(String::from_utf16(&units).unwrap(), "derivé");
    }
}

#[test]
fn string_round_trip() {
    let bytes = b"from C";
    unsafe {
        let s = beagle_string_new(bytes.as_ptr(), bytes.len());
        assert!(!s.is_null());
        assert!(ptr::eq((*s).string_type(), beagle_string_type()));
        assert_eq!(beagle_string_length(s), 6);

        let content = core::slice::from_raw_parts(beagle_string_content(s) as *const u8, 6);
        assert_eq!(content, bytes);

        beagle_string_acquire(s);
        let object = StringObjectRef::of(s);
        assert_eq!(object.count(), 2);
        beagle_string_release(s);
        assert_eq!(object.count(), 1);
        beagle_string_release(s);
    }
}

#[test]
fn string_new_edge_cases() {
    unsafe {
        let empty = beagle_string_new(ptr::null(), 0);
        assert!(!empty.is_null());
        assert_eq!(beagle_string_length(empty), 0);
        beagle_string_release(empty);

        assert!(beagle_string_new(ptr::null(), 4).is_null());
    }
}

#[test]
fn frames_enter_and_leave() {
    let mut outer = FrameRecord::empty();
    let mut inner = FrameRecord::empty();

    unsafe {
        beagle_frame_enter(&mut outer, c"main".as_ptr(), c"prog.bgl".as_ptr(), 1);
        beagle_frame_enter(&mut inner, c"helper".as_ptr(), c"prog.bgl".as_ptr(), 10);
        beagle_frame_line(14);

        assert_eq!(inner.depth(), 1);
        assert_eq!(inner.line(), 14);
        assert_eq!(crate::frames::capture().functions(), ["helper", "main"]);
        beagle_backtrace_print();

        beagle_frame_leave(&mut inner);
        beagle_frame_leave(ptr::null_mut());
    }
    assert!(crate::frames::is_empty());
}

/// Reads the count of the object enclosing a string instance
struct StringObjectRef(ptr::NonNull<ObjectHeader>);

impl StringObjectRef {
    unsafe fn of(s: *const crate::builtins::StringValue) -> Self {
        let value = ptr::NonNull::new(s as *mut crate::builtins::StringValue).unwrap();
        Self(crate::builtins::StringObject::from_instance_ptr(value).cast())
    }

    fn count(&self) -> usize {
        unsafe { crate::gc::ref_count(self.0) }
    }
}
