//! Object header - the prologue of every reference-counted allocation
//!
//! Design: two machine words, C-compatible, read and written in place by
//! generated code. All count updates are atomic.

use core::ptr;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::layout::{struct_layout, StructLayout};

/// Type-specific teardown, called once when the count reaches zero.
///
/// Receives the object itself. It must release whatever the object owns but
/// must not free the object's own storage; the refcount engine does that.
pub type Destructor = unsafe extern "C" fn(obj: *mut ObjectHeader);

/// Object header (16 bytes on 64-bit)
///
/// ```text
/// offset  field  (64-bit)
///      0  refc   size_t, atomic
///      8  dtor   void (*)(void*)
/// ```
#[repr(C)]
pub struct ObjectHeader {
    pub(crate) refc: AtomicUsize,
    pub(crate) dtor: Destructor,
}

impl ObjectHeader {
    /// Header for a new object: one reference, owned by the creator
    #[inline]
    pub const fn new(dtor: Destructor) -> Self {
        Self {
            refc: AtomicUsize::new(1),
            dtor,
        }
    }

    /// Header whose destructor runs `T`'s drop glue. `T` must start with
    /// this header (see `HeapObject`).
    #[inline]
    pub fn for_type<T>() -> Self {
        Self::new(drop_glue::<T>)
    }

    /// Header for objects that own nothing
    #[inline]
    pub const fn trivial() -> Self {
        Self::new(no_op_destructor)
    }

    /// Current count. Only a snapshot when other threads hold references.
    #[inline]
    pub fn ref_count(&self) -> usize {
        self.refc.load(Ordering::Acquire)
    }

    #[inline]
    pub fn destructor(&self) -> Destructor {
        self.dtor
    }
}

impl fmt::Debug for ObjectHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHeader")
            .field("refc", &self.ref_count())
            .field("dtor", &(self.dtor as *const ()))
            .finish()
    }
}

pub(crate) fn layout() -> StructLayout {
    struct_layout!(ObjectHeader as "beagle_object_header" {
        "refc" => refc: "size_t",
        "dtor" => dtor: "beagle_dtor_fn",
    })
}

unsafe extern "C" fn drop_glue<T>(obj: *mut ObjectHeader) {
    ptr::drop_in_place(obj as *mut T);
}

/// Destructor for objects with nothing to release
pub unsafe extern "C" fn no_op_destructor(_obj: *mut ObjectHeader) {}
