//! Reference counted handle
//!
//! An owned reference to a heap object. Cloning is an acquire, dropping is a
//! release; nothing else touches the count, so every acquire/release site is
//! a visible `clone()` or end of scope.

use core::marker::PhantomData;
use core::ops::Deref;
use core::ptr::NonNull;
use std::fmt;

use crate::allocator::{self, ObjectHeader, MALLOC_ALIGN};

/// A value that lives behind an `ObjectHeader`.
///
/// # Safety
/// Implementors must be `#[repr(C)]` with an `ObjectHeader` as their first
/// field, and that header's destructor must be `ObjectHeader::for_type::<Self>()`
/// or otherwise release exactly what `Self` owns.
pub unsafe trait HeapObject: Sized {
    #[inline]
    fn header(&self) -> &ObjectHeader {
        // SAFETY: the header is the first field of a repr(C) struct
        unsafe { &*(self as *const Self as *const ObjectHeader) }
    }
}

pub struct Handle<T: HeapObject> {
    ptr: NonNull<T>,
    _marker: PhantomData<T>,
}

struct AlignCheck<T>(PhantomData<T>);

impl<T> AlignCheck<T> {
    const OK: () = assert!(
        core::mem::align_of::<T>() <= MALLOC_ALIGN,
        "heap objects cannot be more aligned than the C allocator guarantees"
    );
}

impl<T: HeapObject> Handle<T> {
    /// Move `value` to the heap. The returned handle owns its only reference.
    pub fn new(value: T) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = AlignCheck::<T>::OK;
        debug_assert_eq!(value.header().ref_count(), 1, "new objects start with one reference");

        let ptr = allocator::allocate(core::mem::size_of::<T>()).cast::<T>();
        unsafe {
            ptr.as_ptr().write(value);
        }

        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    /// Adopt a reference without touching the count
    ///
    /// # Safety
    /// `ptr` must point to a live `T` allocated by the runtime allocator, and
    /// the caller must be transferring a reference it owns.
    #[inline]
    pub unsafe fn from_raw(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    /// Acquire a new reference to an object the caller can see but does not
    /// own a reference to (e.g. an argument borrowed from generated code)
    ///
    /// # Safety
    /// `ptr` must point to a live `T` allocated by the runtime allocator.
    #[inline]
    pub unsafe fn acquire_raw(ptr: NonNull<T>) -> Self {
        super::acquire(ptr.cast());
        Self::from_raw(ptr)
    }

    /// Give up this handle without releasing its reference
    #[inline]
    pub fn into_raw(self) -> NonNull<T> {
        let ptr = self.ptr;
        core::mem::forget(self);
        ptr
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn header_ptr(&self) -> NonNull<ObjectHeader> {
        self.ptr.cast()
    }

    /// Current count. Only a snapshot when other threads hold references.
    #[inline]
    pub fn ref_count(&self) -> usize {
        (**self).header().ref_count()
    }

    /// True if both handles refer to the same object
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        a.ptr == b.ptr
    }
}

impl<T: HeapObject> Clone for Handle<T> {
    #[inline]
    fn clone(&self) -> Self {
        unsafe {
            super::acquire(self.header_ptr());
        }
        Self {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }
}

impl<T: HeapObject> Drop for Handle<T> {
    #[inline]
    fn drop(&mut self) {
        unsafe {
            super::release(self.header_ptr());
        }
    }
}

impl<T: HeapObject> Deref for Handle<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: HeapObject + fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

// Counting is atomic; sharing the pointee follows the usual Arc rules
unsafe impl<T: HeapObject + Send + Sync> Send for Handle<T> {}
unsafe impl<T: HeapObject + Send + Sync> Sync for Handle<T> {}
