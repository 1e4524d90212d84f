//! Reference counting engine
//!
//! Design: atomic count in the object header, destructor-then-free on the
//! zero crossing, run synchronously on the releasing thread.
//!
//! Teardown is iterative. While one thread is destroying an object, every
//! further object whose count reaches zero on that thread (typically because
//! the destructor released what it owned) is queued instead of destroyed
//! recursively, and the outermost release drains the queue before returning.
//! A million-element owned list is torn down with constant stack depth.

mod refcount;


pub use refcount::{Handle, HeapObject};

use core::ptr::NonNull;
use std::cell::{Cell, RefCell};
use std::sync::atomic::{fence, Ordering};

use crate::allocator::{self, ObjectHeader};
use crate::error::{fatal, RuntimeError};
use crate::logging::log_destroy;

/// Counts above this are treated as a leak of references rather than
/// silently wrapping.
const MAX_REFCOUNT: usize = isize::MAX as usize;

thread_local! {
    static DRAINING: Cell<bool> = const { Cell::new(false) };
    static PENDING: RefCell<Vec<NonNull<ObjectHeader>>> = const { RefCell::new(Vec::new()) };
}

/// Add a reference.
///
/// # Safety
/// `obj` must point to a live object; the caller must already hold one of
/// its references.
#[inline]
pub unsafe fn acquire(obj: NonNull<ObjectHeader>) {
    let old = obj.as_ref().refc.fetch_add(1, Ordering::Relaxed);

    if old == 0 {
        fatal(RuntimeError::AcquireAfterRelease { address: obj.as_ptr() as usize });
    }
    if old > MAX_REFCOUNT {
        fatal(RuntimeError::RefCountOverflow { address: obj.as_ptr() as usize });
    }
}

/// Drop a reference, destroying the object when it was the last one.
///
/// Returns true if this call crossed zero. An outermost release has fully
/// reclaimed the object (and anything its destructor released) by the time
/// it returns. A release made from inside a destructor only queues the
/// object; the outermost release on the same thread reclaims it before
/// returning.
///
/// # Safety
/// `obj` must point to a live object and the caller must own the reference
/// being released. A release with no matching reference aborts the process.
#[inline]
pub unsafe fn release(obj: NonNull<ObjectHeader>) -> bool {
    let old = obj.as_ref().refc.fetch_sub(1, Ordering::Release);

    if old == 1 {
        // Synchronize with every earlier release from other threads
        fence(Ordering::Acquire);
        destroy(obj);
        return true;
    }
    if old == 0 {
        fatal(RuntimeError::RefCountUnderflow { address: obj.as_ptr() as usize });
    }
    false
}

/// Current count of `obj`
///
/// # Safety
/// `obj` must point to a live object.
#[inline]
pub unsafe fn ref_count(obj: NonNull<ObjectHeader>) -> usize {
    obj.as_ref().ref_count()
}

/// Destroy an object whose count reached zero (cold path)
#[cold]
#[inline(never)]
unsafe fn destroy(obj: NonNull<ObjectHeader>) {
    if DRAINING.with(|draining| draining.replace(true)) {
        // PENDING is gone while thread-locals are destroyed at thread exit;
        // tear down directly there
        if PENDING.try_with(|pending| pending.borrow_mut().push(obj)).is_err() {
            finalize(obj);
        }
        return;
    }

    let _draining = DrainGuard;
    let mut next = Some(obj);
    while let Some(obj) = next {
        finalize(obj);
        next = PENDING
            .try_with(|pending| pending.borrow_mut().pop())
            .ok()
            .flatten();
    }
}

/// Run the destructor, then reclaim the storage
unsafe fn finalize(obj: NonNull<ObjectHeader>) {
    let dtor = obj.as_ref().dtor;
    dtor(obj.as_ptr());
    log_destroy(obj.as_ptr() as *const u8);
    allocator::free(obj.cast());
}

/// Clears the draining flag even if a destructor unwinds
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        let _ = DRAINING.try_with(|draining| draining.set(false));
    }
}
