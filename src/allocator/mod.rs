//! Memory allocator - the C heap shared with generated code
//!
//! Design: objects are allocated and freed through the C allocator so that
//! storage obtained by generated code (`malloc`) and by the runtime can be
//! reclaimed by either side. Allocation failure is never handed back to a
//! caller as a null object: it terminates the process with a diagnostic.

pub(crate) mod header;


pub use header::{no_op_destructor, Destructor, ObjectHeader};

use core::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{fatal, Result, RuntimeError};
use crate::logging::{log_allocation, log_deallocation};

/// Alignment every allocation is guaranteed to have
pub const MALLOC_ALIGN: usize = 2 * core::mem::size_of::<usize>();

static ALLOCATIONS: AtomicUsize = AtomicUsize::new(0);
static FREES: AtomicUsize = AtomicUsize::new(0);

/// Allocate `size` bytes, reporting exhaustion as an error
pub fn try_allocate(size: usize) -> Result<NonNull<u8>> {
    // malloc(0) may legally return null
    let ptr = unsafe { libc::malloc(size.max(1)) } as *mut u8;
    match NonNull::new(ptr) {
        Some(ptr) => {
            ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
            log_allocation(size, ptr.as_ptr());
            Ok(ptr)
        }
        None => Err(RuntimeError::OutOfMemory { requested: size }),
    }
}

/// Allocate `size` bytes; exhaustion is fatal
#[inline]
pub fn allocate(size: usize) -> NonNull<u8> {
    match try_allocate(size) {
        Ok(ptr) => ptr,
        Err(err) => fatal(err),
    }
}

/// Return storage obtained from `allocate`
///
/// # Safety
/// `ptr` must come from `allocate`/`try_allocate` (or the C allocator) and
/// must not be used afterwards.
pub unsafe fn free(ptr: NonNull<u8>) {
    log_deallocation(ptr.as_ptr());
    FREES.fetch_add(1, Ordering::Relaxed);
    libc::free(ptr.as_ptr() as *mut libc::c_void);
}

/// Allocate `size` bytes for an object and initialize its header with one
/// reference and `dtor`. The rest of the storage is left uninitialized.
pub fn alloc_object(size: usize, dtor: Destructor) -> NonNull<ObjectHeader> {
    let size = size.max(core::mem::size_of::<ObjectHeader>());
    let header = allocate(size).cast::<ObjectHeader>();
    unsafe {
        header.as_ptr().write(ObjectHeader::new(dtor));
    }
    header
}

/// Allocator statistics for monitoring and debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorStats {
    pub allocations: usize,
    pub frees: usize,
}

impl AllocatorStats {
    /// Allocations not yet freed
    pub fn live(&self) -> usize {
        self.allocations.saturating_sub(self.frees)
    }
}

pub fn stats() -> AllocatorStats {
    AllocatorStats {
        allocations: ALLOCATIONS.load(Ordering::Relaxed),
        frees: FREES.load(Ordering::Relaxed),
    }
}
