//! Call-frame stack - per-thread diagnostic frames for backtraces
//!
//! Design: an intrusive singly linked stack. Each thread has its own top
//! pointer; frames link to their caller through `prev`. Frames are either
//! owned by Rust code through a `FrameGuard` or owned by generated code and
//! linked in through the C API. Both share the same chain.
//!
//! Ordering is strictly LIFO. Popping anything but the top frame, or popping
//! an empty stack, is fatal.

mod trace;

#[cfg(test)]
mod tests;

pub use trace::{capture, walk, Backtrace, FrameInfo, FrameIter, TraceEntry};

use core::marker::PhantomData;
use core::ptr::{self, NonNull};
use std::cell::Cell;
use std::ffi::{c_char, CStr};

use crate::config;
use crate::error::{fatal, RuntimeError};
use crate::layout::{struct_layout, StructLayout};
use crate::logging::{log_frame_pop, log_frame_push};

/// Frame record (C layout, shared with generated code)
///
/// ```text
/// offset  field      (64-bit)
///      0  prev       FrameRecord*   (NULL at the outermost frame)
///      8  function   const char*
///     16  file_name  const char*
///     24  line       uint32_t
///     28  depth      uint32_t
///     32  size       uint32_t       (payload bytes)
/// ```
///
/// The payload is not stored inline: Rust-owned frames keep it in a
/// separately allocated buffer next to the record (see `Frame`).
#[repr(C)]
#[derive(Debug)]
pub struct FrameRecord {
    prev: *mut FrameRecord,
    function: *const c_char,
    file_name: *const c_char,
    line: u32,
    depth: u32,
    size: u32,
}

impl FrameRecord {
    /// An unlinked record. `push_record` fills in the rest.
    pub const fn empty() -> Self {
        Self {
            prev: ptr::null_mut(),
            function: ptr::null(),
            file_name: ptr::null(),
            line: 0,
            depth: 0,
            size: 0,
        }
    }

    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn function(&self) -> &CStr {
        cstr_or_unknown(self.function)
    }

    pub fn file_name(&self) -> &CStr {
        cstr_or_unknown(self.file_name)
    }
}

pub(crate) fn layout() -> StructLayout {
    struct_layout!(FrameRecord as "beagle_frame" {
        "prev" => prev: "struct beagle_frame*",
        "function" => function: "const char*",
        "fileName" => file_name: "const char*",
        "line" => line: "uint32_t",
        "depth" => depth: "uint32_t",
        "size" => size: "uint32_t",
    })
}

fn cstr_or_unknown<'a>(ptr: *const c_char) -> &'a CStr {
    if ptr.is_null() {
        c"<unknown>"
    } else {
        // SAFETY: frame names are NUL-terminated and outlive the frame
        unsafe { CStr::from_ptr(ptr) }
    }
}

/// A Rust-owned frame: the shared record plus its payload buffer
#[repr(C)]
pub struct Frame {
    record: FrameRecord,
    payload: Box<[u8]>,
}

thread_local! {
    static TOP: Cell<*mut FrameRecord> = const { Cell::new(ptr::null_mut()) };
    /// Depth of the deepest frame an active walk can reach
    static WALK_FLOOR: Cell<Option<u32>> = const { Cell::new(None) };
}

/// Link a record as the new top of this thread's stack.
///
/// Sets `prev`, `depth`, the names and the line. Leaves `size` as the caller
/// set it.
///
/// # Safety
/// `record` must stay valid and unmoved until it is popped, and must be
/// popped on this thread.
pub unsafe fn push_record(
    record: NonNull<FrameRecord>,
    function: *const c_char,
    file_name: *const c_char,
    line: u32,
) {
    let prev = TOP.with(Cell::get);
    let depth = match prev.as_ref() {
        Some(prev) => prev.depth + 1,
        None => 0,
    };

    let limit = config::get().limits.max_frame_depth;
    if depth >= limit {
        fatal(RuntimeError::FrameOverflow { limit: limit as usize });
    }

    let rec = record.as_ptr();
    (*rec).prev = prev;
    (*rec).function = function;
    (*rec).file_name = file_name;
    (*rec).line = line;
    (*rec).depth = depth;

    TOP.with(|top| top.set(rec));
    log_frame_push(&(*rec).function().to_string_lossy(), depth);
}

/// Unlink `record`, which must be the current top.
///
/// # Safety
/// `record` must have been linked with `push_record` on this thread and not
/// yet popped.
pub unsafe fn pop_record(record: NonNull<FrameRecord>) {
    let top = checked_top();
    if top != record.as_ptr() {
        fatal(RuntimeError::FrameOrderViolation {
            expected: (*top).function().to_string_lossy().into_owned(),
            found: record.as_ref().function().to_string_lossy().into_owned(),
        });
    }
    unlink(top);
}

/// Unlink whatever frame is on top.
///
/// # Safety
/// The top frame must be caller-owned (not held by a `FrameGuard`, whose
/// drop would then find itself out of order).
pub unsafe fn pop() {
    let top = checked_top();
    unlink(top);
}

unsafe fn checked_top() -> *mut FrameRecord {
    let top = TOP.with(Cell::get);
    if top.is_null() {
        fatal(RuntimeError::FrameUnderflow {
            thread: std::thread::current().name().unwrap_or("<unnamed>").to_string(),
        });
    }

    // Frames pushed after a walk started are not visible to it
    if WALK_FLOOR.with(Cell::get).is_some_and(|floor| (*top).depth <= floor) {
        fatal(RuntimeError::FramePopDuringWalk);
    }
    top
}

unsafe fn unlink(top: *mut FrameRecord) {
    log_frame_pop(&(*top).function().to_string_lossy(), (*top).depth);
    TOP.with(|cell| cell.set((*top).prev));
}

/// Update the line of the frame on top of this thread's stack. No-op when
/// the stack is empty.
#[inline]
pub fn update_line(line: u32) {
    let top = TOP.with(Cell::get);
    if !top.is_null() {
        // SAFETY: linked frames stay valid until popped, on this thread
        unsafe { (*top).line = line };
    }
}

/// Depth of the top frame, `None` when the stack is empty
pub fn current_depth() -> Option<u32> {
    let top = TOP.with(Cell::get);
    // SAFETY: linked frames stay valid until popped, on this thread
    unsafe { top.as_ref().map(|frame| frame.depth) }
}

pub fn is_empty() -> bool {
    TOP.with(Cell::get).is_null()
}

pub(crate) fn top_ptr() -> *const FrameRecord {
    TOP.with(Cell::get)
}

/// Protect every frame at or below `depth` from popping. Returns the
/// previous floor for the caller to restore.
pub(crate) fn raise_walk_floor(depth: Option<u32>) -> Option<u32> {
    WALK_FLOOR.with(|cell| {
        let previous = cell.get();
        cell.set(previous.max(depth));
        previous
    })
}

pub(crate) fn restore_walk_floor(previous: Option<u32>) {
    WALK_FLOOR.with(|cell| cell.set(previous));
}

/// Push a frame with no payload
pub fn push(function: &'static CStr, file_name: &'static CStr, line: u32) -> FrameGuard {
    push_with_payload(function, file_name, line, 0)
}

/// Push a frame carrying `payload_size` zeroed bytes of frame-local data
pub fn push_with_payload(
    function: &'static CStr,
    file_name: &'static CStr,
    line: u32,
    payload_size: u32,
) -> FrameGuard {
    let frame = Box::new(Frame {
        record: FrameRecord {
            size: payload_size,
            ..FrameRecord::empty()
        },
        payload: vec![0u8; payload_size as usize].into_boxed_slice(),
    });
    let frame = NonNull::from(Box::leak(frame));

    unsafe {
        push_record(frame.cast(), function.as_ptr(), file_name.as_ptr(), line);
    }

    FrameGuard {
        frame,
        _not_send: PhantomData,
    }
}

/// Owns a pushed frame; pops it when dropped.
///
/// Not `Send`: a frame must be popped on the thread that pushed it.
///
/// Guards must be dropped in reverse push order. A `Vec<FrameGuard>` drops
/// its elements front to back, which pops the oldest frame first and is
/// fatal; drain it in reverse instead:
///
/// ```
/// let guards: Vec<_> = (0..3).map(|line| beagle::frames::push(c"step", c"s.bgl", line)).collect();
/// for guard in guards.into_iter().rev() {
///     drop(guard);
/// }
/// assert!(beagle::frames::is_empty());
/// ```
pub struct FrameGuard {
    frame: NonNull<Frame>,
    _not_send: PhantomData<*mut ()>,
}

impl FrameGuard {
    #[inline]
    fn record(&self) -> &FrameRecord {
        unsafe { &self.frame.as_ref().record }
    }

    /// Record the line execution has reached in this frame
    #[inline]
    pub fn set_line(&self, line: u32) {
        unsafe {
            (*self.frame.as_ptr()).record.line = line;
        }
    }

    #[inline]
    pub fn line(&self) -> u32 {
        self.record().line
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.record().depth
    }

    pub fn function(&self) -> &CStr {
        self.record().function()
    }

    pub fn file_name(&self) -> &CStr {
        self.record().file_name()
    }

    pub fn payload(&self) -> &[u8] {
        unsafe { &self.frame.as_ref().payload }
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        unsafe { &mut (*self.frame.as_ptr()).payload }
    }

    pub fn record_ptr(&self) -> *const FrameRecord {
        self.frame.as_ptr() as *const FrameRecord
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        unsafe {
            pop_record(self.frame.cast());
            drop(Box::from_raw(self.frame.as_ptr()));
        }
    }
}

pub const fn static_cstr(s: &'static str) -> &'static CStr {
    match CStr::from_bytes_with_nul(s.as_bytes()) {
        Ok(s) => s,
        Err(_) => panic!("frame names must not contain NUL"),
    }
}

/// Push a frame named `$function` at the current file and line.
///
/// ```
/// let frame = beagle::enter_frame!("main");
/// assert_eq!(frame.depth(), 0);
/// ```
#[macro_export]
macro_rules! enter_frame {
    ($function:literal) => {{
        const FUNCTION: &::std::ffi::CStr = $crate::frames::static_cstr(concat!($function, "\0"));
        const FILE: &::std::ffi::CStr = $crate::frames::static_cstr(concat!(file!(), "\0"));
        $crate::frames::push(FUNCTION, FILE, line!())
    }};
}

/// Set a frame's line to the line of this macro call
#[macro_export]
macro_rules! track_line {
    ($frame:expr) => {
        $frame.set_line(line!())
    };
}
