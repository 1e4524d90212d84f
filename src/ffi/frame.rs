//! Call frames - C API
//!
//! Generated code owns its frame records (usually on its own stack) and
//! links them in on function entry.

use core::ffi::c_char;
use core::ptr::NonNull;
use std::io::Write;

use crate::frames::{self, FrameRecord};

/// Link `record` as the new top frame of this thread. `record->size` is left
/// as the caller set it. No-op for null.
///
/// # Safety
/// `record` must stay valid and unmoved until `beagle_frame_leave`, on this
/// thread. The names must be NUL-terminated (or null) and outlive the frame.
#[no_mangle]
pub unsafe extern "C" fn beagle_frame_enter(
    record: *mut FrameRecord,
    function: *const c_char,
    file_name: *const c_char,
    line: u32,
) {
    if let Some(record) = NonNull::new(record) {
        frames::push_record(record, function, file_name, line);
    }
}

/// Set the line of this thread's top frame
#[no_mangle]
pub extern "C" fn beagle_frame_line(line: u32) {
    frames::update_line(line);
}

/// Unlink `record`, which must be the top frame. A null record pops
/// whatever is on top. Popping an empty stack or out of order is fatal.
///
/// # Safety
/// `record` must be null or linked by `beagle_frame_enter` on this thread.
#[no_mangle]
pub unsafe extern "C" fn beagle_frame_leave(record: *mut FrameRecord) {
    match NonNull::new(record) {
        Some(record) => frames::pop_record(record),
        None => frames::pop(),
    }
}

/// Write this thread's backtrace to stderr
#[no_mangle]
pub extern "C" fn beagle_backtrace_print() {
    let trace = frames::capture();
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "backtrace (most recent call first):");
    let _ = write!(stderr, "{}", trace);
    let _ = stderr.flush();
}
