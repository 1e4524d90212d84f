//! Stack walking and backtraces

use core::marker::PhantomData;
use std::ffi::CStr;
use std::fmt;

use super::FrameRecord;
use crate::config;

/// One frame seen during a walk
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo<'a> {
    pub function: &'a CStr,
    pub file: &'a CStr,
    pub line: u32,
    pub depth: u32,
}

/// Lazy walk from the top frame to the root.
///
/// Yields at most `depth + 1` frames of the frame it started from, so it
/// terminates even if a caller-owned record was corrupted.
pub struct FrameIter<'a> {
    next: *const FrameRecord,
    remaining: u32,
    _marker: PhantomData<&'a FrameRecord>,
}

impl<'a> Iterator for FrameIter<'a> {
    type Item = FrameInfo<'a>;

    fn next(&mut self) -> Option<FrameInfo<'a>> {
        if self.remaining == 0 {
            return None;
        }
        // SAFETY: frames visible to `walk` stay linked (and valid) until it
        // returns; popping them is fatal
        let record = unsafe { self.next.as_ref()? };
        self.remaining -= 1;
        self.next = record.prev;

        Some(FrameInfo {
            function: record.function(),
            file: record.file_name(),
            line: record.line,
            depth: record.depth,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let upper = if self.next.is_null() { 0 } else { self.remaining as usize };
        (0, Some(upper))
    }
}

impl std::iter::FusedIterator for FrameIter<'_> {}

/// Walk this thread's frames, most recent first.
///
/// `f` may push frames and pop the ones it pushed; those are not visited.
/// Popping a frame that was already on the stack when the walk started is
/// fatal.
pub fn walk<R>(f: impl FnOnce(FrameIter<'_>) -> R) -> R {
    let top = super::top_ptr();
    let top_depth = unsafe { top.as_ref() }.map(|top| top.depth);
    let remaining = top_depth.map_or(0, |depth| depth.saturating_add(1));

    let _restore = RestoreWalkFloor(super::raise_walk_floor(top_depth));

    f(FrameIter {
        next: top,
        remaining,
        _marker: PhantomData,
    })
}

struct RestoreWalkFloor(Option<u32>);

impl Drop for RestoreWalkFloor {
    fn drop(&mut self) {
        super::restore_walk_floor(self.0);
    }
}

/// Owned copy of one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub function: String,
    pub file: String,
    pub line: u32,
    pub depth: u32,
}

impl From<FrameInfo<'_>> for TraceEntry {
    fn from(info: FrameInfo<'_>) -> Self {
        Self {
            function: info.function.to_string_lossy().into_owned(),
            file: info.file.to_string_lossy().into_owned(),
            line: info.line,
            depth: info.depth,
        }
    }
}

/// Snapshot of a thread's frames, most recent first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backtrace {
    entries: Vec<TraceEntry>,
}

impl Backtrace {
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn functions(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.function.as_str()).collect()
    }
}

/// Capture this thread's frames
pub fn capture() -> Backtrace {
    walk(|frames| Backtrace {
        entries: frames.map(TraceEntry::from).collect(),
    })
}

impl fmt::Display for Backtrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = config::get().limits.max_trace_frames;
        for entry in self.entries.iter().take(shown) {
            writeln!(f, "  #{} {} at {}:{}", entry.depth, entry.function, entry.file, entry.line)?;
        }
        if self.entries.len() > shown {
            writeln!(f, "  ... {} more frames", self.entries.len() - shown)?;
        }
        Ok(())
    }
}
