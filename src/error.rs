//! Runtime errors and the process-fatal exit path
//!
//! Recoverable failures (configuration, descriptor construction, oversized
//! strings) come back as `RuntimeError`. Broken ownership or frame ordering
//! cannot be recovered from, so those go through `fatal`, which reports and
//! aborts.

use std::io::{self, Write};

use once_cell::sync::OnceCell;
use thiserror::Error;

use crate::frames;
use crate::logging::log_fatal;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("out of memory: failed to allocate {requested} bytes")]
    OutOfMemory { requested: usize },

    #[error("reference count underflow on object {address:#x}: released more often than acquired")]
    RefCountUnderflow { address: usize },

    #[error("reference count overflow on object {address:#x}: references are leaking")]
    RefCountOverflow { address: usize },

    #[error("acquire of object {address:#x} whose reference count already reached zero")]
    AcquireAfterRelease { address: usize },

    #[error("type chain of '{name}' exceeds {limit} levels (cycle or runaway inheritance)")]
    TypeChainTooDeep { name: String, limit: usize },

    #[error("invalid type name '{name}': names may not contain NUL")]
    InvalidTypeName { name: String },

    #[error("type '{name}' is already registered with a different descriptor")]
    DuplicateType { name: String },

    #[error("frame pop on thread '{thread}' with an empty call stack")]
    FrameUnderflow { thread: String },

    #[error("frame '{found}' popped while '{expected}' is on top of the call stack")]
    FrameOrderViolation { expected: String, found: String },

    #[error("frame popped while the call stack is being walked")]
    FramePopDuringWalk,

    #[error("call stack exceeded {limit} frames")]
    FrameOverflow { limit: usize },

    #[error("string of {length} bytes exceeds the maximum length of {max}")]
    StringTooLong { length: usize, max: usize },

    #[error("content range {start}..{end} is outside a buffer of {len} bytes")]
    ContentOutOfBounds { start: usize, end: usize, len: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<toml::de::Error> for RuntimeError {
    fn from(err: toml::de::Error) -> Self {
        RuntimeError::Config(err.to_string())
    }
}

/// Hook run by `fatal` after the report is written and before the abort
pub type FatalHook = fn(&RuntimeError);

static FATAL_HOOK: OnceCell<FatalHook> = OnceCell::new();

/// Install the fatal hook. Only the first installation takes effect.
pub fn set_fatal_hook(hook: FatalHook) -> bool {
    FATAL_HOOK.set(hook).is_ok()
}

/// Report an unrecoverable runtime condition and abort the process.
///
/// Writes the error and the current thread's backtrace to stderr. Never
/// unwinds: continuing after a corrupted refcount or frame chain would only
/// move the damage somewhere harder to diagnose.
#[cold]
#[inline(never)]
pub fn fatal(err: RuntimeError) -> ! {
    log_fatal(&err);

    let trace = frames::capture();
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "beagle: fatal runtime error: {}", err);
    if !trace.is_empty() {
        let _ = writeln!(stderr, "backtrace (most recent call first):");
        let _ = write!(stderr, "{}", trace);
    }
    let _ = stderr.flush();
    drop(stderr);

    if let Some(hook) = FATAL_HOOK.get() {
        hook(&err);
    }

    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = RuntimeError::RefCountUnderflow { address: 0x1000 };
        assert!(err.to_string().contains("0x1000"));

        let err = RuntimeError::RefCountOverflow { address: 0x2000 };
        assert!(err.to_string().starts_with("reference count overflow on object 0x2000"));

        let err = RuntimeError::FrameOrderViolation {
            expected: "inner".into(),
            found: "outer".into(),
        };
        assert_eq!(
            err.to_string(),
            "frame 'outer' popped while 'inner' is on top of the call stack"
        );
    }

    #[test]
    fn toml_errors_become_config_errors() {
        let parse: std::result::Result<toml::Value, _> = toml::from_str("limits = [");
        let err: RuntimeError = parse.unwrap_err().into();
        assert!(matches!(err, RuntimeError::Config(_)));
    }
}
