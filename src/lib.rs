//! Beagle Runtime - object-model core for compiled Beagle programs
//!
//! Statically linked into (or loaded by) generated code, this crate provides:
//! - Atomic reference counting with destructor-then-free teardown
//! - Immutable type descriptors forming single-inheritance chains
//! - The string type, split into one shared descriptor and many instances
//! - A per-thread intrusive call-frame stack for backtraces
//!
//! The C ABI lives in [`ffi`]; the layouts generated code depends on are
//! described by [`layout`].

pub mod allocator;
pub mod builtins;
pub mod config;
pub mod error;
pub mod ffi;
pub mod frames;
pub mod gc;
pub mod layout;
pub mod logging;
pub mod types;

// Re-export core types
pub use allocator::{Destructor, ObjectHeader};
pub use builtins::{string_type, ByteBuffer, StringObject, StringType, StringValue};
pub use config::RuntimeConfig;
pub use error::{fatal, Result, RuntimeError};
pub use frames::{Backtrace, FrameGuard, FrameRecord};
pub use gc::{Handle, HeapObject};
pub use types::{is_instance_of, TypeInfo, TypeName};

use parking_lot::Mutex;

struct RuntimeState {
    initialized: bool,
    /// Balanced init/cleanup calls still outstanding
    users: usize,
}

static STATE: Mutex<RuntimeState> = parking_lot::const_mutex(RuntimeState {
    initialized: false,
    users: 0,
});

/// Bring the runtime up: configuration, logging, built-in types.
///
/// Safe to call more than once (embedders and tests do); only the first
/// call does the work. Each call should be paired with `runtime_cleanup`.
///
/// Fails if a different configuration was installed with
/// [`config::install`] beforehand.
pub fn runtime_init() -> Result<()> {
    let mut state = STATE.lock();
    if !state.initialized {
        bring_up()?;
        state.initialized = true;
        logging::log_runtime_init();
    }
    state.users += 1;
    Ok(())
}

fn bring_up() -> Result<()> {
    let loaded = RuntimeConfig::from_env()?;
    let log_config = loaded.log_config();
    config::install_or_match(loaded)?;

    logging::init_with_config(log_config);
    types::registry::register_builtins()
}

/// Release one `runtime_init`. The last one logs the shutdown.
///
/// Objects and descriptors are not swept: live objects stay valid, and
/// descriptors live for the whole process.
pub fn runtime_cleanup() {
    let mut state = STATE.lock();
    if state.users == 0 {
        return;
    }
    state.users -= 1;
    if state.users == 0 && state.initialized {
        let stats = allocator::stats();
        tracing::info!(
            target: "beagle::runtime",
            allocations = stats.allocations,
            live = stats.live(),
            "runtime statistics"
        );
        logging::log_runtime_shutdown();
    }
}

/// True once `runtime_init` has succeeded
pub fn is_initialized() -> bool {
    STATE.lock().initialized
}
