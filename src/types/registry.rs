//! Type registry - reflection by name
//!
//! Process-wide map from UTF-8 type name to descriptor. Descriptors are
//! 'static, so lookups hand out plain references.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;

use super::TypeInfo;
use crate::config;
use crate::error::{Result, RuntimeError};
use crate::logging::log_type_registered;

static REGISTRY: Lazy<DashMap<String, &'static TypeInfo>> = Lazy::new(DashMap::new);

/// Register a descriptor under its UTF-8 name.
///
/// Registering the same descriptor twice is a no-op. Its base chain is
/// validated against `limits.max_type_depth` first, so a registered type is
/// always safe to walk.
pub fn register(info: &'static TypeInfo) -> Result<()> {
    let depth = info.try_depth(config::get().limits.max_type_depth)?;
    let name = info.name_utf8();

    match REGISTRY.entry(name.to_string()) {
        Entry::Occupied(existing) => {
            if std::ptr::eq(*existing.get(), info) {
                Ok(())
            } else {
                Err(RuntimeError::DuplicateType { name: name.to_string() })
            }
        }
        Entry::Vacant(slot) => {
            slot.insert(info);
            log_type_registered(name, depth);
            Ok(())
        }
    }
}

pub fn lookup(name: &str) -> Option<&'static TypeInfo> {
    REGISTRY.get(name).map(|entry| *entry.value())
}

/// All registered names, sorted
pub fn registered_names() -> Vec<String> {
    let mut names: Vec<String> = REGISTRY.iter().map(|entry| entry.key().clone()).collect();
    names.sort();
    names
}

/// Register the descriptors the runtime itself defines
pub(crate) fn register_builtins() -> Result<()> {
    register(crate::builtins::string::string_type_info())
}
