//! ABI layout - the structures generated code reads in place
//!
//! Each owning module describes its own structure with `struct_layout!`
//! (field offsets need the fields to be visible). This module collects them,
//! renders them as JSON or as a C header, and pins the 64-bit sizes at
//! compile time.

use std::fmt::Write as _;

use serde::Serialize;
use static_assertions::const_assert_eq;

use crate::allocator::ObjectHeader;
use crate::builtins::{StringType, StringValue};
use crate::error::Result;
use crate::frames::FrameRecord;
use crate::types::TypeInfo;

#[cfg(target_pointer_width = "64")]
mod pinned {
    use super::*;
    use core::mem::size_of;

    const_assert_eq!(size_of::<ObjectHeader>(), 16);
    const_assert_eq!(size_of::<TypeInfo>(), 40);
    const_assert_eq!(size_of::<StringType>(), 48);
    const_assert_eq!(size_of::<StringValue>(), 24);
    const_assert_eq!(size_of::<FrameRecord>(), 40);
}

/// One field of a C structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldLayout {
    pub name: &'static str,
    pub c_type: &'static str,
    pub offset: usize,
}

/// One C structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructLayout {
    pub name: &'static str,
    pub size: usize,
    pub align: usize,
    pub fields: Vec<FieldLayout>,
}

impl StructLayout {
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Describe a `#[repr(C)]` struct as `"c_name" => rust_field: "c type"`
/// pairs, in declaration order.
macro_rules! struct_layout {
    ($ty:ty as $name:literal { $($c_field:literal => $field:ident : $c_type:literal),* $(,)? }) => {
        $crate::layout::StructLayout {
            name: $name,
            size: ::core::mem::size_of::<$ty>(),
            align: ::core::mem::align_of::<$ty>(),
            fields: vec![$(
                $crate::layout::FieldLayout {
                    name: $c_field,
                    c_type: $c_type,
                    offset: ::core::mem::offset_of!($ty, $field),
                }
            ),*],
        }
    };
}

pub(crate) use struct_layout;

/// Every shared structure, dependencies first
pub fn abi() -> Vec<StructLayout> {
    vec![
        crate::allocator::header::layout(),
        crate::types::layout(),
        crate::builtins::string::type_layout(),
        crate::builtins::string::value_layout(),
        crate::frames::layout(),
    ]
}

/// Target description included in every rendering
#[derive(Debug, Clone, Serialize)]
pub struct Target {
    pub pointer_width: usize,
    pub endian: &'static str,
}

impl Target {
    pub fn current() -> Self {
        Self {
            pointer_width: core::mem::size_of::<usize>() * 8,
            endian: if cfg!(target_endian = "little") { "little" } else { "big" },
        }
    }
}

#[derive(Serialize)]
struct Document {
    target: Target,
    structs: Vec<StructLayout>,
}

pub fn to_json() -> Result<String> {
    let document = Document {
        target: Target::current(),
        structs: abi(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// C declarations for every shared structure, with static assertions on
/// size and field offsets for the target they were generated on.
pub fn render_c_header() -> String {
    let target = Target::current();
    let mut out = String::new();

    let _ = writeln!(out, "/* beagle runtime ABI ({}-bit, {}-endian). Generated by beagle-layout. */", target.pointer_width, target.endian);
    out.push_str("#ifndef BEAGLE_LAYOUT_H\n#define BEAGLE_LAYOUT_H\n\n");
    out.push_str("#include <stddef.h>\n#include <stdint.h>\n\n");
    out.push_str("typedef void (*beagle_dtor_fn)(void*);\n");

    for layout in abi() {
        out.push('\n');
        let _ = writeln!(out, "typedef struct {} {{", layout.name);
        for field in &layout.fields {
            let _ = writeln!(out, "    {} {};", field.c_type, field.name);
        }
        let _ = writeln!(out, "}} {};", layout.name);

        let _ = writeln!(
            out,
            "_Static_assert(sizeof({0}) == {1}, \"{0} size\");",
            layout.name, layout.size
        );
        for field in &layout.fields {
            let _ = writeln!(
                out,
                "_Static_assert(offsetof({0}, {1}) == {2}, \"{0}.{1} offset\");",
                layout.name, field.name, field.offset
            );
        }
    }

    out.push_str("\n#endif /* BEAGLE_LAYOUT_H */\n");
    out
}
