//! Type identity - immutable runtime type descriptors
//!
//! Design: one `TypeInfo` per compiled type, never freed, never mutated.
//! Single inheritance is a chain of `base` references ending at a root.
//! A descriptor can only name a base that already exists, so descriptors
//! built through `TypeInfo::leak` cannot form a cycle. Statics written by
//! hand can, which is why every walk is bounded by `limits.max_type_depth`.

mod name;
pub mod registry;

#[cfg(test)]
mod tests;

pub use name::{encode_utf16, utf16_len, TypeName};

use std::ffi::{c_char, CStr};
use std::fmt;

use crate::config;
use crate::error::{fatal, Result, RuntimeError};
use crate::layout::{struct_layout, StructLayout};

/// Runtime type descriptor (C layout, read directly by generated code)
///
/// ```text
/// offset  field         (64-bit)
///      0  base          const TypeInfo*  (NULL for roots)
///      8  static_size   size_t
///     16  dynamic_size  size_t
///     24  name_u8       const char*      (NUL-terminated)
///     32  name_u16      const uint16_t*  (NUL-terminated)
/// ```
#[repr(C)]
pub struct TypeInfo {
    base: Option<&'static TypeInfo>,
    static_size: usize,
    dynamic_size: usize,
    name_u8: *const c_char,
    name_u16: *const u16,
}

// Immutable after construction; the name pointers refer to 'static data.
unsafe impl Send for TypeInfo {}
unsafe impl Sync for TypeInfo {}

/// Requested name encoding for `TypeInfo::name`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameEncoding {
    Utf8,
    Utf16,
}

/// A type name in the encoding that was asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedName<'a> {
    Utf8(&'a CStr),
    /// Without the trailing NUL
    Utf16(&'a [u16]),
}

impl TypeInfo {
    /// Descriptor for a type with no base
    pub const fn root(name: TypeName, static_size: usize, dynamic_size: usize) -> Self {
        Self {
            base: None,
            static_size,
            dynamic_size,
            name_u8: name.utf8.as_ptr(),
            name_u16: name.utf16.as_ptr(),
        }
    }

    /// Descriptor for a type deriving from `base`
    pub const fn derived(
        base: &'static TypeInfo,
        name: TypeName,
        static_size: usize,
        dynamic_size: usize,
    ) -> Self {
        Self {
            base: Some(base),
            static_size,
            dynamic_size,
            name_u8: name.utf8.as_ptr(),
            name_u16: name.utf16.as_ptr(),
        }
    }

    /// Build a descriptor at load time and leak it.
    ///
    /// The base chain is checked against `limits.max_type_depth` before the
    /// descriptor exists, so a chain that is too deep is rejected here rather
    /// than at the first walk.
    pub fn leak(
        name: &str,
        base: Option<&'static TypeInfo>,
        static_size: usize,
        dynamic_size: usize,
    ) -> Result<&'static TypeInfo> {
        let limit = config::get().limits.max_type_depth;
        if let Some(base) = base {
            let base_depth = base.try_depth(limit)?;
            if base_depth + 1 > limit {
                return Err(RuntimeError::TypeChainTooDeep {
                    name: name.to_string(),
                    limit,
                });
            }
        }

        let name = TypeName::leak(name)?;
        let info = match base {
            Some(base) => TypeInfo::derived(base, name, static_size, dynamic_size),
            None => TypeInfo::root(name, static_size, dynamic_size),
        };
        Ok(Box::leak(Box::new(info)))
    }

    #[inline]
    pub fn base(&self) -> Option<&'static TypeInfo> {
        self.base
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.base.is_none()
    }

    /// Byte size of the fixed-layout part of an instance
    #[inline]
    pub fn static_size(&self) -> usize {
        self.static_size
    }

    /// Byte size of one trailing element (zero for fixed-size types)
    #[inline]
    pub fn dynamic_size(&self) -> usize {
        self.dynamic_size
    }

    pub fn name_cstr(&self) -> &CStr {
        // SAFETY: `name_u8` comes from a `TypeName`, which is NUL-terminated
        // and 'static.
        unsafe { CStr::from_ptr(self.name_u8) }
    }

    pub fn name_utf8(&self) -> &str {
        self.name_cstr().to_str().unwrap_or("<invalid utf-8>")
    }

    /// UTF-16 name without the trailing NUL
    pub fn name_utf16(&self) -> &[u16] {
        // SAFETY: `name_u16` comes from a `TypeName`, which is NUL-terminated
        // and 'static.
        unsafe {
            let mut len = 0;
            while *self.name_u16.add(len) != 0 {
                len += 1;
            }
            std::slice::from_raw_parts(self.name_u16, len)
        }
    }

    pub fn name(&self, encoding: NameEncoding) -> EncodedName<'_> {
        match encoding {
            NameEncoding::Utf8 => EncodedName::Utf8(self.name_cstr()),
            NameEncoding::Utf16 => EncodedName::Utf16(self.name_utf16()),
        }
    }

    /// This descriptor followed by each of its bases, up to the root
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors {
            origin: self,
            next: Some(self),
            remaining: config::get().limits.max_type_depth + 1,
        }
    }

    /// Number of bases above this type (0 for roots)
    pub fn depth(&self) -> usize {
        self.ancestors().count() - 1
    }

    /// Like `depth`, but reports a chain longer than `limit` instead of
    /// aborting.
    pub fn try_depth(&self, limit: usize) -> Result<usize> {
        let mut depth = 0;
        let mut current = self;
        while let Some(base) = current.base {
            depth += 1;
            if depth > limit {
                return Err(RuntimeError::TypeChainTooDeep {
                    name: self.name_utf8().to_string(),
                    limit,
                });
            }
            current = base;
        }
        Ok(depth)
    }

    /// True if `self` is `ty` or derives from it
    #[inline]
    pub fn is_subtype_of(&self, ty: &TypeInfo) -> bool {
        is_instance_of(ty, self)
    }
}

pub(crate) fn layout() -> StructLayout {
    struct_layout!(TypeInfo as "beagle_typeinfo" {
        "base" => base: "const struct beagle_typeinfo*",
        "staticSize" => static_size: "size_t",
        "dynamicSize" => dynamic_size: "size_t",
        "nameU8" => name_u8: "const char*",
        "nameU16" => name_u16: "const uint16_t*",
    })
}

/// Walk `candidate`'s base chain looking for `type_info`.
///
/// Descriptors are compared by identity. A chain longer than
/// `limits.max_type_depth` is treated as corrupted and aborts.
pub fn is_instance_of(type_info: &TypeInfo, candidate: &TypeInfo) -> bool {
    candidate.ancestors().any(|ty| std::ptr::eq(ty, type_info))
}

/// Name of `type_info` in the requested encoding
pub fn name_of(type_info: &TypeInfo, encoding: NameEncoding) -> EncodedName<'_> {
    type_info.name(encoding)
}

/// Bounded iterator up a base chain
pub struct Ancestors<'a> {
    origin: &'a TypeInfo,
    next: Option<&'a TypeInfo>,
    remaining: usize,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a TypeInfo;

    fn next(&mut self) -> Option<&'a TypeInfo> {
        let current = self.next?;
        if self.remaining == 0 {
            fatal(RuntimeError::TypeChainTooDeep {
                name: self.origin.name_utf8().to_string(),
                limit: config::get().limits.max_type_depth,
            });
        }
        self.remaining -= 1;
        self.next = current.base.map(|base| base as &'a TypeInfo);
        Some(current)
    }
}

impl std::iter::FusedIterator for Ancestors<'_> {}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name_utf8())
            .field("base", &self.base.map(|base| base.name_utf8()))
            .field("static_size", &self.static_size)
            .field("dynamic_size", &self.dynamic_size)
            .finish()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name_utf8())
    }
}
