//! String type - immutable byte strings split into descriptor and instance
//!
//! Design:
//! - One `StringType` descriptor for the whole process, a plain static, so it
//!   exists before any code runs and is never initialized twice
//! - Instances (`StringValue`) carry the authoritative `length` and a view of
//!   their bytes; nothing relies on a terminator
//! - Content is either `'static` or kept alive by a reference-counted
//!   `ByteBuffer`, which several instances may share

use core::ffi::c_void;
use core::mem::{offset_of, size_of};
use core::ops::Range;
use core::ptr::{self, NonNull};
use std::fmt;

use crate::allocator::ObjectHeader;
use crate::error::{Result, RuntimeError};
use crate::gc::{Handle, HeapObject};
use crate::layout::{struct_layout, StructLayout};
use crate::type_name;
use crate::types::TypeInfo;

/// Longest string an instance can describe
pub const MAX_LENGTH: usize = u32::MAX as usize;

/// The shared string descriptor (C layout)
///
/// ```text
/// offset  field      (64-bit)
///      0  base       void*     (always NULL: string is a root type)
///      8  type_info  TypeInfo  (40 bytes)
/// ```
#[repr(C)]
pub struct StringType {
    base: *const c_void,
    type_info: TypeInfo,
}

unsafe impl Sync for StringType {}

pub static STRING_TYPE: StringType = StringType {
    base: ptr::null(),
    type_info: TypeInfo::root(type_name!("string"), size_of::<StringValue>(), size_of::<u8>()),
};

impl StringType {
    #[inline]
    pub fn type_info(&'static self) -> &'static TypeInfo {
        &self.type_info
    }
}

pub fn string_type() -> &'static StringType {
    &STRING_TYPE
}

pub fn string_type_info() -> &'static TypeInfo {
    &STRING_TYPE.type_info
}

/// A string instance as generated code sees it (C layout)
///
/// ```text
/// offset  field    (64-bit)
///      0  type     const StringType*
///      8  length   uint32_t
///     16  content  const char*  (length bytes, no terminator)
/// ```
#[repr(C)]
pub struct StringValue {
    ty: &'static StringType,
    length: u32,
    content: *const u8,
}

// Immutable after construction
unsafe impl Send for StringValue {}
unsafe impl Sync for StringValue {}

impl StringValue {
    #[inline]
    pub fn string_type(&self) -> &'static StringType {
        self.ty
    }

    #[inline]
    pub fn type_info(&self) -> &'static TypeInfo {
        &self.ty.type_info
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    pub fn content(&self) -> &[u8] {
        // SAFETY: `content` stays valid for `length` bytes while the owning
        // object is alive, and `&self` borrows from it.
        unsafe { std::slice::from_raw_parts(self.content, self.length as usize) }
    }
}

/// Reference-counted storage for string bytes
#[repr(C)]
pub struct ByteBuffer {
    header: ObjectHeader,
    bytes: Box<[u8]>,
}

unsafe impl HeapObject for ByteBuffer {}

impl ByteBuffer {
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Handle<ByteBuffer> {
        Handle::new(ByteBuffer {
            header: ObjectHeader::for_type::<ByteBuffer>(),
            bytes: bytes.into(),
        })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

enum Backing {
    Static,
    Shared(Handle<ByteBuffer>),
}

/// Heap object wrapping one `StringValue`.
///
/// Generated code holds a `*const StringValue` (the `value` field); the
/// header sits immediately before it.
#[repr(C)]
pub struct StringObject {
    header: ObjectHeader,
    value: StringValue,
    backing: Backing,
}

unsafe impl HeapObject for StringObject {}

impl StringObject {
    /// Copy `bytes` into fresh shared storage
    pub fn new(bytes: &[u8]) -> Result<Handle<StringObject>> {
        check_length(bytes.len())?;
        let buffer = ByteBuffer::new(bytes);
        Self::from_buffer(&buffer, 0..buffer.len())
    }

    /// Borrow bytes that live for the whole process (literals)
    pub fn from_static(bytes: &'static [u8]) -> Result<Handle<StringObject>> {
        check_length(bytes.len())?;
        Ok(Self::build(bytes.as_ptr(), bytes.len(), Backing::Static))
    }

    /// View `range` of a shared buffer. The instance holds a reference to
    /// the buffer for as long as it lives.
    pub fn from_buffer(buffer: &Handle<ByteBuffer>, range: Range<usize>) -> Result<Handle<StringObject>> {
        let available = buffer.len();
        if range.start > range.end || range.end > available {
            return Err(RuntimeError::ContentOutOfBounds {
                start: range.start,
                end: range.end,
                len: available,
            });
        }
        check_length(range.len())?;

        let content = buffer.as_bytes()[range.clone()].as_ptr();
        Ok(Self::build(content, range.len(), Backing::Shared(buffer.clone())))
    }

    fn build(content: *const u8, length: usize, backing: Backing) -> Handle<StringObject> {
        Handle::new(StringObject {
            header: ObjectHeader::for_type::<StringObject>(),
            value: StringValue {
                ty: &STRING_TYPE,
                length: length as u32,
                content,
            },
            backing,
        })
    }

    #[inline]
    pub fn value(&self) -> &StringValue {
        &self.value
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    #[inline]
    pub fn content(&self) -> &[u8] {
        self.value.content()
    }

    #[inline]
    pub fn type_info(&self) -> &'static TypeInfo {
        self.value.type_info()
    }

    /// The shared buffer behind this string, if it is not a static
    pub fn buffer(&self) -> Option<&Handle<ByteBuffer>> {
        match &self.backing {
            Backing::Static => None,
            Backing::Shared(buffer) => Some(buffer),
        }
    }

    /// Pointer handed to generated code
    #[inline]
    pub fn instance_ptr(this: &Handle<StringObject>) -> *const StringValue {
        &this.value
    }

    /// Recover the object from an instance pointer
    ///
    /// # Safety
    /// `value` must have been produced by `instance_ptr` for a live object.
    #[inline]
    pub unsafe fn from_instance_ptr(value: NonNull<StringValue>) -> NonNull<StringObject> {
        NonNull::new_unchecked((value.as_ptr() as *mut u8).sub(VALUE_OFFSET) as *mut StringObject)
    }
}

pub(crate) fn type_layout() -> StructLayout {
    struct_layout!(StringType as "beagle_static_string" {
        "base__" => base: "void*",
        "typeInfo__" => type_info: "beagle_typeinfo",
    })
}

pub(crate) fn value_layout() -> StructLayout {
    struct_layout!(StringValue as "beagle_dynamic_string" {
        "type__" => ty: "const beagle_static_string*",
        "length" => length: "uint32_t",
        "content" => content: "const char*",
    })
}

/// Distance from the object start to the instance handed to generated code
pub const VALUE_OFFSET: usize = offset_of!(StringObject, value);

fn check_length(length: usize) -> Result<()> {
    if length > MAX_LENGTH {
        return Err(RuntimeError::StringTooLong {
            length,
            max: MAX_LENGTH,
        });
    }
    Ok(())
}

impl fmt::Debug for StringObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringObject")
            .field("length", &self.len())
            .field("content", &String::from_utf8_lossy(self.content()))
            .field("shared", &self.buffer().is_some())
            .finish()
    }
}
