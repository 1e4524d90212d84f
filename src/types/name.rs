//! Type names in both encodings
//!
//! Descriptors carry their name as NUL-terminated UTF-8 and NUL-terminated
//! UTF-16, both produced when the descriptor is built. Queries never
//! transcode.

use std::ffi::{CStr, CString};

use crate::error::{Result, RuntimeError};

/// Borrowed pair of name encodings, ready to be stored in a `TypeInfo`
#[derive(Debug, Clone, Copy)]
pub struct TypeName {
    pub(crate) utf8: &'static CStr,
    /// Includes the trailing NUL
    pub(crate) utf16: &'static [u16],
}

impl TypeName {
    /// Build from pre-encoded, NUL-terminated parts. Used by `type_name!`.
    pub const fn from_parts(utf8_nul: &'static str, utf16_nul: &'static [u16]) -> Self {
        let utf8 = match CStr::from_bytes_with_nul(utf8_nul.as_bytes()) {
            Ok(utf8) => utf8,
            Err(_) => panic!("type name must end in its only NUL"),
        };
        assert!(
            !utf16_nul.is_empty() && utf16_nul[utf16_nul.len() - 1] == 0,
            "UTF-16 type name must be NUL-terminated"
        );
        Self { utf8, utf16: utf16_nul }
    }

    /// Encode a name computed at load time. Both encodings are leaked:
    /// descriptors live for the whole process.
    pub fn leak(name: &str) -> Result<Self> {
        let utf8 = CString::new(name)
            .map_err(|_| RuntimeError::InvalidTypeName { name: name.escape_default().to_string() })?;
        let utf16: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();

        Ok(Self {
            utf8: Box::leak(utf8.into_boxed_c_str()),
            utf16: Box::leak(utf16.into_boxed_slice()),
        })
    }

    pub fn as_str(&self) -> &'static str {
        self.utf8.to_str().unwrap_or("<invalid utf-8>")
    }
}

/// Number of UTF-16 code units needed for `s`
pub const fn utf16_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut units = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b < 0x80 {
            i += 1;
            units += 1;
        } else if b < 0xE0 {
            i += 2;
            units += 1;
        } else if b < 0xF0 {
            i += 3;
            units += 1;
        } else {
            i += 4;
            units += 2;
        }
    }
    units
}

/// Compile-time UTF-8 to UTF-16 transcoding. `N` must be at least
/// `utf16_len(s)`; remaining units stay zero, which provides the NUL.
pub const fn encode_utf16<const N: usize>(s: &str) -> [u16; N] {
    let bytes = s.as_bytes();
    let mut out = [0u16; N];
    let mut i = 0;
    let mut j = 0;
    while i < bytes.len() {
        let b = bytes[i] as u32;
        let (cp, width) = if b < 0x80 {
            (b, 1)
        } else if b < 0xE0 {
            (((b & 0x1F) << 6) | (bytes[i + 1] as u32 & 0x3F), 2)
        } else if b < 0xF0 {
            (
                ((b & 0x0F) << 12) | ((bytes[i + 1] as u32 & 0x3F) << 6) | (bytes[i + 2] as u32 & 0x3F),
                3,
            )
        } else {
            (
                ((b & 0x07) << 18)
                    | ((bytes[i + 1] as u32 & 0x3F) << 12)
                    | ((bytes[i + 2] as u32 & 0x3F) << 6)
                    | (bytes[i + 3] as u32 & 0x3F),
                4,
            )
        };

        if cp >= 0x1_0000 {
            let v = cp - 0x1_0000;
            out[j] = (0xD800 + (v >> 10)) as u16;
            out[j + 1] = (0xDC00 + (v & 0x3FF)) as u16;
            j += 2;
        } else {
            out[j] = cp as u16;
            j += 1;
        }
        i += width;
    }
    out
}

/// Build a `TypeName` from a string literal at compile time.
///
/// ```
/// use beagle::types::TypeInfo;
///
/// static POINT: TypeInfo = TypeInfo::root(beagle::type_name!("Point"), 16, 0);
/// assert_eq!(POINT.name_utf8(), "Point");
/// ```
#[macro_export]
macro_rules! type_name {
    ($name:literal) => {{
        const UTF16: [u16; $crate::types::utf16_len($name) + 1] = $crate::types::encode_utf16($name);
        $crate::types::TypeName::from_parts(concat!($name, "\0"), &UTF16)
    }};
}
