//! Built-in types - values whose layout the runtime defines itself
//!
//! Design: each built-in has one static descriptor shared by all instances
//! and a heap object type wrapping the instance layout generated code reads.

pub mod string;


pub use string::{
    string_type, string_type_info, ByteBuffer, StringObject, StringType, StringValue, STRING_TYPE,
};
