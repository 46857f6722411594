// Primitive field types
//
// A field type knows how many bytes it needs from the input, how to encode a
// value and how to decode the bytes it was handed. Instantiating a field and
// parsing it into the tree is done by the descriptor on the type's behalf.

use std::fmt::Debug;

use bytes::{Bytes, BytesMut};

use crate::codec::types::Value;
use crate::internal::error::Result;

pub mod integer;
pub mod bytes_and_text;
pub mod varint;

pub use self::integer::{Flag, Integer};
pub use self::bytes_and_text::{RawBytes, Text};
pub use self::varint::VarUInt;

/// How many bytes a field needs from the remaining input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadLength {
    /// Exactly this many bytes.
    Exact(usize),
    /// The length cannot be told from the remaining input.
    Indeterminate,
}

/// Trait for primitive field types.
pub trait FieldType: Debug + Send + Sync {
    /// Short type name used in errors and introspection.
    fn name(&self) -> &'static str;

    /// Value a field of this type holds when no default is declared.
    fn zero_value(&self) -> Value;

    /// Bytes this type needs when the descriptor configures no explicit length.
    fn required_byte_count(&self, remaining: &[u8]) -> ReadLength;

    /// Appends the encoding of `value`.
    fn encode(&self, value: &Value, out: &mut BytesMut) -> Result<()>;

    /// Length of the encoding of `value`.
    fn encoded_len(&self, value: &Value) -> Result<usize>;

    /// Decodes exactly the bytes in `raw`.
    fn decode(&self, raw: Bytes) -> Result<Value>;
}
