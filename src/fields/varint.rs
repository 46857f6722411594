use bytes::{Bytes, BytesMut};

use crate::codec::types::Value;
use crate::codec::varint;
use crate::fields::{FieldType, ReadLength};
use crate::internal::error::{Error, Result};

/// LEB128 variable-length unsigned integer.
///
/// The field length is read off the input itself: the field ends at the first
/// byte with the continuation bit clear. An unterminated varint is
/// indeterminate rather than an underflow, since no fixed length was promised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VarUInt;

impl FieldType for VarUInt {
    fn name(&self) -> &'static str {
        "VarUInt"
    }

    fn zero_value(&self) -> Value {
        Value::U64(0)
    }

    fn required_byte_count(&self, remaining: &[u8]) -> ReadLength {
        match varint::peek_varint_len(remaining) {
            Some(len) => ReadLength::Exact(len),
            None => ReadLength::Indeterminate,
        }
    }

    fn encode(&self, value: &Value, out: &mut BytesMut) -> Result<()> {
        let v = value.as_u64().ok_or_else(|| Error::ValueOutOfRange {
            type_name: self.name().to_string(),
            value: value.to_string(),
        })?;
        out.extend_from_slice(&varint::encode_varint(v));
        Ok(())
    }

    fn encoded_len(&self, value: &Value) -> Result<usize> {
        value.as_u64().map(varint::varint_len).ok_or_else(|| Error::ValueOutOfRange {
            type_name: self.name().to_string(),
            value: value.to_string(),
        })
    }

    fn decode(&self, raw: Bytes) -> Result<Value> {
        let (value, read) = varint::decode_varint(&raw)?;
        if read != raw.len() {
            return Err(Error::CodecError(format!(
                "Trailing bytes after varint: {}",
                raw.len() - read
            )));
        }
        Ok(Value::U64(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_byte_count_reads_terminator() {
        assert_eq!(VarUInt.required_byte_count(&[0xAC, 0x02, 0x99]), ReadLength::Exact(2));
        assert_eq!(VarUInt.required_byte_count(&[0x80, 0x80]), ReadLength::Indeterminate);
        assert_eq!(VarUInt.required_byte_count(&[]), ReadLength::Indeterminate);
    }

    #[test]
    fn test_encode_decode() {
        let mut out = BytesMut::new();
        VarUInt.encode(&Value::U16(300), &mut out).unwrap();
        assert_eq!(&out[..], &[0xAC, 0x02]);
        assert_eq!(VarUInt.encoded_len(&Value::U16(300)).unwrap(), 2);
        assert_eq!(VarUInt.decode(out.freeze()).unwrap(), Value::U64(300));
    }

    #[test]
    fn test_decode_trailing() {
        assert!(VarUInt.decode(Bytes::from_static(&[0x01, 0x02])).is_err());
    }
}
