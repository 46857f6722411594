use bytes::{Bytes, BytesMut};

use crate::codec::types::Value;
use crate::fields::{FieldType, ReadLength};
use crate::internal::error::{Error, Result};

/// Opaque byte string. Its length always comes from the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawBytes;

/// UTF-8 text. Its length always comes from the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Text;

fn mismatch(type_name: &str, value: &Value) -> Error {
    Error::CodecError(format!("{} field cannot hold {:?}", type_name, value.value_type()))
}

impl FieldType for RawBytes {
    fn name(&self) -> &'static str {
        "Bytes"
    }

    fn zero_value(&self) -> Value {
        Value::Bytes(Bytes::new())
    }

    fn required_byte_count(&self, _remaining: &[u8]) -> ReadLength {
        ReadLength::Indeterminate
    }

    fn encode(&self, value: &Value, out: &mut BytesMut) -> Result<()> {
        let raw = value.as_bytes().ok_or_else(|| mismatch(self.name(), value))?;
        out.extend_from_slice(raw);
        Ok(())
    }

    fn encoded_len(&self, value: &Value) -> Result<usize> {
        value
            .as_bytes()
            .map(<[u8]>::len)
            .ok_or_else(|| mismatch(self.name(), value))
    }

    fn decode(&self, raw: Bytes) -> Result<Value> {
        Ok(Value::Bytes(raw))
    }
}

impl FieldType for Text {
    fn name(&self) -> &'static str {
        "Text"
    }

    fn zero_value(&self) -> Value {
        Value::String(String::new())
    }

    fn required_byte_count(&self, _remaining: &[u8]) -> ReadLength {
        ReadLength::Indeterminate
    }

    fn encode(&self, value: &Value, out: &mut BytesMut) -> Result<()> {
        let text = value.as_str().ok_or_else(|| mismatch(self.name(), value))?;
        out.extend_from_slice(text.as_bytes());
        Ok(())
    }

    fn encoded_len(&self, value: &Value) -> Result<usize> {
        value
            .as_str()
            .map(str::len)
            .ok_or_else(|| mismatch(self.name(), value))
    }

    fn decode(&self, raw: Bytes) -> Result<Value> {
        let text = std::str::from_utf8(&raw)
            .map_err(|e| Error::CodecError(format!("Invalid UTF-8 string: {}", e)))?;
        Ok(Value::String(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_bytes() {
        let mut out = BytesMut::new();
        RawBytes.encode(&Value::from(&b"raw data"[..]), &mut out).unwrap();
        // text encodes as its UTF-8 bytes too
        RawBytes.encode(&Value::from("!"), &mut out).unwrap();
        assert_eq!(&out[..], b"raw data!");
        assert_eq!(RawBytes.encoded_len(&Value::from(&b"abc"[..])).unwrap(), 3);
        assert!(RawBytes.encode(&Value::U8(1), &mut out).is_err());
        assert_eq!(RawBytes.required_byte_count(b"anything"), ReadLength::Indeterminate);
    }

    #[test]
    fn test_text() {
        let mut out = BytesMut::new();
        Text.encode(&Value::from("你好"), &mut out).unwrap();
        assert_eq!(out.len(), 6);
        assert_eq!(Text.encoded_len(&Value::from("你好")).unwrap(), 6);
        assert_eq!(Text.decode(out.freeze()).unwrap(), Value::from("你好"));
    }

    #[test]
    fn test_text_errors() {
        let result = Text.decode(Bytes::from_static(&[0xff, 0xff]));
        assert!(result.unwrap_err().to_string().contains("Invalid UTF-8 string"));
        let mut out = BytesMut::new();
        assert!(Text.encode(&Value::from(&b"bytes"[..]), &mut out).is_err());
    }
}
