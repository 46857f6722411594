use bytes::{Bytes, BytesMut};

use crate::codec::endian::{self, Endian, Width};
use crate::codec::types::Value;
use crate::fields::{FieldType, ReadLength};
use crate::internal::error::{Error, Result};

/// Fixed-width integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Integer {
    width: Width,
    signed: bool,
    endian: Endian,
}

impl Integer {
    pub const fn new(width: Width, signed: bool, endian: Endian) -> Self {
        Self { width, signed, endian }
    }

    pub const fn u8() -> Self {
        Self::new(Width::W1, false, Endian::Big)
    }

    pub const fn i8() -> Self {
        Self::new(Width::W1, true, Endian::Big)
    }

    pub const fn u16(endian: Endian) -> Self {
        Self::new(Width::W2, false, endian)
    }

    pub const fn i16(endian: Endian) -> Self {
        Self::new(Width::W2, true, endian)
    }

    pub const fn u32(endian: Endian) -> Self {
        Self::new(Width::W4, false, endian)
    }

    pub const fn i32(endian: Endian) -> Self {
        Self::new(Width::W4, true, endian)
    }

    pub const fn u64(endian: Endian) -> Self {
        Self::new(Width::W8, false, endian)
    }

    pub const fn i64(endian: Endian) -> Self {
        Self::new(Width::W8, true, endian)
    }

    fn out_of_range(&self, value: &Value) -> Error {
        Error::ValueOutOfRange {
            type_name: self.name().to_string(),
            value: value.to_string(),
        }
    }

    fn wrap(&self, raw: u64) -> Value {
        match self.width {
            Width::W1 => Value::U8(raw as u8),
            Width::W2 => Value::U16(raw as u16),
            Width::W4 => Value::U32(raw as u32),
            Width::W8 => Value::U64(raw),
        }
    }

    fn wrap_signed(&self, raw: i64) -> Value {
        match self.width {
            Width::W1 => Value::I8(raw as i8),
            Width::W2 => Value::I16(raw as i16),
            Width::W4 => Value::I32(raw as i32),
            Width::W8 => Value::I64(raw),
        }
    }
}

impl FieldType for Integer {
    fn name(&self) -> &'static str {
        match (self.width, self.signed) {
            (Width::W1, false) => "UInt8",
            (Width::W2, false) => "UInt16",
            (Width::W4, false) => "UInt32",
            (Width::W8, false) => "UInt64",
            (Width::W1, true) => "Int8",
            (Width::W2, true) => "Int16",
            (Width::W4, true) => "Int32",
            (Width::W8, true) => "Int64",
        }
    }

    fn zero_value(&self) -> Value {
        if self.signed {
            self.wrap_signed(0)
        } else {
            self.wrap(0)
        }
    }

    fn required_byte_count(&self, _remaining: &[u8]) -> ReadLength {
        ReadLength::Exact(self.width.bytes())
    }

    fn encode(&self, value: &Value, out: &mut BytesMut) -> Result<()> {
        if self.signed {
            let v = value.as_i64().ok_or_else(|| self.out_of_range(value))?;
            let (min, max) = self.width.signed_range();
            if v < min || v > max {
                return Err(self.out_of_range(value));
            }
            endian::write_signed(out, v, self.width, self.endian)
        } else {
            let v = value.as_u64().ok_or_else(|| self.out_of_range(value))?;
            if v > self.width.max_unsigned() {
                return Err(self.out_of_range(value));
            }
            endian::write_unsigned(out, v, self.width, self.endian)
        }
    }

    fn encoded_len(&self, _value: &Value) -> Result<usize> {
        Ok(self.width.bytes())
    }

    fn decode(&self, raw: Bytes) -> Result<Value> {
        if self.signed {
            Ok(self.wrap_signed(endian::read_signed(&raw, self.width, self.endian)?))
        } else {
            Ok(self.wrap(endian::read_unsigned(&raw, self.width, self.endian)?))
        }
    }
}

/// Single-byte boolean; any non-zero byte decodes as true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flag;

impl FieldType for Flag {
    fn name(&self) -> &'static str {
        "Flag"
    }

    fn zero_value(&self) -> Value {
        Value::Bool(false)
    }

    fn required_byte_count(&self, _remaining: &[u8]) -> ReadLength {
        ReadLength::Exact(1)
    }

    fn encode(&self, value: &Value, out: &mut BytesMut) -> Result<()> {
        let flag = match value {
            Value::Bool(b) => *b,
            other => other.as_u64().map(|v| v != 0).ok_or_else(|| Error::ValueOutOfRange {
                type_name: self.name().to_string(),
                value: other.to_string(),
            })?,
        };
        out.extend_from_slice(&[flag as u8]);
        Ok(())
    }

    fn encoded_len(&self, _value: &Value) -> Result<usize> {
        Ok(1)
    }

    fn decode(&self, raw: Bytes) -> Result<Value> {
        match raw.as_ref() {
            [byte] => Ok(Value::Bool(*byte != 0)),
            other => Err(Error::CodecError(format!("Invalid length for Flag value: {}", other.len()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_accepts_any_fitting_integer() {
        let mut out = BytesMut::new();
        Integer::u16(Endian::Big).encode(&Value::I64(258), &mut out).unwrap();
        Integer::u8().encode(&Value::U64(7), &mut out).unwrap();
        assert_eq!(&out[..], &[0x01, 0x02, 0x07]);
    }

    #[test]
    fn test_encode_out_of_range() {
        let mut out = BytesMut::new();
        let err = Integer::u8().encode(&Value::U16(256), &mut out).unwrap_err();
        assert_eq!(err.to_string(), "Value Out Of Range: 256 does not fit UInt8");
        assert!(Integer::i8().encode(&Value::I32(-129), &mut out).is_err());
        assert!(Integer::u32(Endian::Little).encode(&Value::I8(-1), &mut out).is_err());
        assert!(Integer::u8().encode(&Value::from("1"), &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_decode_keeps_declared_width() {
        let ty = Integer::i32(Endian::Little);
        let value = ty.decode(Bytes::from_static(&[0xfe, 0xff, 0xff, 0xff])).unwrap();
        assert_eq!(value, Value::I32(-2));
        assert_eq!(ty.required_byte_count(&[]), ReadLength::Exact(4));
        assert_eq!(ty.zero_value(), Value::I32(0));
    }

    #[test]
    fn test_flag() {
        let mut out = BytesMut::new();
        Flag.encode(&Value::Bool(true), &mut out).unwrap();
        assert_eq!(&out[..], &[1]);
        assert_eq!(Flag.decode(Bytes::from_static(&[2])).unwrap(), Value::Bool(true));
        assert!(Flag.decode(Bytes::from_static(&[0, 0])).is_err());
    }
}
