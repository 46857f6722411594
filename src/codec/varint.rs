use crate::internal::error::{Error, Result};

/// Maximum encoded length of a u64 varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Encodes an unsigned 64-bit integer using a variable-length scheme (LEB128).
/// Returns the encoded bytes.
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(varint_len(value));
    let mut value = value;

    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
    buf
}

/// Number of bytes `encode_varint` produces for `value`.
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}

/// Length of the varint at the front of `data`, if it is complete.
pub fn peek_varint_len(data: &[u8]) -> Option<usize> {
    data.iter()
        .take(MAX_VARINT_LEN)
        .position(|byte| byte & 0x80 == 0)
        .map(|index| index + 1)
}

/// Decodes an unsigned 64-bit integer from a variable-length encoded byte slice.
/// Returns the decoded value and the number of bytes read.
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut value = 0u64;
    let mut shift = 0;
    let mut bytes_read = 0;

    for byte in data {
        bytes_read += 1;
        let low_seven_bits = (byte & 0x7F) as u64;
        // the tenth byte carries only the top bit of a u64
        if shift == 63 && low_seven_bits > 1 {
            return Err(Error::CodecError("Varint value too large".to_string()));
        }
        value |= low_seven_bits << shift;
        if (byte & 0x80) == 0 {
            return Ok((value, bytes_read));
        }
        shift += 7;
        if shift >= 64 {
            return Err(Error::CodecError("Varint value too large".to_string()));
        }
    }

    Err(Error::CodecError("Incomplete varint data".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_varint() {
        assert_eq!(encode_varint(0), vec![0x00]);
        assert_eq!(encode_varint(127), vec![0x7F]);
        assert_eq!(encode_varint(128), vec![0x80, 0x01]);
        assert_eq!(encode_varint(300), vec![0xAC, 0x02]);
        assert_eq!(encode_varint(u64::MAX), vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
    }

    #[test]
    fn test_varint_len_matches_encoding() {
        for value in [0u64, 1, 127, 128, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            assert_eq!(varint_len(value), encode_varint(value).len(), "value {}", value);
        }
    }

    #[test]
    fn test_peek_varint_len() {
        assert_eq!(peek_varint_len(&[0x05, 0xFF]), Some(1));
        assert_eq!(peek_varint_len(&[0xAC, 0x02, 0x00]), Some(2));
        assert_eq!(peek_varint_len(&[0x80]), None);
        assert_eq!(peek_varint_len(&[]), None);
    }

    #[test]
    fn test_decode_varint() {
        assert_eq!(decode_varint(&[0x00]).unwrap(), (0, 1));
        assert_eq!(decode_varint(&[0xAC, 0x02]).unwrap(), (300, 2));
        assert_eq!(decode_varint(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]).unwrap(), (u64::MAX, 10));
    }

    #[test]
    fn test_decode_varint_errors() {
        assert!(decode_varint(&[0x80]).is_err());
        let data = vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert!(decode_varint(&data).is_err());
        let overflow = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        assert!(decode_varint(&overflow).is_err());
        let top_bit = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert_eq!(decode_varint(&top_bit).unwrap(), (1 << 63, 10));
    }
}
