// Endian-aware integer encoding shared by the fixed-width field types.

use std::io::Cursor;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use bytes::{BufMut, BytesMut};

use crate::internal::error::{Error, Result};

/// Byte order for multi-byte integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    /// Network byte order
    #[default]
    Big,
    Little,
}

/// Supported integer widths, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    W1 = 1,
    W2 = 2,
    W4 = 4,
    W8 = 8,
}

impl Width {
    pub fn bytes(self) -> usize {
        self as usize
    }

    /// Largest unsigned value representable in this width.
    pub fn max_unsigned(self) -> u64 {
        match self {
            Width::W1 => u8::MAX as u64,
            Width::W2 => u16::MAX as u64,
            Width::W4 => u32::MAX as u64,
            Width::W8 => u64::MAX,
        }
    }

    /// Signed range representable in this width.
    pub fn signed_range(self) -> (i64, i64) {
        match self {
            Width::W1 => (i8::MIN as i64, i8::MAX as i64),
            Width::W2 => (i16::MIN as i64, i16::MAX as i64),
            Width::W4 => (i32::MIN as i64, i32::MAX as i64),
            Width::W8 => (i64::MIN, i64::MAX),
        }
    }
}

/// Appends `value` as an unsigned integer of `width` bytes.
/// The caller guarantees the value fits.
pub fn write_unsigned(out: &mut BytesMut, value: u64, width: Width, endian: Endian) -> Result<()> {
    let mut writer = out.writer();
    match (width, endian) {
        (Width::W1, _) => writer.write_u8(value as u8)?,
        (Width::W2, Endian::Big) => writer.write_u16::<BigEndian>(value as u16)?,
        (Width::W2, Endian::Little) => writer.write_u16::<LittleEndian>(value as u16)?,
        (Width::W4, Endian::Big) => writer.write_u32::<BigEndian>(value as u32)?,
        (Width::W4, Endian::Little) => writer.write_u32::<LittleEndian>(value as u32)?,
        (Width::W8, Endian::Big) => writer.write_u64::<BigEndian>(value)?,
        (Width::W8, Endian::Little) => writer.write_u64::<LittleEndian>(value)?,
    }
    Ok(())
}

/// Appends `value` as a two's complement integer of `width` bytes.
pub fn write_signed(out: &mut BytesMut, value: i64, width: Width, endian: Endian) -> Result<()> {
    let mut writer = out.writer();
    match (width, endian) {
        (Width::W1, _) => writer.write_i8(value as i8)?,
        (Width::W2, Endian::Big) => writer.write_i16::<BigEndian>(value as i16)?,
        (Width::W2, Endian::Little) => writer.write_i16::<LittleEndian>(value as i16)?,
        (Width::W4, Endian::Big) => writer.write_i32::<BigEndian>(value as i32)?,
        (Width::W4, Endian::Little) => writer.write_i32::<LittleEndian>(value as i32)?,
        (Width::W8, Endian::Big) => writer.write_i64::<BigEndian>(value)?,
        (Width::W8, Endian::Little) => writer.write_i64::<LittleEndian>(value)?,
    }
    Ok(())
}

fn check_exact(raw: &[u8], width: Width) -> Result<()> {
    if raw.len() != width.bytes() {
        return Err(Error::CodecError(format!(
            "Invalid length for {}-byte integer: {}",
            width.bytes(),
            raw.len()
        )));
    }
    Ok(())
}

/// Reads an unsigned integer that occupies all of `raw`.
pub fn read_unsigned(raw: &[u8], width: Width, endian: Endian) -> Result<u64> {
    check_exact(raw, width)?;
    let mut reader = Cursor::new(raw);
    let value = match (width, endian) {
        (Width::W1, _) => reader.read_u8()? as u64,
        (Width::W2, Endian::Big) => reader.read_u16::<BigEndian>()? as u64,
        (Width::W2, Endian::Little) => reader.read_u16::<LittleEndian>()? as u64,
        (Width::W4, Endian::Big) => reader.read_u32::<BigEndian>()? as u64,
        (Width::W4, Endian::Little) => reader.read_u32::<LittleEndian>()? as u64,
        (Width::W8, Endian::Big) => reader.read_u64::<BigEndian>()?,
        (Width::W8, Endian::Little) => reader.read_u64::<LittleEndian>()?,
    };
    Ok(value)
}

/// Reads a two's complement integer that occupies all of `raw`.
pub fn read_signed(raw: &[u8], width: Width, endian: Endian) -> Result<i64> {
    check_exact(raw, width)?;
    let mut reader = Cursor::new(raw);
    let value = match (width, endian) {
        (Width::W1, _) => reader.read_i8()? as i64,
        (Width::W2, Endian::Big) => reader.read_i16::<BigEndian>()? as i64,
        (Width::W2, Endian::Little) => reader.read_i16::<LittleEndian>()? as i64,
        (Width::W4, Endian::Big) => reader.read_i32::<BigEndian>()? as i64,
        (Width::W4, Endian::Little) => reader.read_i32::<LittleEndian>()? as i64,
        (Width::W8, Endian::Big) => reader.read_i64::<BigEndian>()?,
        (Width::W8, Endian::Little) => reader.read_i64::<LittleEndian>()?,
    };
    Ok(value)
}
