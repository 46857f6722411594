// Codec module: value model and byte-level encoding helpers for recordkit

pub mod endian;
pub mod varint;
pub mod types;

pub use self::endian::{Endian, Width};
pub use self::types::{Value, ValueType};
