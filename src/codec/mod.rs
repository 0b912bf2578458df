//! Primitive binary codec: byte cursor, variable-length integers,
//! fixed-width blobs and time types.
//!
//! Everything is little-endian and packed back to back in declaration
//! order with no padding.

mod fixed;
mod stream;
mod timestamp;
mod varint;

pub use fixed::{Float128, Int128, Uint128, Uint256};
pub use stream::{Decoder, Encoder, Pack, Unpack};
pub use timestamp::{BlockTimestamp, TimePoint, TimePointSec};
pub use varint::{
    VarInt32, VarUint32, pack_varint32, pack_varuint32, unpack_varint32, unpack_varuint32,
    varint32_size, varuint32_size,
};

/// Serialize a value into a fresh byte vector.
pub fn to_bytes<T: Pack + ?Sized>(value: &T) -> Vec<u8> {
    let mut enc = Encoder::with_capacity(value.size());
    value.pack(&mut enc);
    enc.into_bytes()
}

/// Deserialize a value, requiring the whole input to be consumed.
pub fn from_bytes<T: Unpack>(bytes: &[u8]) -> crate::Result<T> {
    let mut dec = Decoder::new(bytes);
    let value = T::unpack(&mut dec)?;
    dec.finish()?;
    Ok(value)
}
