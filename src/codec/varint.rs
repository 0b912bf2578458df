//! Base-128 variable-length integers.
//!
//! Seven value bits per byte, low bits first; the top bit of each byte
//! signals that more bytes follow. Signed values are zig-zag mapped first.

use crate::codec::stream::{Decoder, Encoder, Pack, Unpack};
use crate::error::{Error, Result};

/// Longest encoding of a 32-bit value.
const MAX_VARINT32_BYTES: usize = 5;

/// Encode an unsigned 32-bit value.
pub fn pack_varuint32(mut v: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(varuint32_size(v));
    while v >= 0x80 {
        out.push((v as u8 & 0x7f) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
    out
}

/// Decode an unsigned 32-bit value, returning it with the bytes consumed.
pub fn unpack_varuint32(data: &[u8]) -> Result<(u32, usize)> {
    let mut value: u64 = 0;
    for (i, byte) in data.iter().take(MAX_VARINT32_BYTES).enumerate() {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return u32::try_from(value)
                .map(|v| (v, i + 1))
                .map_err(|_| Error::invalid_value("varuint32", format!("{} overflows", value)));
        }
    }

    if data.len() >= MAX_VARINT32_BYTES {
        Err(Error::invalid_value(
            "varuint32",
            "more than 5 continuation bytes",
        ))
    } else {
        Err(Error::Truncated {
            offset: 0,
            needed: data.len() + 1,
            remaining: data.len(),
        })
    }
}

/// Encoded length of an unsigned value.
pub fn varuint32_size(v: u32) -> usize {
    match v {
        0..=0x7f => 1,
        0x80..=0x3fff => 2,
        0x4000..=0x1f_ffff => 3,
        0x20_0000..=0x0fff_ffff => 4,
        _ => 5,
    }
}

fn zigzag(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

fn unzigzag(v: u32) -> i32 {
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

/// Encode a signed 32-bit value.
pub fn pack_varint32(v: i32) -> Vec<u8> {
    pack_varuint32(zigzag(v))
}

/// Decode a signed 32-bit value, returning it with the bytes consumed.
pub fn unpack_varint32(data: &[u8]) -> Result<(i32, usize)> {
    unpack_varuint32(data).map(|(v, n)| (unzigzag(v), n))
}

/// Encoded length of a signed value.
pub fn varint32_size(v: i32) -> usize {
    varuint32_size(zigzag(v))
}

/// Variable-length unsigned 32-bit integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarUint32(pub u32);

impl Pack for VarUint32 {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_varuint32(self.0);
    }

    fn size(&self) -> usize {
        varuint32_size(self.0)
    }
}

impl Unpack for VarUint32 {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.read_varuint32().map(VarUint32)
    }
}

/// Variable-length signed 32-bit integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarInt32(pub i32);

impl Pack for VarInt32 {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_varint32(self.0);
    }

    fn size(&self) -> usize {
        varint32_size(self.0)
    }
}

impl Unpack for VarInt32 {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.read_varint32().map(VarInt32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_and_double_byte_ranges() {
        assert_eq!(pack_varuint32(0), vec![0x00]);
        assert_eq!(pack_varuint32(127), vec![0x7f]);
        assert_eq!(pack_varuint32(128), vec![0x80, 0x01]);
        assert_eq!(pack_varuint32(16383), vec![0xff, 0x7f]);
        assert_eq!(pack_varuint32(16384).len(), 3);
        assert_eq!(pack_varuint32(u32::MAX), vec![0xff, 0xff, 0xff, 0xff, 0x0f]);
    }

    #[test]
    fn test_signed_boundaries() {
        for v in [0, -1, 1, i32::MIN, i32::MAX] {
            let bytes = pack_varint32(v);
            assert_eq!(bytes.len(), varint32_size(v));
            assert_eq!(unpack_varint32(&bytes).unwrap(), (v, bytes.len()));
        }
        assert_eq!(pack_varint32(-1), vec![0x01]);
        assert_eq!(pack_varint32(1), vec![0x02]);
    }

    #[test]
    fn test_truncated_input() {
        assert!(matches!(
            unpack_varuint32(&[0x80, 0x80]),
            Err(Error::Truncated { .. })
        ));
        assert!(matches!(unpack_varuint32(&[]), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_overlong_input() {
        assert!(unpack_varuint32(&[0xff, 0xff, 0xff, 0xff, 0xff, 0x01]).is_err());
        // Fifth byte carrying more than 4 value bits overflows 32 bits
        assert!(unpack_varuint32(&[0xff, 0xff, 0xff, 0xff, 0x1f]).is_err());
    }

    #[test]
    fn test_decoding_stops_at_terminator() {
        assert_eq!(unpack_varuint32(&[0x05, 0xff, 0xff]).unwrap(), (5, 1));
    }

    proptest! {
        #[test]
        fn varuint32_round_trips(v in any::<u32>()) {
            let bytes = pack_varuint32(v);
            prop_assert_eq!(bytes.len(), varuint32_size(v));
            prop_assert_eq!(unpack_varuint32(&bytes).unwrap(), (v, bytes.len()));
        }

        #[test]
        fn varint32_round_trips(v in any::<i32>()) {
            let bytes = pack_varint32(v);
            prop_assert_eq!(bytes.len(), VarInt32(v).size());
            prop_assert_eq!(unpack_varint32(&bytes).unwrap(), (v, bytes.len()));
        }
    }
}
