//! Fixed-width little-endian blobs wider than the native integer types
//! the chain format supports directly.

use crate::codec::stream::{Decoder, Encoder, Pack, Unpack};
use crate::error::Result;

macro_rules! fixed_blob {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn from_bytes(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name([0u8; $len])
            }
        }

        impl Pack for $name {
            fn pack(&self, enc: &mut Encoder) {
                enc.write_bytes(&self.0);
            }

            fn size(&self) -> usize {
                $len
            }
        }

        impl Unpack for $name {
            fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
                dec.read_array::<$len>().map($name)
            }
        }
    };
}

fixed_blob!(
    /// Signed 128-bit integer, two's complement.
    Int128,
    16
);
fixed_blob!(
    /// Unsigned 128-bit integer.
    Uint128,
    16
);
fixed_blob!(
    /// Unsigned 256-bit integer.
    Uint256,
    32
);
fixed_blob!(
    /// IEEE 754 quadruple precision float, carried as opaque bytes.
    Float128,
    16
);

macro_rules! low_u64_accessors {
    ($($name:ident),*) => {
        $(
            impl $name {
                /// Zero-fill, then store `v` in the low eight bytes.
                pub fn set_u64(&mut self, v: u64) {
                    self.0 = Default::default();
                    self.0[..8].copy_from_slice(&v.to_le_bytes());
                }

                /// The low eight bytes as an integer.
                pub fn low_u64(&self) -> u64 {
                    let mut low = [0u8; 8];
                    low.copy_from_slice(&self.0[..8]);
                    u64::from_le_bytes(low)
                }
            }
        )*
    };
}

low_u64_accessors!(Uint128, Uint256);

impl From<u128> for Uint128 {
    fn from(v: u128) -> Self {
        Uint128(v.to_le_bytes())
    }
}

impl From<Uint128> for u128 {
    fn from(v: Uint128) -> Self {
        u128::from_le_bytes(v.0)
    }
}

impl From<i128> for Int128 {
    fn from(v: i128) -> Self {
        Int128(v.to_le_bytes())
    }
}

impl From<Int128> for i128 {
    fn from(v: Int128) -> Self {
        i128::from_le_bytes(v.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_bytes, to_bytes};
    use proptest::prelude::*;

    #[test]
    fn test_set_u64_zero_fills() {
        let mut v = Uint256([0xff; 32]);
        v.set_u64(0x0102_0304_0506_0708);
        assert_eq!(&v.0[..8], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert!(v.0[8..].iter().all(|b| *b == 0));
        assert_eq!(v.low_u64(), 0x0102_0304_0506_0708);
    }

    #[test]
    fn test_sizes() {
        assert_eq!(to_bytes(&Int128::default()).len(), 16);
        assert_eq!(to_bytes(&Uint128::default()).len(), 16);
        assert_eq!(to_bytes(&Uint256::default()).len(), 32);
        assert_eq!(to_bytes(&Float128::default()).len(), 16);
    }

    #[test]
    fn test_short_input_fails() {
        assert!(from_bytes::<Uint256>(&[0u8; 31]).is_err());
        assert!(from_bytes::<Int128>(&[0u8; 15]).is_err());
    }

    #[test]
    fn test_int128_negative() {
        let v = Int128::from(-1i128);
        assert_eq!(v.0, [0xff; 16]);
        assert_eq!(i128::from(v), -1);
    }

    proptest! {
        #[test]
        fn uint128_round_trips(v in any::<u128>()) {
            let blob = Uint128::from(v);
            let back: Uint128 = from_bytes(&to_bytes(&blob)).unwrap();
            prop_assert_eq!(u128::from(back), v);
        }

        #[test]
        fn uint256_round_trips(bytes in prop::array::uniform32(any::<u8>())) {
            let blob = Uint256(bytes);
            prop_assert_eq!(from_bytes::<Uint256>(&to_bytes(&blob)).unwrap(), blob);
        }
    }
}
