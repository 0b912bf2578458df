//! Account and action names packed into 64-bit integers.
//!
//! A name is up to 13 characters from `.12345a-z`. The first twelve use five
//! bits each, high bits first; the thirteenth only has four bits left and is
//! limited to `.1-5a-j`.

use crate::codec::{Decoder, Encoder, Pack, Unpack};
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";
const MAX_NAME_LEN: usize = 13;

fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some(u64::from(c - b'a') + 6),
        b'1'..=b'5' => Some(u64::from(c - b'1') + 1),
        b'.' => Some(0),
        _ => None,
    }
}

/// A packed account, action, or permission name.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(pub u64);

impl Name {
    pub const fn from_u64(value: u64) -> Self {
        Name(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // Trailing dots would be lost on the way back to text.
        if s.len() > MAX_NAME_LEN || s.ends_with('.') {
            return Err(Error::InvalidName(s.to_string()));
        }

        let mut value = 0u64;
        for (i, c) in s.bytes().enumerate() {
            let sym = char_to_symbol(c).ok_or_else(|| Error::InvalidName(s.to_string()))?;
            if i < MAX_NAME_LEN - 1 {
                value |= sym << (64 - 5 * (i + 1));
            } else if sym > 0x0f {
                return Err(Error::InvalidName(s.to_string()));
            } else {
                value |= sym;
            }
        }
        Ok(Name(value))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = [b'.'; MAX_NAME_LEN];
        let mut tmp = self.0;
        for i in 0..MAX_NAME_LEN {
            let (mask, shift) = if i == 0 { (0x0f, 4) } else { (0x1f, 5) };
            out[MAX_NAME_LEN - 1 - i] = CHARMAP[(tmp & mask) as usize];
            tmp >>= shift;
        }
        let len = out.iter().rposition(|c| *c != b'.').map_or(0, |p| p + 1);
        // CHARMAP is ASCII
        f.write_str(std::str::from_utf8(&out[..len]).map_err(|_| fmt::Error)?)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self)
    }
}

/// Pack a name string into its integer form.
pub fn name_to_u64(s: &str) -> Result<u64> {
    s.parse::<Name>().map(|n| n.0)
}

/// Render an integer as a name string.
pub fn u64_to_name(v: u64) -> String {
    Name(v).to_string()
}

impl Pack for Name {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_u64(self.0);
    }

    fn size(&self) -> usize {
        8
    }
}

impl Unpack for Name {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.read_u64().map(Name)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_values() {
        assert_eq!(name_to_u64("eosio").unwrap(), 6138663577826885632);
        assert_eq!(name_to_u64("eosio.token").unwrap(), 6138663591592764928);
        assert_eq!(name_to_u64("transfer").unwrap(), 14829575313431724032);
        assert_eq!(name_to_u64("").unwrap(), 0);
        assert_eq!(u64_to_name(3773036822876127232), "alice");
        assert_eq!(u64_to_name(0), "");
        assert_eq!(u64_to_name(u64::MAX), "zzzzzzzzzzzzj");
    }

    #[test]
    fn test_invalid_names() {
        for bad in ["Alice", "bob!", "eosio6", "abcdefghijklmn", "zzzzzzzzzzzzk", "alice."] {
            assert!(bad.parse::<Name>().is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_json_form() {
        let n: Name = serde_json::from_str("\"eosio.token\"").unwrap();
        assert_eq!(serde_json::to_string(&n).unwrap(), "\"eosio.token\"");
    }

    fn arb_name() -> impl Strategy<Value = String> {
        // Twelve free characters, an optional restricted thirteenth, no trailing dot.
        (
            "[.1-5a-z]{0,11}[1-5a-z]",
            proptest::option::of("[1-5a-j]"),
        )
            .prop_map(|(head, tail)| match tail {
                Some(t) if head.len() == 12 => format!("{}{}", head, t),
                _ => head,
            })
    }

    proptest! {
        #[test]
        fn text_round_trips(s in arb_name()) {
            let n: Name = s.parse().unwrap();
            prop_assert_eq!(n.to_string(), s);
        }

        #[test]
        fn integer_round_trips(v in any::<u64>()) {
            prop_assert_eq!(name_to_u64(&u64_to_name(v)).unwrap(), v);
        }
    }
}
