//! Token symbols and assets.
//!
//! A symbol packs its precision into the lowest byte of a `u64` and up to
//! seven uppercase ticker characters into the bytes above it.

use crate::codec::{Decoder, Encoder, Pack, Unpack};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

const MAX_CODE_LEN: usize = 7;
const MAX_PRECISION: u8 = 18;

/// Ticker without precision, e.g. `EOS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolCode(pub u64);

impl FromStr for SymbolCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || s.len() > MAX_CODE_LEN {
            return Err(Error::InvalidSymbol(format!(
                "ticker '{}' must be 1 to {} characters",
                s, MAX_CODE_LEN
            )));
        }
        let mut value = 0u64;
        for (i, c) in s.bytes().enumerate() {
            if !c.is_ascii_uppercase() {
                return Err(Error::InvalidSymbol(format!(
                    "ticker '{}' must be uppercase A-Z",
                    s
                )));
            }
            value |= u64::from(c) << (8 * i);
        }
        Ok(SymbolCode(value))
    }
}

impl fmt::Display for SymbolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut v = self.0;
        while v & 0xff != 0 {
            write!(f, "{}", (v & 0xff) as u8 as char)?;
            v >>= 8;
        }
        Ok(())
    }
}

/// Precision plus ticker, e.g. `4,EOS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    pub value: u64,
}

impl Symbol {
    pub fn new(ticker: &str, precision: u8) -> Result<Self> {
        if precision > MAX_PRECISION {
            return Err(Error::InvalidSymbol(format!(
                "precision {} exceeds {}",
                precision, MAX_PRECISION
            )));
        }
        let code: SymbolCode = ticker.parse()?;
        Ok(Symbol {
            value: (code.0 << 8) | u64::from(precision),
        })
    }

    pub fn precision(&self) -> u8 {
        (self.value & 0xff) as u8
    }

    pub fn code(&self) -> SymbolCode {
        SymbolCode(self.value >> 8)
    }
}

impl FromStr for Symbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (precision, ticker) = s
            .split_once(',')
            .ok_or_else(|| Error::InvalidSymbol(format!("'{}' is not <precision>,<ticker>", s)))?;
        let precision = precision
            .trim()
            .parse::<u8>()
            .map_err(|_| Error::InvalidSymbol(format!("bad precision in '{}'", s)))?;
        Symbol::new(ticker.trim(), precision)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision(), self.code())
    }
}

/// Signed amount of a symbol, e.g. `1.0000 EOS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Asset {
    pub amount: i64,
    pub symbol: Symbol,
}

impl FromStr for Asset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::invalid_value("asset", s);
        let (amount, ticker) = s.trim().split_once(' ').ok_or_else(invalid)?;
        let (negative, digits) = match amount.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, amount),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty()
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let precision = u8::try_from(frac.len()).map_err(|_| invalid())?;
        let symbol = Symbol::new(ticker.trim(), precision)?;
        let magnitude: i64 = format!("{}{}", whole, frac)
            .parse()
            .map_err(|_| invalid())?;
        Ok(Asset {
            amount: if negative { -magnitude } else { magnitude },
            symbol,
        })
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = usize::from(self.symbol.precision());
        let sign = if self.amount < 0 { "-" } else { "" };
        let magnitude = self.amount.unsigned_abs();
        if precision == 0 {
            return write!(f, "{}{} {}", sign, magnitude, self.symbol.code());
        }
        let digits = format!("{:0>width$}", magnitude, width = precision + 1);
        let (whole, frac) = digits.split_at(digits.len() - precision);
        write!(f, "{}{}.{} {}", sign, whole, frac, self.symbol.code())
    }
}

impl Pack for SymbolCode {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_u64(self.0);
    }

    fn size(&self) -> usize {
        8
    }
}

impl Unpack for SymbolCode {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.read_u64().map(SymbolCode)
    }
}

impl Pack for Symbol {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_u64(self.value);
    }

    fn size(&self) -> usize {
        8
    }
}

impl Unpack for Symbol {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        let symbol = Symbol {
            value: dec.read_u64()?,
        };
        if symbol.precision() > MAX_PRECISION {
            return Err(Error::InvalidSymbol(format!(
                "precision {} exceeds {}",
                symbol.precision(),
                MAX_PRECISION
            )));
        }
        Ok(symbol)
    }
}

impl Pack for Asset {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_i64(self.amount);
        self.symbol.pack(enc);
    }

    fn size(&self) -> usize {
        16
    }
}

impl Unpack for Asset {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Asset {
            amount: dec.read_i64()?,
            symbol: dec.unpack()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_bytes, to_bytes};

    #[test]
    fn test_symbol_layout() {
        let sym = Symbol::new("EOS", 4).unwrap();
        assert_eq!(sym.value, 1397703940);
        assert_eq!(sym.precision(), 4);
        assert_eq!(sym.code().to_string(), "EOS");
        assert_eq!(sym.to_string(), "4,EOS");
        assert_eq!("4,EOS".parse::<Symbol>().unwrap(), sym);
    }

    #[test]
    fn test_symbol_rejects_long_ticker() {
        assert!(Symbol::new("ABCDEFGH", 4).is_err());
        assert!(Symbol::new("ABCDEFG", 4).is_ok());
        assert!(Symbol::new("eos", 4).is_err());
        assert!(Symbol::new("EOS", 19).is_err());
    }

    #[test]
    fn test_asset_text() {
        let a: Asset = "1.0000 EOS".parse().unwrap();
        assert_eq!(a.amount, 10000);
        assert_eq!(a.symbol.precision(), 4);
        assert_eq!(a.to_string(), "1.0000 EOS");

        let a: Asset = "-0.0500 SYS".parse().unwrap();
        assert_eq!(a.amount, -500);
        assert_eq!(a.to_string(), "-0.0500 SYS");

        let a: Asset = "42 WAX".parse().unwrap();
        assert_eq!(a.symbol.precision(), 0);
        assert_eq!(a.to_string(), "42 WAX");
    }

    #[test]
    fn test_asset_rejects_garbage() {
        for bad in ["1.0000", "abc EOS", "1.0x EOS", ".5 EOS", "1.0000 eos"] {
            assert!(bad.parse::<Asset>().is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_unpack_rejects_oversized_precision() {
        for bytes in [
            "010000000000000040454f5300000000",
            "010000000000000014454f5300000000",
        ] {
            let raw = hex::decode(bytes).unwrap();
            let err = from_bytes::<Asset>(&raw).unwrap_err();
            assert!(matches!(err, Error::InvalidSymbol(_)), "{}", err);
        }

        let raw = hex::decode("010000000000000012454f5300000000").unwrap();
        let asset = from_bytes::<Asset>(&raw).unwrap();
        assert_eq!(asset.to_string(), "0.000000000000000001 EOS");
    }

    #[test]
    fn test_asset_display_wide_precision() {
        let asset = Asset {
            amount: -12,
            symbol: Symbol {
                value: (Symbol::new("EOS", 0).unwrap().value) | 40,
            },
        };
        assert_eq!(
            asset.to_string(),
            format!("-0.{}12 EOS", "0".repeat(38))
        );
    }

    #[test]
    fn test_asset_binary() {
        let a: Asset = "1.0000 EOS".parse().unwrap();
        assert_eq!(
            hex::encode(to_bytes(&a)),
            "102700000000000004454f5300000000"
        );
    }
}
