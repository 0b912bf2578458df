//! Chain time types and their ISO-8601-like text form.
//!
//! Text is always UTC without a timezone suffix, e.g. `2021-03-04T05:06:07`.
//! Sub-second precision is appended as `.mmm` (or `.uuuuuu` when the value
//! is not a whole millisecond) for the types that carry it.

use crate::codec::stream::{Decoder, Encoder, Pack, Unpack};
use crate::error::{Error, Result};
use ::time::macros::format_description;
use ::time::{OffsetDateTime, PrimitiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Block timestamps count half-second slots from 2000-01-01T00:00:00.
const BLOCK_TIMESTAMP_EPOCH_MS: u64 = 946_684_800_000;
const BLOCK_INTERVAL_MS: u64 = 500;

fn format_seconds(secs: i64) -> Result<String> {
    let dt = OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| Error::invalid_value("time", format!("{}: {}", secs, e)))?;
    dt.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second]"
    ))
    .map_err(|e| Error::FormatError(e.to_string()))
}

fn format_micros(micros: u64) -> Result<String> {
    let secs = i64::try_from(micros / 1_000_000)
        .map_err(|_| Error::invalid_value("time_point", micros.to_string()))?;
    let frac = micros % 1_000_000;
    let base = format_seconds(secs)?;
    if frac % 1000 == 0 {
        Ok(format!("{}.{:03}", base, frac / 1000))
    } else {
        Ok(format!("{}.{:06}", base, frac))
    }
}

/// Parse `YYYY-MM-DDTHH:MM:SS[.f{1,6}]` into microseconds since the epoch.
fn parse_micros(kind: &'static str, s: &str) -> Result<i128> {
    let s = s.trim().trim_end_matches('Z');
    let (whole, frac) = match s.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (s, None),
    };

    let dt = PrimitiveDateTime::parse(
        whole,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .map_err(|_| Error::invalid_value(kind, s))?;
    let secs = i128::from(dt.assume_utc().unix_timestamp());

    let frac_micros = match frac {
        None => 0,
        Some(f) if !f.is_empty() && f.len() <= 6 && f.bytes().all(|b| b.is_ascii_digit()) => {
            let padded = format!("{:0<6}", f);
            padded
                .parse::<i128>()
                .map_err(|_| Error::invalid_value(kind, s))?
        }
        Some(_) => return Err(Error::invalid_value(kind, s)),
    };

    Ok(secs * 1_000_000 + frac_micros)
}

/// Microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimePoint {
    pub elapsed: u64,
}

impl TimePoint {
    pub fn to_iso_string(&self) -> Result<String> {
        format_micros(self.elapsed)
    }
}

impl FromStr for TimePoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let micros = parse_micros("time_point", s)?;
        u64::try_from(micros)
            .map(|elapsed| TimePoint { elapsed })
            .map_err(|_| Error::invalid_value("time_point", s))
    }
}

/// Whole seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimePointSec {
    pub utc_seconds: u32,
}

impl TimePointSec {
    pub fn new(utc_seconds: u32) -> Self {
        TimePointSec { utc_seconds }
    }

    /// Current wall-clock time, truncated to seconds.
    pub fn now() -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        TimePointSec {
            utc_seconds: u32::try_from(now).unwrap_or(u32::MAX),
        }
    }

    pub fn saturating_add(self, secs: u32) -> Self {
        TimePointSec {
            utc_seconds: self.utc_seconds.saturating_add(secs),
        }
    }

    pub fn to_iso_string(&self) -> Result<String> {
        format_seconds(i64::from(self.utc_seconds))
    }
}

impl FromStr for TimePointSec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let micros = parse_micros("time_point_sec", s)?;
        if micros % 1_000_000 != 0 {
            return Err(Error::invalid_value("time_point_sec", s));
        }
        u32::try_from(micros / 1_000_000)
            .map(TimePointSec::new)
            .map_err(|_| Error::invalid_value("time_point_sec", s))
    }
}

/// Half-second block slot since 2000-01-01T00:00:00.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockTimestamp {
    pub slot: u32,
}

impl BlockTimestamp {
    pub fn to_iso_string(&self) -> Result<String> {
        let ms = u64::from(self.slot) * BLOCK_INTERVAL_MS + BLOCK_TIMESTAMP_EPOCH_MS;
        format_micros(ms * 1000)
    }
}

impl FromStr for BlockTimestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let micros = parse_micros("block_timestamp_type", s)?;
        let since_epoch = micros - i128::from(BLOCK_TIMESTAMP_EPOCH_MS) * 1000;
        let slot_micros = i128::from(BLOCK_INTERVAL_MS) * 1000;
        if since_epoch < 0 || since_epoch % slot_micros != 0 {
            return Err(Error::invalid_value("block_timestamp_type", s));
        }
        u32::try_from(since_epoch / slot_micros)
            .map(|slot| BlockTimestamp { slot })
            .map_err(|_| Error::invalid_value("block_timestamp_type", s))
    }
}

impl Pack for TimePoint {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_u64(self.elapsed);
    }

    fn size(&self) -> usize {
        8
    }
}

impl Unpack for TimePoint {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.read_u64().map(|elapsed| TimePoint { elapsed })
    }
}

impl Pack for TimePointSec {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_u32(self.utc_seconds);
    }

    fn size(&self) -> usize {
        4
    }
}

impl Unpack for TimePointSec {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.read_u32().map(TimePointSec::new)
    }
}

impl Pack for BlockTimestamp {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_u32(self.slot);
    }

    fn size(&self) -> usize {
        4
    }
}

impl Unpack for BlockTimestamp {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.read_u32().map(|slot| BlockTimestamp { slot })
    }
}

impl Serialize for TimePointSec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let text = self.to_iso_string().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for TimePointSec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
