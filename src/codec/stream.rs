//! Linear byte cursor used by every encoder and decoder.

use crate::codec::varint::{pack_varint32, pack_varuint32, unpack_varint32, unpack_varuint32};
use crate::error::{Error, Result};

/// Types with a canonical binary encoding.
pub trait Pack {
    /// Append the encoding of `self`.
    fn pack(&self, enc: &mut Encoder);

    /// Exact encoded length in bytes.
    fn size(&self) -> usize;
}

/// Types that can be read back from their binary encoding.
pub trait Unpack: Sized {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self>;
}

/// Append-only output buffer.
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Encoder {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_i8(&mut self, v: i8) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_i16(&mut self, v: i16) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_varuint32(&mut self, v: u32) {
        self.buf.extend(pack_varuint32(v));
    }

    pub fn write_varint32(&mut self, v: i32) {
        self.buf.extend(pack_varint32(v));
    }

    /// Length-prefixed byte string.
    pub fn write_blob(&mut self, bytes: &[u8]) {
        self.write_varuint32(bytes.len() as u32);
        self.write_bytes(bytes);
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_blob(s.as_bytes());
    }

    /// Length-prefixed sequence of packable items.
    pub fn write_list<T: Pack>(&mut self, items: &[T]) {
        self.write_varuint32(items.len() as u32);
        for item in items {
            item.pack(self);
        }
    }

    pub fn pack<T: Pack + ?Sized>(&mut self, value: &T) {
        value.pack(self);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Read cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Decoder { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Fail unless every byte has been consumed.
    pub fn finish(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::invalid_value(
                "binary",
                format!("{} trailing byte(s)", self.remaining()),
            ))
        }
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Truncated {
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::invalid_value("bool", other.to_string())),
        }
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    pub fn read_varuint32(&mut self) -> Result<u32> {
        let (v, n) = unpack_varuint32(&self.data[self.pos..]).map_err(|e| self.at_offset(e))?;
        self.pos += n;
        Ok(v)
    }

    pub fn read_varint32(&mut self) -> Result<i32> {
        let (v, n) = unpack_varint32(&self.data[self.pos..]).map_err(|e| self.at_offset(e))?;
        self.pos += n;
        Ok(v)
    }

    pub fn read_blob(&mut self) -> Result<Vec<u8>> {
        let len = self.read_varuint32()? as usize;
        Ok(self.read_bytes(len)?.to_vec())
    }

    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_blob()?;
        String::from_utf8(bytes)
            .map_err(|e| Error::invalid_value("string", format!("invalid UTF-8: {}", e)))
    }

    pub fn read_list<T: Unpack>(&mut self) -> Result<Vec<T>> {
        let len = self.read_varuint32()? as usize;
        // Every element occupies at least one byte.
        if len > self.remaining() {
            return Err(Error::Truncated {
                offset: self.pos,
                needed: len,
                remaining: self.remaining(),
            });
        }
        (0..len).map(|_| T::unpack(self)).collect()
    }

    pub fn unpack<T: Unpack>(&mut self) -> Result<T> {
        T::unpack(self)
    }

    fn at_offset(&self, err: Error) -> Error {
        match err {
            Error::Truncated {
                needed, remaining, ..
            } => Error::Truncated {
                offset: self.pos,
                needed,
                remaining,
            },
            other => other,
        }
    }
}

macro_rules! impl_le_scalar {
    ($($ty:ty => $write:ident, $read:ident;)*) => {
        $(
            impl Pack for $ty {
                fn pack(&self, enc: &mut Encoder) {
                    enc.$write(*self);
                }

                fn size(&self) -> usize {
                    std::mem::size_of::<$ty>()
                }
            }

            impl Unpack for $ty {
                fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
                    dec.$read()
                }
            }
        )*
    };
}

impl_le_scalar! {
    u8 => write_u8, read_u8;
    u16 => write_u16, read_u16;
    u32 => write_u32, read_u32;
    u64 => write_u64, read_u64;
    i8 => write_i8, read_i8;
    i16 => write_i16, read_i16;
    i32 => write_i32, read_i32;
    i64 => write_i64, read_i64;
    bool => write_bool, read_bool;
}

impl Pack for Vec<u8> {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_blob(self);
    }

    fn size(&self) -> usize {
        crate::codec::varuint32_size(self.len() as u32) + self.len()
    }
}

impl Unpack for Vec<u8> {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.read_blob()
    }
}

impl Pack for str {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_string(self);
    }

    fn size(&self) -> usize {
        crate::codec::varuint32_size(self.len() as u32) + self.len()
    }
}

impl Pack for String {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_string(self);
    }

    fn size(&self) -> usize {
        self.as_str().size()
    }
}

impl Unpack for String {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.read_string()
    }
}
