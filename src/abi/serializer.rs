//! Schema-directed conversion between [`Value`] and binary.

use super::types::{Builtin, Schema, TypePlan};
use crate::codec::{
    BlockTimestamp, Decoder, Encoder, Float128, Int128, TimePoint, TimePointSec, Uint128, Unpack,
};
use crate::crypto::{PublicKey, Signature};
use crate::error::{Error, Result};
use crate::name::Name;
use crate::symbol::{Asset, Symbol, SymbolCode};
use crate::value::{Value, ValueMap};
use std::str::FromStr;

/// Values nested deeper than this are rejected in both directions.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Walks a compiled schema to pack or unpack one value.
pub struct Serializer<'s> {
    schema: &'s Schema,
}

fn scalar<'v>(ty: &str, value: &'v Value) -> Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| Error::mismatch(ty, format!("expected a scalar, found {}", value.kind_name())))
}

fn parse<T: FromStr>(ty: &str, text: &str) -> Result<T> {
    text.trim()
        .parse()
        .map_err(|_| Error::mismatch(ty, format!("'{}' is not a valid {}", text, ty)))
}

fn parse_bool(text: &str) -> Result<bool> {
    match text {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(Error::mismatch("bool", format!("'{}' is not a boolean", other))),
    }
}

fn fixed_hex(ty: &str, text: &str, len: usize) -> Result<Vec<u8>> {
    let bytes = hex::decode(text.trim_start_matches("0x"))?;
    if bytes.len() != len {
        return Err(Error::mismatch(
            ty,
            format!("expected {} bytes, got {}", len, bytes.len()),
        ));
    }
    Ok(bytes)
}

fn checksum_len(b: Builtin) -> Option<usize> {
    match b {
        Builtin::Checksum160 => Some(20),
        Builtin::Checksum256 => Some(32),
        Builtin::Checksum512 => Some(64),
        _ => None,
    }
}

impl<'s> Serializer<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Serializer { schema }
    }

    pub fn pack(&self, plan: &TypePlan, value: &Value) -> Result<Vec<u8>> {
        let mut enc = Encoder::new();
        self.pack_into(plan, value, &mut enc, 0)?;
        Ok(enc.into_bytes())
    }

    /// Decode exactly one value; trailing bytes are an error.
    pub fn unpack(&self, plan: &TypePlan, data: &[u8]) -> Result<Value> {
        let mut dec = Decoder::new(data);
        let value = self.unpack_from(plan, &mut dec, 0)?;
        dec.finish()?;
        Ok(value)
    }

    fn check_depth(&self, plan: &TypePlan, depth: usize) -> Result<()> {
        if depth > MAX_NESTING_DEPTH {
            return Err(Error::mismatch(
                self.schema.describe(plan),
                format!("nesting deeper than {}", MAX_NESTING_DEPTH),
            ));
        }
        Ok(())
    }

    pub fn pack_into(
        &self,
        plan: &TypePlan,
        value: &Value,
        enc: &mut Encoder,
        depth: usize,
    ) -> Result<()> {
        self.check_depth(plan, depth)?;
        match plan {
            TypePlan::Builtin(b) => pack_builtin(*b, value, enc),
            TypePlan::Struct(i) => self.pack_struct(*i, value, enc, depth),
            TypePlan::Variant(i) => {
                let variant = &self.schema.variants[*i];
                let pair = value.as_list().filter(|items| items.len() == 2).ok_or_else(|| {
                    Error::mismatch(&variant.name, "expected [\"type\", value]")
                })?;
                let tag = scalar(&variant.name, &pair[0])?;
                let (index, (_, option)) = variant
                    .options
                    .iter()
                    .enumerate()
                    .find(|(_, (name, _))| name == tag)
                    .ok_or_else(|| {
                        Error::mismatch(&variant.name, format!("'{}' is not an option", tag))
                    })?;
                enc.write_varuint32(index as u32);
                self.pack_into(option, &pair[1], enc, depth + 1)
            }
            TypePlan::Array(elem) => {
                let items = self.list(plan, value)?;
                let count = u32::try_from(items.len())
                    .map_err(|_| Error::mismatch(self.schema.describe(plan), "too many items"))?;
                enc.write_varuint32(count);
                items
                    .iter()
                    .try_for_each(|item| self.pack_into(elem, item, enc, depth + 1))
            }
            TypePlan::FixedArray(elem, len) => {
                let items = self.list(plan, value)?;
                if items.len() != *len {
                    return Err(Error::mismatch(
                        self.schema.describe(plan),
                        format!("expected {} items, got {}", len, items.len()),
                    ));
                }
                enc.write_varuint32(*len as u32);
                items
                    .iter()
                    .try_for_each(|item| self.pack_into(elem, item, enc, depth + 1))
            }
            TypePlan::Optional(inner) => {
                if value.is_null() {
                    enc.write_u8(0);
                    Ok(())
                } else {
                    enc.write_u8(1);
                    self.pack_into(inner, value, enc, depth + 1)
                }
            }
            TypePlan::Extension(inner) => self.pack_into(inner, value, enc, depth + 1),
        }
    }

    fn list<'v>(&self, plan: &TypePlan, value: &'v Value) -> Result<&'v [Value]> {
        value.as_list().ok_or_else(|| {
            Error::mismatch(
                self.schema.describe(plan),
                format!("expected a list, found {}", value.kind_name()),
            )
        })
    }

    fn pack_struct(&self, index: usize, value: &Value, enc: &mut Encoder, depth: usize) -> Result<()> {
        let s = &self.schema.structs[index];
        let map = value.as_map().ok_or_else(|| {
            Error::mismatch(&s.name, format!("expected an object, found {}", value.kind_name()))
        })?;

        let mut extensions_ended = false;
        for field in &s.fields {
            match (map.get(&field.name), &field.plan) {
                (Some(v), _) if !extensions_ended => {
                    self.pack_into(&field.plan, v, enc, depth + 1)?;
                }
                (Some(_), _) => {
                    return Err(Error::mismatch(
                        &s.name,
                        format!("field '{}' follows an omitted extension", field.name),
                    ));
                }
                (None, TypePlan::Extension(_)) => extensions_ended = true,
                (None, TypePlan::Optional(_)) if !extensions_ended => enc.write_u8(0),
                (None, _) if extensions_ended => {}
                (None, _) => {
                    return Err(Error::MissingField {
                        owner: s.name.clone(),
                        field: field.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn unpack_from(&self, plan: &TypePlan, dec: &mut Decoder<'_>, depth: usize) -> Result<Value> {
        self.check_depth(plan, depth)?;
        match plan {
            TypePlan::Builtin(b) => unpack_builtin(*b, dec),
            TypePlan::Struct(i) => {
                let s = &self.schema.structs[*i];
                let mut map = ValueMap::with_capacity(s.fields.len());
                for field in &s.fields {
                    match &field.plan {
                        TypePlan::Extension(_) if dec.is_empty() => break,
                        TypePlan::Optional(inner) => {
                            if dec.read_bool()? {
                                let v = self.unpack_from(inner, dec, depth + 2)?;
                                map.insert(field.name.clone(), v);
                            }
                        }
                        other => {
                            let v = self.unpack_from(other, dec, depth + 1)?;
                            map.insert(field.name.clone(), v);
                        }
                    }
                }
                Ok(Value::Map(map))
            }
            TypePlan::Variant(i) => {
                let variant = &self.schema.variants[*i];
                let index = dec.read_varuint32()? as usize;
                let (name, option) = variant.options.get(index).ok_or_else(|| {
                    Error::mismatch(&variant.name, format!("option index {} out of range", index))
                })?;
                let inner = self.unpack_from(option, dec, depth + 1)?;
                Ok(Value::List(vec![Value::from(name.as_str()), inner]))
            }
            TypePlan::Array(elem) => {
                let count = dec.read_varuint32()? as usize;
                self.unpack_items(elem, count, dec, depth)
            }
            TypePlan::FixedArray(elem, len) => {
                let count = dec.read_varuint32()? as usize;
                if count != *len {
                    return Err(Error::mismatch(
                        self.schema.describe(plan),
                        format!("expected {} items, found {}", len, count),
                    ));
                }
                self.unpack_items(elem, count, dec, depth)
            }
            TypePlan::Optional(inner) => {
                if dec.read_bool()? {
                    self.unpack_from(inner, dec, depth + 1)
                } else {
                    Ok(Value::null())
                }
            }
            TypePlan::Extension(inner) => self.unpack_from(inner, dec, depth + 1),
        }
    }

    fn unpack_items(
        &self,
        elem: &TypePlan,
        count: usize,
        dec: &mut Decoder<'_>,
        depth: usize,
    ) -> Result<Value> {
        if count > dec.remaining() {
            return Err(Error::Truncated {
                offset: dec.position(),
                needed: count,
                remaining: dec.remaining(),
            });
        }
        (0..count)
            .map(|_| self.unpack_from(elem, dec, depth + 1))
            .collect::<Result<Vec<_>>>()
            .map(Value::List)
    }
}

fn pack_extended_asset(value: &Value, enc: &mut Encoder) -> Result<()> {
    let ty = Builtin::ExtendedAsset.as_str();
    let map = value
        .as_map()
        .ok_or_else(|| Error::mismatch(ty, format!("expected an object, found {}", value.kind_name())))?;
    let field = |name: &str| {
        map.get(name).ok_or_else(|| Error::MissingField {
            owner: ty.to_string(),
            field: name.to_string(),
        })
    };
    let quantity: Asset = scalar("asset", field("quantity")?)?.parse()?;
    let contract: Name = scalar("name", field("contract")?)?.parse()?;
    enc.pack(&quantity);
    enc.pack(&contract);
    Ok(())
}

fn pack_builtin(b: Builtin, value: &Value, enc: &mut Encoder) -> Result<()> {
    let ty = b.as_str();
    let text = || scalar(ty, value);
    match b {
        Builtin::Bool => enc.write_bool(parse_bool(text()?)?),
        Builtin::Int8 => enc.write_i8(parse(ty, text()?)?),
        Builtin::Uint8 => enc.write_u8(parse(ty, text()?)?),
        Builtin::Int16 => enc.write_i16(parse(ty, text()?)?),
        Builtin::Uint16 => enc.write_u16(parse(ty, text()?)?),
        Builtin::Int32 => enc.write_i32(parse(ty, text()?)?),
        Builtin::Uint32 => enc.write_u32(parse(ty, text()?)?),
        Builtin::Int64 => enc.write_i64(parse(ty, text()?)?),
        Builtin::Uint64 => enc.write_u64(parse(ty, text()?)?),
        Builtin::Int128 => enc.pack(&Int128::from(parse::<i128>(ty, text()?)?)),
        Builtin::Uint128 => enc.pack(&Uint128::from(parse::<u128>(ty, text()?)?)),
        Builtin::VarInt32 => enc.write_varint32(parse(ty, text()?)?),
        Builtin::VarUint32 => enc.write_varuint32(parse(ty, text()?)?),
        Builtin::Float32 => enc.write_f32(parse(ty, text()?)?),
        Builtin::Float64 => enc.write_f64(parse(ty, text()?)?),
        Builtin::Float128 => enc.write_bytes(&fixed_hex(ty, text()?, Float128::LEN)?),
        Builtin::TimePoint => enc.pack(&text()?.parse::<TimePoint>()?),
        Builtin::TimePointSec => enc.pack(&text()?.parse::<TimePointSec>()?),
        Builtin::BlockTimestamp => enc.pack(&text()?.parse::<BlockTimestamp>()?),
        Builtin::Name => enc.pack(&text()?.parse::<Name>()?),
        Builtin::Bytes => enc.write_blob(&hex::decode(text()?)?),
        Builtin::String => enc.write_string(text()?),
        Builtin::Checksum160 | Builtin::Checksum256 | Builtin::Checksum512 => {
            let len = checksum_len(b).unwrap_or_default();
            enc.write_bytes(&fixed_hex(ty, text()?, len)?);
        }
        Builtin::PublicKey => enc.pack(&text()?.parse::<PublicKey>()?),
        Builtin::Signature => enc.pack(&text()?.parse::<Signature>()?),
        Builtin::Symbol => enc.pack(&text()?.parse::<Symbol>()?),
        Builtin::SymbolCode => enc.pack(&text()?.parse::<SymbolCode>()?),
        Builtin::Asset => enc.pack(&text()?.parse::<Asset>()?),
        Builtin::ExtendedAsset => pack_extended_asset(value, enc)?,
    }
    Ok(())
}

fn unpack_builtin(b: Builtin, dec: &mut Decoder<'_>) -> Result<Value> {
    let text = match b {
        Builtin::Bool => dec.read_bool()?.to_string(),
        Builtin::Int8 => dec.read_i8()?.to_string(),
        Builtin::Uint8 => dec.read_u8()?.to_string(),
        Builtin::Int16 => dec.read_i16()?.to_string(),
        Builtin::Uint16 => dec.read_u16()?.to_string(),
        Builtin::Int32 => dec.read_i32()?.to_string(),
        Builtin::Uint32 => dec.read_u32()?.to_string(),
        Builtin::Int64 => dec.read_i64()?.to_string(),
        Builtin::Uint64 => dec.read_u64()?.to_string(),
        Builtin::Int128 => i128::from(Int128::unpack(dec)?).to_string(),
        Builtin::Uint128 => u128::from(Uint128::unpack(dec)?).to_string(),
        Builtin::VarInt32 => dec.read_varint32()?.to_string(),
        Builtin::VarUint32 => dec.read_varuint32()?.to_string(),
        Builtin::Float32 => dec.read_f32()?.to_string(),
        Builtin::Float64 => dec.read_f64()?.to_string(),
        Builtin::Float128 => format!("0x{}", hex::encode(Float128::unpack(dec)?.as_bytes())),
        Builtin::TimePoint => TimePoint::unpack(dec)?.to_iso_string()?,
        Builtin::TimePointSec => TimePointSec::unpack(dec)?.to_iso_string()?,
        Builtin::BlockTimestamp => BlockTimestamp::unpack(dec)?.to_iso_string()?,
        Builtin::Name => Name::unpack(dec)?.to_string(),
        Builtin::Bytes => hex::encode(dec.read_blob()?),
        Builtin::String => dec.read_string()?,
        Builtin::Checksum160 | Builtin::Checksum256 | Builtin::Checksum512 => {
            hex::encode(dec.read_bytes(checksum_len(b).unwrap_or_default())?)
        }
        Builtin::PublicKey => PublicKey::unpack(dec)?.to_string(),
        Builtin::Signature => Signature::unpack(dec)?.to_string(),
        Builtin::Symbol => Symbol::unpack(dec)?.to_string(),
        Builtin::SymbolCode => SymbolCode::unpack(dec)?.to_string(),
        Builtin::Asset => Asset::unpack(dec)?.to_string(),
        Builtin::ExtendedAsset => {
            let quantity = Asset::unpack(dec)?;
            let contract = Name::unpack(dec)?;
            let mut map = ValueMap::new();
            map.insert("quantity".to_string(), Value::from(quantity.to_string()));
            map.insert("contract".to_string(), Value::from(contract.to_string()));
            return Ok(Value::Map(map));
        }
    };
    Ok(Value::String(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::AbiDef;

    const ABI: &str = r#"{
        "version": "eosio::abi/1.2",
        "types": [{"new_type_name": "account_name", "type": "name"}],
        "structs": [
            {"name": "abc", "base": "", "fields": [
                {"name": "a", "type": "uint64"},
                {"name": "b", "type": "string"},
                {"name": "c", "type": "uint32[]"}]},
            {"name": "opt", "base": "", "fields": [
                {"name": "who", "type": "account_name"},
                {"name": "note", "type": "string?"},
                {"name": "extra", "type": "uint8$"}]},
            {"name": "pick", "base": "", "fields": [{"name": "v", "type": "num_or_text"}]},
            {"name": "node", "base": "", "fields": [{"name": "kids", "type": "node[]"}]},
            {"name": "all", "base": "", "fields": [
                {"name": "flag", "type": "bool"},
                {"name": "small", "type": "int8"},
                {"name": "big", "type": "int128"},
                {"name": "vi", "type": "varint32"},
                {"name": "f", "type": "float64"},
                {"name": "tp", "type": "time_point"},
                {"name": "tps", "type": "time_point_sec"},
                {"name": "bt", "type": "block_timestamp_type"},
                {"name": "blob", "type": "bytes"},
                {"name": "digest", "type": "checksum256"},
                {"name": "sym", "type": "symbol"},
                {"name": "code", "type": "symbol_code"},
                {"name": "xa", "type": "extended_asset"},
                {"name": "quad", "type": "uint16[2]"}]}
        ],
        "variants": [{"name": "num_or_text", "types": ["uint32", "string"]}]
    }"#;

    fn schema() -> Schema {
        Schema::compile(&AbiDef::from_json(ABI).unwrap()).unwrap()
    }

    fn round_trip(ty: &str, json: &str) -> (Vec<u8>, Value) {
        let schema = schema();
        let plan = schema.resolve(ty).unwrap();
        let ser = Serializer::new(&schema);
        let bytes = ser.pack(&plan, &Value::parse(json).unwrap()).unwrap();
        let back = ser.unpack(&plan, &bytes).unwrap();
        (bytes, back)
    }

    #[test]
    fn test_struct_round_trip() {
        let (bytes, back) = round_trip("abc", r#"{"a":"1","b":"hello","c":["1","2","3"]}"#);
        assert_eq!(
            hex::encode(&bytes),
            "01000000000000000568656c6c6f03010000000200000003000000"
        );
        assert_eq!(back.to_json(), r#"{"a":1,"b":"hello","c":[1,2,3]}"#);
    }

    #[test]
    fn test_optional_and_extension() {
        let (bytes, back) = round_trip("opt", r#"{"who":"alice"}"#);
        assert_eq!(bytes.len(), 9);
        assert_eq!(back.to_json(), r#"{"who":"alice"}"#);

        let (bytes, back) = round_trip("opt", r#"{"who":"alice","note":"hi","extra":7}"#);
        assert_eq!(bytes.len(), 8 + 1 + 3 + 1);
        assert_eq!(back.to_json(), r#"{"who":"alice","note":"hi","extra":7}"#);

        let (_, back) = round_trip("opt", r#"{"who":"alice","note":null}"#);
        assert_eq!(back.to_json(), r#"{"who":"alice"}"#);
    }

    #[test]
    fn test_variant() {
        let (bytes, back) = round_trip("pick", r#"{"v":["string","yo"]}"#);
        assert_eq!(hex::encode(&bytes), "0102796f");
        assert_eq!(back.to_json(), r#"{"v":["string","yo"]}"#);

        let schema = schema();
        let plan = schema.resolve("pick").unwrap();
        let err = Serializer::new(&schema)
            .pack(&plan, &Value::parse(r#"{"v":["int8","1"]}"#).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_builtins_round_trip() {
        let json = r#"{"flag":"true","small":"-3","big":"-170141183460469231731687303715884105728",
            "vi":"-64","f":"1.5","tp":"2021-03-04T05:06:07.500","tps":"2021-03-04T05:06:07",
            "bt":"2000-01-01T00:00:00.500","blob":"beef",
            "digest":"0000000000000000000000000000000000000000000000000000000000000001",
            "sym":"4,EOS","code":"EOS","xa":{"quantity":"1.0000 EOS","contract":"eosio.token"},
            "quad":["1","2"]}"#;
        let (_, back) = round_trip("all", json);
        assert_eq!(back, Value::parse(json).unwrap());
    }

    #[test]
    fn test_block_timestamp_must_land_on_slot() {
        let schema = schema();
        let plan = schema.resolve("block_timestamp_type").unwrap();
        let ser = Serializer::new(&schema);
        assert!(ser.pack(&plan, &Value::parse(r#""2000-01-01T00:00:00.250""#).unwrap()).is_err());

        let bytes = ser
            .pack(&plan, &Value::parse(r#""2000-01-01T00:00:01.500""#).unwrap())
            .unwrap();
        assert_eq!(bytes, vec![3, 0, 0, 0]);
        let back = ser.unpack(&plan, &bytes).unwrap();
        assert_eq!(back, Value::parse(r#""2000-01-01T00:00:01.500""#).unwrap());
    }

    #[test]
    fn test_missing_field() {
        let schema = schema();
        let plan = schema.resolve("abc").unwrap();
        let err = Serializer::new(&schema)
            .pack(&plan, &Value::parse(r#"{"a":"1","c":[]}"#).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::MissingField { field, .. } if field == "b"));
    }

    #[test]
    fn test_mistyped_field() {
        let schema = schema();
        let plan = schema.resolve("abc").unwrap();
        let ser = Serializer::new(&schema);
        for bad in [
            r#"{"a":"x","b":"s","c":[]}"#,
            r#"{"a":"1","b":"s","c":"nope"}"#,
            r#"{"a":"-1","b":"s","c":[]}"#,
        ] {
            let err = ser.pack(&plan, &Value::parse(bad).unwrap()).unwrap_err();
            assert!(matches!(err, Error::TypeMismatch { .. }), "{}", bad);
        }
    }

    #[test]
    fn test_fixed_array_length_checked() {
        let schema = schema();
        let plan = schema.resolve("uint16[2]").unwrap();
        let ser = Serializer::new(&schema);
        assert!(ser.pack(&plan, &Value::parse(r#"["1"]"#).unwrap()).is_err());
    }

    #[test]
    fn test_truncated_input() {
        let schema = schema();
        let plan = schema.resolve("abc").unwrap();
        let ser = Serializer::new(&schema);
        let bytes = ser
            .pack(&plan, &Value::parse(r#"{"a":"1","b":"hello","c":["1"]}"#).unwrap())
            .unwrap();
        let err = ser.unpack(&plan, &bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }));
    }

    #[test]
    fn test_huge_count_rejected() {
        let schema = schema();
        let plan = schema.resolve("uint8[]").unwrap();
        let err = Serializer::new(&schema)
            .unpack(&plan, &[0xff, 0xff, 0xff, 0xff, 0x0f])
            .unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }));
    }

    #[test]
    fn test_nesting_limit() {
        let schema = schema();
        let plan = schema.resolve("node").unwrap();
        let ser = Serializer::new(&schema);

        let mut deep = String::from(r#"{"kids":[]}"#);
        for _ in 0..40 {
            deep = format!(r#"{{"kids":[{}]}}"#, deep);
        }
        let err = ser.pack(&plan, &Value::parse(&deep).unwrap()).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));

        let shallow = r#"{"kids":[{"kids":[]},{"kids":[]}]}"#;
        let bytes = ser.pack(&plan, &Value::parse(shallow).unwrap()).unwrap();
        assert_eq!(ser.unpack(&plan, &bytes).unwrap().to_json(), shallow);
    }
}
