//! Compiled schema.
//!
//! Type strings are resolved once when an ABI is loaded. Every field,
//! variant option and action ends up as a [`TypePlan`], so packing and
//! unpacking never look at type names again.

use super::def::AbiDef;
use crate::error::{Error, Result};
use crate::name::Name;
use std::collections::HashMap;

/// Alias chains and base-struct chains longer than this are rejected.
pub const MAX_RESOLVE_DEPTH: usize = 32;

/// Types every ABI understands without declaring them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Bool,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Int128,
    Uint128,
    VarInt32,
    VarUint32,
    Float32,
    Float64,
    Float128,
    TimePoint,
    TimePointSec,
    BlockTimestamp,
    Name,
    Bytes,
    String,
    Checksum160,
    Checksum256,
    Checksum512,
    PublicKey,
    Signature,
    Symbol,
    SymbolCode,
    Asset,
    ExtendedAsset,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Builtin::Bool,
            "int8" => Builtin::Int8,
            "uint8" => Builtin::Uint8,
            "int16" => Builtin::Int16,
            "uint16" => Builtin::Uint16,
            "int32" => Builtin::Int32,
            "uint32" => Builtin::Uint32,
            "int64" => Builtin::Int64,
            "uint64" => Builtin::Uint64,
            "int128" => Builtin::Int128,
            "uint128" => Builtin::Uint128,
            "varint32" => Builtin::VarInt32,
            "varuint32" => Builtin::VarUint32,
            "float32" => Builtin::Float32,
            "float64" => Builtin::Float64,
            "float128" => Builtin::Float128,
            "time_point" => Builtin::TimePoint,
            "time_point_sec" => Builtin::TimePointSec,
            "block_timestamp_type" => Builtin::BlockTimestamp,
            "name" => Builtin::Name,
            "bytes" => Builtin::Bytes,
            "string" => Builtin::String,
            "checksum160" => Builtin::Checksum160,
            "checksum256" => Builtin::Checksum256,
            "checksum512" => Builtin::Checksum512,
            "public_key" => Builtin::PublicKey,
            "signature" => Builtin::Signature,
            "symbol" => Builtin::Symbol,
            "symbol_code" => Builtin::SymbolCode,
            "asset" => Builtin::Asset,
            "extended_asset" => Builtin::ExtendedAsset,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Builtin::Bool => "bool",
            Builtin::Int8 => "int8",
            Builtin::Uint8 => "uint8",
            Builtin::Int16 => "int16",
            Builtin::Uint16 => "uint16",
            Builtin::Int32 => "int32",
            Builtin::Uint32 => "uint32",
            Builtin::Int64 => "int64",
            Builtin::Uint64 => "uint64",
            Builtin::Int128 => "int128",
            Builtin::Uint128 => "uint128",
            Builtin::VarInt32 => "varint32",
            Builtin::VarUint32 => "varuint32",
            Builtin::Float32 => "float32",
            Builtin::Float64 => "float64",
            Builtin::Float128 => "float128",
            Builtin::TimePoint => "time_point",
            Builtin::TimePointSec => "time_point_sec",
            Builtin::BlockTimestamp => "block_timestamp_type",
            Builtin::Name => "name",
            Builtin::Bytes => "bytes",
            Builtin::String => "string",
            Builtin::Checksum160 => "checksum160",
            Builtin::Checksum256 => "checksum256",
            Builtin::Checksum512 => "checksum512",
            Builtin::PublicKey => "public_key",
            Builtin::Signature => "signature",
            Builtin::Symbol => "symbol",
            Builtin::SymbolCode => "symbol_code",
            Builtin::Asset => "asset",
            Builtin::ExtendedAsset => "extended_asset",
        }
    }
}

/// How to encode one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypePlan {
    Builtin(Builtin),
    /// Index into [`Schema::structs`].
    Struct(usize),
    /// Index into [`Schema::variants`].
    Variant(usize),
    Array(Box<TypePlan>),
    FixedArray(Box<TypePlan>, usize),
    Optional(Box<TypePlan>),
    /// Trailing field that may be absent from older encodings.
    Extension(Box<TypePlan>),
}

#[derive(Debug, Clone)]
pub struct FieldPlan {
    pub name: String,
    pub plan: TypePlan,
}

/// A struct with its base fields already flattened in front.
#[derive(Debug, Clone)]
pub struct StructPlan {
    pub name: String,
    pub fields: Vec<FieldPlan>,
}

#[derive(Debug, Clone)]
pub struct VariantPlan {
    pub name: String,
    pub options: Vec<(String, TypePlan)>,
}

/// A compiled ABI.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub structs: Vec<StructPlan>,
    pub variants: Vec<VariantPlan>,
    aliases: HashMap<String, String>,
    struct_index: HashMap<String, usize>,
    variant_index: HashMap<String, usize>,
    actions: HashMap<Name, TypePlan>,
    action_results: HashMap<Name, TypePlan>,
    tables: HashMap<Name, String>,
}

impl Schema {
    /// Resolve every type the document mentions.
    pub fn compile(def: &AbiDef) -> Result<Self> {
        let mut schema = Schema::default();

        for t in &def.types {
            if t.new_type_name == t.r#type {
                return Err(Error::InvalidAbi(format!(
                    "type '{}' is an alias of itself",
                    t.new_type_name
                )));
            }
            schema
                .aliases
                .insert(t.new_type_name.clone(), t.r#type.clone());
        }
        for (i, s) in def.structs.iter().enumerate() {
            schema.struct_index.insert(s.name.clone(), i);
        }
        for (i, v) in def.variants.iter().enumerate() {
            schema.variant_index.insert(v.name.clone(), i);
        }

        // Placeholders keep indices stable while fields reference each other.
        schema.structs = def
            .structs
            .iter()
            .map(|s| StructPlan {
                name: s.name.clone(),
                fields: Vec::new(),
            })
            .collect();
        schema.variants = def
            .variants
            .iter()
            .map(|v| VariantPlan {
                name: v.name.clone(),
                options: Vec::new(),
            })
            .collect();

        for i in 0..def.structs.len() {
            let mut fields = Vec::new();
            schema.flatten_fields(def, i, 0, &mut fields)?;
            schema.structs[i].fields = fields;
        }
        for (i, v) in def.variants.iter().enumerate() {
            let options = v
                .types
                .iter()
                .map(|ty| Ok((ty.clone(), schema.resolve(ty)?)))
                .collect::<Result<Vec<_>>>()?;
            schema.variants[i].options = options;
        }

        for action in &def.actions {
            let plan = schema.resolve(&action.r#type)?;
            schema.actions.insert(action.name, plan);
        }
        for result in &def.action_results {
            let plan = schema.resolve(&result.result_type)?;
            schema.action_results.insert(result.name, plan);
        }
        for table in &def.tables {
            schema.tables.insert(table.name, table.r#type.clone());
        }

        Ok(schema)
    }

    fn flatten_fields(
        &self,
        def: &AbiDef,
        index: usize,
        depth: usize,
        out: &mut Vec<FieldPlan>,
    ) -> Result<()> {
        let s = &def.structs[index];
        if depth > MAX_RESOLVE_DEPTH {
            return Err(Error::InvalidAbi(format!(
                "base chain of struct '{}' is too deep",
                s.name
            )));
        }
        if !s.base.is_empty() {
            let base = self.resolve_alias(&s.base)?;
            let base_index = *self.struct_index.get(base).ok_or_else(|| {
                Error::InvalidAbi(format!("base '{}' of struct '{}' is not a struct", s.base, s.name))
            })?;
            self.flatten_fields(def, base_index, depth + 1, out)?;
        }
        for field in &s.fields {
            out.push(FieldPlan {
                name: field.name.clone(),
                plan: self.resolve(&field.r#type)?,
            });
        }
        Ok(())
    }

    fn resolve_alias<'a>(&'a self, mut ty: &'a str) -> Result<&'a str> {
        for _ in 0..MAX_RESOLVE_DEPTH {
            match self.aliases.get(ty) {
                Some(target) => ty = target.as_str(),
                None => return Ok(ty),
            }
        }
        Err(Error::InvalidAbi(format!(
            "alias chain for '{}' is too deep",
            ty
        )))
    }

    /// Resolve a type string such as `asset[]` or `my_alias?`.
    pub fn resolve(&self, ty: &str) -> Result<TypePlan> {
        self.resolve_at(ty, 0)
    }

    fn resolve_at(&self, ty: &str, depth: usize) -> Result<TypePlan> {
        if depth > MAX_RESOLVE_DEPTH {
            return Err(Error::InvalidAbi(format!("type '{}' nests too deeply", ty)));
        }
        if let Some(inner) = ty.strip_suffix('$') {
            return Ok(TypePlan::Extension(Box::new(self.resolve_at(inner, depth + 1)?)));
        }
        if let Some(inner) = ty.strip_suffix('?') {
            return Ok(TypePlan::Optional(Box::new(self.resolve_at(inner, depth + 1)?)));
        }
        if let Some(inner) = ty.strip_suffix("[]") {
            return Ok(TypePlan::Array(Box::new(self.resolve_at(inner, depth + 1)?)));
        }
        if let Some(open) = ty.strip_suffix(']').and_then(|t| t.rfind('[').map(|i| (t, i))) {
            let (head, i) = open;
            let len: usize = head[i + 1..]
                .parse()
                .map_err(|_| Error::UnknownType(ty.to_string()))?;
            let elem = self.resolve_at(&head[..i], depth + 1)?;
            return Ok(TypePlan::FixedArray(Box::new(elem), len));
        }

        if let Some(builtin) = Builtin::from_name(ty) {
            return Ok(TypePlan::Builtin(builtin));
        }
        if let Some(target) = self.aliases.get(ty) {
            return self.resolve_at(target, depth + 1);
        }
        if let Some(&i) = self.struct_index.get(ty) {
            return Ok(TypePlan::Struct(i));
        }
        if let Some(&i) = self.variant_index.get(ty) {
            return Ok(TypePlan::Variant(i));
        }
        Err(Error::UnknownType(ty.to_string()))
    }

    pub fn action(&self, action: Name) -> Option<&TypePlan> {
        self.actions.get(&action)
    }

    pub fn action_result(&self, action: Name) -> Option<&TypePlan> {
        self.action_results.get(&action)
    }

    /// Row type of a table.
    pub fn table_type(&self, table: Name) -> Option<&str> {
        self.tables.get(&table).map(String::as_str)
    }

    /// Human-readable type name for error messages.
    pub fn describe(&self, plan: &TypePlan) -> String {
        match plan {
            TypePlan::Builtin(b) => b.as_str().to_string(),
            TypePlan::Struct(i) => self.structs[*i].name.clone(),
            TypePlan::Variant(i) => self.variants[*i].name.clone(),
            TypePlan::Array(inner) => format!("{}[]", self.describe(inner)),
            TypePlan::FixedArray(inner, n) => format!("{}[{}]", self.describe(inner), n),
            TypePlan::Optional(inner) => format!("{}?", self.describe(inner)),
            TypePlan::Extension(inner) => format!("{}$", self.describe(inner)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(json: &str) -> Result<Schema> {
        Schema::compile(&AbiDef::from_json(json)?)
    }

    #[test]
    fn test_suffixes() {
        let s = schema(r#"{"types":[{"new_type_name":"account_name","type":"name"}]}"#).unwrap();
        assert_eq!(
            s.resolve("account_name[]").unwrap(),
            TypePlan::Array(Box::new(TypePlan::Builtin(Builtin::Name)))
        );
        assert_eq!(
            s.resolve("uint8[4]").unwrap(),
            TypePlan::FixedArray(Box::new(TypePlan::Builtin(Builtin::Uint8)), 4)
        );
        assert_eq!(
            s.resolve("string?").unwrap(),
            TypePlan::Optional(Box::new(TypePlan::Builtin(Builtin::String)))
        );
        assert_eq!(s.describe(&s.resolve("asset[]?").unwrap()), "asset[]?");
    }

    #[test]
    fn test_base_fields_come_first() {
        let s = schema(
            r#"{"structs":[
                {"name":"child","base":"parent","fields":[{"name":"b","type":"uint8"}]},
                {"name":"parent","base":"","fields":[{"name":"a","type":"uint8"}]}]}"#,
        )
        .unwrap();
        let names: Vec<_> = s.structs[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_recursive_struct_by_index() {
        let s = schema(
            r#"{"structs":[{"name":"node","base":"","fields":[{"name":"kids","type":"node[]"}]}]}"#,
        )
        .unwrap();
        assert_eq!(
            s.structs[0].fields[0].plan,
            TypePlan::Array(Box::new(TypePlan::Struct(0)))
        );
    }

    #[test]
    fn test_alias_cycle_rejected() {
        let err = schema(
            r#"{"types":[{"new_type_name":"a","type":"b"},{"new_type_name":"b","type":"a"}],
                "structs":[{"name":"s","base":"","fields":[{"name":"x","type":"a"}]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidAbi(_)));
    }

    #[test]
    fn test_base_cycle_rejected() {
        let err = schema(
            r#"{"structs":[{"name":"a","base":"b","fields":[]},{"name":"b","base":"a","fields":[]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidAbi(_)));
    }

    #[test]
    fn test_unknown_field_type() {
        let err = schema(
            r#"{"structs":[{"name":"s","base":"","fields":[{"name":"x","type":"mystery"}]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownType(t) if t == "mystery"));
    }

    #[test]
    fn test_actions_resolved_on_load() {
        let s = schema(
            r#"{"structs":[{"name":"hi","base":"","fields":[]}],
                "actions":[{"name":"hi","type":"hi","ricardian_contract":""}]}"#,
        )
        .unwrap();
        let hi: Name = "hi".parse().unwrap();
        assert_eq!(s.action(hi), Some(&TypePlan::Struct(0)));
    }
}
