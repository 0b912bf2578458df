//! The ABI document model.
//!
//! [`AbiDef`] mirrors the JSON layout chain tooling emits. It is read
//! leniently: absent sections default to empty, so hand-written ABIs with
//! only `structs` and `actions` load fine.

use crate::error::{Error, Result};
use crate::name::Name;
use crate::value::Value;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeDef {
    pub new_type_name: String,
    pub r#type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDef {
    pub name: String,
    pub r#type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructDef {
    pub name: String,
    pub base: String,
    #[serde(deserialize_with = "nullable")]
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionDef {
    pub name: Name,
    pub r#type: String,
    pub ricardian_contract: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableDef {
    pub name: Name,
    pub index_type: String,
    #[serde(deserialize_with = "nullable")]
    pub key_names: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub key_types: Vec<String>,
    pub r#type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClausePair {
    pub id: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorMessage {
    #[serde(deserialize_with = "number_or_text")]
    pub error_code: u64,
    pub error_msg: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionEntry {
    #[serde(deserialize_with = "number_or_text")]
    pub tag: u16,
    /// Hex-encoded payload.
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantDef {
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionResultDef {
    pub name: Name,
    pub result_type: String,
}

/// A contract ABI document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbiDef {
    #[serde(deserialize_with = "nullable")]
    pub version: String,
    #[serde(deserialize_with = "nullable")]
    pub types: Vec<TypeDef>,
    #[serde(deserialize_with = "nullable")]
    pub structs: Vec<StructDef>,
    #[serde(deserialize_with = "nullable")]
    pub actions: Vec<ActionDef>,
    #[serde(deserialize_with = "nullable")]
    pub tables: Vec<TableDef>,
    #[serde(deserialize_with = "nullable")]
    pub ricardian_clauses: Vec<ClausePair>,
    #[serde(deserialize_with = "nullable")]
    pub error_messages: Vec<ErrorMessage>,
    #[serde(deserialize_with = "nullable")]
    pub abi_extensions: Vec<ExtensionEntry>,
    #[serde(deserialize_with = "nullable")]
    pub variants: Vec<VariantDef>,
    #[serde(deserialize_with = "nullable")]
    pub action_results: Vec<ActionResultDef>,
}

pub const DEFAULT_VERSION: &str = "eosio::abi/1.2";

/// `null` reads as the empty default.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Numeric fields show up both as JSON numbers and as decimal strings.
fn number_or_text<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<N> {
        Number(N),
        Text(String),
    }

    match Raw::<T>::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

fn abi_error(e: serde_json::Error) -> Error {
    match e.classify() {
        serde_json::error::Category::Data => Error::InvalidAbi(e.to_string()),
        _ => Error::InvalidJson(e),
    }
}

/// JSON tree with every scalar kept as a string, so names and memos that
/// look numeric are not retyped on the way through.
fn scalars_as_text(value: &Value) -> serde_json::Value {
    match value {
        v if v.is_null() => serde_json::Value::Null,
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => items.iter().map(scalars_as_text).collect(),
        Value::Map(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), scalars_as_text(v)))
            .collect(),
    }
}

impl AbiDef {
    /// Parse an ABI from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str::<AbiDef>(text)
            .map(AbiDef::with_default_version)
            .map_err(abi_error)
    }

    /// Read an ABI from a parsed document.
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value::<AbiDef>(scalars_as_text(value))
            .map(AbiDef::with_default_version)
            .map_err(abi_error)
    }

    fn with_default_version(mut self) -> Self {
        if self.version.is_empty() {
            self.version = DEFAULT_VERSION.to_string();
        }
        self
    }

    /// Render in the canonical document layout, every section present.
    pub fn to_value(&self) -> Result<Value> {
        Value::parse(&self.to_json()?)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::FormatError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_document() {
        let abi = AbiDef::from_json(
            r#"{"structs":[{"name":"hi","base":"","fields":[{"name":"user","type":"name"}]}],
                "actions":[{"name":"hi","type":"hi"}]}"#,
        )
        .unwrap();
        assert_eq!(abi.version, DEFAULT_VERSION);
        assert_eq!(abi.structs[0].fields[0].r#type, "name");
        assert_eq!(abi.actions[0].name.to_string(), "hi");
        assert!(abi.tables.is_empty());
        assert!(abi.action_results.is_empty());
    }

    #[test]
    fn test_numbers_and_nulls() {
        let abi = AbiDef::from_json(
            r#"{"version":"eosio::abi/1.1","types":null,
                "error_messages":[{"error_code":7,"error_msg":"nope"}]}"#,
        )
        .unwrap();
        assert!(abi.types.is_empty());
        assert_eq!(abi.error_messages[0].error_code, 7);
    }

    #[test]
    fn test_rejects_wrong_shapes() {
        assert!(AbiDef::from_json(r#"[]"#).is_err());
        assert!(AbiDef::from_json(r#"{"structs":"x"}"#).is_err());
        assert!(AbiDef::from_json(r#"{"actions":[{"name":"Bad!","type":"x"}]}"#).is_err());
    }

    #[test]
    fn test_numeric_looking_text_survives() {
        let abi = AbiDef::from_json(
            r#"{"structs":[{"name":"s","base":"","fields":[{"name":"12345","type":"uint8"}]}],
                "actions":[{"name":"12345","type":"s","ricardian_contract":"42"}],
                "abi_extensions":[{"tag":"3","value":"beef"}]}"#,
        )
        .unwrap();
        let back = AbiDef::from_value(&abi.to_value().unwrap()).unwrap();
        assert_eq!(back, abi);
        assert_eq!(back.structs[0].fields[0].name, "12345");
        assert_eq!(back.actions[0].ricardian_contract, "42");
        assert_eq!(back.abi_extensions[0].tag, 3);
    }

    #[test]
    fn test_canonical_json_layout() {
        let abi = AbiDef::from_json(r#"{"error_messages":[{"error_code":"9","error_msg":"x"}]}"#)
            .unwrap();
        let json = abi.to_json().unwrap();
        assert!(json.starts_with(r#"{"version":"eosio::abi/1.2","types":[],"structs":[]"#));
        assert!(json.contains(r#"{"error_code":9,"error_msg":"x"}"#));
    }

    #[test]
    fn test_value_round_trip() {
        let abi = AbiDef::from_json(
            r#"{"version":"eosio::abi/1.2",
                "tables":[{"name":"accounts","index_type":"i64","key_names":[],"key_types":[],"type":"account"}],
                "variants":[{"name":"v","types":["uint8","string"]}]}"#,
        )
        .unwrap();
        assert_eq!(AbiDef::from_value(&abi.to_value().unwrap()).unwrap(), abi);
    }
}
