//! The ABI that describes ABI documents themselves.

use super::def::AbiDef;
use super::serializer::Serializer;
use super::types::Schema;
use crate::error::{Error, Result};
use crate::value::Value;
use std::sync::OnceLock;

const ABI_DEF: &str = "abi_def";

const META_ABI: &str = r#"{
    "version": "eosio::abi/1.2",
    "structs": [
        {"name": "extensions_entry", "base": "", "fields": [
            {"name": "tag", "type": "uint16"},
            {"name": "value", "type": "bytes"}]},
        {"name": "type_def", "base": "", "fields": [
            {"name": "new_type_name", "type": "string"},
            {"name": "type", "type": "string"}]},
        {"name": "field_def", "base": "", "fields": [
            {"name": "name", "type": "string"},
            {"name": "type", "type": "string"}]},
        {"name": "struct_def", "base": "", "fields": [
            {"name": "name", "type": "string"},
            {"name": "base", "type": "string"},
            {"name": "fields", "type": "field_def[]"}]},
        {"name": "action_def", "base": "", "fields": [
            {"name": "name", "type": "name"},
            {"name": "type", "type": "string"},
            {"name": "ricardian_contract", "type": "string"}]},
        {"name": "table_def", "base": "", "fields": [
            {"name": "name", "type": "name"},
            {"name": "index_type", "type": "string"},
            {"name": "key_names", "type": "string[]"},
            {"name": "key_types", "type": "string[]"},
            {"name": "type", "type": "string"}]},
        {"name": "clause_pair", "base": "", "fields": [
            {"name": "id", "type": "string"},
            {"name": "body", "type": "string"}]},
        {"name": "error_message", "base": "", "fields": [
            {"name": "error_code", "type": "uint64"},
            {"name": "error_msg", "type": "string"}]},
        {"name": "variant_def", "base": "", "fields": [
            {"name": "name", "type": "string"},
            {"name": "types", "type": "string[]"}]},
        {"name": "action_result_def", "base": "", "fields": [
            {"name": "name", "type": "name"},
            {"name": "result_type", "type": "string"}]},
        {"name": "abi_def", "base": "", "fields": [
            {"name": "version", "type": "string"},
            {"name": "types", "type": "type_def[]"},
            {"name": "structs", "type": "struct_def[]"},
            {"name": "actions", "type": "action_def[]"},
            {"name": "tables", "type": "table_def[]"},
            {"name": "ricardian_clauses", "type": "clause_pair[]"},
            {"name": "error_messages", "type": "error_message[]"},
            {"name": "abi_extensions", "type": "extensions_entry[]"},
            {"name": "variants", "type": "variant_def[]$"},
            {"name": "action_results", "type": "action_result_def[]$"}]}
    ]
}"#;

fn meta_schema() -> Result<&'static Schema> {
    static META: OnceLock<std::result::Result<Schema, String>> = OnceLock::new();
    META.get_or_init(|| {
        AbiDef::from_json(META_ABI)
            .and_then(|def| Schema::compile(&def))
            .map_err(|e| e.to_string())
    })
    .as_ref()
    .map_err(|e| Error::InvalidAbi(format!("meta ABI: {}", e)))
}

/// Encode an ABI document (JSON text) into its binary form.
pub fn pack_abi(json: &str) -> Result<Vec<u8>> {
    pack_abi_def(&AbiDef::from_json(json)?)
}

pub fn pack_abi_def(def: &AbiDef) -> Result<Vec<u8>> {
    let schema = meta_schema()?;
    let plan = schema.resolve(ABI_DEF)?;
    Serializer::new(schema).pack(&plan, &def.to_value()?)
}

/// Decode a binary ABI into its document form.
pub fn unpack_abi(data: &[u8]) -> Result<Value> {
    let schema = meta_schema()?;
    let plan = schema.resolve(ABI_DEF)?;
    Serializer::new(schema).unpack(&plan, data)
}

/// Read an ABI given either as JSON text or in binary form.
pub fn parse_abi(raw: &[u8]) -> Result<AbiDef> {
    let looks_like_json = raw
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{');
    if looks_like_json {
        let text = std::str::from_utf8(raw)
            .map_err(|e| Error::InvalidAbi(format!("ABI text is not UTF-8: {}", e)))?;
        AbiDef::from_json(text)
    } else {
        AbiDef::from_value(&unpack_abi(raw)?)
    }
}
