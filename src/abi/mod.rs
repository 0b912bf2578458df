//! ABI schemas and schema-directed serialization.
//!
//! An ABI is loaded once per contract account ([`AbiRegistry::set_contract_abi`]),
//! compiled into [`TypePlan`]s, and reused by every pack and unpack call
//! for that account.

mod def;
mod meta;
mod registry;
mod serializer;
mod types;

pub use def::{
    AbiDef, ActionDef, ActionResultDef, ClausePair, ErrorMessage, ExtensionEntry, FieldDef,
    StructDef, TableDef, TypeDef, VariantDef,
};
pub use meta::{pack_abi, pack_abi_def, parse_abi, unpack_abi};
pub use registry::{AbiRegistry, ContractAbi};
pub use serializer::{MAX_NESTING_DEPTH, Serializer};
pub use types::{Builtin, FieldPlan, MAX_RESOLVE_DEPTH, Schema, StructPlan, TypePlan, VariantPlan};
