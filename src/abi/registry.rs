//! Process-wide cache of contract ABIs.

use super::def::AbiDef;
use super::meta::parse_abi;
use super::serializer::Serializer;
use super::types::{Schema, TypePlan};
use crate::error::{Error, Result};
use crate::name::Name;
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// One contract's ABI, parsed and compiled.
#[derive(Debug)]
pub struct ContractAbi {
    account: String,
    raw: Vec<u8>,
    def: AbiDef,
    schema: Schema,
}

impl ContractAbi {
    /// Load from JSON text or the binary form.
    pub fn load(account: &str, raw: &[u8]) -> Result<Self> {
        let def = parse_abi(raw)?;
        let schema = Schema::compile(&def)?;
        Ok(ContractAbi {
            account: account.to_string(),
            raw: raw.to_vec(),
            def,
            schema,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// The bytes the ABI was loaded from.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn def(&self) -> &AbiDef {
        &self.def
    }

    fn action_plan(&self, action: &str) -> Result<&TypePlan> {
        let unknown = || Error::UnknownAction {
            contract: self.account.clone(),
            action: action.to_string(),
        };
        let name: Name = action.parse().map_err(|_| unknown())?;
        self.schema.action(name).ok_or_else(unknown)
    }

    /// Resolve a type name, falling back to a table's row type.
    fn type_plan(&self, ty: &str) -> Result<TypePlan> {
        match self.schema.resolve(ty) {
            Err(Error::UnknownType(missing)) => ty
                .parse::<Name>()
                .ok()
                .and_then(|table| self.schema.table_type(table))
                .map(|row| self.schema.resolve(row))
                .unwrap_or(Err(Error::UnknownType(missing))),
            other => other,
        }
    }

    pub fn pack_action_args(&self, action: &str, args: &Value) -> Result<Vec<u8>> {
        Serializer::new(&self.schema).pack(self.action_plan(action)?, args)
    }

    pub fn unpack_action_args(&self, action: &str, data: &[u8]) -> Result<Value> {
        Serializer::new(&self.schema).unpack(self.action_plan(action)?, data)
    }

    pub fn pack_type(&self, ty: &str, value: &Value) -> Result<Vec<u8>> {
        Serializer::new(&self.schema).pack(&self.type_plan(ty)?, value)
    }

    pub fn unpack_type(&self, ty: &str, data: &[u8]) -> Result<Value> {
        Serializer::new(&self.schema).unpack(&self.type_plan(ty)?, data)
    }

    /// Decode the value an action returned.
    pub fn unpack_action_result(&self, action: &str, data: &[u8]) -> Result<Value> {
        let name: Name = action.parse()?;
        let plan = self.schema.action_result(name).ok_or_else(|| Error::UnknownAction {
            contract: self.account.clone(),
            action: action.to_string(),
        })?;
        Serializer::new(&self.schema).unpack(plan, data)
    }
}

/// Contract ABIs keyed by account. Entries are replaced, never evicted.
#[derive(Debug, Default)]
pub struct AbiRegistry {
    entries: RwLock<HashMap<String, Arc<ContractAbi>>>,
}

impl AbiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process.
    pub fn global() -> &'static AbiRegistry {
        static REGISTRY: OnceLock<AbiRegistry> = OnceLock::new();
        REGISTRY.get_or_init(AbiRegistry::new)
    }

    /// Parse and cache an ABI, replacing any previous one for `account`.
    pub fn set_contract_abi(&self, account: &str, raw: &[u8]) -> Result<()> {
        let abi = ContractAbi::load(account, raw)?;
        debug!(
            account,
            structs = abi.def.structs.len(),
            actions = abi.def.actions.len(),
            "cached contract ABI"
        );
        self.entries
            .write()
            .insert(account.to_string(), Arc::new(abi));
        Ok(())
    }

    pub fn is_abi_cached(&self, account: &str) -> bool {
        self.entries.read().contains_key(account)
    }

    pub fn get(&self, account: &str) -> Result<Arc<ContractAbi>> {
        let found = self.entries.read().get(account).cloned();
        match found {
            Some(abi) => {
                debug!(account, "ABI cache hit");
                Ok(abi)
            }
            None => {
                debug!(account, "ABI cache miss");
                Err(Error::AbiNotCached(account.to_string()))
            }
        }
    }

    /// Pack JSON action arguments.
    pub fn pack_action_args(&self, account: &str, action: &str, args: &str) -> Result<Vec<u8>> {
        let abi = self.get(account)?;
        abi.pack_action_args(action, &Value::parse(args)?)
    }

    pub fn unpack_action_args(&self, account: &str, action: &str, data: &[u8]) -> Result<Value> {
        self.get(account)?.unpack_action_args(action, data)
    }

    /// Pack JSON as a named type (or table row) of the contract's ABI.
    pub fn pack_abi_type(&self, account: &str, ty: &str, args: &str) -> Result<Vec<u8>> {
        let abi = self.get(account)?;
        abi.pack_type(ty, &Value::parse(args)?)
    }

    pub fn unpack_abi_type(&self, account: &str, ty: &str, data: &[u8]) -> Result<Value> {
        self.get(account)?.unpack_type(ty, data)
    }

    pub fn unpack_action_result(&self, account: &str, action: &str, data: &[u8]) -> Result<Value> {
        self.get(account)?.unpack_action_result(action, data)
    }
}
