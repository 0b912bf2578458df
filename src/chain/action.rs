//! Actions and their authorizations.

use super::hex_bytes;
use crate::abi::AbiRegistry;
use crate::codec::{Decoder, Encoder, Pack, Unpack, varuint32_size};
use crate::error::{Error, Result};
use crate::name::Name;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An `actor@permission` pair authorizing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionLevel {
    pub actor: Name,
    pub permission: Name,
}

impl PermissionLevel {
    pub fn new(actor: Name, permission: Name) -> Self {
        PermissionLevel { actor, permission }
    }
}

/// One contract invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub account: Name,
    pub name: Name,
    #[serde(default)]
    pub authorization: Vec<PermissionLevel>,
    #[serde(default, with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl Action {
    pub fn new(account: Name, name: Name, data: Vec<u8>) -> Self {
        Action {
            account,
            name,
            authorization: Vec::new(),
            data,
        }
    }

    /// Build an action from text arguments.
    ///
    /// `data` is taken as raw hex when it is an even-length run of hex
    /// digits (the empty string included). Anything else is JSON packed
    /// with the contract's cached ABI.
    pub fn from_args(
        registry: &AbiRegistry,
        account: &str,
        name: &str,
        data: &str,
    ) -> Result<Self> {
        let account_name: Name = account.parse()?;
        let action_name: Name = name.parse()?;
        if account_name.is_empty() || action_name.is_empty() {
            return Err(Error::InvalidName(format!("{}::{}", account, name)));
        }
        let data = match ActionData::classify(data) {
            ActionData::Hex(hex_text) => {
                debug!(account, action = name, "using hex action data verbatim");
                hex::decode(hex_text)?
            }
            ActionData::Json(json) => registry.pack_action_args(account, name, json)?,
        };
        Ok(Action::new(account_name, action_name, data))
    }

    /// Appends; duplicates are kept because order is signed.
    pub fn add_permission(&mut self, actor: Name, permission: Name) {
        self.authorization
            .push(PermissionLevel::new(actor, permission));
    }

    /// Add authorizations given as `{"actor": "permission", ...}` or as
    /// `[{"actor": ..., "permission": ...}, ...]`.
    pub fn add_permissions_json(&mut self, json: &str) -> Result<()> {
        match Value::parse(json)? {
            Value::Map(map) => {
                for (actor, permission) in &map {
                    let permission = permission
                        .as_str()
                        .ok_or_else(|| Error::invalid_value("permission", permission.to_json()))?;
                    self.add_permission(actor.parse()?, permission.parse()?);
                }
            }
            Value::List(items) => {
                for item in &items {
                    let actor = item.get_key("actor")?;
                    let permission = item.get_key("permission")?;
                    let (Some(actor), Some(permission)) = (actor.as_str(), permission.as_str())
                    else {
                        return Err(Error::invalid_value("permission", item.to_json()));
                    };
                    self.add_permission(actor.parse()?, permission.parse()?);
                }
            }
            other => return Err(Error::invalid_value("permissions", other.to_json())),
        }
        Ok(())
    }
}

/// Which path an action argument string takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionData<'a> {
    Hex(&'a str),
    Json(&'a str),
}

impl<'a> ActionData<'a> {
    pub fn classify(data: &'a str) -> Self {
        let trimmed = data.trim();
        if trimmed.len() % 2 == 0 && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            ActionData::Hex(trimmed)
        } else {
            ActionData::Json(data)
        }
    }
}

impl Pack for PermissionLevel {
    fn pack(&self, enc: &mut Encoder) {
        self.actor.pack(enc);
        self.permission.pack(enc);
    }

    fn size(&self) -> usize {
        16
    }
}

impl Unpack for PermissionLevel {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(PermissionLevel {
            actor: dec.unpack()?,
            permission: dec.unpack()?,
        })
    }
}

impl Pack for Action {
    fn pack(&self, enc: &mut Encoder) {
        self.account.pack(enc);
        self.name.pack(enc);
        enc.write_list(&self.authorization);
        enc.write_blob(&self.data);
    }

    fn size(&self) -> usize {
        16 + varuint32_size(self.authorization.len() as u32)
            + 16 * self.authorization.len()
            + varuint32_size(self.data.len() as u32)
            + self.data.len()
    }
}

impl Unpack for Action {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Action {
            account: dec.unpack()?,
            name: dec.unpack()?,
            authorization: dec.read_list()?,
            data: dec.read_blob()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_bytes, to_bytes};

    fn n(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(ActionData::classify("00ff"), ActionData::Hex("00ff"));
        assert_eq!(ActionData::classify(""), ActionData::Hex(""));
        assert_eq!(ActionData::classify("abc"), ActionData::Json("abc"));
        assert_eq!(
            ActionData::classify(r#"{"a":1}"#),
            ActionData::Json(r#"{"a":1}"#)
        );
    }

    #[test]
    fn test_hex_data_bypasses_abi() {
        let registry = AbiRegistry::new();
        let action = Action::from_args(&registry, "eosio.token", "transfer", "0102").unwrap();
        assert_eq!(action.data, vec![1, 2]);
    }

    #[test]
    fn test_empty_account_or_name_rejected() {
        let registry = AbiRegistry::new();
        for (account, name) in [("", "transfer"), ("eosio.token", ""), ("", "")] {
            let err = Action::from_args(&registry, account, name, "").unwrap_err();
            assert!(matches!(err, Error::InvalidName(_)), "{}::{}", account, name);
        }
    }

    #[test]
    fn test_json_data_needs_abi() {
        let registry = AbiRegistry::new();
        let err = Action::from_args(&registry, "eosio.token", "transfer", "{}").unwrap_err();
        assert!(matches!(err, Error::AbiNotCached(_)));
    }

    #[test]
    fn test_permissions_keep_order_and_duplicates() {
        let mut action = Action::new(n("eosio"), n("noop"), vec![]);
        action
            .add_permissions_json(r#"{"bob":"active","alice":"owner"}"#)
            .unwrap();
        action
            .add_permissions_json(r#"[{"actor":"bob","permission":"active"}]"#)
            .unwrap();
        let actors: Vec<_> = action
            .authorization
            .iter()
            .map(|p| p.actor.to_string())
            .collect();
        assert_eq!(actors, vec!["bob", "alice", "bob"]);
        assert!(action.add_permissions_json(r#""bob""#).is_err());
    }

    #[test]
    fn test_binary_layout() {
        let mut action = Action::new(n("eosio.token"), n("transfer"), vec![0xaa]);
        action.add_permission(n("alice"), n("active"));
        let bytes = to_bytes(&action);
        assert_eq!(bytes.len(), action.size());
        assert_eq!(bytes.len(), 8 + 8 + 1 + 16 + 1 + 1);
        assert_eq!(from_bytes::<Action>(&bytes).unwrap(), action);
    }

    #[test]
    fn test_json_shape() {
        let mut action = Action::new(n("eosio.token"), n("transfer"), vec![0xaa, 0x01]);
        action.add_permission(n("alice"), n("active"));
        assert_eq!(
            serde_json::to_string(&action).unwrap(),
            r#"{"account":"eosio.token","name":"transfer","authorization":[{"actor":"alice","permission":"active"}],"data":"aa01"}"#
        );
    }
}
