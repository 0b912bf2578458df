//! String-in, JSON-out operations for embedding hosts.
//!
//! Every call returns an envelope: `{"data": ...}` on success or
//! `{"error": "...", "kind": "..."}` on failure. State lives in process
//! globals: the ABI registry, the transaction handle table and a keystore.

use crate::abi::{self, AbiRegistry};
use crate::chain::{Action, PackedTransaction, Transaction, parse_id};
use crate::crypto::{self, Keystore, PrivateKey, PublicKey, Signature};
use crate::error::{Error, Result};
use crate::handles::{self, Handle};
use crate::name::{name_to_u64, u64_to_name};
use crate::symbol::Symbol;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

#[derive(Serialize)]
#[serde(untagged)]
enum Envelope<T> {
    Data { data: T },
    Error { error: String, kind: &'static str },
}

fn render<T: Serialize>(result: Result<T>) -> String {
    let envelope = match result {
        Ok(data) => Envelope::Data { data },
        Err(err) => {
            debug!(kind = err.kind().as_str(), %err, "call failed");
            Envelope::Error {
                error: err.to_string(),
                kind: err.kind().as_str(),
            }
        }
    };
    serde_json::to_string(&envelope).unwrap_or_else(|e| {
        format!(
            r#"{{"error":{},"kind":"malformed_input"}}"#,
            serde_json::Value::String(e.to_string())
        )
    })
}

fn json_document(text: &str) -> Result<serde_json::Value> {
    Ok(serde_json::from_str(text)?)
}

fn digest_from_hex(digest: &str) -> Result<[u8; 32]> {
    parse_id("digest", digest)
}

/// The keystore backing `wallet_*` and `transaction_sign`.
pub fn keystore() -> &'static Keystore {
    static KEYSTORE: OnceLock<Keystore> = OnceLock::new();
    KEYSTORE.get_or_init(Keystore::new)
}

fn registry() -> &'static AbiRegistry {
    AbiRegistry::global()
}

// Wallet

pub fn wallet_import(name: &str, private_key: &str) -> String {
    render(
        keystore()
            .import(name, private_key)
            .map(|pk| pk.to_string()),
    )
}

pub fn wallet_get_public_keys() -> String {
    let keys: Vec<String> = keystore()
        .public_keys()
        .iter()
        .map(PublicKey::to_string)
        .collect();
    render(Ok(keys))
}

pub fn wallet_sign_digest(digest: &str, public_key: &str) -> String {
    render((|| -> Result<_> {
        let digest = digest_from_hex(digest)?;
        let public_key: PublicKey = public_key.parse()?;
        Ok(keystore().sign_digest(&digest, &public_key)?.to_string())
    })())
}

// Transactions

/// Allocate a transaction expiring `expiration` seconds from now.
pub fn transaction_new(expiration: i64, ref_block: &str, chain_id: &str) -> String {
    render((|| -> Result<_> {
        let secs = u32::try_from(expiration)
            .map_err(|_| Error::invalid_value("expiration", expiration.to_string()))?;
        let mut tx = Transaction::new(secs);
        tx.set_reference_block(ref_block)?;
        let mut packed = PackedTransaction::new(tx);
        packed.set_chain_id(chain_id)?;
        handles::transactions().create(packed)
    })())
}

/// Load a transaction from JSON. An empty `chain_id` leaves it unbound.
pub fn transaction_from_json(json: &str, chain_id: &str) -> String {
    render((|| -> Result<_> {
        let mut packed = PackedTransaction::from_json(json)?;
        if !chain_id.trim().is_empty() {
            packed.set_chain_id(chain_id)?;
        }
        handles::transactions().create(packed)
    })())
}

pub fn transaction_free(handle: Handle) {
    handles::transactions().free(handle);
}

pub fn transaction_set_chain_id(handle: Handle, chain_id: &str) -> String {
    render(
        handles::transactions()
            .with(handle, |tx| tx.set_chain_id(chain_id))
            .map(|()| "ok"),
    )
}

pub fn transaction_set_reference_block(handle: Handle, block_id: &str) -> String {
    render(
        handles::transactions()
            .with(handle, |tx| tx.set_reference_block(block_id))
            .map(|()| "ok"),
    )
}

/// Append an action. `data` is hex or JSON arguments; `permissions` is
/// `{"actor": "permission"}`.
pub fn transaction_add_action(
    handle: Handle,
    account: &str,
    name: &str,
    data: &str,
    permissions: &str,
) -> String {
    render(handles::transactions().with(handle, |tx| {
        let mut action = Action::from_args(registry(), account, name, data)?;
        action.add_permissions_json(permissions)?;
        tx.add_action(action)?;
        Ok("ok")
    }))
}

/// Sign with a key previously imported through [`wallet_import`].
pub fn transaction_sign(handle: Handle, public_key: &str) -> String {
    render(handles::transactions().with(handle, |tx| {
        let public_key: PublicKey = public_key.parse()?;
        Ok(tx.sign(keystore(), &public_key)?.to_string())
    }))
}

pub fn transaction_sign_by_private_key(handle: Handle, private_key: &str) -> String {
    render(handles::transactions().with(handle, |tx| {
        let key: PrivateKey = private_key.parse()?;
        Ok(tx.sign_by_private_key(&key)?.to_string())
    }))
}

/// The push-endpoint object for the transaction.
pub fn transaction_pack(handle: Handle, compress: bool) -> String {
    render(
        handles::transactions()
            .with(handle, |tx| tx.to_push_json(compress))
            .and_then(|text| json_document(&text)),
    )
}

pub fn transaction_marshal(handle: Handle) -> String {
    render(
        handles::transactions()
            .with(handle, |tx| tx.marshal())
            .and_then(|text| json_document(&text)),
    )
}

/// Decode a hex-encoded serialized transaction body.
pub fn transaction_unpack(data: &str) -> String {
    render(
        hex::decode(data.trim())
            .map_err(Error::from)
            .and_then(|bytes| Transaction::unpack(&bytes)),
    )
}

// ABI

pub fn set_contract_abi(account: &str, abi: &[u8]) -> String {
    render(registry().set_contract_abi(account, abi).map(|()| "ok"))
}

pub fn is_abi_cached(account: &str) -> bool {
    registry().is_abi_cached(account)
}

/// Pack JSON arguments; data is hex.
pub fn pack_action_args(account: &str, action: &str, args: &str) -> String {
    render(registry().pack_action_args(account, action, args).map(hex::encode))
}

pub fn unpack_action_args(account: &str, action: &str, data: &str) -> String {
    render(
        hex::decode(data.trim())
            .map_err(Error::from)
            .and_then(|bytes| registry().unpack_action_args(account, action, &bytes)),
    )
}

pub fn pack_abi_type(account: &str, ty: &str, args: &str) -> String {
    render(registry().pack_abi_type(account, ty, args).map(hex::encode))
}

pub fn unpack_abi_type(account: &str, ty: &str, data: &str) -> String {
    render(
        hex::decode(data.trim())
            .map_err(Error::from)
            .and_then(|bytes| registry().unpack_abi_type(account, ty, &bytes)),
    )
}

pub fn unpack_action_result(account: &str, action: &str, data: &str) -> String {
    render(
        hex::decode(data.trim())
            .map_err(Error::from)
            .and_then(|bytes| registry().unpack_action_result(account, action, &bytes)),
    )
}

/// Serialize a JSON ABI document; data is hex.
pub fn pack_abi(json: &str) -> String {
    render(abi::pack_abi(json).map(hex::encode))
}

pub fn unpack_abi(data: &[u8]) -> String {
    render(abi::unpack_abi(data))
}

// Names and symbols

pub fn s2n(name: &str) -> String {
    render(name_to_u64(name))
}

pub fn n2s(value: u64) -> String {
    render(Ok(u64_to_name(value)))
}

pub fn sym2n(symbol: &str, precision: u64) -> String {
    render((|| -> Result<_> {
        let precision = u8::try_from(precision)
            .map_err(|_| Error::InvalidSymbol(format!("precision {} is out of range", precision)))?;
        Ok(Symbol::new(symbol, precision)?.value)
    })())
}

// Crypto

pub fn crypto_sign_digest(digest: &str, private_key: &str) -> String {
    render((|| -> Result<_> {
        let digest = digest_from_hex(digest)?;
        let key: PrivateKey = private_key.parse()?;
        Ok(key.sign_digest(&digest)?.to_string())
    })())
}

/// Public key of `private_key`, in the legacy `EOS` form when `legacy`.
pub fn crypto_get_public_key(private_key: &str, legacy: bool) -> String {
    render(private_key.parse::<PrivateKey>().map(|key| {
        let public_key = key.public_key();
        if legacy {
            public_key.to_legacy_string()
        } else {
            public_key.to_string()
        }
    }))
}

pub fn crypto_recover_key(digest: &str, signature: &str) -> String {
    render((|| -> Result<_> {
        let digest = digest_from_hex(digest)?;
        let signature: Signature = signature.parse()?;
        Ok(crypto::recover(&digest, &signature)?.to_string())
    })())
}

pub fn crypto_create_key() -> String {
    let pair = crypto::generate_key();
    let keys = BTreeMap::from([
        ("private", pair.private_key.to_string()),
        ("public", pair.public_key.to_string()),
    ]);
    render(Ok(keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as Json;

    const DEV_WIF: &str = "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3";
    const DEV_PUB: &str = "PUB_K1_6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5BoDq63";
    const BLOCK_ID: &str = "0000d1a4c4b11bd7d34c1fb0cc7cbfe0fd0e5b8db4ccbd0ac36ff0d1a6d1b9c1";
    const TOKEN_ABI: &str = r#"{
        "version": "eosio::abi/1.1",
        "structs": [{"name": "transfer", "base": "", "fields": [
            {"name": "from", "type": "name"},
            {"name": "to", "type": "name"},
            {"name": "quantity", "type": "asset"},
            {"name": "memo", "type": "string"}]}],
        "actions": [{"name": "transfer", "type": "transfer", "ricardian_contract": ""}]
    }"#;

    fn parse(envelope: &str) -> Json {
        serde_json::from_str(envelope).unwrap()
    }

    fn data(envelope: &str) -> Json {
        let v = parse(envelope);
        assert!(v.get("error").is_none(), "unexpected error: {}", envelope);
        v["data"].clone()
    }

    fn chain_id() -> String {
        "00".repeat(32)
    }

    #[test]
    fn test_error_envelope() {
        let v = parse(&s2n("Alice"));
        assert_eq!(v["kind"], "malformed_input");
        assert!(v["error"].as_str().unwrap().contains("Alice"));

        let v = parse(&transaction_sign(-1, DEV_PUB));
        assert_eq!(v["kind"], "handle");
    }

    #[test]
    fn test_names_and_symbols() {
        assert_eq!(data(&s2n("eosio")), 6138663577826885632u64);
        assert_eq!(data(&n2s(6138663577826885632)), "eosio");
        assert_eq!(data(&sym2n("EOS", 4)), 1397703940u64);
        assert_eq!(parse(&sym2n("EOS", 300))["kind"], "malformed_input");
    }

    #[test]
    fn test_crypto_calls() {
        assert_eq!(data(&crypto_get_public_key(DEV_WIF, false)), DEV_PUB);
        assert_eq!(
            data(&crypto_get_public_key(DEV_WIF, true)),
            "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV"
        );

        let digest = hex::encode(crypto::sha256(b"hello"));
        let sig = data(&crypto_sign_digest(&digest, DEV_WIF));
        let recovered = data(&crypto_recover_key(&digest, sig.as_str().unwrap()));
        assert_eq!(recovered, DEV_PUB);

        let keys = data(&crypto_create_key());
        assert!(keys["private"].as_str().unwrap().starts_with("PVT_K1_"));
        assert!(keys["public"].as_str().unwrap().starts_with("PUB_K1_"));

        assert_eq!(parse(&crypto_sign_digest("abcd", DEV_WIF))["kind"], "malformed_input");
        assert_eq!(parse(&crypto_sign_digest(&digest, "5Kbad"))["kind"], "crypto");
    }

    #[test]
    fn test_wallet_calls() {
        assert_eq!(data(&wallet_import("dev", DEV_WIF)), DEV_PUB);
        let keys = data(&wallet_get_public_keys());
        assert!(keys.as_array().unwrap().iter().any(|k| k == DEV_PUB));

        let digest = hex::encode([7u8; 32]);
        let sig = data(&wallet_sign_digest(&digest, DEV_PUB));
        assert!(sig.as_str().unwrap().starts_with("SIG_K1_"));

        let stranger = crypto::generate_key().public_key.to_string();
        assert_eq!(parse(&wallet_sign_digest(&digest, &stranger))["kind"], "crypto");
    }

    #[test]
    fn test_abi_calls() {
        assert_eq!(data(&set_contract_abi("apitoken", TOKEN_ABI.as_bytes())), "ok");
        assert!(is_abi_cached("apitoken"));
        assert!(!is_abi_cached("apinothing"));

        let args = r#"{"from":"alice","to":"bob","quantity":"1.0000 EOS","memo":""}"#;
        let packed = data(&pack_action_args("apitoken", "transfer", args));
        let back = data(&unpack_action_args("apitoken", "transfer", packed.as_str().unwrap()));
        assert_eq!(back, parse(args));

        let asset = data(&pack_abi_type("apitoken", "asset", r#""1.0000 EOS""#));
        assert_eq!(asset, "102700000000000004454f5300000000");
        assert_eq!(data(&unpack_abi_type("apitoken", "asset", asset.as_str().unwrap())), "1.0000 EOS");

        let err = parse(&pack_action_args("apinothing", "transfer", args));
        assert_eq!(err["kind"], "schema");
    }

    #[test]
    fn test_unpack_rejects_bad_asset_precision() {
        set_contract_abi("apiprec", TOKEN_ABI.as_bytes());
        for quantity in ["010000000000000040454f5300000000", "010000000000000014454f5300000000"] {
            let err = parse(&unpack_abi_type("apiprec", "asset", quantity));
            assert_eq!(err["kind"], "malformed_input");

            let args = format!("0000000000855c340000000000000e3d{}00", quantity);
            let err = parse(&unpack_action_args("apiprec", "transfer", &args));
            assert_eq!(err["kind"], "malformed_input");
        }
    }

    #[test]
    fn test_abi_document_calls() {
        let packed = data(&pack_abi(TOKEN_ABI));
        let bytes = hex::decode(packed.as_str().unwrap()).unwrap();
        let doc = data(&unpack_abi(&bytes));
        assert_eq!(doc["version"], "eosio::abi/1.1");
        assert_eq!(doc["structs"][0]["fields"][2]["type"], "asset");
    }

    #[test]
    fn test_transaction_flow() {
        set_contract_abi("apiflow", TOKEN_ABI.as_bytes());
        let handle = data(&transaction_new(3600, BLOCK_ID, &chain_id()))
            .as_i64()
            .unwrap();

        let args = r#"{"from":"alice","to":"bob","quantity":"1.0000 EOS","memo":""}"#;
        let added = transaction_add_action(handle, "apiflow", "transfer", args, r#"{"alice":"active"}"#);
        assert_eq!(data(&added), "ok");

        let sig = data(&transaction_sign_by_private_key(handle, DEV_WIF));
        assert!(sig.as_str().unwrap().starts_with("SIG_K1_"));

        let again = transaction_add_action(handle, "apiflow", "transfer", "", "{}");
        assert_eq!(parse(&again)["kind"], "state");

        let push = data(&transaction_pack(handle, true));
        assert_eq!(push["compression"], 1);
        assert_eq!(push["signatures"][0], sig);

        let marshaled = data(&transaction_marshal(handle));
        let actions = &marshaled["transaction"]["actions"];
        assert_eq!(actions[0]["account"], "apiflow");
        assert_eq!(actions[0]["authorization"][0]["actor"], "alice");

        let copy = data(&transaction_from_json(&marshaled.to_string(), &chain_id()))
            .as_i64()
            .unwrap();
        assert_ne!(copy, handle);

        transaction_free(handle);
        transaction_free(copy);
        transaction_free(-7);
    }

    #[test]
    fn test_transaction_sign_needs_reference_block() {
        let handle = data(&transaction_from_json(r#"{"expiration":"2030-01-01T00:00:00"}"#, &chain_id()))
            .as_i64()
            .unwrap();
        assert_eq!(parse(&transaction_sign_by_private_key(handle, DEV_WIF))["kind"], "state");
        assert_eq!(data(&transaction_set_reference_block(handle, BLOCK_ID)), "ok");
        assert!(data(&transaction_sign_by_private_key(handle, DEV_WIF)).is_string());
        transaction_free(handle);
    }

    #[test]
    fn test_transaction_new_rejects_bad_input() {
        assert_eq!(parse(&transaction_new(-1, BLOCK_ID, &chain_id()))["kind"], "malformed_input");
        assert_eq!(parse(&transaction_new(60, "zz", &chain_id()))["kind"], "malformed_input");
        assert_eq!(parse(&transaction_new(60, BLOCK_ID, "00"))["kind"], "malformed_input");
    }

    #[test]
    fn test_transaction_unpack_call() {
        let body = data(&transaction_unpack("01000000000000000000000000000000"));
        assert_eq!(body["expiration"], "1970-01-01T00:00:01");
        assert!(body["actions"].as_array().unwrap().is_empty());
        assert_eq!(parse(&transaction_unpack("0100"))["kind"], "malformed_input");
    }
}
