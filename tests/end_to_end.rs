//! Build, sign, pack and verify a token transfer through the library.

use eoskit::abi::AbiRegistry;
use eoskit::api;
use eoskit::chain::{Action, PackedTransaction, Transaction};
use eoskit::crypto::{Keystore, PrivateKey, PublicKey};
use eoskit::{Error, ErrorKind};

const TOKEN_ABI: &str = include_str!("fixtures/token.abi.json");
const DEV_WIF: &str = "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3";
const DEV_PUB: &str = "PUB_K1_6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5BoDq63";
const BLOCK_ID: &str = "0000d1a4c4b11bd7d34c1fb0cc7cbfe0fd0e5b8db4ccbd0ac36ff0d1a6d1b9c1";
const TRANSFER: &str = r#"{"from":"alice","to":"bob","quantity":"1.0000 EOS","memo":""}"#;

fn chain_id() -> String {
    "00".repeat(32)
}

fn token_registry() -> AbiRegistry {
    let registry = AbiRegistry::new();
    registry
        .set_contract_abi("eosio.token", TOKEN_ABI.as_bytes())
        .unwrap();
    registry
}

fn transfer_transaction(registry: &AbiRegistry) -> PackedTransaction {
    let mut action = Action::from_args(registry, "eosio.token", "transfer", TRANSFER).unwrap();
    action.add_permissions_json(r#"{"alice":"active"}"#).unwrap();

    let mut tx = Transaction::new(3600);
    tx.set_reference_block(BLOCK_ID).unwrap();
    let mut packed = PackedTransaction::new(tx);
    packed.set_chain_id(&chain_id()).unwrap();
    packed.add_action(action).unwrap();
    packed
}

#[test]
fn test_transfer_signs_and_recovers() {
    let registry = token_registry();
    let mut packed = transfer_transaction(&registry);
    let key: PrivateKey = DEV_WIF.parse().unwrap();

    let digest = packed.digest().unwrap();
    let signature = packed.sign_by_private_key(&key).unwrap();
    assert_eq!(signature.recover(&digest).unwrap().to_string(), DEV_PUB);

    for compress in [false, true] {
        let wire = packed.pack(compress).unwrap();
        assert!(!wire.is_empty());
        let back = PackedTransaction::unpack(&wire).unwrap();
        assert_eq!(back.transaction(), packed.transaction());
        assert_eq!(back.signatures(), packed.signatures());
    }

    let data = &packed.transaction().actions[0].data;
    let args = registry
        .unpack_action_args("eosio.token", "transfer", data)
        .unwrap();
    assert_eq!(args.get_key("quantity").unwrap().as_str(), Some("1.0000 EOS"));
}

#[test]
fn test_digest_depends_on_chain() {
    let registry = token_registry();
    let a = transfer_transaction(&registry);
    let mut b = a.clone();
    assert_eq!(a.digest().unwrap(), b.digest().unwrap());

    let mut c = PackedTransaction::new(a.transaction().clone());
    c.set_chain_id(&"11".repeat(32)).unwrap();
    assert_ne!(a.digest().unwrap(), c.digest().unwrap());

    // rebinding an unsigned transaction is allowed
    b.set_chain_id(&"11".repeat(32)).unwrap();
    assert_eq!(b.digest().unwrap(), c.digest().unwrap());
}

#[test]
fn test_keystore_signing() {
    let registry = token_registry();
    let keystore = Keystore::new();
    let public_key = keystore.import("dev", DEV_WIF).unwrap();

    let mut packed = transfer_transaction(&registry);
    let digest = packed.digest().unwrap();
    let signature = packed.sign(&keystore, &public_key).unwrap();
    assert_eq!(signature.recover(&digest).unwrap(), public_key);

    let stranger: PublicKey = eoskit::crypto::generate_key().public_key;
    let err = transfer_transaction(&registry)
        .sign(&keystore, &stranger)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Crypto);
}

#[test]
fn test_signed_body_is_frozen() {
    let registry = token_registry();
    let mut packed = transfer_transaction(&registry);
    packed
        .sign_by_private_key(&DEV_WIF.parse().unwrap())
        .unwrap();
    let extra = Action::from_args(&registry, "eosio.token", "transfer", TRANSFER).unwrap();
    assert!(matches!(packed.add_action(extra), Err(Error::AlreadySigned(_))));
}

#[test]
fn test_boundary_transfer() {
    fn data(envelope: &str) -> serde_json::Value {
        let v: serde_json::Value = serde_json::from_str(envelope).unwrap();
        assert!(v.get("error").is_none(), "{}", envelope);
        v["data"].clone()
    }

    data(&api::set_contract_abi("e2e.token", TOKEN_ABI.as_bytes()));
    let handle = data(&api::transaction_new(3600, BLOCK_ID, &chain_id()))
        .as_i64()
        .unwrap();
    data(&api::transaction_add_action(
        handle,
        "e2e.token",
        "transfer",
        TRANSFER,
        r#"{"alice":"active"}"#,
    ));

    data(&api::wallet_import("e2e", DEV_WIF));
    let signature = data(&api::transaction_sign(handle, DEV_PUB));

    let push = data(&api::transaction_pack(handle, false));
    assert_eq!(push["signatures"][0], signature);
    let packed_trx = push["packed_trx"].as_str().unwrap();
    assert!(!packed_trx.is_empty());

    let body = data(&api::transaction_unpack(packed_trx));
    assert_eq!(body["actions"][0]["name"], "transfer");

    api::transaction_free(handle);
    let freed: serde_json::Value = serde_json::from_str(&api::transaction_pack(handle, false)).unwrap();
    assert_eq!(freed["kind"], "handle");
}
