//! Subcommand implementations. Each returns a [`Report`] for the caller to
//! render.

use crate::abi::{self, AbiRegistry};
use crate::chain::{Action, PackedTransaction, Transaction};
use crate::cli::{AbiCommand, ActionTarget, ArgsCommand, BuildArgs, Command, InputSpec, KeyCommand, TxCommand};
use crate::crypto::{self, PrivateKey, PublicKey, Signature};
use crate::error::{Error, Result};
use crate::format::Report;
use crate::input::{read_bytes, read_text};
use crate::name::{Name, u64_to_name};
use crate::symbol::{Asset, Symbol};
use crate::value::{Value, ValuePath};
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::debug;

/// Run one subcommand.
pub fn execute(command: &Command) -> Result<Report> {
    match command {
        Command::Name { value } => name(value),
        Command::Symbol { value } => symbol(value),
        Command::Abi(cmd) => abi_command(cmd),
        Command::Args(cmd) => args_command(cmd),
        Command::Tx(TxCommand::Build(build)) => build_transaction(build),
        Command::Tx(TxCommand::Unpack { input, query }) => {
            unpack_transaction(&InputSpec::detect(input), query.as_deref())
        }
        Command::Key(cmd) => key_command(cmd),
    }
}

fn name(value: &str) -> Result<Report> {
    let (text, raw) = match value.parse::<u64>() {
        Ok(raw) => (u64_to_name(raw), raw),
        Err(_) => (value.to_string(), value.parse::<Name>()?.as_u64()),
    };
    Ok(Report::Fields(vec![
        ("name", text),
        ("value", raw.to_string()),
        ("hex", format!("{:016x}", raw)),
    ]))
}

fn symbol(value: &str) -> Result<Report> {
    if value.contains(',') {
        let sym: Symbol = value.parse()?;
        return Ok(Report::Fields(vec![
            ("symbol", sym.to_string()),
            ("code", sym.code().to_string()),
            ("precision", sym.precision().to_string()),
            ("value", sym.value.to_string()),
        ]));
    }
    let asset: Asset = value.parse()?;
    Ok(Report::Fields(vec![
        ("asset", asset.to_string()),
        ("amount", asset.amount.to_string()),
        ("symbol", asset.symbol.to_string()),
        ("packed", hex::encode(crate::codec::to_bytes(&asset))),
    ]))
}

fn to_json(value: &Value) -> Result<JsonValue> {
    serde_json::to_value(value).map_err(|e| Error::FormatError(e.to_string()))
}

fn abi_command(cmd: &AbiCommand) -> Result<Report> {
    match cmd {
        AbiCommand::Pack { input } => {
            let json = read_text(&InputSpec::detect(input))?;
            Ok(Report::Text(hex::encode(abi::pack_abi(&json)?)))
        }
        AbiCommand::Unpack { input } => {
            let bytes = read_bytes(&InputSpec::detect(input))?;
            Ok(Report::Document(to_json(&abi::unpack_abi(&bytes)?)?))
        }
    }
}

/// A private registry holding one contract's ABI read from `path`.
fn load_abi(account: &str, path: &Path) -> Result<AbiRegistry> {
    let raw = read_bytes(&InputSpec::File(path.to_path_buf()))?;
    let registry = AbiRegistry::new();
    registry.set_contract_abi(account, &raw)?;
    debug!(account, path = %path.display(), "loaded ABI file");
    Ok(registry)
}

fn args_command(cmd: &ArgsCommand) -> Result<Report> {
    match cmd {
        ArgsCommand::Pack { target, input } => {
            let ActionTarget { abi, account, action } = target;
            let registry = load_abi(account, abi)?;
            let json = read_text(&InputSpec::detect(input))?;
            let data = registry.pack_action_args(account, action, &json)?;
            Ok(Report::Text(hex::encode(data)))
        }
        ArgsCommand::Unpack { target, input } => {
            let ActionTarget { abi, account, action } = target;
            let registry = load_abi(account, abi)?;
            let data = read_bytes(&InputSpec::detect(input))?;
            let value = registry.unpack_action_args(account, action, &data)?;
            Ok(Report::Document(to_json(&value)?))
        }
    }
}

fn parse_authorization(text: &str) -> Result<(Name, Name)> {
    let (actor, permission) = text
        .split_once('@')
        .ok_or_else(|| Error::invalid_value("authorization", text))?;
    Ok((actor.parse()?, permission.parse()?))
}

/// Decoded view of a transaction with its id.
fn summary(packed: &PackedTransaction) -> Result<JsonValue> {
    let mut summary: JsonValue = serde_json::from_str(&packed.marshal()?)?;
    if let Some(map) = summary.as_object_mut() {
        map.insert(
            "id".to_string(),
            JsonValue::String(hex::encode(packed.transaction().id())),
        );
    }
    Ok(summary)
}

fn build_transaction(build: &BuildArgs) -> Result<Report> {
    let registry = match &build.abi {
        Some(path) => load_abi(&build.account, path)?,
        None => AbiRegistry::new(),
    };

    let mut action = Action::from_args(&registry, &build.account, &build.action, &build.data)?;
    for auth in &build.authorization {
        let (actor, permission) = parse_authorization(auth)?;
        action.add_permission(actor, permission);
    }

    let mut tx = Transaction::new(build.expiration);
    tx.set_reference_block(&build.ref_block)?;
    let mut packed = PackedTransaction::new(tx);
    packed.set_chain_id(&build.chain_id)?;
    packed.add_action(action)?;

    if let Some(key) = &build.key {
        let key: PrivateKey = key.parse()?;
        packed.sign_by_private_key(&key)?;
    }

    let wire: JsonValue = serde_json::from_str(&packed.to_push_json(build.compress)?)?;
    Ok(Report::Transaction {
        summary: summary(&packed)?,
        wire,
    })
}

fn unpack_transaction(input: &InputSpec, query: Option<&str>) -> Result<Report> {
    let bytes = read_bytes(input)?;
    let packed = match PackedTransaction::unpack(&bytes) {
        Ok(packed) => packed,
        Err(packed_err) => {
            debug!(error = %packed_err, "not a packed transaction, trying a bare body");
            PackedTransaction::new(Transaction::unpack(&bytes)?)
        }
    };
    let summary = summary(&packed)?;

    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return Ok(Report::Transaction {
            wire: summary.clone(),
            summary,
        });
    };

    let path = ValuePath::parse(query)?;
    let doc = Value::parse(&summary.to_string())?;
    if path.has_wildcard() {
        let matches = doc
            .select(&path.segments)?
            .into_iter()
            .map(to_json)
            .collect::<Result<Vec<_>>>()?;
        Ok(Report::Matches(matches))
    } else {
        Ok(Report::Document(to_json(doc.get(&path.segments)?)?))
    }
}

fn parse_digest(text: &str) -> Result<[u8; 32]> {
    crate::chain::parse_id("digest", text)
}

fn key_command(cmd: &KeyCommand) -> Result<Report> {
    match cmd {
        KeyCommand::Create => {
            let pair = crypto::generate_key();
            Ok(Report::Fields(vec![
                ("private", pair.private_key.to_string()),
                ("public", pair.public_key.to_string()),
            ]))
        }
        KeyCommand::Public { private_key, legacy } => {
            let public_key = private_key.parse::<PrivateKey>()?.public_key();
            Ok(Report::Text(if *legacy {
                public_key.to_legacy_string()
            } else {
                public_key.to_string()
            }))
        }
        KeyCommand::Sign { digest, key } => {
            let key: PrivateKey = key.parse()?;
            let signature = key.sign_digest(&parse_digest(digest)?)?;
            Ok(Report::Text(signature.to_string()))
        }
        KeyCommand::Recover { digest, signature } => {
            let signature: Signature = signature.parse()?;
            let public_key: PublicKey = signature.recover(&parse_digest(digest)?)?;
            Ok(Report::Text(public_key.to_string()))
        }
    }
}
