//! Signed, wire-ready transactions.

use super::action::Action;
use super::hex_bytes;
use super::transaction::{ID_LEN, Transaction, pack_context_free_data, parse_id};
use crate::codec::{Decoder, Encoder};
use crate::crypto::{PrivateKey, PublicKey, Signature, Wallet};
use crate::error::{Error, Result};
use flate2::Compression as ZlibLevel;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::{debug, warn};

/// Upper bound on an inflated `packed_trx` or `packed_context_free_data`.
pub const MAX_UNPACKED_SIZE: usize = 1 << 20;

/// Payload compression on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Zlib,
}

impl Compression {
    fn from_flag(compress: bool) -> Self {
        if compress {
            Compression::Zlib
        } else {
            Compression::None
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Compression::None => 0,
            Compression::Zlib => 1,
        }
    }

    fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Zlib),
            other => Err(Error::invalid_value("compression", other.to_string())),
        }
    }

    fn compress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Zlib => {
                let io = |source| Error::IoError { path: None, source };
                let mut encoder = ZlibEncoder::new(Vec::new(), ZlibLevel::best());
                encoder.write_all(data).map_err(io)?;
                encoder.finish().map_err(io)
            }
        }
    }

    fn decompress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Zlib => {
                let mut out = Vec::new();
                ZlibDecoder::new(data)
                    .take(MAX_UNPACKED_SIZE as u64 + 1)
                    .read_to_end(&mut out)
                    .map_err(|e| Error::invalid_value("zlib payload", e.to_string()))?;
                if out.len() > MAX_UNPACKED_SIZE {
                    return Err(Error::invalid_value(
                        "zlib payload",
                        format!("inflates past {} bytes", MAX_UNPACKED_SIZE),
                    ));
                }
                Ok(out)
            }
        }
    }
}

/// A transaction with its chain binding and signatures.
///
/// The body can be changed until the first signature is attached; after
/// that every mutation fails with [`Error::AlreadySigned`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedTransaction {
    transaction: Transaction,
    chain_id: Option<[u8; ID_LEN]>,
    signatures: Vec<Signature>,
    context_free_data: Vec<Vec<u8>>,
    compression: Compression,
}

/// JSON layout used by [`PackedTransaction::marshal`] and
/// [`PackedTransaction::from_json`].
#[derive(Serialize, Deserialize)]
struct MarshalForm {
    #[serde(default)]
    signatures: Vec<Signature>,
    #[serde(default)]
    compression: Compression,
    #[serde(default, with = "hex_bytes::list")]
    context_free_data: Vec<Vec<u8>>,
    transaction: Transaction,
}

/// Body accepted by chain push endpoints.
#[derive(Serialize)]
struct PushForm<'a> {
    signatures: &'a [Signature],
    compression: u8,
    #[serde(with = "hex_bytes")]
    packed_context_free_data: Vec<u8>,
    #[serde(with = "hex_bytes")]
    packed_trx: Vec<u8>,
}

impl PackedTransaction {
    pub fn new(transaction: Transaction) -> Self {
        PackedTransaction {
            transaction,
            ..Default::default()
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    pub fn chain_id(&self) -> Option<&[u8; ID_LEN]> {
        self.chain_id.as_ref()
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    fn ensure_unsigned(&self, operation: &'static str) -> Result<()> {
        if self.is_signed() {
            warn!(operation, "rejected mutation of a signed transaction");
            return Err(Error::AlreadySigned(operation));
        }
        Ok(())
    }

    /// Bind to a chain; `chain_id` is 64 hex digits.
    ///
    /// A signed transaction loaded without a chain id may be bound once;
    /// rebinding after signing is rejected.
    pub fn set_chain_id(&mut self, chain_id: &str) -> Result<()> {
        let id = parse_id("chain_id", chain_id)?;
        if self.chain_id.is_some() {
            self.ensure_unsigned("set_chain_id")?;
        }
        self.chain_id = Some(id);
        Ok(())
    }

    pub fn set_reference_block(&mut self, block_id: &str) -> Result<()> {
        self.ensure_unsigned("set_reference_block")?;
        self.transaction.set_reference_block(block_id)
    }

    pub fn add_action(&mut self, action: Action) -> Result<()> {
        self.ensure_unsigned("add_action")?;
        debug!(
            account = %action.account,
            name = %action.name,
            bytes = action.data.len(),
            "added action"
        );
        self.transaction.add_action(action);
        Ok(())
    }

    pub fn add_context_free_action(&mut self, action: Action, data: Vec<u8>) -> Result<()> {
        self.ensure_unsigned("add_context_free_action")?;
        self.transaction.add_context_free_action(action);
        self.context_free_data.push(data);
        Ok(())
    }

    /// The digest signatures commit to. Identical for identical content.
    pub fn digest(&self) -> Result<[u8; 32]> {
        let chain_id = self
            .chain_id
            .as_ref()
            .ok_or(Error::NotReady("chain id is not set"))?;
        if !self.transaction.has_reference_block() {
            return Err(Error::NotReady("reference block is not set"));
        }
        Ok(self
            .transaction
            .signing_digest(chain_id, &self.context_free_data))
    }

    /// Sign through a wallet holding the key for `public_key`.
    pub fn sign(&mut self, wallet: &dyn Wallet, public_key: &PublicKey) -> Result<Signature> {
        let digest = self.digest()?;
        let signature = wallet.sign(&digest, public_key)?;
        self.attach(signature)
    }

    pub fn sign_by_private_key(&mut self, key: &PrivateKey) -> Result<Signature> {
        let digest = self.digest()?;
        let signature = key.sign_digest(&digest)?;
        self.attach(signature)
    }

    fn attach(&mut self, signature: Signature) -> Result<Signature> {
        debug!(%signature, count = self.signatures.len() + 1, "signed transaction");
        self.signatures.push(signature);
        Ok(signature)
    }

    fn packed_context_free_data(&self) -> Vec<u8> {
        if self.context_free_data.is_empty() {
            Vec::new()
        } else {
            pack_context_free_data(&self.context_free_data)
        }
    }

    /// Wire form: signatures, compression flag, context-free data, body.
    pub fn pack(&self, compress: bool) -> Result<Vec<u8>> {
        let compression = Compression::from_flag(compress);
        let mut enc = Encoder::new();
        enc.write_list(&self.signatures);
        enc.write_u8(compression.as_u8());
        enc.write_blob(&compression.compress(&self.packed_context_free_data())?);
        enc.write_blob(&compression.compress(&self.transaction.pack())?);
        Ok(enc.into_bytes())
    }

    /// Decode the wire form. The result carries no chain id.
    pub fn unpack(data: &[u8]) -> Result<Self> {
        let mut dec = Decoder::new(data);
        let signatures: Vec<Signature> = dec.read_list()?;
        let compression = Compression::from_u8(dec.read_u8()?)?;
        let cfd = compression.decompress(&dec.read_blob()?)?;
        let trx = compression.decompress(&dec.read_blob()?)?;
        dec.finish()?;

        let context_free_data = if cfd.is_empty() {
            Vec::new()
        } else {
            let mut cfd_dec = Decoder::new(&cfd);
            let list = cfd_dec.read_list()?;
            cfd_dec.finish()?;
            list
        };

        Ok(PackedTransaction {
            transaction: Transaction::unpack(&trx)?,
            chain_id: None,
            signatures,
            context_free_data,
            compression,
        })
    }

    /// Full JSON view: signatures, compression, decoded transaction.
    pub fn marshal(&self) -> Result<String> {
        let form = MarshalForm {
            signatures: self.signatures.clone(),
            compression: self.compression,
            context_free_data: self.context_free_data.clone(),
            transaction: self.transaction.clone(),
        };
        serde_json::to_string(&form).map_err(|e| Error::FormatError(e.to_string()))
    }

    /// Rebuild from [`marshal`](Self::marshal) output or from a bare
    /// transaction object.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(text)?;
        let form: MarshalForm = if raw.get("transaction").is_some() {
            serde_json::from_value(raw)?
        } else {
            MarshalForm {
                signatures: Vec::new(),
                compression: Compression::None,
                context_free_data: Vec::new(),
                transaction: serde_json::from_value(raw)?,
            }
        };
        Ok(PackedTransaction {
            transaction: form.transaction,
            chain_id: None,
            signatures: form.signatures,
            context_free_data: form.context_free_data,
            compression: form.compression,
        })
    }

    /// The object accepted by `push_transaction` endpoints.
    pub fn to_push_json(&self, compress: bool) -> Result<String> {
        let compression = Compression::from_flag(compress);
        let form = PushForm {
            signatures: &self.signatures,
            compression: compression.as_u8(),
            packed_context_free_data: compression.compress(&self.packed_context_free_data())?,
            packed_trx: compression.compress(&self.transaction.pack())?,
        };
        serde_json::to_string(&form).map_err(|e| Error::FormatError(e.to_string()))
    }
}
