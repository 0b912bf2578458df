//! Transaction header and body.

use super::action::Action;
use super::hex_bytes;
use crate::codec::{
    Decoder, Encoder, Pack, TimePointSec, Unpack, from_bytes, to_bytes, varuint32_size,
};
use crate::crypto::sha256;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Length of a block id and of a chain id.
pub const ID_LEN: usize = 32;

/// A typed blob attached to a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub r#type: u16,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

/// An unsigned transaction.
///
/// Reference-block fields are zero until [`Transaction::set_reference_block`]
/// is called; a transaction in that state cannot be signed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transaction {
    pub expiration: TimePointSec,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub max_net_usage_words: u32,
    pub max_cpu_usage_ms: u8,
    pub delay_sec: u32,
    pub context_free_actions: Vec<Action>,
    pub actions: Vec<Action>,
    pub transaction_extensions: Vec<Extension>,
}

/// Decode a 32-byte hex id (block id or chain id).
pub fn parse_id(kind: &'static str, text: &str) -> Result<[u8; ID_LEN]> {
    let bytes = hex::decode(text.trim())?;
    <[u8; ID_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
        Error::invalid_value(
            kind,
            format!("expected {} bytes, got {}", ID_LEN, bytes.len()),
        )
    })
}

impl Transaction {
    /// A transaction expiring `expiration_secs` from now.
    pub fn new(expiration_secs: u32) -> Self {
        Self::with_expiration(TimePointSec::now().saturating_add(expiration_secs))
    }

    pub fn with_expiration(expiration: TimePointSec) -> Self {
        Transaction {
            expiration,
            ..Default::default()
        }
    }

    /// Derive the reference-block fields from a block id.
    ///
    /// The block number is the big-endian word at the start of the id; only
    /// its low 16 bits are kept. The prefix is the little-endian word at
    /// byte 8.
    pub fn set_reference_block(&mut self, block_id: &str) -> Result<()> {
        let id = parse_id("block_id", block_id)?;
        let block_num = u32::from_be_bytes([id[0], id[1], id[2], id[3]]);
        self.ref_block_num = (block_num & 0xffff) as u16;
        self.ref_block_prefix = u32::from_le_bytes([id[8], id[9], id[10], id[11]]);
        Ok(())
    }

    pub fn has_reference_block(&self) -> bool {
        self.ref_block_num != 0 || self.ref_block_prefix != 0
    }

    pub fn add_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn add_context_free_action(&mut self, action: Action) {
        self.context_free_actions.push(action);
    }

    pub fn pack(&self) -> Vec<u8> {
        to_bytes(self)
    }

    /// Decode a serialized transaction; trailing bytes are an error.
    pub fn unpack(data: &[u8]) -> Result<Self> {
        from_bytes(data)
    }

    /// The hash that signatures commit to.
    ///
    /// `sha256(chain_id || packed transaction || context-free data digest)`,
    /// where the last part is 32 zero bytes when there is no context-free
    /// data.
    pub fn signing_digest(&self, chain_id: &[u8; ID_LEN], context_free_data: &[Vec<u8>]) -> [u8; 32] {
        let mut buf = Vec::with_capacity(ID_LEN + self.size() + 32);
        buf.extend_from_slice(chain_id);
        buf.extend_from_slice(&self.pack());
        if context_free_data.is_empty() {
            buf.extend_from_slice(&[0u8; 32]);
        } else {
            buf.extend_from_slice(&sha256(&pack_context_free_data(context_free_data)));
        }
        sha256(&buf)
    }

    /// Transaction id: the hash of the packed transaction alone.
    pub fn id(&self) -> [u8; 32] {
        sha256(&self.pack())
    }
}

pub(crate) fn pack_context_free_data(data: &[Vec<u8>]) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.write_list(data);
    enc.into_bytes()
}

impl Pack for Extension {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_u16(self.r#type);
        enc.write_blob(&self.data);
    }

    fn size(&self) -> usize {
        2 + varuint32_size(self.data.len() as u32) + self.data.len()
    }
}

impl Unpack for Extension {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Extension {
            r#type: dec.read_u16()?,
            data: dec.read_blob()?,
        })
    }
}

fn list_size<T: Pack>(items: &[T]) -> usize {
    varuint32_size(items.len() as u32) + items.iter().map(Pack::size).sum::<usize>()
}

impl Pack for Transaction {
    fn pack(&self, enc: &mut Encoder) {
        self.expiration.pack(enc);
        enc.write_u16(self.ref_block_num);
        enc.write_u32(self.ref_block_prefix);
        enc.write_varuint32(self.max_net_usage_words);
        enc.write_u8(self.max_cpu_usage_ms);
        enc.write_varuint32(self.delay_sec);
        enc.write_list(&self.context_free_actions);
        enc.write_list(&self.actions);
        enc.write_list(&self.transaction_extensions);
    }

    fn size(&self) -> usize {
        4 + 2
            + 4
            + varuint32_size(self.max_net_usage_words)
            + 1
            + varuint32_size(self.delay_sec)
            + list_size(&self.context_free_actions)
            + list_size(&self.actions)
            + list_size(&self.transaction_extensions)
    }
}

impl Unpack for Transaction {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Transaction {
            expiration: dec.unpack()?,
            ref_block_num: dec.read_u16()?,
            ref_block_prefix: dec.read_u32()?,
            max_net_usage_words: dec.read_varuint32()?,
            max_cpu_usage_ms: dec.read_u8()?,
            delay_sec: dec.read_varuint32()?,
            context_free_actions: dec.read_list()?,
            actions: dec.read_list()?,
            transaction_extensions: dec.read_list()?,
        })
    }
}
