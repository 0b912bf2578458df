//! secp256k1 keys and recoverable signatures in the chain's text formats.
//!
//! | kind        | text form                         | checksum                        |
//! |-------------|-----------------------------------|---------------------------------|
//! | private key | `5...` (WIF) or `PVT_K1_...`      | double SHA-256 / RIPEMD-160+K1  |
//! | public key  | `EOS...` or `PUB_K1_...`          | RIPEMD-160 / RIPEMD-160+K1      |
//! | signature   | `SIG_K1_...`                      | RIPEMD-160+K1                   |

use crate::codec::{Decoder, Encoder, Pack, Unpack};
use crate::error::{Error, Result};
use k256::ecdsa::signature::hazmat::RandomizedPrehashSigner;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use ripemd::Ripemd160;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

const WIF_VERSION: u8 = 0x80;
const K1_SUFFIX: &[u8] = b"K1";
const KEY_TYPE_K1: u8 = 0;
const LEGACY_PUBLIC_PREFIX: &str = "EOS";
const PUBLIC_PREFIX: &str = "PUB_K1_";
const PRIVATE_PREFIX: &str = "PVT_K1_";
const SIGNATURE_PREFIX: &str = "SIG_K1_";

/// Give up on finding a canonical signature after this many nonces.
const MAX_SIGN_ATTEMPTS: usize = 64;

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

fn ripemd160_checksum(data: &[u8], suffix: &[u8]) -> [u8; 4] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.update(suffix);
    let digest = hasher.finalize();
    [digest[0], digest[1], digest[2], digest[3]]
}

fn double_sha256_checksum(data: &[u8]) -> [u8; 4] {
    let digest = sha256(&sha256(data));
    [digest[0], digest[1], digest[2], digest[3]]
}

fn encode_with_checksum(payload: &[u8], checksum: [u8; 4]) -> String {
    let mut buf = Vec::with_capacity(payload.len() + 4);
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&checksum);
    bs58::encode(buf).into_string()
}

/// Base58-decode `text` and split off a 4-byte checksum, checking the
/// payload length.
fn decode_with_checksum(text: &str, payload_len: usize) -> Option<(Vec<u8>, [u8; 4])> {
    let mut raw = bs58::decode(text).into_vec().ok()?;
    if raw.len() != payload_len + 4 {
        return None;
    }
    let tail = raw.split_off(payload_len);
    Some((raw, [tail[0], tail[1], tail[2], tail[3]]))
}

/// A secp256k1 public key.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// 33-byte compressed SEC1 encoding.
    pub fn to_compressed(&self) -> [u8; 33] {
        let point = self.0.to_encoded_point(true);
        let mut out = [0u8; 33];
        out.copy_from_slice(point.as_bytes());
        out
    }

    pub fn from_compressed(bytes: &[u8]) -> Result<Self> {
        VerifyingKey::from_sec1_bytes(bytes)
            .map(PublicKey)
            .map_err(|e| Error::InvalidKey(format!("bad public key point: {}", e)))
    }

    /// Legacy `EOS...` form.
    pub fn to_legacy_string(&self) -> String {
        let data = self.to_compressed();
        format!(
            "{}{}",
            LEGACY_PUBLIC_PREFIX,
            encode_with_checksum(&data, ripemd160_checksum(&data, &[]))
        )
    }
}

impl FromStr for PublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (body, suffix) = if let Some(body) = s.strip_prefix(PUBLIC_PREFIX) {
            (body, K1_SUFFIX)
        } else if let Some(body) = s.strip_prefix(LEGACY_PUBLIC_PREFIX) {
            (body, &[][..])
        } else {
            return Err(Error::InvalidKey(format!("unknown public key format '{}'", s)));
        };

        let (data, checksum) = decode_with_checksum(body, 33)
            .ok_or_else(|| Error::InvalidKey(format!("malformed public key '{}'", s)))?;
        if ripemd160_checksum(&data, suffix) != checksum {
            return Err(Error::InvalidKey(format!("checksum mismatch in '{}'", s)));
        }
        PublicKey::from_compressed(&data)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.to_compressed();
        write!(
            f,
            "{}{}",
            PUBLIC_PREFIX,
            encode_with_checksum(&data, ripemd160_checksum(&data, K1_SUFFIX))
        )
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

/// A secp256k1 private key.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Fresh random key from the operating system RNG.
    pub fn generate() -> Self {
        PrivateKey(SigningKey::random(&mut OsRng))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        SigningKey::from_slice(bytes)
            .map(PrivateKey)
            .map_err(|_| Error::InvalidKey("private key is not a valid scalar".to_string()))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes().into()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().clone())
    }

    /// Wallet import format, `5...`.
    pub fn to_wif(&self) -> String {
        let mut payload = Vec::with_capacity(33);
        payload.push(WIF_VERSION);
        payload.extend_from_slice(&self.to_bytes());
        encode_with_checksum(&payload, double_sha256_checksum(&payload))
    }

    /// Produce a canonical, recoverable signature over a 32-byte digest.
    ///
    /// The first attempt is deterministic (RFC 6979); later attempts mix in
    /// fresh randomness until both `r` and `s` have the canonical form the
    /// chain accepts.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature> {
        let (sig, recid) = self
            .0
            .sign_prehash_recoverable(digest)
            .map_err(|e| Error::SigningFailed(e.to_string()))?;
        let candidate = Signature::from_parts(&sig, recid);
        if candidate.is_canonical() {
            return Ok(candidate);
        }

        let verifying_key = self.0.verifying_key();
        for _ in 1..MAX_SIGN_ATTEMPTS {
            let sig: EcdsaSignature = self
                .0
                .sign_prehash_with_rng(&mut OsRng, digest)
                .map_err(|e| Error::SigningFailed(e.to_string()))?;
            let sig = sig.normalize_s().unwrap_or(sig);
            let recid = trial_recovery(verifying_key, digest, &sig)?;
            let candidate = Signature::from_parts(&sig, recid);
            if candidate.is_canonical() {
                return Ok(candidate);
            }
        }

        Err(Error::SigningFailed(
            "no canonical signature found".to_string(),
        ))
    }
}

fn trial_recovery(
    expected: &VerifyingKey,
    digest: &[u8; 32],
    sig: &EcdsaSignature,
) -> Result<RecoveryId> {
    (0u8..4)
        .filter_map(RecoveryId::from_byte)
        .find(|id| {
            VerifyingKey::recover_from_prehash(digest, sig, *id)
                .map(|vk| vk == *expected)
                .unwrap_or(false)
        })
        .ok_or_else(|| Error::SigningFailed("could not determine recovery id".to_string()))
}

impl FromStr for PrivateKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(body) = s.strip_prefix(PRIVATE_PREFIX) {
            let (data, checksum) = decode_with_checksum(body, 32)
                .ok_or_else(|| Error::InvalidKey("malformed PVT_K1 private key".to_string()))?;
            if ripemd160_checksum(&data, K1_SUFFIX) != checksum {
                return Err(Error::InvalidKey("private key checksum mismatch".to_string()));
            }
            return PrivateKey::from_bytes(&data);
        }

        let (payload, checksum) = decode_with_checksum(s, 33)
            .ok_or_else(|| Error::InvalidKey("malformed WIF private key".to_string()))?;
        if payload[0] != WIF_VERSION {
            return Err(Error::InvalidKey(format!(
                "unexpected WIF version byte 0x{:02x}",
                payload[0]
            )));
        }
        if double_sha256_checksum(&payload) != checksum {
            return Err(Error::InvalidKey("private key checksum mismatch".to_string()));
        }
        PrivateKey::from_bytes(&payload[1..])
    }
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.to_bytes();
        write!(
            f,
            "{}{}",
            PRIVATE_PREFIX,
            encode_with_checksum(&data, ripemd160_checksum(&data, K1_SUFFIX))
        )
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({})", self.public_key())
    }
}

/// A 65-byte recoverable signature: header byte, then `r`, then `s`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 65]);

impl Signature {
    /// Header byte offset for compressed-key signatures.
    const HEADER_BASE: u8 = 27 + 4;

    fn from_parts(sig: &EcdsaSignature, recid: RecoveryId) -> Self {
        let mut out = [0u8; 65];
        out[0] = Self::HEADER_BASE + recid.to_byte();
        out[1..].copy_from_slice(&sig.to_bytes());
        Signature(out)
    }

    pub fn from_bytes(bytes: [u8; 65]) -> Self {
        Signature(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    /// Neither `r` nor `s` may have the high bit set or a redundant leading
    /// zero byte.
    pub fn is_canonical(&self) -> bool {
        let c = &self.0;
        c[1] & 0x80 == 0
            && !(c[1] == 0 && c[2] & 0x80 == 0)
            && c[33] & 0x80 == 0
            && !(c[33] == 0 && c[34] & 0x80 == 0)
    }

    /// Recover the public key that produced this signature over `digest`.
    pub fn recover(&self, digest: &[u8; 32]) -> Result<PublicKey> {
        let recid = self.0[0]
            .checked_sub(Self::HEADER_BASE)
            .or_else(|| self.0[0].checked_sub(27))
            .and_then(|b| RecoveryId::from_byte(b & 0x03))
            .ok_or_else(|| Error::InvalidSignature(format!("bad header byte {}", self.0[0])))?;
        let sig = EcdsaSignature::from_slice(&self.0[1..])
            .map_err(|e| Error::InvalidSignature(e.to_string()))?;
        VerifyingKey::recover_from_prehash(digest, &sig, recid)
            .map(PublicKey)
            .map_err(|e| Error::InvalidSignature(format!("recovery failed: {}", e)))
    }
}

impl FromStr for Signature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let body = s
            .strip_prefix(SIGNATURE_PREFIX)
            .ok_or_else(|| Error::InvalidSignature(format!("unknown signature format '{}'", s)))?;
        let (data, checksum) = decode_with_checksum(body, 65)
            .ok_or_else(|| Error::InvalidSignature(format!("malformed signature '{}'", s)))?;
        if ripemd160_checksum(&data, K1_SUFFIX) != checksum {
            return Err(Error::InvalidSignature("checksum mismatch".to_string()));
        }
        let mut out = [0u8; 65];
        out.copy_from_slice(&data);
        Ok(Signature(out))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            SIGNATURE_PREFIX,
            encode_with_checksum(&self.0, ripemd160_checksum(&self.0, K1_SUFFIX))
        )
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

impl Pack for PublicKey {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_u8(KEY_TYPE_K1);
        enc.write_bytes(&self.to_compressed());
    }

    fn size(&self) -> usize {
        34
    }
}

impl Unpack for PublicKey {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        match dec.read_u8()? {
            KEY_TYPE_K1 => PublicKey::from_compressed(dec.read_bytes(33)?),
            other => Err(Error::InvalidKey(format!("unsupported key type {}", other))),
        }
    }
}

impl Pack for Signature {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_u8(KEY_TYPE_K1);
        enc.write_bytes(&self.0);
    }

    fn size(&self) -> usize {
        66
    }
}

impl Unpack for Signature {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self> {
        match dec.read_u8()? {
            KEY_TYPE_K1 => dec.read_array::<65>().map(Signature),
            other => Err(Error::InvalidSignature(format!(
                "unsupported signature type {}",
                other
            ))),
        }
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
