//! Hash-chain primitives: canonical encoding, hashing and signing.
//!
//! Hash input layout (bytes, in order):
//!   1. the previous chain value as 32 raw bytes (the header seed for index 1)
//!   2. canonical JSON of the entry (serde_json, compact, declaration order)
//!
//! The HMAC is computed over the 32 raw bytes of the resulting hash, never
//! over its hex form.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use warden_contracts::{
    entry::{Entry, SignedEntry},
    error::{AuditError, AuditResult},
};

type HmacSha256 = Hmac<Sha256>;

/// A raw chain value: a seed or an entry hash.
pub type ChainHash = [u8; 32];

/// Length of a hex-encoded chain value.
pub const HASH_HEX_LEN: usize = 64;

/// Encode `entry` exactly as it is hashed and stored.
pub fn canonical_encode(entry: &Entry) -> AuditResult<Vec<u8>> {
    serde_json::to_vec(entry).map_err(|e| AuditError::Serialization {
        reason: format!("failed to encode entry {}: {}", entry.index, e),
    })
}

/// Decode a 64-character hex chain value. Returns `None` for anything else.
pub fn decode_hash(hex_str: &str) -> Option<ChainHash> {
    if hex_str.len() != HASH_HEX_LEN {
        return None;
    }
    let mut out = [0u8; 32];
    hex::decode_to_slice(hex_str, &mut out).ok()?;
    Some(out)
}

/// SHA-256 over the previous chain value followed by the encoded entry.
pub fn entry_hash(prev: &ChainHash, encoded_entry: &[u8]) -> ChainHash {
    let mut hasher = Sha256::new();
    hasher.update(prev);
    hasher.update(encoded_entry);
    hasher.finalize().into()
}

/// HMAC-SHA256 of a chain value under `key`.
pub fn entry_hmac(key: &[u8], hash: &ChainHash) -> AuditResult<[u8; 32]> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| AuditError::config(format!("unusable HMAC key: {}", e)))?;
    mac.update(hash);
    Ok(mac.finalize().into_bytes().into())
}

/// Link `entry` onto `prev`, producing the persisted record and its raw hash.
pub fn sign_entry(entry: Entry, prev: &ChainHash, key: &[u8]) -> AuditResult<(SignedEntry, ChainHash)> {
    let encoded = canonical_encode(&entry)?;
    let hash = entry_hash(prev, &encoded);
    let hmac = entry_hmac(key, &hash)?;

    let signed = SignedEntry {
        entry,
        prev_hash: hex::encode(prev),
        hash: hex::encode(hash),
        hmac: hex::encode(hmac),
    };
    Ok((signed, hash))
}

/// Compare two strings without an early exit on the first differing byte.
///
/// Strings of different length compare unequal.
pub fn ct_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
