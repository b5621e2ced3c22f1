//! Audit key loading.
//!
//! The key is a base64-encoded secret of at least [`MIN_KEY_LEN`] bytes,
//! injected by the hosting application (usually through an environment
//! variable). Decoding is pure; only [`load_key_from_env`] touches the process
//! environment.

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

use warden_contracts::error::{AuditError, AuditResult};

/// Minimum accepted key length in bytes.
pub const MIN_KEY_LEN: usize = 32;

/// Default environment variable holding the encoded key.
pub const DEFAULT_KEY_ENV: &str = "WARDEN_AUDIT_KEY";

/// The shared HMAC secret. Wiped from memory on drop.
#[derive(Clone)]
pub struct AuditKey(Zeroizing<Vec<u8>>);

impl AuditKey {
    /// Wrap raw key bytes, enforcing the minimum length.
    pub fn from_bytes(bytes: Vec<u8>) -> AuditResult<Self> {
        let bytes = Zeroizing::new(bytes);
        if bytes.len() < MIN_KEY_LEN {
            return Err(AuditError::config(format!(
                "key length is {} bytes; must be at least {} bytes",
                bytes.len(),
                MIN_KEY_LEN
            )));
        }
        Ok(Self(bytes))
    }

    /// A fresh random key of [`MIN_KEY_LEN`] bytes.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new(vec![0u8; MIN_KEY_LEN]);
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Standard base64, the form [`decode_key`] accepts.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.as_bytes())
    }
}

impl std::fmt::Debug for AuditKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuditKey([REDACTED; {}])", self.0.len())
    }
}

/// Decode a base64 key, failing with `Config` if it is empty, malformed or short.
pub fn decode_key(encoded: &str) -> AuditResult<AuditKey> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(AuditError::config("audit key is empty"));
    }
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| AuditError::config(format!("failed to decode audit key from base64: {}", e)))?;
    AuditKey::from_bytes(bytes)
}

/// Read and decode the key from environment variable `var`.
pub fn load_key_from_env(var: &str) -> AuditResult<AuditKey> {
    let encoded = Zeroizing::new(
        std::env::var(var)
            .map_err(|_| AuditError::config(format!("{} environment variable not set", var)))?,
    );
    decode_key(&encoded)
}
