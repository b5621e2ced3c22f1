//! Audit configuration.
//!
//! `AuditConfig` is read from a TOML document; every key is optional.
//!
//! ```toml
//! dir = "/var/lib/warden/audit"
//! key_env = "WARDEN_AUDIT_KEY"
//! failure_policy = "abort"   # or "warn"
//! read_back = false
//! exclusive_lock = true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use warden_contracts::error::{AuditError, AuditResult};
use warden_core::FailurePolicy;

use crate::{
    key::{load_key_from_env, AuditKey, DEFAULT_KEY_ENV},
    writer::WriterOptions,
};

/// Where the audit trail lives and how strictly it is written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Directory holding the dated `audit-YYYY-MM-DD.log` files.
    pub dir: PathBuf,
    /// Environment variable carrying the base64 HMAC key.
    pub key_env: String,
    /// What callers do when an append cannot be made durable.
    pub failure_policy: FailurePolicy,
    /// Re-read each appended line to confirm it landed as written.
    pub read_back: bool,
    /// Hold an OS advisory lock on the live file.
    pub exclusive_lock: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("audit"),
            key_env: DEFAULT_KEY_ENV.to_string(),
            failure_policy: FailurePolicy::default(),
            read_back: false,
            exclusive_lock: true,
        }
    }
}

impl AuditConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `AuditError::Config` if the TOML is malformed or carries
    /// unknown keys.
    pub fn from_toml_str(s: &str) -> AuditResult<Self> {
        toml::from_str(s).map_err(|e| AuditError::config(format!("failed to parse audit config: {}", e)))
    }

    /// Read the file at `path` and parse it as TOML.
    pub fn from_file(path: &Path) -> AuditResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AuditError::config(format!(
                "failed to read audit config '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            read_back: self.read_back,
            exclusive_lock: self.exclusive_lock,
        }
    }

    /// Load the key from the configured environment variable.
    pub fn load_key(&self) -> AuditResult<AuditKey> {
        load_key_from_env(&self.key_env)
    }
}
