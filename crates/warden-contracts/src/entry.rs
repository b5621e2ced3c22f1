//! On-disk record types.
//!
//! A log file is newline-delimited JSON: line 1 is a [`Header`], every later
//! line is a [`SignedEntry`]. The JSON produced by `serde_json::to_vec` for an
//! [`Entry`] is a hash input, so the field order below is a format contract:
//!
//! ```text
//! Entry:        kind, index, time, actor, action, command?, prof_command?,
//!               result, error?, fields?
//! Field:        name, value, rule?, deleted_rule?
//! RuleSnapshot: action, direction, interface, from_ip, to_ip, port,
//!               protocol, app_profile   (each omitted when empty)
//! ```
//!
//! `?` marks members omitted when `None` or empty. Reordering, renaming, or
//! changing an omission rule requires bumping [`FORMAT_VERSION`].
//!
//! Entry decoding is lenient: unknown members are ignored and missing ones
//! take their empty value. An edited member name therefore decodes, and the
//! re-encoded entry no longer matches the stored hash.

use serde::{Deserialize, Serialize};

/// Current log format version written into every header.
///
/// Bumped on any change to the canonical encoding. Readers reject headers
/// carrying a version of 0 or one newer than this.
pub const FORMAT_VERSION: u32 = 1;

/// Discriminator for the header line.
pub const HEADER_KIND: &str = "hdr";

/// Discriminator for entry lines.
pub const ENTRY_KIND: &str = "entry";

/// The first line of every log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Always `"hdr"`.
    pub kind: String,
    pub version: u32,
    /// UTC creation time, RFC 3339.
    pub created: String,
    pub host: String,
    /// Hex of 32 random bytes; stands in for the hash of entry 0.
    #[serde(rename = "seed")]
    pub seed_hex: String,
    /// Final verified hash of the preceding file, or `""` when there is none.
    pub prev_log_last_hash: String,
}

impl Header {
    /// Build a header for a fresh file at the current format version.
    pub fn new(
        created: impl Into<String>,
        host: impl Into<String>,
        seed_hex: impl Into<String>,
        prev_log_last_hash: impl Into<String>,
    ) -> Self {
        Self {
            kind: HEADER_KIND.to_string(),
            version: FORMAT_VERSION,
            created: created.into(),
            host: host.into(),
            seed_hex: seed_hex.into(),
            prev_log_last_hash: prev_log_last_hash.into(),
        }
    }

    /// True when the file records a predecessor in its continuity field.
    pub fn has_predecessor(&self) -> bool {
        !self.prev_log_last_hash.is_empty()
    }
}

/// A snapshot of a firewall rule as it was submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSnapshot {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub action: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub direction: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub interface: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub from_ip: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub to_ip: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub port: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub protocol: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub app_profile: String,
}

/// One structured annotation attached to an entry.
///
/// Carries a name/value pair and, optionally, a full rule snapshot or the
/// textual form of a rule that was deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Field {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_rule: Option<String>,
}

impl Field {
    /// A plain name/value annotation.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }
}

/// A single audited action. The payload is opaque to the audit subsystem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entry {
    /// Always `"entry"`.
    pub kind: String,
    /// 1-based position within the file.
    pub index: u64,
    /// UTC time of the append, RFC 3339.
    pub time: String,
    pub actor: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prof_command: Vec<String>,
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
}

/// The persisted unit: an entry plus its chain link, hash and HMAC.
///
/// Members outside `entry` are not covered by the hash, so extras are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignedEntry {
    pub entry: Entry,
    /// Hex of the previous chain value (the header seed for index 1).
    pub prev_hash: String,
    /// Hex SHA-256 over the raw previous hash bytes and the canonical entry.
    pub hash: String,
    /// Hex HMAC-SHA256 over the raw `hash` bytes.
    pub hmac: String,
}
