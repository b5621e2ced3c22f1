//! Verification outcome types.
//!
//! A verifier never fails on malformed content; it reports the first point of
//! divergence as a `VerifyResult` with a stable reason string.

use serde::{Deserialize, Serialize};

use crate::entry::Header;

/// Stable, machine-checkable failure reasons.
pub mod reason {
    pub const INVALID_HEADER: &str = "invalid header";
    pub const CORRUPTED_LOG: &str = "corrupted log";
    pub const INVALID_KIND: &str = "invalid log entry kind";
    pub const BROKEN_CHAIN: &str = "broken hash chain";
    pub const INVALID_HASH: &str = "invalid entry hash";
    pub const INVALID_HMAC: &str = "invalid entry HMAC";
    pub const NON_CONTIGUOUS_INDEX: &str = "non-contiguous index";
    pub const BROKEN_CONTINUITY: &str = "broken file continuity";
}

/// The result of verifying one log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResult {
    pub ok: bool,
    /// 1-based line of the first failure; 0 on success.
    pub failed_line: u64,
    /// One of the constants in [`reason`]; empty on success.
    pub reason: String,
    /// Index of the last entry that verified.
    pub last_index: u64,
    /// Final chain value; the continuity seed for the next file on success.
    pub last_hash_hex: String,
    /// The parsed header, when line 1 was readable.
    pub header: Option<Header>,
}

impl VerifyResult {
    pub fn passed(header: Header, last_index: u64, last_hash_hex: String) -> Self {
        Self {
            ok: true,
            failed_line: 0,
            reason: String::new(),
            last_index,
            last_hash_hex,
            header: Some(header),
        }
    }

    pub fn failed(
        header: Option<Header>,
        failed_line: u64,
        reason: &str,
        last_index: u64,
        last_hash_hex: String,
    ) -> Self {
        Self {
            ok: false,
            failed_line,
            reason: reason.to_string(),
            last_index,
            last_hash_hex,
            header,
        }
    }
}

/// Verification outcome for a single file inside a directory sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub file_name: String,
    pub result: VerifyResult,
}

/// Result of verifying every dated file in a log directory, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    /// True when every file verified and each header links to its predecessor.
    pub ok: bool,
    /// Per-file results up to and including the first failure.
    pub files: Vec<FileReport>,
}

impl ChainReport {
    /// The first failing file, if any.
    pub fn first_failure(&self) -> Option<&FileReport> {
        self.files.iter().find(|f| !f.result.ok)
    }
}
