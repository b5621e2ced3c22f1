//! Fast recovery of chain state from an existing log file.
//!
//! The tail scan trusts the file: it follows each entry's stored `hash`
//! without recomputing it or checking the HMAC. It exists so a restarted
//! writer can resume the chain quickly. Adversarial checking belongs to
//! [`crate::verify`].

use std::{fs::File, io::BufReader, path::Path};

use warden_contracts::{
    entry::{Header, SignedEntry, ENTRY_KIND},
    error::{AuditError, AuditResult},
};

use crate::{
    chain::{decode_hash, ChainHash},
    reader::{parse_header, Line, LineReader},
};

/// Chain position recovered from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailState {
    pub header: Header,
    /// Hash of the last entry, or the seed when the file holds no entries.
    pub last_hash: ChainHash,
    /// Index the next appended entry receives.
    pub next_index: u64,
}

impl TailState {
    pub fn last_hash_hex(&self) -> String {
        hex::encode(self.last_hash)
    }

    /// Number of entries the file claims to hold.
    pub fn entry_count(&self) -> u64 {
        self.next_index.saturating_sub(1)
    }
}

/// Scan the file at `path` and return where its chain currently ends.
///
/// Fails with `Parse` if the header is missing or invalid, or if any entry
/// line is not a well-formed `SignedEntry` of kind `"entry"`.
pub fn scan_tail(path: &Path) -> AuditResult<TailState> {
    let file = File::open(path)
        .map_err(|e| AuditError::io(format!("failed to open '{}'", path.display()), e))?;
    let mut reader = LineReader::new(BufReader::new(file));
    let read_err = |e| AuditError::io(format!("failed to read '{}'", path.display()), e);

    let (header, seed) = match reader.next_line().map_err(read_err)? {
        None => return Err(AuditError::parse(1, "file is missing its header")),
        Some((_, Line::Oversized)) => return Err(AuditError::parse(1, "header line too long")),
        Some((_, Line::Content(bytes))) => {
            parse_header(bytes).map_err(|reason| AuditError::parse(1, reason))?
        }
    };

    let mut last_hash = seed;
    let mut next_index = 1;

    while let Some((line_no, line)) = reader.next_line().map_err(read_err)? {
        let bytes = match line {
            Line::Content(bytes) => bytes,
            Line::Oversized => return Err(AuditError::parse(line_no, "entry line too long")),
        };
        let se: SignedEntry = serde_json::from_slice(bytes)
            .map_err(|e| AuditError::parse(line_no, format!("invalid log entry: {}", e)))?;
        if se.entry.kind != ENTRY_KIND {
            return Err(AuditError::parse(line_no, "invalid log entry kind"));
        }
        last_hash = decode_hash(&se.hash)
            .ok_or_else(|| AuditError::parse(line_no, "malformed entry hash"))?;
        next_index = se
            .entry
            .index
            .checked_add(1)
            .ok_or_else(|| AuditError::parse(line_no, "entry index overflow"))?;
    }

    Ok(TailState {
        header,
        last_hash,
        next_index,
    })
}
