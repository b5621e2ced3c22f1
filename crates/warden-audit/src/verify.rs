//! Independent, adversarial verification of a closed log file.
//!
//! Verification algorithm, per entry line:
//!
//! 1. Decode the `SignedEntry`; anything undecodable is `corrupted log`.
//! 2. The entry kind must be `"entry"`.
//! 3. `prev_hash` must equal the running chain value (constant time).
//! 4. The hash recomputed from the running value and the canonical entry must
//!    equal the stored `hash` (constant time).
//! 5. The HMAC recomputed from that hash must equal the stored `hmac`
//!    (constant time).
//! 6. The index must follow the previous one.
//!
//! The first failure is reported with its line number and stops the walk.
//! Malformed content never produces an `Err`; only I/O failures do.
//!
//! Do not point this at the file a live writer is appending to: a reader may
//! observe a half-written trailing line.

use std::{fs::File, io::BufReader, path::Path};

use tracing::debug;

use warden_contracts::{
    entry::{SignedEntry, ENTRY_KIND},
    error::{AuditError, AuditResult},
    verify::{reason, VerifyResult},
};

use crate::{
    chain::{canonical_encode, ct_eq, entry_hash, entry_hmac},
    reader::{parse_header, Line, LineReader},
};

/// Verify the whole chain in the file at `path` under `key`.
pub fn verify_file(path: &Path, key: &[u8]) -> AuditResult<VerifyResult> {
    let file = File::open(path)
        .map_err(|e| AuditError::io(format!("failed to open '{}'", path.display()), e))?;
    let mut reader = LineReader::new(BufReader::new(file));
    let read_err = |e| AuditError::io(format!("failed to read '{}'", path.display()), e);

    let parsed = match reader.next_line().map_err(read_err)? {
        Some((_, Line::Content(bytes))) => parse_header(bytes).ok(),
        _ => None,
    };
    let Some((header, seed)) = parsed else {
        return Ok(VerifyResult::failed(None, 1, reason::INVALID_HEADER, 0, String::new()));
    };

    let mut expected = seed;
    let mut expected_hex = hex::encode(seed);
    let mut last_index = 0u64;

    while let Some((line_no, line)) = reader.next_line().map_err(read_err)? {
        let fail = |why: &str, last_index: u64, last_hash_hex: &str| {
            Ok(VerifyResult::failed(
                Some(header.clone()),
                line_no,
                why,
                last_index,
                last_hash_hex.to_string(),
            ))
        };

        let se: SignedEntry = match line {
            Line::Content(bytes) => match serde_json::from_slice(bytes) {
                Ok(se) => se,
                Err(_) => return fail(reason::CORRUPTED_LOG, last_index, &expected_hex),
            },
            Line::Oversized => return fail(reason::CORRUPTED_LOG, last_index, &expected_hex),
        };

        if se.entry.kind != ENTRY_KIND {
            return fail(reason::INVALID_KIND, last_index, &expected_hex);
        }

        if !ct_eq(&se.prev_hash, &expected_hex) {
            return fail(reason::BROKEN_CHAIN, last_index, &expected_hex);
        }

        let encoded = canonical_encode(&se.entry)?;
        let hash = entry_hash(&expected, &encoded);
        let hash_hex = hex::encode(hash);
        if !ct_eq(&se.hash, &hash_hex) {
            return fail(reason::INVALID_HASH, last_index, &expected_hex);
        }

        let hmac_hex = hex::encode(entry_hmac(key, &hash)?);
        if !ct_eq(&se.hmac, &hmac_hex) {
            return fail(reason::INVALID_HMAC, last_index, &expected_hex);
        }

        if se.entry.index != last_index + 1 {
            return fail(reason::NON_CONTIGUOUS_INDEX, last_index, &expected_hex);
        }

        expected = hash;
        expected_hex = hash_hex;
        last_index = se.entry.index;
    }

    debug!(path = %path.display(), last_index, "audit log verified");
    Ok(VerifyResult::passed(header, last_index, expected_hex))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;
    use warden_contracts::{
        entry::Header,
        record::{outcome, AuditRecord},
    };

    use super::*;
    use crate::chain::{sign_entry, ChainHash};

    const KEY: [u8; 32] = [0x24; 32];
    const SEED: ChainHash = [0x01; 32];

    fn signed_lines(count: u64) -> Vec<String> {
        let header = Header::new("2026-01-02T00:00:00.000Z", "fw01", hex::encode(SEED), "");
        let mut out = vec![serde_json::to_string(&header).unwrap()];
        let mut prev = SEED;
        for index in 1..=count {
            let entry = AuditRecord::new("rule.add", outcome::SUCCESS)
                .actor("alice")
                .command(format!("ufw allow {}", 1000 + index))
                .into_entry(index, "2026-01-02T00:00:01.000Z");
            let (se, hash) = sign_entry(entry, &prev, &KEY).unwrap();
            out.push(serde_json::to_string(&se).unwrap());
            prev = hash;
        }
        out
    }

    fn write(dir: &TempDir, lines: &[String]) -> std::path::PathBuf {
        let path = dir.path().join("audit.log");
        let mut file = File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    fn edit(line: &str, f: impl FnOnce(&mut SignedEntry)) -> String {
        let mut se: SignedEntry = serde_json::from_str(line).unwrap();
        f(&mut se);
        serde_json::to_string(&se).unwrap()
    }

    #[test]
    fn intact_log_verifies() {
        let dir = TempDir::new().unwrap();
        let lines = signed_lines(4);
        let path = write(&dir, &lines);

        let result = verify_file(&path, &KEY).unwrap();
        assert!(result.ok);
        assert_eq!(result.last_index, 4);
        let last: SignedEntry = serde_json::from_str(&lines[4]).unwrap();
        assert_eq!(result.last_hash_hex, last.hash);
    }

    #[test]
    fn header_only_log_verifies_to_seed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, &signed_lines(0));
        let result = verify_file(&path, &KEY).unwrap();
        assert!(result.ok);
        assert_eq!(result.last_index, 0);
        assert_eq!(result.last_hash_hex, hex::encode(SEED));
    }

    #[test]
    fn empty_or_garbled_header_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let empty = write(&dir, &[]);
        let result = verify_file(&empty, &KEY).unwrap();
        assert_eq!((result.ok, result.failed_line), (false, 1));
        assert_eq!(result.reason, reason::INVALID_HEADER);

        let path = write(&dir, &["{not json".to_string()]);
        let result = verify_file(&path, &KEY).unwrap();
        assert_eq!(result.reason, reason::INVALID_HEADER);
        assert!(result.header.is_none());
    }

    #[test]
    fn edited_content_is_invalid_hash() {
        let dir = TempDir::new().unwrap();
        let mut lines = signed_lines(3);
        lines[2] = edit(&lines[2], |se| se.entry.actor = "mallory".into());
        let path = write(&dir, &lines);

        let result = verify_file(&path, &KEY).unwrap();
        assert!(!result.ok);
        assert_eq!(result.failed_line, 3);
        assert_eq!(result.reason, reason::INVALID_HASH);
        assert_eq!(result.last_index, 1);
    }

    #[test]
    fn deleted_entry_breaks_chain() {
        let dir = TempDir::new().unwrap();
        let mut lines = signed_lines(3);
        lines.remove(2);
        let path = write(&dir, &lines);

        let result = verify_file(&path, &KEY).unwrap();
        assert_eq!(result.failed_line, 3);
        assert_eq!(result.reason, reason::BROKEN_CHAIN);
    }

    #[test]
    fn reordered_entries_break_chain() {
        let dir = TempDir::new().unwrap();
        let mut lines = signed_lines(3);
        lines.swap(2, 3);
        let path = write(&dir, &lines);
        assert_eq!(verify_file(&path, &KEY).unwrap().reason, reason::BROKEN_CHAIN);
    }

    #[test]
    fn wrong_key_is_invalid_hmac_on_first_entry() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, &signed_lines(2));
        let result = verify_file(&path, &[0x25; 32]).unwrap();
        assert_eq!(result.failed_line, 2);
        assert_eq!(result.reason, reason::INVALID_HMAC);
    }

    #[test]
    fn recomputed_hash_without_key_fails_hmac() {
        let dir = TempDir::new().unwrap();
        let mut lines = signed_lines(1);
        let forged = edit(&lines[1], |se| {
            se.entry.result = outcome::ERROR.into();
            let encoded = canonical_encode(&se.entry).unwrap();
            se.hash = hex::encode(entry_hash(&SEED, &encoded));
        });
        lines[1] = forged;
        let path = write(&dir, &lines);
        assert_eq!(verify_file(&path, &KEY).unwrap().reason, reason::INVALID_HMAC);
    }

    #[test]
    fn garbage_line_is_corrupted_log() {
        let dir = TempDir::new().unwrap();
        let mut lines = signed_lines(2);
        lines.push("{\"entry\":".to_string());
        let path = write(&dir, &lines);
        let result = verify_file(&path, &KEY).unwrap();
        assert_eq!(result.failed_line, 4);
        assert_eq!(result.reason, reason::CORRUPTED_LOG);
        assert_eq!(result.last_index, 2);
    }

    #[test]
    fn wrong_kind_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut lines = signed_lines(1);
        lines[1] = edit(&lines[1], |se| se.entry.kind = "hdr".into());
        let path = write(&dir, &lines);
        assert_eq!(verify_file(&path, &KEY).unwrap().reason, reason::INVALID_KIND);
    }

    #[test]
    fn validly_signed_index_gap_is_reported() {
        let dir = TempDir::new().unwrap();
        let header = Header::new("t", "fw01", hex::encode(SEED), "");
        let entry = AuditRecord::new("rule.add", outcome::SUCCESS).into_entry(5, "t");
        let (se, _) = sign_entry(entry, &SEED, &KEY).unwrap();
        let path = write(
            &dir,
            &[serde_json::to_string(&header).unwrap(), serde_json::to_string(&se).unwrap()],
        );
        let result = verify_file(&path, &KEY).unwrap();
        assert_eq!(result.failed_line, 2);
        assert_eq!(result.reason, reason::NON_CONTIGUOUS_INDEX);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = verify_file(&dir.path().join("absent.log"), &KEY).unwrap_err();
        assert!(matches!(err, AuditError::Io { .. }));
    }
}
