//! # warden-audit
//!
//! Append-only, SHA-256 hash-chained, HMAC-signed audit log files.
//!
//! ## Overview
//!
//! Every security-relevant action is appended to a daily newline-delimited
//! JSON file as a `SignedEntry` that links to the previous entry's hash and
//! carries an HMAC under a shared secret. Editing, deleting or reordering any
//! past entry breaks the chain, and forging a replacement chain requires the
//! key. Daily files are linked by carrying each file's final hash into the
//! next file's header.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warden_audit::{continuity::open_daily, verify::verify_file, AuditConfig};
//!
//! let config = AuditConfig::from_file(Path::new("/etc/warden/audit.toml"))?;
//! let log = open_daily(&config, config.load_key()?, Utc::now())?;
//! log.append(AuditRecord::new("ufw.add", "success").actor("alice").command(cmd))?;
//!
//! let result = verify_file(Path::new("audit/audit-2026-01-01.log"), key.as_bytes())?;
//! assert!(result.ok);
//! ```

pub mod chain;
pub mod config;
pub mod continuity;
pub mod key;
mod reader;
pub mod tail;
pub mod verify;
pub mod writer;

pub use config::AuditConfig;
pub use continuity::{open_daily, resolve_prior_hash, verify_directory};
pub use key::{decode_key, load_key_from_env, AuditKey};
pub use reader::MAX_LINE_BYTES;
pub use tail::{scan_tail, TailState};
pub use verify::verify_file;
pub use writer::{Log, WriterOptions};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::{
        path::{Path, PathBuf},
        sync::Arc,
    };

    use tempfile::TempDir;
    use warden_contracts::{
        entry::{Header, SignedEntry},
        record::{outcome, AuditRecord},
        verify::reason,
    };
    use warden_core::{FailurePolicy, Recorder};

    use super::{verify_file, AuditKey, Log};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn key() -> AuditKey {
        AuditKey::from_bytes((0u8..32).collect()).unwrap()
    }

    fn wrong_key() -> AuditKey {
        AuditKey::from_bytes((1u8..33).collect()).unwrap()
    }

    fn record(n: usize) -> AuditRecord {
        AuditRecord::new("rule.add", outcome::SUCCESS)
            .actor("alice")
            .command(format!("ufw allow {}/tcp", 2000 + n))
    }

    /// Open a fresh log, append `n` records, and close it.
    fn fresh_log(dir: &TempDir, n: usize) -> PathBuf {
        let path = dir.path().join("audit-2026-01-02.log");
        let log = Log::open(&path, key(), "").unwrap();
        for i in 0..n {
            log.append(record(i)).unwrap();
        }
        log.close().unwrap();
        path
    }

    fn entry_lines(path: &Path) -> Vec<SignedEntry> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .skip(1)
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    /// N appends on an empty file verify as N entries.
    #[test]
    fn test_chain_integrity() {
        let dir = TempDir::new().unwrap();
        for n in [0usize, 1, 5, 40] {
            let sub = TempDir::new_in(dir.path()).unwrap();
            let path = fresh_log(&sub, n);
            let result = verify_file(&path, key().as_bytes()).unwrap();
            assert!(result.ok, "log with {} entries must verify", n);
            assert_eq!(result.last_index, n as u64);
        }
    }

    /// Flipping one byte of entry i's content is caught at line i+1.
    #[test]
    fn test_tamper_detection() {
        let dir = TempDir::new().unwrap();
        let path = fresh_log(&dir, 5);
        let original = std::fs::read(&path).unwrap();

        for i in 1..=5usize {
            let mut bytes = original.clone();
            let line_start = bytes
                .split(|b| *b == b'\n')
                .take(i)
                .map(|l| l.len() + 1)
                .sum::<usize>();
            let needle = b"\"actor\":\"alice\"";
            let offset = bytes[line_start..]
                .windows(needle.len())
                .position(|w| w == needle)
                .unwrap();
            // Flip the 'a' of "alice".
            bytes[line_start + offset + 9] ^= 0x01;
            std::fs::write(&path, &bytes).unwrap();

            let result = verify_file(&path, key().as_bytes()).unwrap();
            assert!(!result.ok);
            assert_eq!(result.failed_line, i as u64 + 1);
            assert_eq!(result.reason, reason::INVALID_HASH);
        }
    }

    /// Editing a member name inside an entry is a hash failure, not a decode failure.
    #[test]
    fn test_member_name_edit_is_hash_failure() {
        let dir = TempDir::new().unwrap();
        let path = fresh_log(&dir, 3);
        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines: Vec<String> = content.lines().map(String::from).collect();
        lines[2] = lines[2].replacen("\"actor\":", "\"`ctor\":", 1);
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();

        let result = verify_file(&path, key().as_bytes()).unwrap();
        assert!(!result.ok);
        assert_eq!(result.failed_line, 3);
        assert_eq!(result.reason, reason::INVALID_HASH);
        assert_eq!(result.last_index, 1);
    }

    /// An unmodified log under the wrong key fails HMAC at the first entry.
    #[test]
    fn test_key_sensitivity() {
        let dir = TempDir::new().unwrap();
        let path = fresh_log(&dir, 3);
        let result = verify_file(&path, wrong_key().as_bytes()).unwrap();
        assert!(!result.ok);
        assert_eq!(result.failed_line, 2);
        assert_eq!(result.reason, reason::INVALID_HMAC);
    }

    /// Reopening a file with M entries and appending K yields M+K contiguous entries.
    #[test]
    fn test_resume_correctness() {
        let dir = TempDir::new().unwrap();
        let path = fresh_log(&dir, 4);

        let log = Log::open(&path, key(), "").unwrap();
        assert_eq!(log.head().unwrap().1, 5);
        for i in 0..3 {
            log.append(record(100 + i)).unwrap();
        }
        log.close().unwrap();

        let result = verify_file(&path, key().as_bytes()).unwrap();
        assert!(result.ok);
        assert_eq!(result.last_index, 7);

        let indices: Vec<u64> = entry_lines(&path).iter().map(|se| se.entry.index).collect();
        assert_eq!(indices, (1..=7).collect::<Vec<_>>());
    }

    /// Indices are never reused or skipped across several restarts.
    #[test]
    fn test_index_monotonic_across_restarts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        for round in 0..4 {
            let log = Log::open(&path, key(), "").unwrap();
            log.append(record(round)).unwrap();
            log.append(record(round + 10)).unwrap();
        }
        let indices: Vec<u64> = entry_lines(&path).iter().map(|se| se.entry.index).collect();
        assert_eq!(indices, (1..=8).collect::<Vec<_>>());
        assert!(verify_file(&path, key().as_bytes()).unwrap().ok);
    }

    /// A file opened with file A's final hash records it in its header.
    #[test]
    fn test_continuity_hash_carried() {
        let dir = TempDir::new().unwrap();
        let a = fresh_log(&dir, 2);
        let verified = verify_file(&a, key().as_bytes()).unwrap();
        assert!(verified.ok);

        let b = dir.path().join("audit-2026-01-03.log");
        Log::open(&b, key(), &verified.last_hash_hex).unwrap().close().unwrap();

        let content = std::fs::read_to_string(&b).unwrap();
        let header: Header = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(header.prev_log_last_hash, verified.last_hash_hex);
    }

    /// One firewall rule append produces a two-line file that verifies only under its key.
    #[test]
    fn test_single_rule_scenario() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit-2026-01-02.log");
        let log = Arc::new(Log::open(&path, key(), "").unwrap());
        let recorder = Recorder::new(log.clone(), "alice", FailurePolicy::Abort);

        recorder
            .record(
                AuditRecord::new("rule.add", outcome::SUCCESS)
                    .command("ufw allow from 10.0.0.5 to any port 22 proto tcp"),
            )
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        let entries = entry_lines(&path);
        assert_eq!(entries[0].entry.index, 1);
        assert_eq!(entries[0].entry.actor, "alice");

        let ok = verify_file(&path, key().as_bytes()).unwrap();
        assert!(ok.ok);
        assert_eq!(ok.last_index, 1);

        let bad = verify_file(&path, wrong_key().as_bytes()).unwrap();
        assert!(!bad.ok);
        assert!(bad.reason.contains("HMAC"));
    }
}
