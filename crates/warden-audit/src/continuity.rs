//! Cross-file continuity across daily rotation.
//!
//! Each day writes `audit-YYYY-MM-DD.log`. When a new file is created, the
//! most recent earlier file is verified in full and its final hash becomes
//! the new header's `prev_log_last_hash`, linking the files into one chain.
//! A predecessor that fails verification stops startup with `ChainError`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use warden_contracts::{
    error::{AuditError, AuditResult},
    verify::{reason, ChainReport, FileReport, VerifyResult},
};

use crate::{config::AuditConfig, key::AuditKey, verify::verify_file, writer::Log};

const LOG_PREFIX: &str = "audit-";
const LOG_SUFFIX: &str = ".log";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// File name for the log of `day`.
pub fn log_file_name(day: NaiveDate) -> String {
    format!("{}{}{}", LOG_PREFIX, day.format(DATE_FORMAT), LOG_SUFFIX)
}

/// The date encoded in a log file name, if it follows the naming scheme.
pub fn parse_log_date(name: &str) -> Option<NaiveDate> {
    let date = name.strip_prefix(LOG_PREFIX)?.strip_suffix(LOG_SUFFIX)?;
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

/// Every dated log in `dir`, oldest first. A missing directory holds none.
fn dated_logs(dir: &Path) -> AuditResult<Vec<(NaiveDate, PathBuf)>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(AuditError::io(format!("failed to list '{}'", dir.display()), e))
        }
    };

    let mut logs = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| AuditError::io(format!("failed to list '{}'", dir.display()), e))?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Some(date) = entry.file_name().to_str().and_then(parse_log_date) {
            logs.push((date, entry.path()));
        }
    }
    logs.sort();
    Ok(logs)
}

/// The latest log in `dir` dated strictly before `day`.
pub fn find_previous_log(dir: &Path, day: NaiveDate) -> AuditResult<Option<PathBuf>> {
    Ok(dated_logs(dir)?
        .into_iter()
        .filter(|(date, _)| *date < day)
        .last()
        .map(|(_, path)| path))
}

/// The continuity hash for a file created on `day`.
///
/// Returns `""` when there is no earlier file, otherwise the verified final
/// hash of the latest earlier file. Fails with `Chain` if that file does not
/// verify.
pub fn resolve_prior_hash(dir: &Path, key: &AuditKey, day: NaiveDate) -> AuditResult<String> {
    let Some(prev) = find_previous_log(dir, day)? else {
        debug!(dir = %dir.display(), "no previous audit log; starting a new chain");
        return Ok(String::new());
    };

    let result = verify_file(&prev, key.as_bytes())?;
    if !result.ok {
        warn!(
            path = %prev.display(),
            line = result.failed_line,
            reason = %result.reason,
            "previous audit log failed verification"
        );
        return Err(AuditError::Chain {
            path: prev,
            line: result.failed_line,
            reason: result.reason,
        });
    }

    info!(
        path = %prev.display(),
        last_index = result.last_index,
        "previous audit log verified; carrying its final hash forward"
    );
    Ok(result.last_hash_hex)
}

/// Resolve continuity and open the log for the UTC date of `now`.
pub fn open_daily(config: &AuditConfig, key: AuditKey, now: DateTime<Utc>) -> AuditResult<Log> {
    let day = now.date_naive();
    let prior = resolve_prior_hash(&config.dir, &key, day)?;
    let path = config.dir.join(log_file_name(day));
    Log::open_with(path, key, &prior, config.writer_options())
}

/// Verify every dated log in `dir` and the links between them.
///
/// Each file after the first must name its predecessor's final hash in
/// `prev_log_last_hash`. Stops at the first failure. Must not be run while a
/// writer is appending to the newest file.
pub fn verify_directory(dir: &Path, key: &AuditKey) -> AuditResult<ChainReport> {
    let mut files = Vec::new();
    let mut prev_hash: Option<String> = None;

    for (_, path) in dated_logs(dir)? {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut result = verify_file(&path, key.as_bytes())?;

        let linked = match (&prev_hash, &result.header) {
            (Some(expected), Some(header)) => header.prev_log_last_hash == *expected,
            _ => true,
        };
        if result.ok && !linked {
            result = VerifyResult::failed(
                result.header.take(),
                1,
                reason::BROKEN_CONTINUITY,
                0,
                String::new(),
            );
        }

        let ok = result.ok;
        prev_hash = Some(result.last_hash_hex.clone());
        files.push(FileReport { file_name, result });
        if !ok {
            return Ok(ChainReport { ok: false, files });
        }
    }

    Ok(ChainReport { ok: true, files })
}
