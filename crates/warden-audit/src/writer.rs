//! File-backed, append-only audit log.
//!
//! `Log` owns the live file handle and the chain head. Appends are serialized
//! by a `Mutex`, so concurrent callers in one process always link to the entry
//! written immediately before theirs. The chain head only advances after the
//! new line has been written and synced; on any failure the file is truncated
//! back to its previous length and the head is left untouched.
//!
//! Separate processes are kept apart by an advisory lock on the file (see
//! [`WriterOptions::exclusive_lock`]).

use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use chrono::{SecondsFormat, Utc};
use fs2::FileExt;
use rand::{rngs::OsRng, RngCore};
use tracing::{debug, error, info, warn};

use warden_contracts::{
    entry::Header,
    error::{AuditError, AuditResult},
    record::{AppendReceipt, AuditRecord},
};
use warden_core::traits::AuditSink;

use crate::{
    chain::{decode_hash, sign_entry, ChainHash},
    key::AuditKey,
    tail::scan_tail,
};

/// Knobs for durability and cross-process safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Re-read every appended line after syncing and compare it byte for byte.
    pub read_back: bool,
    /// Hold an exclusive advisory lock on the file for the life of the `Log`.
    pub exclusive_lock: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            read_back: false,
            exclusive_lock: true,
        }
    }
}

struct LogState {
    file: File,
    last_hash: ChainHash,
    next_index: u64,
    locked: bool,
}

impl Drop for LogState {
    fn drop(&mut self) {
        if let Err(e) = self.file.sync_all() {
            warn!(error = %e, "failed to sync audit log on drop");
        }
        if self.locked {
            if let Err(e) = FileExt::unlock(&self.file) {
                warn!(error = %e, "failed to unlock audit log on drop");
            }
        }
    }
}

/// An open audit log file.
pub struct Log {
    path: PathBuf,
    key: AuditKey,
    options: WriterOptions,
    state: Mutex<LogState>,
}

impl Log {
    /// Open `path` with default options. See [`Log::open_with`].
    pub fn open(path: impl AsRef<Path>, key: AuditKey, prior_chain_hash: &str) -> AuditResult<Self> {
        Self::open_with(path, key, prior_chain_hash, WriterOptions::default())
    }

    /// Open or create the log at `path`.
    ///
    /// An absent or empty file gets a fresh header with a random seed and
    /// `prior_chain_hash` recorded as `prev_log_last_hash` (`""` when there is
    /// no predecessor). A file with content is resumed by tail scan without
    /// re-checking HMACs.
    pub fn open_with(
        path: impl AsRef<Path>,
        key: AuditKey,
        prior_chain_hash: &str,
        options: WriterOptions,
    ) -> AuditResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !prior_chain_hash.is_empty() && decode_hash(prior_chain_hash).is_none() {
            return Err(AuditError::config(format!(
                "prior chain hash '{}' is not a 64-character hex value",
                prior_chain_hash
            )));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_private_dir(parent).map_err(|e| {
                AuditError::io(format!("failed to create '{}'", parent.display()), e)
            })?;
        }

        let mut file = open_private_append(&path)
            .map_err(|e| AuditError::io(format!("failed to open '{}'", path.display()), e))?;

        if options.exclusive_lock {
            file.try_lock_exclusive().map_err(|e| {
                if e.kind() == fs2::lock_contended_error().kind() {
                    AuditError::Locked { path: path.clone() }
                } else {
                    AuditError::io(format!("failed to lock '{}'", path.display()), e)
                }
            })?;
        }

        let len = file
            .metadata()
            .map_err(|e| AuditError::io(format!("failed to stat '{}'", path.display()), e))?
            .len();

        let (last_hash, next_index) = if len == 0 {
            let seed = write_header(&mut file, &path, prior_chain_hash)?;
            info!(path = %path.display(), prev_log_last_hash = %prior_chain_hash, "created audit log");
            (seed, 1)
        } else {
            let tail = scan_tail(&path)?;
            if tail.header.prev_log_last_hash != prior_chain_hash {
                warn!(
                    path = %path.display(),
                    header = %tail.header.prev_log_last_hash,
                    supplied = %prior_chain_hash,
                    "resumed log records a different predecessor hash; keeping the file's header"
                );
            }
            info!(path = %path.display(), next_index = tail.next_index, "resumed audit log");
            (tail.last_hash, tail.next_index)
        };

        Ok(Self {
            path,
            key,
            options,
            state: Mutex::new(LogState {
                file,
                last_hash,
                next_index,
                locked: options.exclusive_lock,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current chain head as `(last_hash_hex, next_index)`.
    pub fn head(&self) -> AuditResult<(String, u64)> {
        let state = self.lock_state()?;
        Ok((hex::encode(state.last_hash), state.next_index))
    }

    /// Sign `record` and append it durably.
    ///
    /// The record receives the next index and the current UTC time. Success is
    /// only returned once the line has been synced to storage.
    pub fn append(&self, record: AuditRecord) -> AuditResult<AppendReceipt> {
        let mut state = self.lock_state()?;

        let index = state.next_index;
        let next_index = index.checked_add(1).ok_or_else(|| AuditError::Serialization {
            reason: format!("entry index {} cannot be followed", index),
        })?;
        let entry = record.into_entry(index, now_timestamp());
        let (signed, hash) = sign_entry(entry, &state.last_hash, self.key.as_bytes())?;

        let mut line = serde_json::to_vec(&signed).map_err(|e| AuditError::Serialization {
            reason: format!("failed to encode entry {}: {}", index, e),
        })?;
        line.push(b'\n');

        let offset = state
            .file
            .metadata()
            .map_err(|e| AuditError::io(format!("failed to stat '{}'", self.path.display()), e))?
            .len();

        if let Err(e) = self.write_line(&mut state.file, &line, offset) {
            error!(path = %self.path.display(), index, error = %e, "audit append failed");
            self.roll_back(&state.file, offset);
            return Err(e);
        }

        state.last_hash = hash;
        state.next_index = next_index;
        debug!(index, hash = %&signed.hash[..12], "appended audit entry");

        Ok(AppendReceipt {
            index,
            hash: signed.hash,
        })
    }

    /// Sync and release the file, reporting any final I/O error.
    pub fn close(self) -> AuditResult<()> {
        let state = self.lock_state()?;
        state
            .file
            .sync_all()
            .map_err(|e| AuditError::io(format!("failed to sync '{}'", self.path.display()), e))?;
        info!(path = %self.path.display(), next_index = state.next_index, "closed audit log");
        Ok(())
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn lock_state(&self) -> AuditResult<MutexGuard<'_, LogState>> {
        self.state.lock().map_err(|_| {
            AuditError::io(
                "audit state lock poisoned",
                io::Error::new(io::ErrorKind::Other, "a previous append panicked"),
            )
        })
    }

    fn write_line(&self, file: &mut File, line: &[u8], offset: u64) -> AuditResult<()> {
        let ctx = |what: &str| format!("failed to {} '{}'", what, self.path.display());
        file.write_all(line).map_err(|e| AuditError::io(ctx("write"), e))?;
        file.sync_all().map_err(|e| AuditError::io(ctx("sync"), e))?;

        if self.options.read_back {
            let mut reader = File::open(&self.path).map_err(|e| AuditError::io(ctx("reopen"), e))?;
            reader
                .seek(SeekFrom::Start(offset))
                .map_err(|e| AuditError::io(ctx("seek"), e))?;
            let mut written = vec![0u8; line.len()];
            reader
                .read_exact(&mut written)
                .map_err(|e| AuditError::io(ctx("read back"), e))?;
            if written != line {
                return Err(AuditError::io(
                    ctx("confirm"),
                    io::Error::new(io::ErrorKind::InvalidData, "read-back differs from written line"),
                ));
            }
        }
        Ok(())
    }

    /// Drop any partial line so later entries never follow garbage.
    fn roll_back(&self, file: &File, offset: u64) {
        if let Err(e) = file.set_len(offset).and_then(|_| file.sync_all()) {
            error!(
                path = %self.path.display(),
                offset,
                error = %e,
                "failed to truncate partial audit line"
            );
        }
    }
}

impl AuditSink for Log {
    fn append(&self, record: AuditRecord) -> AuditResult<AppendReceipt> {
        Log::append(self, record)
    }
}

impl std::fmt::Debug for Log {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Log")
            .field("path", &self.path)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// UTC now, RFC 3339 with millisecond precision.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn host_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn create_private_dir(dir: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
    }
    #[cfg(not(unix))]
    {
        std::fs::create_dir_all(dir)
    }
}

fn open_private_append(path: &Path) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    opts.open(path)
}

/// Write a fresh header and return its seed.
fn write_header(file: &mut File, path: &Path, prior_chain_hash: &str) -> AuditResult<ChainHash> {
    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);

    let header = Header::new(now_timestamp(), host_name(), hex::encode(seed), prior_chain_hash);
    let mut line = serde_json::to_vec(&header).map_err(|e| AuditError::Serialization {
        reason: format!("failed to encode header: {}", e),
    })?;
    line.push(b'\n');

    let result = file.write_all(&line).and_then(|_| file.sync_all());
    if let Err(e) = result {
        if let Err(trunc) = file.set_len(0) {
            error!(path = %path.display(), error = %trunc, "failed to truncate partial audit header");
        }
        return Err(AuditError::io(
            format!("failed to write header to '{}'", path.display()),
            e,
        ));
    }
    Ok(seed)
}
