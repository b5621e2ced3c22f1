//! Error types for the warden audit trail.
//!
//! Every fallible audit operation returns `AuditResult<T>`. Variants map onto
//! the four failure classes callers care about (configuration, I/O, parsing,
//! chain continuity) plus lock contention and encoding failures.

use std::path::PathBuf;

use thiserror::Error;

/// The unified error type for the audit subsystem.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The key or the configuration is missing, malformed, or too weak.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// Creating, opening, writing, syncing or reading a file failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A header or entry line could not be decoded.
    #[error("parse error at line {line}: {reason}")]
    Parse { line: u64, reason: String },

    /// A predecessor file failed verification while bootstrapping continuity.
    ///
    /// Fatal to startup: a chain that cannot be proven intact is never extended.
    #[error("previous log '{}' failed verification at line {line}: {reason}", path.display())]
    Chain {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// Another process holds the advisory lock on the live log file.
    #[error("audit log '{}' is locked by another process", path.display())]
    Locked { path: PathBuf },

    /// An entry could not be canonically encoded.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

impl AuditError {
    /// Wrap an I/O error with a short description of what was being attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Build a `Config` error from anything displayable.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Build a `Parse` error for the given 1-based line.
    pub fn parse(line: u64, reason: impl Into<String>) -> Self {
        Self::Parse {
            line,
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the warden crates.
pub type AuditResult<T> = Result<T, AuditError>;
