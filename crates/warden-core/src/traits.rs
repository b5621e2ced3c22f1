//! The append seam between collaborators and the audit trail.
//!
//! Rule execution, authentication and notification code only ever see an
//! `AuditSink`. The file-backed implementation lives in `warden-audit`.

use warden_contracts::{
    error::AuditResult,
    record::{AppendReceipt, AuditRecord},
};

/// An append-only sink of audit records.
///
/// Implementations must serialize concurrent appends so each record links to
/// the one immediately before it, and must only report success once the
/// record is durable.
pub trait AuditSink: Send + Sync {
    /// Append one record, returning the index and hash it was committed as.
    fn append(&self, record: AuditRecord) -> AuditResult<AppendReceipt>;
}
