//! # warden-core
//!
//! The seam every audited component depends on.
//!
//! This crate provides:
//! - The `AuditSink` trait, the single append entry point
//! - The `Recorder` handle that binds an actor and a `FailurePolicy` to a sink
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warden_core::{FailurePolicy, Recorder};
//!
//! let recorder = Recorder::new(Arc::new(log), "alice@fw01", FailurePolicy::Abort);
//! recorder.record(AuditRecord::new("ufw.add", "success").command(cmd))?;
//! ```

pub mod recorder;
pub mod traits;

pub use recorder::{FailurePolicy, Recorder};
pub use traits::AuditSink;

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use warden_contracts::{
        error::{AuditError, AuditResult},
        record::{outcome, AppendReceipt, AuditRecord},
    };

    use super::{AuditSink, FailurePolicy, Recorder};

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Collects records in memory; optionally fails every append.
    #[derive(Default)]
    struct CollectingSink {
        records: Mutex<Vec<AuditRecord>>,
        fail: bool,
    }

    impl AuditSink for CollectingSink {
        fn append(&self, record: AuditRecord) -> AuditResult<AppendReceipt> {
            if self.fail {
                return Err(AuditError::io(
                    "writing audit entry",
                    std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                ));
            }
            let mut records = self.records.lock().unwrap();
            records.push(record);
            Ok(AppendReceipt {
                index: records.len() as u64,
                hash: "00".repeat(32),
            })
        }
    }

    fn failing_sink() -> Arc<CollectingSink> {
        Arc::new(CollectingSink {
            fail: true,
            ..CollectingSink::default()
        })
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    #[test]
    fn recorder_stamps_actor() {
        let sink = Arc::new(CollectingSink::default());
        let recorder = Recorder::new(sink.clone(), "alice@fw01", FailurePolicy::Abort);

        let receipt = recorder
            .record(AuditRecord::new("rule.add", outcome::SUCCESS).actor("ignored"))
            .unwrap()
            .unwrap();

        assert_eq!(receipt.index, 1);
        let records = sink.records.lock().unwrap();
        assert_eq!(records[0].actor, "alice@fw01");
    }

    #[test]
    fn with_actor_shares_sink() {
        let sink = Arc::new(CollectingSink::default());
        let recorder = Recorder::new(sink.clone(), "alice", FailurePolicy::Abort);
        let remote = recorder.with_actor("alice via_ssh=fw02");

        recorder.record(AuditRecord::new("a", outcome::SUCCESS)).unwrap();
        remote.record(AuditRecord::new("b", outcome::SUCCESS)).unwrap();

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].actor, "alice via_ssh=fw02");
        assert_eq!(remote.policy(), FailurePolicy::Abort);
    }

    #[test]
    fn abort_policy_propagates_failure() {
        let recorder = Recorder::new(failing_sink(), "alice", FailurePolicy::Abort);
        let err = recorder
            .record(AuditRecord::new("rule.add", outcome::SUCCESS))
            .unwrap_err();
        assert!(matches!(err, AuditError::Io { .. }));
        assert_eq!(recorder.failed_appends(), 0);
    }

    #[test]
    fn warn_policy_counts_and_continues() {
        let recorder = Recorder::new(failing_sink(), "alice", FailurePolicy::Warn);
        let other = recorder.with_actor("bob");

        assert!(recorder.record(AuditRecord::new("a", outcome::ERROR)).unwrap().is_none());
        assert!(other.record(AuditRecord::new("b", outcome::ERROR)).unwrap().is_none());
        assert_eq!(recorder.failed_appends(), 2);
    }

    #[test]
    fn failure_policy_deserializes_lowercase() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            policy: FailurePolicy,
        }
        let w: Wrapper = serde_json::from_str(r#"{"policy":"warn"}"#).unwrap();
        assert_eq!(w.policy, FailurePolicy::Warn);
        assert_eq!(FailurePolicy::default(), FailurePolicy::Abort);
    }
}
