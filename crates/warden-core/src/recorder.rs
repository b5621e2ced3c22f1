//! Actor-bound handle over an `AuditSink`.
//!
//! A `Recorder` is built once at startup and handed to every component that
//! audits. It stamps the actor onto each record and applies the configured
//! `FailurePolicy` when an append fails.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use serde::{Deserialize, Serialize};
use tracing::error;

use warden_contracts::{
    error::AuditResult,
    record::{AppendReceipt, AuditRecord},
};

use crate::traits::AuditSink;

/// What to do when a record cannot be made durable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Return the error so the triggering action can be refused.
    #[default]
    Abort,
    /// Log the failure, count it, and let the triggering action proceed.
    Warn,
}

/// A cloneable handle that records on behalf of one actor.
#[derive(Clone)]
pub struct Recorder {
    sink: Arc<dyn AuditSink>,
    actor: String,
    policy: FailurePolicy,
    failures: Arc<AtomicU64>,
}

impl Recorder {
    pub fn new(sink: Arc<dyn AuditSink>, actor: impl Into<String>, policy: FailurePolicy) -> Self {
        Self {
            sink,
            actor: actor.into(),
            policy,
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A handle for a different actor sharing the same sink and failure count.
    ///
    /// Used to qualify the actor, e.g. `alice via_ssh=fw01`.
    pub fn with_actor(&self, actor: impl Into<String>) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            actor: actor.into(),
            policy: self.policy,
            failures: Arc::clone(&self.failures),
        }
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Appends swallowed under `FailurePolicy::Warn` so far.
    pub fn failed_appends(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Stamp the actor onto `record` and append it.
    ///
    /// Returns `Ok(None)` when the append failed and the policy is `Warn`.
    pub fn record(&self, record: AuditRecord) -> AuditResult<Option<AppendReceipt>> {
        let action = record.action.clone();
        match self.sink.append(record.actor(self.actor.clone())) {
            Ok(receipt) => Ok(Some(receipt)),
            Err(e) => match self.policy {
                FailurePolicy::Abort => Err(e),
                FailurePolicy::Warn => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    error!(
                        actor = %self.actor,
                        action = %action,
                        error = %e,
                        "audit append failed; continuing under warn policy"
                    );
                    Ok(None)
                }
            },
        }
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("actor", &self.actor)
            .field("policy", &self.policy)
            .field("failures", &self.failed_appends())
            .finish_non_exhaustive()
    }
}
