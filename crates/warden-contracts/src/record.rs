//! Caller-facing append payload.
//!
//! Collaborators describe what happened with an `AuditRecord`; the writer
//! assigns the index and timestamp and turns it into a signed [`Entry`].

use serde::{Deserialize, Serialize};

use crate::entry::{Entry, Field, RuleSnapshot, ENTRY_KIND};

/// Common `result` values. The log accepts any string.
pub mod outcome {
    pub const SUCCESS: &str = "success";
    pub const ERROR: &str = "error";
    pub const WARNING: &str = "warning";
}

/// Everything a caller supplies for one `Append`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub actor: String,
    pub action: String,
    pub command: Option<String>,
    pub prof_command: Vec<String>,
    pub result: String,
    pub error: Option<String>,
    pub fields: Vec<Field>,
}

impl AuditRecord {
    /// Start a record for `action` with the given `result`.
    ///
    /// The actor is left empty; a `Recorder` stamps it, or set it with
    /// [`AuditRecord::actor`].
    pub fn new(action: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            result: result.into(),
            ..Self::default()
        }
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Sub-commands executed as part of a profile deployment.
    pub fn prof_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prof_command = commands.into_iter().map(Into::into).collect();
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Field::new(name, value));
        self
    }

    /// Attach a full rule snapshot under `name`.
    pub fn rule(mut self, name: impl Into<String>, value: impl Into<String>, rule: RuleSnapshot) -> Self {
        self.fields.push(Field {
            rule: Some(rule),
            ..Field::new(name, value)
        });
        self
    }

    /// Attach the textual form of a deleted rule under `name`.
    pub fn deleted_rule(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        self.fields.push(Field {
            deleted_rule: Some(rule.into()),
            ..Field::new(name, value)
        });
        self
    }

    /// Turn the record into an entry at `index`, stamped with `time`.
    pub fn into_entry(self, index: u64, time: impl Into<String>) -> Entry {
        Entry {
            kind: ENTRY_KIND.to_string(),
            index,
            time: time.into(),
            actor: self.actor,
            action: self.action,
            command: self.command,
            prof_command: self.prof_command,
            result: self.result,
            error: self.error,
            fields: self.fields,
        }
    }
}

/// What a successful append committed to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendReceipt {
    pub index: u64,
    /// Hex hash of the new entry, now the head of the chain.
    pub hash: String,
}
