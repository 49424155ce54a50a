use std::fmt;
use std::sync::{Mutex, MutexGuard};

use crate::CommandSpec;

/// One line of the audit trail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEntry {
    /// A subprocess or service call that was issued
    Command(String),
    /// A recoverable condition worth keeping next to the commands
    Note(String),
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEntry::Command(command) => write!(f, "{}", command),
            AuditEntry::Note(note) => write!(f, "===>>> {}", note),
        }
    }
}

/// Collects every command a comparison executes, in issue order.
///
/// Passed by reference into each pipeline component; one log per comparison run.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_command(&self, command: &CommandSpec) {
        self.push(AuditEntry::Command(command.audit_line()));
    }

    /// Record a non-process call, e.g. a request to the annotation service
    pub fn record_call(&self, description: impl Into<String>) {
        self.push(AuditEntry::Command(description.into()));
    }

    pub fn note(&self, note: impl Into<String>) {
        self.push(AuditEntry::Note(note.into()));
    }

    /// Rendered lines, ready to be written to the audit file
    pub fn lines(&self) -> Vec<String> {
        self.guard().iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    fn push(&self, entry: AuditEntry) {
        self.guard().push(entry);
    }

    fn guard(&self) -> MutexGuard<'_, Vec<AuditEntry>> {
        // A panic while holding the lock cannot leave a half-pushed Vec behind
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_keep_issue_order_and_mark_notes() {
        let audit = AuditLog::new();
        audit.record_command(&CommandSpec::new("git").args(["fetch", "--all", "--tags"]));
        audit.note("No diff found for file /repo/a.rs");
        audit.record_call("call LLM to explain diffs for file /repo/b.rs");

        assert_eq!(
            audit.lines(),
            vec![
                "git fetch --all --tags",
                "===>>> No diff found for file /repo/a.rs",
                "call LLM to explain diffs for file /repo/b.rs",
            ]
        );
        assert_eq!(audit.len(), 3);
    }
}
