//! Run summary: counters, per-record entries, and the batch error taxonomy
//!
//! Every tool accumulates one `RunSummary` per invocation. Errors are counted
//! and surfaced here, never silently swallowed; no single record's failure
//! aborts a batch.

use serde::{Deserialize, Serialize};

/// Batch-level error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Record file unreadable or malformed
    SourceRead,
    /// External QA call failed or returned garbage
    Invocation,
    /// Routing destination already holds a file with the same name
    RoutingCollision,
    /// Report references a record id absent from the record set
    UnresolvedReport,
    /// Remote update rejected; local state stands, remote unconfirmed
    RemoteApply,
}

/// One error recorded against a record (or a file, when no id is known)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    pub kind: ErrorKind,
    pub key: String,
    pub message: String,
}

/// Per-record outcome entry for the run report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordEntry {
    /// Record key (the record id, or the report file stem when unresolved)
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    /// Actions taken (or, in dry-run, that would be taken)
    #[serde(default)]
    pub actions: Vec<String>,
    /// Recommendations present in the report but not applied
    #[serde(default)]
    pub unapplied: Vec<String>,
}

/// Aggregate outcome of one tool invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub processed: usize,
    pub corrected: usize,
    pub moved_out_of_scope: usize,
    pub moved_duplicates: usize,
    pub missing: usize,
    #[serde(default)]
    pub entries: Vec<RecordEntry>,
    #[serde(default)]
    pub errors: Vec<RunError>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; the batch continues
    pub fn record_error(&mut self, kind: ErrorKind, key: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(key = %key, kind = ?kind, "{}", message);
        self.errors.push(RunError {
            kind,
            key: key.to_string(),
            message,
        });
    }

    /// Number of errors of one kind
    pub fn error_count(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_accumulate_without_aborting() {
        let mut summary = RunSummary::new();
        summary.record_error(ErrorKind::UnresolvedReport, "R3", "no record for report");
        summary.record_error(ErrorKind::RoutingCollision, "R4", "destination exists");
        assert_eq!(summary.errors.len(), 2);
        assert_eq!(summary.error_count(ErrorKind::UnresolvedReport), 1);
        assert_eq!(summary.error_count(ErrorKind::RemoteApply), 0);
    }
}
