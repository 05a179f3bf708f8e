//! QA report model
//!
//! One report per record per run, produced by the reviewing stage and
//! consumed by the correction stage in a later, separate invocation. The two
//! stages communicate only through these report files.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;

use crate::{Error, Result};

/// Filename suffix tying a report file to its record id
pub const REPORT_SUFFIX: &str = "-report";

/// Classification of one QA finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    /// Title casing/formatting correction
    TitleFormat,
    /// Author affiliation correction (old name -> recommended name)
    Affiliation,
    /// Organizational author name correction
    OrganizationalAuthor,
    /// Record does not belong in the repository
    OutOfScope,
    /// Record duplicates an existing one (by title and/or DOI)
    Duplicate,
    /// Anything else the reviewer reports; never auto-applied
    #[serde(other)]
    Other,
}

/// The kinds pre-approved for automatic field overwrite.
/// Everything outside this set is report-only.
pub fn default_trusted_kinds() -> BTreeSet<FindingKind> {
    BTreeSet::from([
        FindingKind::TitleFormat,
        FindingKind::Affiliation,
        FindingKind::OrganizationalAuthor,
    ])
}

/// One reported issue within a QA report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaFinding {
    /// Record field the finding concerns (e.g. "title")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Finding classification
    pub kind: FindingKind,
    /// Replacement value, when the reviewer proposes one. For affiliation
    /// and organizational-author findings this is an `{old, new}` pair or a
    /// list of such pairs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_value: Option<Value>,
    /// Free-text rationale, report-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QaFinding {
    /// Whether the finding carries a usable suggested value
    pub fn has_suggestion(&self) -> bool {
        match &self.suggested_value {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(_) => true,
        }
    }
}

/// Structured output of one quality review pass over one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaReport {
    /// Identifier of the reviewed record
    pub record_id: String,
    /// Findings in the order the reviewer reported them
    #[serde(default)]
    pub findings: Vec<QaFinding>,
    /// False when the review did not complete (malformed or empty response)
    #[serde(default)]
    pub checked: bool,
}

impl QaReport {
    /// Report for a record the reviewer could not evaluate
    pub fn unchecked(record_id: &str) -> Self {
        Self {
            record_id: record_id.to_string(),
            findings: Vec::new(),
            checked: false,
        }
    }

    /// Whether any finding has the given kind
    pub fn has_kind(&self, kind: FindingKind) -> bool {
        self.findings.iter().any(|f| f.kind == kind)
    }

    /// Report filename for a record id: `<id>-report.json`
    pub fn file_name(record_id: &str) -> String {
        format!("{record_id}{REPORT_SUFFIX}.json")
    }

    /// Read a report from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let report = serde_json::from_str(&content)?;
        Ok(report)
    }

    /// Write the report as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Record key for a report file: the `record_id` field when present,
    /// otherwise the file stem with any `-report` suffix stripped.
    pub fn key_for(path: &Path, report: Option<&QaReport>) -> Result<String> {
        if let Some(report) = report {
            if !report.record_id.is_empty() {
                return Ok(report.record_id.clone());
            }
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::NotFound(format!("no file stem: {}", path.display())))?;
        Ok(stem.strip_suffix(REPORT_SUFFIX).unwrap_or(stem).to_string())
    }
}
