//! Correction & Routing Engine
//!
//! Pure decision logic over one record and its QA report: which findings are
//! trusted-safe to apply, how the record mutates, and whether the record is
//! routed to a special folder instead. No I/O happens here; the batch driver
//! owns every filesystem and network effect, which keeps the engine testable
//! without the external reviewing service.

use serde_json::Value;
use std::collections::BTreeSet;

use nirqa_common::report::default_trusted_kinds;
use nirqa_common::{FindingKind, QaFinding, QaReport, Record};

/// Default routing subfolder for possible out-of-scope records
pub const DEFAULT_OUT_OF_SCOPE_DIR: &str = "Possible_Out_Of_Scope";
/// Default routing subfolder for possible duplicate records
pub const DEFAULT_DUPLICATES_DIR: &str = "Possible_Duplicates";

/// Engine configuration for one run
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Compute decisions without any filesystem or network mutation
    pub dry_run: bool,
    /// Subfolder name (under the records folder) for out-of-scope records
    pub out_of_scope_dir: String,
    /// Subfolder name for duplicate records
    pub duplicates_dir: String,
    /// Finding kinds eligible for automatic field overwrite
    pub trusted: BTreeSet<FindingKind>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            out_of_scope_dir: DEFAULT_OUT_OF_SCOPE_DIR.to_string(),
            duplicates_dir: DEFAULT_DUPLICATES_DIR.to_string(),
            trusted: default_trusted_kinds(),
        }
    }
}

/// Routing outcome for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    /// At least one trusted correction was applied in place
    ApplyCorrections,
    /// Record scheduled to move into the out-of-scope subfolder
    OutOfScope,
    /// Record scheduled to move into the duplicates subfolder
    Duplicate,
    /// Nothing to do
    NoAction,
}

/// Result of deciding one record
#[derive(Debug, Clone)]
pub struct Decision {
    pub routing: RoutingDecision,
    /// The record after any trusted mutation (identical to the input for
    /// routing and no-action decisions)
    pub record: Record,
    /// Dotted paths of the fields a trusted correction changed, for the
    /// remote partial update
    pub changed_fields: Vec<&'static str>,
    /// Human-readable actions taken (or would be taken, in dry-run)
    pub actions: Vec<String>,
    /// Recommendations present in the report but not applied
    pub unapplied: Vec<String>,
}

/// Decide one record against its QA report.
///
/// Out-of-scope and duplicate findings are evaluated first and short-circuit
/// every field-level correction: a routed record is never also rewritten in
/// place. The QA-checked marker is set on the returned record whenever a
/// trusted correction applied; whether anything is persisted is the caller's
/// concern (dry-run gates all effects there).
pub fn decide(record: &Record, report: &QaReport, config: &EngineConfig) -> Decision {
    let mut decision = Decision {
        routing: RoutingDecision::NoAction,
        record: record.clone(),
        changed_fields: Vec::new(),
        actions: Vec::new(),
        unapplied: Vec::new(),
    };

    if report.has_kind(FindingKind::OutOfScope) {
        decision.routing = RoutingDecision::OutOfScope;
        decision
            .actions
            .push(format!("Move to {}", config.out_of_scope_dir));
        return decision;
    }

    if let Some(finding) = report
        .findings
        .iter()
        .find(|f| f.kind == FindingKind::Duplicate)
    {
        decision.routing = RoutingDecision::Duplicate;
        decision.actions.push(format!(
            "Move to {} (duplicate by {})",
            config.duplicates_dir,
            duplicate_reason(finding)
        ));
        return decision;
    }

    for finding in &report.findings {
        if !config.trusted.contains(&finding.kind) || !finding.has_suggestion() {
            if finding.has_suggestion() || finding.explanation.is_some() {
                decision.unapplied.push(describe_unapplied(finding));
            }
            continue;
        }
        match finding.kind {
            FindingKind::TitleFormat => apply_title(finding, &mut decision),
            FindingKind::Affiliation => apply_affiliations(finding, &mut decision),
            FindingKind::OrganizationalAuthor => apply_org_authors(finding, &mut decision),
            // Routing kinds were handled above; an unexpected trusted kind
            // stays report-only.
            _ => decision.unapplied.push(describe_unapplied(finding)),
        }
    }

    if decision.changed_fields.is_empty() {
        decision.routing = RoutingDecision::NoAction;
    } else {
        decision.routing = RoutingDecision::ApplyCorrections;
        decision.record.mark_qa_checked();
    }
    decision
}

fn apply_title(finding: &QaFinding, decision: &mut Decision) {
    let Some(title) = finding.suggested_value.as_ref().and_then(Value::as_str) else {
        decision
            .unapplied
            .push("Title correction present but not a string".to_string());
        return;
    };
    let old = decision.record.title().unwrap_or_default().to_string();
    if decision.record.set_title(title) {
        tracing::info!(old = %old, new = %title, "Title corrected");
        decision.actions.push("Title corrected".to_string());
        push_changed(decision, "metadata.title");
    }
}

fn apply_affiliations(finding: &QaFinding, decision: &mut Decision) {
    let pairs = correction_pairs(finding, "old_affiliation", "recommended_affiliation");
    if pairs.is_empty() {
        decision
            .unapplied
            .push("Affiliation correction present but malformed".to_string());
        return;
    }
    let mut applied = 0;
    for (old, new) in &pairs {
        let n = decision.record.replace_affiliation(old, new);
        if n > 0 {
            tracing::info!(old = %old, new = %new, "Affiliation corrected");
        }
        applied += n;
    }
    if applied > 0 {
        decision
            .actions
            .push(format!("Affiliations corrected ({applied})"));
        push_changed(decision, "metadata.creators");
    } else {
        decision
            .unapplied
            .push("Affiliation corrections present but no matches found".to_string());
    }
}

fn apply_org_authors(finding: &QaFinding, decision: &mut Decision) {
    let pairs = correction_pairs(
        finding,
        "old_organizational_author",
        "recommended_organizational_author",
    );
    if pairs.is_empty() {
        decision
            .unapplied
            .push("Organizational author correction present but malformed".to_string());
        return;
    }
    let mut applied = 0;
    for (old, new) in &pairs {
        let n = decision.record.rename_organizational_author(old, new);
        if n > 0 {
            tracing::info!(old = %old, new = %new, "Organizational author corrected");
        }
        applied += n;
    }
    if applied > 0 {
        decision
            .actions
            .push(format!("Organizational authors corrected ({applied})"));
        push_changed(decision, "metadata.creators");
    } else {
        decision
            .unapplied
            .push("Organizational author corrections present but no matches found".to_string());
    }
}

/// Extract `{old, new}` replacement pairs from a finding's suggested value.
/// Accepts a single object or a list; `old`/`new` key names are accepted
/// alongside the reviewer's longer key names.
fn correction_pairs(finding: &QaFinding, old_key: &str, new_key: &str) -> Vec<(String, String)> {
    let Some(value) = &finding.suggested_value else {
        return Vec::new();
    };
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let old = obj
                .get("old")
                .or_else(|| obj.get(old_key))
                .and_then(Value::as_str)?;
            let new = obj
                .get("new")
                .or_else(|| obj.get(new_key))
                .and_then(Value::as_str)?;
            if old.is_empty() || new.is_empty() {
                return None;
            }
            Some((old.to_string(), new.to_string()))
        })
        .collect()
}

fn duplicate_reason(finding: &QaFinding) -> String {
    match &finding.suggested_value {
        Some(Value::String(reason)) if !reason.trim().is_empty() => reason.clone(),
        Some(Value::Object(obj)) => {
            let by_title = obj.get("by_title").and_then(Value::as_bool).unwrap_or(false);
            let by_doi = obj.get("by_doi").and_then(Value::as_bool).unwrap_or(false);
            match (by_title, by_doi) {
                (true, true) => "title and doi".to_string(),
                (true, false) => "title".to_string(),
                (false, true) => "doi".to_string(),
                (false, false) => "unknown".to_string(),
            }
        }
        _ => finding
            .explanation
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

fn describe_unapplied(finding: &QaFinding) -> String {
    let field = finding.field.as_deref().unwrap_or("record");
    match &finding.explanation {
        Some(explanation) => format!("{field}: {explanation}"),
        None => format!("{field}: suggestion outside the trusted set, not applied"),
    }
}

fn push_changed(decision: &mut Decision, path: &'static str) {
    if !decision.changed_fields.contains(&path) {
        decision.changed_fields.push(path);
    }
}
