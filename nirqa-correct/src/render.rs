//! Markdown run report
//!
//! Rendered after every run, dry-run included, so the notification shell
//! always has a human-readable account of what happened (or would happen).

use chrono::Local;
use std::path::Path;

use nirqa_common::RunSummary;

/// Render the run report as Markdown.
pub fn render_markdown(
    summary: &RunSummary,
    records_dir: &Path,
    qa_dir: &Path,
    out_of_scope_dir: &Path,
    duplicates_dir: &Path,
    dry_run: bool,
) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("# Correction & Routing Report".to_string());
    lines.push(String::new());
    lines.push(format!(
        "- Generated: {}",
        Local::now().format("%Y-%m-%dT%H:%M:%S")
    ));
    lines.push(format!("- Dry run: {}", if dry_run { "yes" } else { "no" }));
    lines.push(format!("- Records dir: {}", records_dir.display()));
    lines.push(format!("- QA dir: {}", qa_dir.display()));
    lines.push(format!("- Out-of-scope dir: {}", out_of_scope_dir.display()));
    lines.push(format!("- Duplicates dir: {}", duplicates_dir.display()));
    lines.push(String::new());
    lines.push("## Summary".to_string());
    lines.push(String::new());
    lines.push(format!("- Reports processed: {}", summary.processed));
    lines.push(format!("- Records corrected: {}", summary.corrected));
    lines.push(format!(
        "- Records moved (out-of-scope): {}",
        summary.moved_out_of_scope
    ));
    lines.push(format!(
        "- Records moved (duplicates): {}",
        summary.moved_duplicates
    ));
    lines.push(format!("- Records missing: {}", summary.missing));
    lines.push(format!("- Errors: {}", summary.errors.len()));
    lines.push(String::new());

    if !summary.errors.is_empty() {
        lines.push("## Errors".to_string());
        lines.push(String::new());
        for error in &summary.errors {
            lines.push(format!("- `{}` [{:?}]: {}", error.key, error.kind, error.message));
        }
        lines.push(String::new());
    }

    lines.push("## Details".to_string());
    lines.push(String::new());

    if summary.entries.is_empty() {
        lines.push("_No records processed._".to_string());
    } else {
        for entry in &summary.entries {
            lines.push(format!("### {}", entry.key));
            lines.push(String::new());
            if let Some(record_path) = &entry.record_path {
                lines.push(format!("- Record file: `{record_path}`"));
            }
            if let Some(report_path) = &entry.report_path {
                lines.push(format!("- QA report: `{report_path}`"));
            }
            if entry.actions.is_empty() {
                lines.push("- Actions: none".to_string());
            } else {
                lines.push("- Actions:".to_string());
                for action in &entry.actions {
                    lines.push(format!("  - {action}"));
                }
            }
            if entry.unapplied.is_empty() {
                lines.push("- Recommendations not applied: none".to_string());
            } else {
                lines.push("- Recommendations not applied:".to_string());
                for note in &entry.unapplied {
                    lines.push(format!("  - {note}"));
                }
            }
            lines.push(String::new());
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
