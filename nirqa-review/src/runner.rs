//! Sequential review loop
//!
//! One external call per record, awaited in order. Generic over `Reviewer`
//! so the loop is testable with a fake instead of the live service. Failed
//! review calls land in the run summary as invocation errors alongside the
//! unchecked report file they still produce.

use std::path::Path;

use nirqa_common::summary::RecordEntry;
use nirqa_common::{ErrorKind, QaReport, Record, Result, RunSummary};

use crate::llm::Reviewer;

/// Outcome counters for one review run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewStats {
    /// Report files written
    pub written: usize,
    /// Records skipped because the QA-checked marker was already set
    pub skipped_checked: usize,
    /// Records skipped for having no id
    pub skipped_no_id: usize,
    /// Reports written with `checked = false` (review call failed)
    pub unchecked: usize,
}

/// Counters plus the run summary handed to the notification shell
#[derive(Debug, Clone, Default)]
pub struct ReviewRun {
    pub stats: ReviewStats,
    pub summary: RunSummary,
}

/// Review every record and write one report file per record into `qa_dir`.
///
/// `recheck_checked = false` skips records already carrying the QA-checked
/// marker from a prior run.
pub async fn review_records<R: Reviewer>(
    reviewer: &R,
    records: &[Record],
    instructions: &str,
    qa_dir: &Path,
    recheck_checked: bool,
) -> Result<ReviewRun> {
    std::fs::create_dir_all(qa_dir)?;
    let mut run = ReviewRun::default();

    for record in records {
        let Some(record_id) = record.id().map(String::from) else {
            tracing::warn!("Skipping record without id");
            run.stats.skipped_no_id += 1;
            continue;
        };

        if !recheck_checked && record.qa_checked() {
            tracing::debug!(record_id = %record_id, "Already QA-checked, skipping");
            run.stats.skipped_checked += 1;
            continue;
        }

        run.summary.processed += 1;
        let report = reviewer.evaluate(record, instructions).await;
        if !report.checked {
            run.stats.unchecked += 1;
            run.summary.record_error(
                ErrorKind::Invocation,
                &record_id,
                "review call failed or returned garbage; wrote unchecked report",
            );
        }

        let path = qa_dir.join(QaReport::file_name(&record_id));
        report.save(&path)?;
        run.stats.written += 1;
        run.summary.entries.push(RecordEntry {
            key: record_id.clone(),
            record_path: None,
            report_path: Some(path.display().to_string()),
            actions: vec![if report.checked {
                format!("Report written ({} findings)", report.findings.len())
            } else {
                "Unchecked report written".to_string()
            }],
            unapplied: Vec::new(),
        });
        tracing::info!(
            record_id = %record_id,
            findings = report.findings.len(),
            checked = report.checked,
            "Report written"
        );
    }

    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nirqa_common::{FindingKind, QaFinding};
    use serde_json::json;
    use tempfile::TempDir;

    /// Reviewer that flags every record's title, or fails on demand
    struct FakeReviewer {
        fail: bool,
    }

    impl Reviewer for FakeReviewer {
        async fn evaluate(&self, record: &Record, _instructions: &str) -> QaReport {
            let record_id = record.id().unwrap_or_default().to_string();
            if self.fail {
                return QaReport::unchecked(&record_id);
            }
            QaReport {
                record_id,
                findings: vec![QaFinding {
                    field: Some("title".to_string()),
                    kind: FindingKind::TitleFormat,
                    suggested_value: Some(json!("Fixed Title")),
                    explanation: None,
                }],
                checked: true,
            }
        }
    }

    fn record(value: serde_json::Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn writes_one_report_per_record() {
        let tmp = TempDir::new().unwrap();
        let records = vec![
            record(json!({"id": "R1", "metadata": {"title": "a"}})),
            record(json!({"id": "R2", "metadata": {"title": "b"}})),
        ];

        let run = review_records(
            &FakeReviewer { fail: false },
            &records,
            "instructions",
            tmp.path(),
            true,
        )
        .await
        .unwrap();

        assert_eq!(run.stats.written, 2);
        assert_eq!(run.stats.unchecked, 0);
        assert_eq!(run.summary.processed, 2);
        assert!(run.summary.errors.is_empty());
        let report = QaReport::load(&tmp.path().join("R1-report.json")).unwrap();
        assert_eq!(report.record_id, "R1");
        assert!(report.checked);
        assert_eq!(report.findings.len(), 1);
    }

    #[tokio::test]
    async fn failed_review_still_writes_unchecked_report() {
        let tmp = TempDir::new().unwrap();
        let records = vec![record(json!({"id": "R1"}))];

        let run = review_records(
            &FakeReviewer { fail: true },
            &records,
            "instructions",
            tmp.path(),
            true,
        )
        .await
        .unwrap();

        assert_eq!(run.stats.written, 1);
        assert_eq!(run.stats.unchecked, 1);
        let report = QaReport::load(&tmp.path().join("R1-report.json")).unwrap();
        assert!(!report.checked);
        assert!(report.findings.is_empty());
    }

    #[tokio::test]
    async fn failed_review_is_an_invocation_error_in_the_summary() {
        let tmp = TempDir::new().unwrap();
        let records = vec![
            record(json!({"id": "R1"})),
            record(json!({"id": "R2"})),
        ];

        let run = review_records(
            &FakeReviewer { fail: true },
            &records,
            "instructions",
            tmp.path(),
            true,
        )
        .await
        .unwrap();

        assert_eq!(run.summary.error_count(ErrorKind::Invocation), 2);
        assert_eq!(run.summary.processed, 2);
        let entry = run.summary.entries.iter().find(|e| e.key == "R1").unwrap();
        assert_eq!(entry.actions, vec!["Unchecked report written"]);
    }

    #[tokio::test]
    async fn checked_records_are_skipped_when_recheck_is_off() {
        let tmp = TempDir::new().unwrap();
        let records = vec![
            record(json!({"id": "R1", "custom_fields": {"qa:checked": true}})),
            record(json!({"id": "R2"})),
        ];

        let run = review_records(
            &FakeReviewer { fail: false },
            &records,
            "instructions",
            tmp.path(),
            false,
        )
        .await
        .unwrap();

        assert_eq!(run.stats.skipped_checked, 1);
        assert_eq!(run.stats.written, 1);
        assert!(!tmp.path().join("R1-report.json").exists());
        assert!(tmp.path().join("R2-report.json").exists());
    }

    #[tokio::test]
    async fn record_without_id_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let records = vec![record(json!({"metadata": {"title": "anonymous"}}))];

        let run = review_records(
            &FakeReviewer { fail: false },
            &records,
            "instructions",
            tmp.path(),
            true,
        )
        .await
        .unwrap();

        assert_eq!(run.stats.skipped_no_id, 1);
        assert_eq!(run.stats.written, 0);
    }
}
