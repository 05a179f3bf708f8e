//! Loading QA report files into a keyed map
//!
//! The reviewing stage writes one `<record-id>-report.json` per record; this
//! module reads a whole QA directory back, skipping unreadable files so one
//! bad report never blocks the batch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use nirqa_common::{QaReport, Result};

/// A loaded report together with the file it came from
#[derive(Debug, Clone)]
pub struct LoadedReport {
    pub report: QaReport,
    pub path: PathBuf,
}

/// Read every `*.json` report in `qa_dir`, keyed by record id.
///
/// Unparseable files are logged and skipped. A later report for the same key
/// supersedes an earlier one; reports are never merged.
pub fn load_reports(qa_dir: &Path) -> Result<BTreeMap<String, LoadedReport>> {
    let mut reports = BTreeMap::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(qa_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json")
        })
        .collect();
    entries.sort();

    for path in entries {
        let report = match QaReport::load(&path) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable report");
                continue;
            }
        };
        let key = QaReport::key_for(&path, Some(&report))?;
        if key.is_empty() {
            tracing::warn!(path = %path.display(), "Skipping report with no key");
            continue;
        }
        reports.insert(key, LoadedReport { report, path });
    }

    Ok(reports)
}

/// Locate the record file for a report key: `<records_dir>/<key>.json`
pub fn find_record_file(records_dir: &Path, key: &str) -> Option<PathBuf> {
    let candidate = records_dir.join(format!("{key}.json"));
    candidate.exists().then_some(candidate)
}

/// Every file in `records_dir` sharing the record key as stem (the record
/// JSON plus any sibling full-text file), for routing moves.
pub fn sibling_files(records_dir: &Path, key: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(records_dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file() && p.file_stem().and_then(|s| s.to_str()) == Some(key)
        })
        .collect();
    files.sort();
    files
}
