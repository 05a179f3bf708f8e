//! Batch driver: one correction-and-routing pass over a records folder
//!
//! Owns every effect the engine decides on: record rewrites, routing moves,
//! and remote pushes. No single record's failure aborts the batch; every
//! failure lands in the run summary.

use std::path::PathBuf;

use nirqa_common::summary::RecordEntry;
use nirqa_common::{ErrorKind, Record, Result, RunSummary};

use crate::engine::{decide, EngineConfig, RoutingDecision};
use crate::mover::move_into;
use crate::remote::RemoteApplyClient;
use crate::reports::{find_record_file, load_reports, sibling_files};

/// Options for one batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Folder of `<id>.json` record files
    pub records_dir: PathBuf,
    /// Folder of QA report files
    pub qa_dir: PathBuf,
    pub engine: EngineConfig,
}

impl BatchOptions {
    pub fn out_of_scope_dir(&self) -> PathBuf {
        self.records_dir.join(&self.engine.out_of_scope_dir)
    }

    pub fn duplicates_dir(&self) -> PathBuf {
        self.records_dir.join(&self.engine.duplicates_dir)
    }
}

/// Process every QA report in the QA folder against the records folder.
///
/// `remote` is present only when a token is configured and remote apply was
/// explicitly requested on a non-dry run; it receives exactly the records
/// whose decision is apply-corrections.
pub async fn run_batch(
    options: &BatchOptions,
    remote: Option<&RemoteApplyClient>,
) -> Result<RunSummary> {
    let mut summary = RunSummary::new();

    let reports = load_reports(&options.qa_dir)?;
    if reports.is_empty() {
        tracing::warn!(qa_dir = %options.qa_dir.display(), "No QA report files found");
        return Ok(summary);
    }

    for (key, loaded) in &reports {
        let report_path = loaded.path.display().to_string();

        let Some(record_path) = find_record_file(&options.records_dir, key) else {
            summary.missing += 1;
            summary.record_error(
                ErrorKind::UnresolvedReport,
                key,
                format!("no local record JSON found for report {report_path}"),
            );
            summary.entries.push(RecordEntry {
                key: key.clone(),
                record_path: None,
                report_path: Some(report_path),
                actions: vec!["Record JSON missing".to_string()],
                unapplied: Vec::new(),
            });
            continue;
        };

        let record = match Record::load(&record_path) {
            Ok(record) => record,
            Err(e) => {
                summary.record_error(
                    ErrorKind::SourceRead,
                    key,
                    format!("unreadable record {}: {e}", record_path.display()),
                );
                continue;
            }
        };

        summary.processed += 1;
        let decision = decide(&record, &loaded.report, &options.engine);
        let mut entry = RecordEntry {
            key: key.clone(),
            record_path: Some(record_path.display().to_string()),
            report_path: Some(report_path),
            actions: decision.actions.clone(),
            unapplied: decision.unapplied.clone(),
        };

        match decision.routing {
            RoutingDecision::OutOfScope | RoutingDecision::Duplicate => {
                let (dest_dir, dir_name) = if decision.routing == RoutingDecision::OutOfScope {
                    (
                        options.out_of_scope_dir(),
                        options.engine.out_of_scope_dir.as_str(),
                    )
                } else {
                    (
                        options.duplicates_dir(),
                        options.engine.duplicates_dir.as_str(),
                    )
                };
                let siblings = sibling_files(&options.records_dir, key);

                // Routing is all-or-nothing across the record's files: any
                // taken destination name refuses the whole move, so the
                // record never ends up split between two folders.
                let collisions: Vec<std::path::PathBuf> = siblings
                    .iter()
                    .filter_map(|src| src.file_name().map(|name| dest_dir.join(name)))
                    .filter(|dest| dest.exists())
                    .collect();

                if !collisions.is_empty() {
                    for dest in &collisions {
                        summary.record_error(
                            ErrorKind::RoutingCollision,
                            key,
                            format!("destination already exists: {}", dest.display()),
                        );
                    }
                    entry.actions = vec![format!(
                        "Move to {dir_name} refused: destination already exists"
                    )];
                } else {
                    let mut failed = false;
                    for src in siblings {
                        match move_into(&src, &dest_dir, options.engine.dry_run) {
                            Ok(_) => {}
                            Err(e) => {
                                failed = true;
                                summary.record_error(
                                    ErrorKind::RoutingCollision,
                                    key,
                                    e.to_string(),
                                );
                            }
                        }
                    }
                    if failed {
                        entry.actions = vec![format!("Move to {dir_name} incomplete")];
                    } else {
                        match decision.routing {
                            RoutingDecision::OutOfScope => summary.moved_out_of_scope += 1,
                            _ => summary.moved_duplicates += 1,
                        }
                    }
                }
            }
            RoutingDecision::ApplyCorrections => {
                summary.corrected += 1;
                if !options.engine.dry_run {
                    if let Err(e) = decision.record.save(&record_path) {
                        summary.record_error(
                            ErrorKind::SourceRead,
                            key,
                            format!("failed to rewrite {}: {e}", record_path.display()),
                        );
                        summary.entries.push(entry);
                        continue;
                    }
                    if let Some(remote) = remote {
                        match remote
                            .apply(key, &decision.record, &decision.changed_fields)
                            .await
                        {
                            Ok(()) => entry.actions.push("Remote record updated".to_string()),
                            Err(e) => {
                                // Local state stands; remote confirmation pending
                                summary.record_error(ErrorKind::RemoteApply, key, e.to_string());
                            }
                        }
                    }
                }
            }
            RoutingDecision::NoAction => {}
        }

        if entry.actions.is_empty() {
            entry.actions.push("No changes applied".to_string());
        }
        summary.entries.push(entry);
    }

    tracing::info!(
        processed = summary.processed,
        corrected = summary.corrected,
        moved_out_of_scope = summary.moved_out_of_scope,
        moved_duplicates = summary.moved_duplicates,
        missing = summary.missing,
        errors = summary.errors.len(),
        "Batch complete"
    );

    Ok(summary)
}
