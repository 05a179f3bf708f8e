//! End-to-end scenarios for the correction & routing batch:
//! local corrections, folder routing, unresolved reports, dry-run purity.

use std::path::Path;

use serde_json::{json, Value};
use tempfile::TempDir;

use nirqa_common::Record;
use nirqa_correct::batch::{run_batch, BatchOptions};
use nirqa_correct::engine::EngineConfig;

struct Fixture {
    _tmp: TempDir,
    records_dir: std::path::PathBuf,
    qa_dir: std::path::PathBuf,
}

fn fixture() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let records_dir = tmp.path().join("records");
    let qa_dir = tmp.path().join("qa");
    std::fs::create_dir_all(&records_dir).unwrap();
    std::fs::create_dir_all(&qa_dir).unwrap();
    Fixture {
        _tmp: tmp,
        records_dir,
        qa_dir,
    }
}

fn write_json(dir: &Path, name: &str, value: Value) {
    std::fs::write(
        dir.join(name),
        serde_json::to_string_pretty(&value).unwrap(),
    )
    .unwrap();
}

fn options(fixture: &Fixture, dry_run: bool) -> BatchOptions {
    BatchOptions {
        records_dir: fixture.records_dir.clone(),
        qa_dir: fixture.qa_dir.clone(),
        engine: EngineConfig {
            dry_run,
            ..EngineConfig::default()
        },
    }
}

#[tokio::test]
async fn title_correction_rewrites_record_and_sets_marker() {
    let fx = fixture();
    write_json(
        &fx.records_dir,
        "R1.json",
        json!({"id": "R1", "metadata": {"title": "the Study of X"}}),
    );
    write_json(
        &fx.qa_dir,
        "R1-report.json",
        json!({
            "record_id": "R1",
            "checked": true,
            "findings": [{
                "field": "title",
                "kind": "title-format",
                "suggested_value": "The Study of X"
            }]
        }),
    );

    let summary = run_batch(&options(&fx, false), None).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.corrected, 1);
    assert!(summary.errors.is_empty());

    let record = Record::load(&fx.records_dir.join("R1.json")).unwrap();
    assert_eq!(record.title(), Some("The Study of X"));
    assert!(record.qa_checked());
}

#[tokio::test]
async fn out_of_scope_record_moves_without_field_mutation() {
    let fx = fixture();
    write_json(
        &fx.records_dir,
        "R2.json",
        json!({"id": "R2", "metadata": {"title": "Unrelated"}}),
    );
    // A sibling full-text file travels with the record
    std::fs::write(fx.records_dir.join("R2.pdf"), b"pdf bytes").unwrap();
    write_json(
        &fx.qa_dir,
        "R2-report.json",
        json!({
            "record_id": "R2",
            "checked": true,
            "findings": [
                {"kind": "out-of-scope", "explanation": "not nuclear-related"},
                {"field": "title", "kind": "title-format", "suggested_value": "Changed"}
            ]
        }),
    );

    let summary = run_batch(&options(&fx, false), None).await.unwrap();
    assert_eq!(summary.moved_out_of_scope, 1);
    assert_eq!(summary.corrected, 0);

    let moved = fx
        .records_dir
        .join("Possible_Out_Of_Scope")
        .join("R2.json");
    assert!(moved.exists());
    assert!(fx
        .records_dir
        .join("Possible_Out_Of_Scope")
        .join("R2.pdf")
        .exists());
    assert!(!fx.records_dir.join("R2.json").exists());
    // Out-of-scope takes precedence: no field mutation anywhere
    let record = Record::load(&moved).unwrap();
    assert_eq!(record.title(), Some("Unrelated"));
}

#[tokio::test]
async fn unresolved_report_is_logged_and_batch_continues() {
    let fx = fixture();
    write_json(
        &fx.records_dir,
        "R1.json",
        json!({"id": "R1", "metadata": {"title": "the Study of X"}}),
    );
    write_json(
        &fx.qa_dir,
        "R1-report.json",
        json!({
            "record_id": "R1",
            "checked": true,
            "findings": [{
                "field": "title",
                "kind": "title-format",
                "suggested_value": "The Study of X"
            }]
        }),
    );
    write_json(
        &fx.qa_dir,
        "R3-report.json",
        json!({"record_id": "R3", "checked": true, "findings": []}),
    );

    let summary = run_batch(&options(&fx, false), None).await.unwrap();
    assert_eq!(summary.missing, 1);
    assert_eq!(summary.errors.len(), 1);
    // The other record was still processed normally
    assert_eq!(summary.corrected, 1);
    let record = Record::load(&fx.records_dir.join("R1.json")).unwrap();
    assert_eq!(record.title(), Some("The Study of X"));
}

#[tokio::test]
async fn dry_run_reports_decisions_but_mutates_nothing() {
    let fx = fixture();
    write_json(
        &fx.records_dir,
        "R1.json",
        json!({"id": "R1", "metadata": {"title": "the Study of X"}}),
    );
    write_json(
        &fx.records_dir,
        "R2.json",
        json!({"id": "R2", "metadata": {"title": "Unrelated"}}),
    );
    write_json(
        &fx.qa_dir,
        "R1-report.json",
        json!({
            "record_id": "R1",
            "checked": true,
            "findings": [{
                "field": "title",
                "kind": "title-format",
                "suggested_value": "The Study of X"
            }]
        }),
    );
    write_json(
        &fx.qa_dir,
        "R2-report.json",
        json!({"record_id": "R2", "checked": true, "findings": [{"kind": "out-of-scope"}]}),
    );

    let summary = run_batch(&options(&fx, true), None).await.unwrap();
    // Same decisions as a wet run...
    assert_eq!(summary.corrected, 1);
    assert_eq!(summary.moved_out_of_scope, 1);
    // ...but zero filesystem mutation
    let record = Record::load(&fx.records_dir.join("R1.json")).unwrap();
    assert_eq!(record.title(), Some("the Study of X"));
    assert!(!record.qa_checked());
    assert!(fx.records_dir.join("R2.json").exists());
    assert!(!fx.records_dir.join("Possible_Out_Of_Scope").exists());
}

#[tokio::test]
async fn routing_collision_preserves_existing_file() {
    let fx = fixture();
    write_json(
        &fx.records_dir,
        "R4.json",
        json!({"id": "R4", "metadata": {"title": "Dup"}}),
    );
    let dup_dir = fx.records_dir.join("Possible_Duplicates");
    std::fs::create_dir_all(&dup_dir).unwrap();
    std::fs::write(dup_dir.join("R4.json"), "{\"id\": \"earlier R4\"}").unwrap();
    write_json(
        &fx.qa_dir,
        "R4-report.json",
        json!({
            "record_id": "R4",
            "checked": true,
            "findings": [{"kind": "duplicate", "suggested_value": "doi"}]
        }),
    );

    let summary = run_batch(&options(&fx, false), None).await.unwrap();
    assert_eq!(summary.moved_duplicates, 0);
    assert_eq!(summary.errors.len(), 1);
    // Existing destination file untouched, source still present
    assert_eq!(
        std::fs::read_to_string(dup_dir.join("R4.json")).unwrap(),
        "{\"id\": \"earlier R4\"}"
    );
    assert!(fx.records_dir.join("R4.json").exists());
}

#[tokio::test]
async fn collision_on_one_sibling_refuses_the_whole_move() {
    let fx = fixture();
    write_json(
        &fx.records_dir,
        "R9.json",
        json!({"id": "R9", "metadata": {"title": "Out"}}),
    );
    std::fs::write(fx.records_dir.join("R9.pdf"), b"full text").unwrap();
    let oos_dir = fx.records_dir.join("Possible_Out_Of_Scope");
    std::fs::create_dir_all(&oos_dir).unwrap();
    std::fs::write(oos_dir.join("R9.json"), "{\"id\": \"earlier R9\"}").unwrap();
    write_json(
        &fx.qa_dir,
        "R9-report.json",
        json!({"record_id": "R9", "checked": true, "findings": [{"kind": "out-of-scope"}]}),
    );

    let summary = run_batch(&options(&fx, false), None).await.unwrap();
    assert_eq!(summary.moved_out_of_scope, 0);
    assert_eq!(summary.errors.len(), 1);
    // All of the record's files stay together in the source folder
    assert!(fx.records_dir.join("R9.json").exists());
    assert!(fx.records_dir.join("R9.pdf").exists());
    assert!(!oos_dir.join("R9.pdf").exists());
    assert_eq!(
        std::fs::read_to_string(oos_dir.join("R9.json")).unwrap(),
        "{\"id\": \"earlier R9\"}"
    );
    // The action text reports the refusal, not a move
    let entry = summary.entries.iter().find(|e| e.key == "R9").unwrap();
    assert!(entry.actions[0].contains("refused"));
    assert!(!entry.actions.iter().any(|a| a == "Move to Possible_Out_Of_Scope"));
}

#[tokio::test]
async fn second_pass_over_corrected_record_is_a_no_op() {
    let fx = fixture();
    write_json(
        &fx.records_dir,
        "R1.json",
        json!({"id": "R1", "metadata": {"title": "the Study of X"}}),
    );
    write_json(
        &fx.qa_dir,
        "R1-report.json",
        json!({
            "record_id": "R1",
            "checked": true,
            "findings": [{
                "field": "title",
                "kind": "title-format",
                "suggested_value": "The Study of X"
            }]
        }),
    );

    run_batch(&options(&fx, false), None).await.unwrap();
    let after_first = std::fs::read_to_string(fx.records_dir.join("R1.json")).unwrap();

    let summary = run_batch(&options(&fx, false), None).await.unwrap();
    assert_eq!(summary.corrected, 0);
    let after_second = std::fs::read_to_string(fx.records_dir.join("R1.json")).unwrap();
    assert_eq!(after_first, after_second);
}
