//! nirqa-correct - Correction & Routing tool entry point
//!
//! Applies trusted QA corrections to local record files, routes possible
//! out-of-scope and duplicate records into subfolders, and optionally pushes
//! approved changes to the remote records API.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nirqa_common::config::{load_toml_config, resolve_value};
use nirqa_correct::batch::{run_batch, BatchOptions};
use nirqa_correct::engine::{EngineConfig, DEFAULT_DUPLICATES_DIR, DEFAULT_OUT_OF_SCOPE_DIR};
use nirqa_correct::remote::RemoteApplyClient;
use nirqa_correct::render::render_markdown;

/// Command-line arguments for nirqa-correct
#[derive(Parser, Debug)]
#[command(name = "nirqa-correct")]
#[command(about = "Apply trusted QA corrections and organize flagged records")]
#[command(version)]
struct Args {
    /// Folder with local record JSON files
    #[arg(long)]
    records_dir: PathBuf,

    /// Folder with QA report JSON files
    #[arg(long)]
    qa_dir: PathBuf,

    /// Subfolder for possible out-of-scope records
    #[arg(long, default_value = DEFAULT_OUT_OF_SCOPE_DIR)]
    out_of_scope_dir: String,

    /// Subfolder for possible duplicate records
    #[arg(long, default_value = DEFAULT_DUPLICATES_DIR)]
    duplicates_dir: String,

    /// Compute and report decisions without writing, moving, or pushing anything
    #[arg(long)]
    dry_run: bool,

    /// Push approved changes to the remote records API (requires a token)
    #[arg(long)]
    apply: bool,

    /// Bearer token for the remote records API
    #[arg(long, env = "NIRQA_RECORDS_API_TOKEN")]
    token: Option<String>,

    /// Base URL of the remote records API
    #[arg(long, env = "NIRQA_RECORDS_API_BASE")]
    records_api_base: Option<String>,

    /// Path for the Markdown run report (file or directory; default: QA dir)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Path for a JSON copy of the run summary, for the notification shell
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nirqa_correct=info,nirqa_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if !args.records_dir.is_dir() {
        bail!("Records dir does not exist: {}", args.records_dir.display());
    }
    if !args.qa_dir.is_dir() {
        bail!("QA dir does not exist: {}", args.qa_dir.display());
    }

    let toml_config = load_toml_config().context("Failed to load configuration")?;

    // Remote mutation is opt-in: --apply plus a configured token, never in dry-run.
    let remote = if args.apply && !args.dry_run {
        let token = resolve_value(
            "records API token",
            args.token.as_deref(),
            "NIRQA_RECORDS_API_TOKEN",
            toml_config.records_api_token.as_deref(),
        )
        .context("--apply requires a records API token")?;
        let base = resolve_value(
            "records API base URL",
            args.records_api_base.as_deref(),
            "NIRQA_RECORDS_API_BASE",
            toml_config.records_api_base.as_deref(),
        )
        .context("--apply requires a records API base URL")?;
        Some(RemoteApplyClient::new(&base, &token)?)
    } else {
        if args.apply && args.dry_run {
            tracing::warn!("--apply ignored in dry-run mode");
        }
        None
    };

    let options = BatchOptions {
        records_dir: args.records_dir.clone(),
        qa_dir: args.qa_dir.clone(),
        engine: EngineConfig {
            dry_run: args.dry_run,
            out_of_scope_dir: args.out_of_scope_dir.clone(),
            duplicates_dir: args.duplicates_dir.clone(),
            ..EngineConfig::default()
        },
    };

    let summary = run_batch(&options, remote.as_ref()).await?;

    let markdown = render_markdown(
        &summary,
        &args.records_dir,
        &args.qa_dir,
        &options.out_of_scope_dir(),
        &options.duplicates_dir(),
        args.dry_run,
    );
    let report_path = resolve_report_path(args.report.as_deref(), &args.qa_dir);
    std::fs::write(&report_path, markdown)
        .with_context(|| format!("Failed to write report: {}", report_path.display()))?;
    tracing::info!("Report written to {}", report_path.display());

    if let Some(summary_path) = &args.summary_json {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(summary_path, json)
            .with_context(|| format!("Failed to write summary: {}", summary_path.display()))?;
    }

    // Findings and per-record errors are a normal outcome; only setup
    // failures exit non-zero (they bailed above).
    Ok(())
}

fn resolve_report_path(report_arg: Option<&std::path::Path>, qa_dir: &std::path::Path) -> PathBuf {
    match report_arg {
        Some(path) if path.is_dir() => path.join("corrections-report.md"),
        Some(path)
            if path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("md"))
                .unwrap_or(false) =>
        {
            path.to_path_buf()
        }
        Some(path) => path
            .parent()
            .unwrap_or(qa_dir)
            .join("corrections-report.md"),
        None => qa_dir.join("corrections-report.md"),
    }
}
