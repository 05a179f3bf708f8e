//! nirqa-review - QA invocation tool entry point
//!
//! Reads records from a local folder or the remote records API, reviews each
//! against the fixed instruction text, and writes one QA report file per
//! record for `nirqa-correct` to consume.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nirqa_common::config::{load_toml_config, resolve_bool, resolve_required, resolve_value};
use nirqa_review::runner::review_records;
use nirqa_review::source::{RecordFilter, RecordSource};
use nirqa_review::LlmClient;

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Command-line arguments for nirqa-review
#[derive(Parser, Debug)]
#[command(name = "nirqa-review")]
#[command(about = "Review bibliographic records against the QA instruction set")]
#[command(version)]
struct Args {
    /// Folder with local record JSON files (local mode)
    #[arg(long, conflicts_with = "live")]
    records_dir: Option<PathBuf>,

    /// Fetch records from the remote records API instead of a local folder
    #[arg(long)]
    live: bool,

    /// Output folder for QA report JSON files
    #[arg(long)]
    qa_dir: PathBuf,

    /// File holding the fixed QA instruction text
    #[arg(long)]
    instructions: PathBuf,

    /// Chat-completions endpoint of the reviewing service
    #[arg(long, env = "NIRQA_LLM_ENDPOINT")]
    llm_endpoint: Option<String>,

    /// Bearer key for the reviewing service
    #[arg(long, env = "NIRQA_LLM_API_KEY")]
    llm_api_key: Option<String>,

    /// Model name sent with each review request
    #[arg(long, env = "NIRQA_LLM_MODEL")]
    llm_model: Option<String>,

    /// Base URL of the remote records API (live mode)
    #[arg(long, env = "NIRQA_RECORDS_API_BASE")]
    records_api_base: Option<String>,

    /// Bearer token for the remote records API (live mode)
    #[arg(long, env = "NIRQA_RECORDS_API_TOKEN")]
    token: Option<String>,

    /// Only records created on or after this date (live mode, YYYY-MM-DD)
    #[arg(long)]
    from_date: Option<NaiveDate>,

    /// Only records created on or before this date (live mode, YYYY-MM-DD)
    #[arg(long)]
    until_date: Option<NaiveDate>,

    /// Country of input to include; repeatable (live mode)
    #[arg(long = "country")]
    countries: Vec<String>,

    /// Country of input to exclude; repeatable (live mode)
    #[arg(long = "exclude-country")]
    exclude_countries: Vec<String>,

    /// Skip records already carrying the QA-checked marker
    #[arg(long)]
    skip_checked: bool,

    /// Path for a JSON copy of the run summary, for the notification shell
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nirqa_review=info,nirqa_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let toml_config = load_toml_config().context("Failed to load configuration")?;

    let endpoint = resolve_required(
        "LLM endpoint",
        args.llm_endpoint.as_deref(),
        "NIRQA_LLM_ENDPOINT",
        toml_config.llm_endpoint.as_deref(),
    )?;
    let api_key = resolve_required(
        "LLM API key",
        args.llm_api_key.as_deref(),
        "NIRQA_LLM_API_KEY",
        toml_config.llm_api_key.as_deref(),
    )?;
    let model = resolve_value(
        "LLM model",
        args.llm_model.as_deref(),
        "NIRQA_LLM_MODEL",
        toml_config.llm_model.as_deref(),
    )
    .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let instructions = std::fs::read_to_string(&args.instructions).with_context(|| {
        format!(
            "Failed to read instructions: {}",
            args.instructions.display()
        )
    })?;

    let source = if args.live {
        let base_url = resolve_required(
            "records API base URL",
            args.records_api_base.as_deref(),
            "NIRQA_RECORDS_API_BASE",
            toml_config.records_api_base.as_deref(),
        )?;
        let token = resolve_value(
            "records API token",
            args.token.as_deref(),
            "NIRQA_RECORDS_API_TOKEN",
            toml_config.records_api_token.as_deref(),
        );
        RecordSource::Remote {
            base_url,
            token,
            filter: RecordFilter {
                from_date: args.from_date,
                until_date: args.until_date,
                countries: args.countries.clone(),
                exclude_countries: args.exclude_countries.clone(),
            },
        }
    } else {
        let Some(records_dir) = &args.records_dir else {
            bail!("Either --records-dir or --live is required");
        };
        if !records_dir.is_dir() {
            bail!("Records dir does not exist: {}", records_dir.display());
        }
        RecordSource::Local(records_dir.clone())
    };

    let records = source
        .fetch_records()
        .await
        .context("Failed to fetch records")?;
    tracing::info!(count = records.len(), "Records to review");

    let reviewer = LlmClient::new(&endpoint, &api_key, &model)?;
    // --skip-checked is the CLI tier of the recheck policy
    let recheck_checked = resolve_bool(
        "recheck policy",
        args.skip_checked.then_some(false),
        "NIRQA_RECHECK_CHECKED",
        toml_config.recheck_checked,
    );

    let run = review_records(
        &reviewer,
        &records,
        &instructions,
        &args.qa_dir,
        recheck_checked,
    )
    .await?;

    if let Some(summary_path) = &args.summary_json {
        let json = serde_json::to_string_pretty(&run.summary)?;
        std::fs::write(summary_path, json)
            .with_context(|| format!("Failed to write summary: {}", summary_path.display()))?;
    }

    tracing::info!(
        written = run.stats.written,
        skipped_checked = run.stats.skipped_checked,
        skipped_no_id = run.stats.skipped_no_id,
        unchecked = run.stats.unchecked,
        invocation_errors = run.summary.error_count(nirqa_common::ErrorKind::Invocation),
        "Review run complete"
    );

    // Findings (or their absence) are a normal outcome; only setup failures
    // exit non-zero.
    Ok(())
}
