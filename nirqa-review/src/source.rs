//! Record sourcing
//!
//! Records come from either a local folder of one-JSON-file-per-record or
//! the remote records API filtered by creation date and country of input.
//! Both sources normalize to the same in-memory `Record`. Unreadable records
//! are logged and skipped; the batch continues.

use chrono::NaiveDate;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use nirqa_common::Record;

const USER_AGENT: &str = "NIRQA/0.1.0 (records QA automation)";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const PAGE_SIZE: u32 = 100;

/// Record source errors (setup-level; per-record problems are logged skips)
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Records dir unreadable: {0}")]
    DirUnreadable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),
}

/// Date and country-of-input filters for the remote source
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub from_date: Option<NaiveDate>,
    pub until_date: Option<NaiveDate>,
    /// Countries of input to include (empty = all)
    pub countries: Vec<String>,
    /// Countries of input to exclude
    pub exclude_countries: Vec<String>,
}

/// Where records come from for one run
pub enum RecordSource {
    /// Local folder of `<id>.json` files
    Local(PathBuf),
    /// Remote records API
    Remote {
        base_url: String,
        token: Option<String>,
        filter: RecordFilter,
    },
}

impl RecordSource {
    /// Fetch every record the source yields. Per-record read failures are
    /// logged and skipped; only a source-level failure is an error.
    pub async fn fetch_records(&self) -> Result<Vec<Record>, SourceError> {
        match self {
            Self::Local(dir) => fetch_local(dir),
            Self::Remote {
                base_url,
                token,
                filter,
            } => fetch_remote(base_url, token.as_deref(), filter).await,
        }
    }
}

fn fetch_local(dir: &Path) -> Result<Vec<Record>, SourceError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| SourceError::DirUnreadable(format!("{}: {e}", dir.display())))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    paths.sort();

    let mut records = Vec::new();
    for path in paths {
        match Record::load(&path) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable record");
            }
        }
    }

    tracing::info!(dir = %dir.display(), count = records.len(), "Loaded local records");
    Ok(records)
}

async fn fetch_remote(
    base_url: &str,
    token: Option<&str>,
    filter: &RecordFilter,
) -> Result<Vec<Record>, SourceError> {
    let http_client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| SourceError::Network(e.to_string()))?;

    let mut records = Vec::new();
    let mut url = Some(first_page_url(base_url, filter));

    while let Some(page_url) = url {
        tracing::debug!(url = %page_url, "Fetching records page");

        let mut request = http_client.get(&page_url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourceError::ApiError(status.as_u16(), error_text));
        }

        let page: Value = response
            .json()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        for hit in page_hits(&page) {
            match Record::from_value(hit.clone()) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed remote record");
                }
            }
        }

        url = page
            .get("links")
            .and_then(|l| l.get("next"))
            .and_then(Value::as_str)
            .map(String::from);
    }

    tracing::info!(count = records.len(), "Fetched remote records");
    Ok(records)
}

/// Build the first page URL with date and country-of-input filters.
/// The query shape is the records API's fixed external contract.
fn first_page_url(base_url: &str, filter: &RecordFilter) -> String {
    let mut query: Vec<String> = vec![format!("size={PAGE_SIZE}")];
    if let Some(from) = filter.from_date {
        query.push(format!("from_date={}", from.format("%Y-%m-%d")));
    }
    if let Some(until) = filter.until_date {
        query.push(format!("until_date={}", until.format("%Y-%m-%d")));
    }
    for country in &filter.countries {
        query.push(format!("country={country}"));
    }
    for country in &filter.exclude_countries {
        query.push(format!("exclude_country={country}"));
    }
    format!(
        "{}/records?{}",
        base_url.trim_end_matches('/'),
        query.join("&")
    )
}

/// Records arrive either as a plain array or under `hits.hits`.
fn page_hits(page: &Value) -> Vec<&Value> {
    if let Some(array) = page.as_array() {
        return array.iter().collect();
    }
    page.get("hits")
        .and_then(|h| h.get("hits"))
        .and_then(Value::as_array)
        .map(|a| a.iter().collect())
        .unwrap_or_default()
}
