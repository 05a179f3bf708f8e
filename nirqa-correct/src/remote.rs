//! Remote apply adapter
//!
//! Pushes trusted field changes to the remote records API as an authenticated
//! partial update — never a full-record overwrite — and sets the remote
//! QA-checked marker. Remote mutation is opt-in: no token or no `--apply`
//! means this adapter is never constructed.

use serde_json::{json, Map, Value};
use std::time::Duration;
use thiserror::Error;

use nirqa_common::record::QA_CHECKED_FIELD;
use nirqa_common::Record;

const USER_AGENT: &str = "NIRQA/0.1.0 (records QA automation)";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Remote apply errors
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Authentication rejected")]
    Unauthorized,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),
}

/// Authenticated client for partial record updates
pub struct RemoteApplyClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RemoteApplyClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, RemoteError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Push the changed fields of `record` to the remote record `record_id`.
    pub async fn apply(
        &self,
        record_id: &str,
        record: &Record,
        changed_fields: &[&str],
    ) -> Result<(), RemoteError> {
        let body = partial_body(record, changed_fields);
        let url = format!("{}/records/{}", self.base_url, record_id);

        tracing::debug!(record_id = %record_id, url = %url, "Pushing partial update");

        let response = self
            .http_client
            .patch(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();

        if status == 404 {
            return Err(RemoteError::RecordNotFound(record_id.to_string()));
        }
        if status == 401 || status == 403 {
            return Err(RemoteError::Unauthorized);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RemoteError::ApiError(status.as_u16(), error_text));
        }

        tracing::info!(
            record_id = %record_id,
            fields = ?changed_fields,
            "Remote record updated and marked QA-checked"
        );
        Ok(())
    }
}

/// Build the update body: exactly the changed field paths extracted from the
/// mutated record, plus the QA-checked marker.
pub fn partial_body(record: &Record, changed_fields: &[&str]) -> Value {
    let full = record.as_value();
    let mut body = Map::new();

    for path in changed_fields {
        let Some(value) = lookup_path(&full, path) else {
            continue;
        };
        insert_path(&mut body, path, value.clone());
    }

    insert_path(
        &mut body,
        &format!("custom_fields.{QA_CHECKED_FIELD}"),
        json!(true),
    );

    Value::Object(body)
}

fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |v, seg| v.get(seg))
}

fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = target;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        current = current
            .entry(segment.to_string())
            .or_insert_with(|| json!({}))
            .as_object_mut()
            .expect("intermediate path segment is always an object");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_carries_only_changed_fields_plus_marker() {
        let record = Record::from_value(json!({
            "id": "R1",
            "metadata": {
                "title": "The Study of X",
                "description": "untouched abstract",
                "creators": [{"person_or_org": {"type": "personal", "name": "Doe"}}]
            },
            "pids": {"doi": {"identifier": "10.1/x"}}
        }))
        .unwrap();

        let body = partial_body(&record, &["metadata.title"]);
        assert_eq!(body["metadata"]["title"], "The Study of X");
        assert_eq!(body["custom_fields"][QA_CHECKED_FIELD], json!(true));
        // Never a full-record overwrite
        assert!(body["metadata"].get("description").is_none());
        assert!(body.get("pids").is_none());
        assert!(body.get("id").is_none());
    }

    #[test]
    fn body_with_no_changes_still_marks_checked() {
        let record = Record::from_value(json!({"id": "R1"})).unwrap();
        let body = partial_body(&record, &[]);
        assert_eq!(body["custom_fields"][QA_CHECKED_FIELD], json!(true));
        assert_eq!(body.as_object().unwrap().len(), 1);
    }

    #[test]
    fn missing_path_is_skipped() {
        let record = Record::from_value(json!({"id": "R1"})).unwrap();
        let body = partial_body(&record, &["metadata.title"]);
        assert!(body.get("metadata").is_none());
    }
}
