//! Reviewing-service client
//!
//! Calls an OpenAI-compatible chat-completions endpoint with the review
//! prompt and parses the completion text back into a `QaReport`. A malformed
//! or empty response yields a zero-finding report with `checked = false`;
//! one bad record must never abort the rest of the batch.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use nirqa_common::{QaFinding, QaReport, Record};

use crate::prompt::build_prompt;

const USER_AGENT: &str = "NIRQA/0.1.0 (records QA automation)";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_RETRIES: u32 = 2;

/// Reviewing-service client errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Empty completion")]
    EmptyCompletion,
}

/// Anything that can review one record against the fixed instructions.
/// Implemented by `LlmClient`; tests substitute fakes.
pub trait Reviewer {
    /// Review one record. Never fails the batch: an unreviewable record
    /// yields an unchecked zero-finding report.
    fn evaluate(
        &self,
        record: &Record,
        instructions: &str,
    ) -> impl std::future::Future<Output = QaReport> + Send;
}

/// Chat-completions client for the reviewing service
pub struct LlmClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<serde_json::Value>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// The JSON object the reviewer is instructed to answer with
#[derive(Debug, Deserialize)]
struct ReviewPayload {
    #[serde(default)]
    findings: Vec<QaFinding>,
}

impl LlmClient {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// One request attempt; retried by `evaluate` on timeout or 5xx.
    async fn request_completion(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![json!({"role": "user", "content": prompt})],
            temperature: 0.0,
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError(status.as_u16(), error_text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyCompletion)
    }

    fn is_retryable(error: &LlmError) -> bool {
        match error {
            LlmError::Network(_) => true,
            LlmError::ApiError(status, _) => *status >= 500,
            LlmError::EmptyCompletion => false,
        }
    }
}

impl Reviewer for LlmClient {
    async fn evaluate(&self, record: &Record, instructions: &str) -> QaReport {
        let record_id = record.id().unwrap_or_default().to_string();
        let prompt = build_prompt(record, instructions);

        let mut attempt = 0;
        let content = loop {
            match self.request_completion(&prompt).await {
                Ok(content) => break content,
                Err(e) if attempt < MAX_RETRIES && Self::is_retryable(&e) => {
                    attempt += 1;
                    tracing::warn!(
                        record_id = %record_id,
                        attempt = attempt,
                        error = %e,
                        "Review call failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(2 * attempt as u64)).await;
                }
                Err(e) => {
                    tracing::warn!(record_id = %record_id, error = %e, "Review call failed");
                    return QaReport::unchecked(&record_id);
                }
            }
        };

        parse_review_response(&content, &record_id)
    }
}

/// Parse the completion text into a report.
///
/// Tolerates code fences and surrounding prose by extracting the outermost
/// JSON object. Anything unparseable yields an unchecked report.
pub fn parse_review_response(content: &str, record_id: &str) -> QaReport {
    let Some(object) = extract_json_object(content) else {
        tracing::warn!(record_id = %record_id, "No JSON object in review response");
        return QaReport::unchecked(record_id);
    };

    match serde_json::from_str::<ReviewPayload>(object) {
        Ok(payload) => {
            tracing::debug!(
                record_id = %record_id,
                findings = payload.findings.len(),
                "Parsed review response"
            );
            QaReport {
                record_id: record_id.to_string(),
                findings: payload.findings,
                checked: true,
            }
        }
        Err(e) => {
            tracing::warn!(record_id = %record_id, error = %e, "Malformed review response");
            QaReport::unchecked(record_id)
        }
    }
}

fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}
