//! Review prompt construction
//!
//! The instruction text is an opaque configuration string; this module only
//! frames it together with the record content and the response contract the
//! parser expects.

use nirqa_common::Record;

/// Appended to every request so the reviewer answers in the shape
/// `llm::parse_review_response` understands.
const RESPONSE_CONTRACT: &str = "\
Respond with a single JSON object and nothing else:\n\
{\n\
  \"findings\": [\n\
    {\"field\": \"<record field>\", \"kind\": \"<title-format|affiliation|organizational-author|out-of-scope|duplicate|other>\", \"suggested_value\": <replacement or {\"old\": ..., \"new\": ...} or null>, \"explanation\": \"<short rationale>\"}\n\
  ]\n\
}\n\
Report an empty findings list when the record passes every check.";

/// Build the user message for one record review.
pub fn build_prompt(record: &Record, instructions: &str) -> String {
    let record_json = serde_json::to_string_pretty(&record.as_value())
        .unwrap_or_else(|_| "{}".to_string());
    format!(
        "{instructions}\n\n\
         Record under review:\n\
         ```json\n{record_json}\n```\n\n\
         {RESPONSE_CONTRACT}"
    )
}
