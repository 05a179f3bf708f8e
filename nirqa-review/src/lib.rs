//! nirqa-review - QA invocation tool
//!
//! Reads bibliographic records (local folder or remote records API), builds a
//! review prompt per record from a fixed instruction text, calls the external
//! reviewing service, and writes one QA report file per record for the
//! correction stage to consume later.

pub mod llm;
pub mod prompt;
pub mod runner;
pub mod source;

pub use llm::{LlmClient, Reviewer};
pub use runner::{review_records, ReviewRun, ReviewStats};
pub use source::{RecordFilter, RecordSource};
