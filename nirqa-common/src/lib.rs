//! # NIRQA Common Library
//!
//! Shared code for the NIRQA quality-assurance tools including:
//! - Bibliographic record model
//! - QA report and finding types
//! - Run summary and error taxonomy
//! - Configuration loading

pub mod config;
pub mod error;
pub mod record;
pub mod report;
pub mod summary;

pub use error::{Error, Result};
pub use record::Record;
pub use report::{FindingKind, QaFinding, QaReport};
pub use summary::{ErrorKind, RunSummary};
