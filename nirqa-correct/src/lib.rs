//! nirqa-correct - Correction & Routing tool
//!
//! Consumes QA report files produced by `nirqa-review`, applies the trusted
//! subset of corrections to local record files, routes possible out-of-scope
//! and duplicate records into subfolders, optionally pushes approved field
//! changes to the remote records API, and renders a Markdown run report.

pub mod batch;
pub mod engine;
pub mod mover;
pub mod remote;
pub mod render;
pub mod reports;

pub use batch::{run_batch, BatchOptions};
pub use engine::{decide, Decision, EngineConfig, RoutingDecision};
