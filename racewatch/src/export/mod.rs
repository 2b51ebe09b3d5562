//! Report export
//!
//! Serializes the teardown report for external tooling. Currently supports
//! pretty-printed JSON.

pub mod report_json;

pub use report_json::ReportExporter;
