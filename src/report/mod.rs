//! Report generation modules.

pub mod generator;

pub use generator::{generate_markdown_report, write_report, ReportWriteError};
