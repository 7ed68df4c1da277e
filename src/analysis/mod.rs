//! Correlation analysis.
//!
//! The ranker scans every pair of numeric columns and picks the two most
//! correlated pairs; the summary extractor describes the columns they use.

pub mod ranker;
pub mod summary;

pub use ranker::rank_pairs;

use thiserror::Error;

/// Errors raised by ranking and summary extraction. All are fatal to a run.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("Need at least two numeric columns to rank pairs, found {found}")]
    InsufficientColumns { found: usize },

    #[error("No column pair has a defined correlation (every numeric column is constant)")]
    NoComparablePairs,

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column is not numeric: {0}")]
    NotNumeric(String),
}
