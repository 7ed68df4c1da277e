//! Data models for the analysis pipeline.
//!
//! This module contains the core data structures shared between the
//! ranker, the insight requester, the chart driver and the report
//! assembler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// An unordered pair of distinct numeric columns and their Pearson r.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnPair {
    /// Column that comes first in dataset order.
    pub first: String,
    /// Column that comes second in dataset order.
    pub second: String,
    /// Pearson correlation coefficient in [-1, 1].
    pub correlation: f64,
}

impl ColumnPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>, correlation: f64) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
            correlation,
        }
    }

    /// Returns the two column names in dataset order.
    pub fn columns(&self) -> (&str, &str) {
        (&self.first, &self.second)
    }
}

impl fmt::Display for ColumnPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) r={:.4}",
            self.first, self.second, self.correlation
        )
    }
}

/// Descriptive statistics for one numeric column.
///
/// Field names on the wire follow the familiar `describe()` layout
/// (`count`, `mean`, `std`, `min`, `25%`, `50%`, `75%`, `max`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` when fewer than two values exist.
    pub std: Option<f64>,
    pub min: f64,
    #[serde(rename = "25%")]
    pub p25: f64,
    #[serde(rename = "50%")]
    pub p50: f64,
    #[serde(rename = "75%")]
    pub p75: f64,
    pub max: f64,
}

/// Column summaries keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSummaryBundle(BTreeMap<String, ColumnSummary>);

impl ColumnSummaryBundle {
    pub fn insert(&mut self, column: impl Into<String>, summary: ColumnSummary) {
        self.0.insert(column.into(), summary);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ColumnSummary)> {
        self.0.iter()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}

/// The two most correlated pairs, plus summaries for their columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSelection {
    pub max_corr_pair: ColumnPair,
    /// Unset when no pair has a correlation strictly below the maximum.
    pub second_max_corr_pair: Option<ColumnPair>,
    pub summaries: ColumnSummaryBundle,
}

impl RankedSelection {
    /// Selected pairs in selection order: max pair first.
    pub fn pairs(&self) -> impl Iterator<Item = &ColumnPair> {
        std::iter::once(&self.max_corr_pair).chain(self.second_max_corr_pair.as_ref())
    }

    /// Distinct column names referenced by the selection, in pair order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for pair in self.pairs() {
            for column in [&pair.first, &pair.second] {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }
        columns
    }
}

/// Reply to a correlation-judgment request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationJudgment {
    /// Whether the two top columns share semantic meaning.
    pub is_columns_common: bool,
    /// Explanation for the correlation behaviour.
    pub reason: String,
}

/// Reply to a report-generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDraft {
    /// Suggested plotting code. Kept verbatim, never executed.
    pub python_code: String,
    pub chart_name: String,
    pub readme_file_summary: String,
}

/// A decoded answer from the reasoning service, one variant per request kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InsightResponse {
    Correlation(CorrelationJudgment),
    Report(ReportDraft),
}

impl InsightResponse {
    /// Pretty JSON rendering of the answer's fields.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Outcome of one external request as it appears in the report.
#[derive(Debug, Clone, PartialEq)]
pub enum InsightSection {
    Answered(InsightResponse),
    /// Retries were exhausted; the run continued in degraded mode.
    Failed {
        operation: String,
        attempts: u32,
        detail: String,
    },
    /// The request was not made (disabled by configuration).
    Skipped,
}

impl InsightSection {
    pub fn response(&self) -> Option<&InsightResponse> {
        match self {
            InsightSection::Answered(response) => Some(response),
            _ => None,
        }
    }
}

/// A rendered chart for one selected pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartArtifact {
    pub pair: ColumnPair,
    pub path: PathBuf,
}

/// A chart that could not be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartFailure {
    pub pair: ColumnPair,
    pub error: String,
}

/// Metadata about the analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Dataset path as given on the command line.
    pub dataset: String,
    /// Dataset base name (file stem).
    pub dataset_name: String,
    pub generated_at: DateTime<Utc>,
    pub model_used: String,
    pub rows_analyzed: usize,
    pub rows_dropped: usize,
    pub numeric_columns: Vec<String>,
}

/// The complete analysis report.
#[derive(Debug, Clone)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub selection: RankedSelection,
    /// Charts in selection order: max pair first.
    pub charts: Vec<ChartArtifact>,
    pub chart_failures: Vec<ChartFailure>,
    pub judgment: InsightSection,
    pub narrative: InsightSection,
}
