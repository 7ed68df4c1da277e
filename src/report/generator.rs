//! Markdown report generation.
//!
//! This module renders the analysis report as a README document and
//! writes it into the dataset's report directory.

use crate::config::ReportConfig;
use crate::layout::OutputLayout;
use crate::models::{
    ChartArtifact, ChartFailure, ColumnSummaryBundle, InsightResponse, InsightSection, Report,
    ReportMetadata, RankedSelection,
};
use std::path::PathBuf;
use thiserror::Error;

/// Failure writing the report document. Always fatal.
#[derive(Debug, Error)]
#[error("Failed to write report to {path}: {source}")]
pub struct ReportWriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Generate the complete Markdown report.
pub fn generate_markdown_report(
    report: &Report,
    layout: &OutputLayout,
    options: &ReportConfig,
) -> String {
    let mut output = String::new();

    // Title
    output.push_str(&format!(
        "# Data Analysis Report for {}\n\n",
        report.metadata.dataset
    ));

    output.push_str(&generate_metadata_section(&report.metadata));

    output.push_str(&generate_insights_section(
        &report.selection,
        &report.charts,
        &report.chart_failures,
        layout,
    ));

    output.push_str(&generate_judgment_section(&report.judgment));

    output.push_str(&generate_narrative_section(&report.narrative));

    if options.include_statistics {
        output.push_str(&generate_statistics_section(&report.selection.summaries));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Dataset:** `{}`\n", metadata.dataset));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model_used));
    section.push_str(&format!("- **Rows Analyzed:** {}\n", metadata.rows_analyzed));
    if metadata.rows_dropped > 0 {
        section.push_str(&format!(
            "- **Rows Dropped (missing values):** {}\n",
            metadata.rows_dropped
        ));
    }
    section.push_str(&format!(
        "- **Numeric Columns:** {}\n",
        metadata.numeric_columns.join(", ")
    ));
    section.push('\n');

    section
}

/// Generate the insights section: chart embeds and the selected pairs.
fn generate_insights_section(
    selection: &RankedSelection,
    charts: &[ChartArtifact],
    failures: &[ChartFailure],
    layout: &OutputLayout,
) -> String {
    let mut section = String::new();

    section.push_str("## Insights\n\n");
    section.push_str(
        "The top two correlated columns are analyzed and visualized below:\n\n",
    );

    for chart in charts {
        section.push_str(&format!(
            "![{} vs {}]({})\n",
            chart.pair.first,
            chart.pair.second,
            layout.chart_link(&chart.path)
        ));
    }
    if !charts.is_empty() {
        section.push('\n');
    }

    for failure in failures {
        section.push_str(&format!(
            "> Chart for `{}` vs `{}` could not be rendered: {}\n\n",
            failure.pair.first, failure.pair.second, failure.error
        ));
    }

    section.push_str("| Rank | Columns | Pearson r |\n");
    section.push_str("|:---:|:---|:---:|\n");
    for (i, pair) in selection.pairs().enumerate() {
        section.push_str(&format!(
            "| {} | `{}` / `{}` | {:.4} |\n",
            i + 1,
            pair.first,
            pair.second,
            pair.correlation
        ));
    }
    section.push('\n');

    if selection.second_max_corr_pair.is_none() {
        section.push_str(
            "No other pair has a correlation below the maximum, so only one chart is shown.\n\n",
        );
    }

    section
}

/// Generate the verbatim correlation-judgment block.
fn generate_judgment_section(judgment: &InsightSection) -> String {
    let mut section = String::new();

    section.push_str("### Summary of Analysis\n\n");
    match judgment {
        InsightSection::Answered(response) => {
            section.push_str("```json\n");
            section.push_str(&response.to_pretty_json());
            section.push_str("\n```\n\n");
        }
        InsightSection::Failed {
            operation,
            attempts,
            detail,
        } => {
            section.push_str(&format!(
                "*The {} request failed after {} attempt(s): {}*\n\n",
                operation, attempts, detail
            ));
        }
        InsightSection::Skipped => {
            section.push_str("*No interpretation was requested.*\n\n");
        }
    }

    section
}

/// Generate the narrative section from a report draft.
fn generate_narrative_section(narrative: &InsightSection) -> String {
    let mut section = String::new();

    match narrative {
        InsightSection::Answered(response @ InsightResponse::Report(draft)) => {
            section.push_str("### Narrative\n\n");
            if !draft.chart_name.is_empty() {
                section.push_str(&format!("**{}**\n\n", draft.chart_name));
            }
            section.push_str(draft.readme_file_summary.trim());
            section.push_str("\n\n");

            section.push_str("<details>\n<summary>Raw response</summary>\n\n```json\n");
            section.push_str(&response.to_pretty_json());
            section.push_str("\n```\n</details>\n\n");
        }
        InsightSection::Answered(other) => {
            section.push_str("### Narrative\n\n```json\n");
            section.push_str(&other.to_pretty_json());
            section.push_str("\n```\n\n");
        }
        InsightSection::Failed {
            operation,
            attempts,
            detail,
        } => {
            section.push_str("### Narrative\n\n");
            section.push_str(&format!(
                "*The {} request failed after {} attempt(s): {}*\n\n",
                operation, attempts, detail
            ));
        }
        InsightSection::Skipped => {}
    }

    section
}

/// Generate the column statistics table.
fn generate_statistics_section(summaries: &ColumnSummaryBundle) -> String {
    if summaries.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("### Column Statistics\n\n");
    section.push_str("| Column | count | mean | std | min | 25% | 50% | 75% | max |\n");
    section.push_str("|:---|---:|---:|---:|---:|---:|---:|---:|---:|\n");

    for (name, s) in summaries.iter() {
        let std = s
            .std
            .map(|v| format!("{:.4}", v))
            .unwrap_or_else(|| "-".to_string());
        section.push_str(&format!(
            "| `{}` | {} | {:.4} | {} | {:.4} | {:.4} | {:.4} | {:.4} | {:.4} |\n",
            name, s.count, s.mean, std, s.min, s.p25, s.p50, s.p75, s.max
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by corrsight*\n");

    footer
}

/// Write the report document into the layout's report directory.
///
/// The directory is created if missing.
pub fn write_report(content: &str, layout: &OutputLayout) -> Result<PathBuf, ReportWriteError> {
    let dir = layout.report_dir();
    std::fs::create_dir_all(&dir).map_err(|source| ReportWriteError {
        path: dir.clone(),
        source,
    })?;

    let path = layout.report_path();
    std::fs::write(&path, content).map_err(|source| ReportWriteError {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ColumnPair, ColumnSummary, CorrelationJudgment, ReportDraft,
    };
    use chrono::Utc;
    use std::path::Path;
    use tempfile::TempDir;

    fn layout() -> OutputLayout {
        OutputLayout::for_dataset(Path::new("data/sales.csv"), None)
    }

    fn create_test_report() -> Report {
        let mut summaries = ColumnSummaryBundle::default();
        summaries.insert(
            "price",
            ColumnSummary {
                count: 3,
                mean: 2.0,
                std: Some(1.0),
                min: 1.0,
                p25: 1.5,
                p50: 2.0,
                p75: 2.5,
                max: 3.0,
            },
        );

        let max_pair = ColumnPair::new("price", "revenue", 0.98);
        let second_pair = ColumnPair::new("quantity", "revenue", 0.93);

        Report {
            metadata: ReportMetadata {
                dataset: "data/sales.csv".to_string(),
                dataset_name: "sales".to_string(),
                generated_at: Utc::now(),
                model_used: "test-model".to_string(),
                rows_analyzed: 3,
                rows_dropped: 1,
                numeric_columns: vec!["price".into(), "quantity".into(), "revenue".into()],
            },
            selection: RankedSelection {
                max_corr_pair: max_pair.clone(),
                second_max_corr_pair: Some(second_pair.clone()),
                summaries,
            },
            charts: vec![
                ChartArtifact {
                    pair: max_pair,
                    path: PathBuf::from("data/sales_price_revenue.png"),
                },
                ChartArtifact {
                    pair: second_pair,
                    path: PathBuf::from("data/sales_quantity_revenue.png"),
                },
            ],
            chart_failures: vec![],
            judgment: InsightSection::Answered(InsightResponse::Correlation(
                CorrelationJudgment {
                    is_columns_common: true,
                    reason: "Revenue is price times quantity".to_string(),
                },
            )),
            narrative: InsightSection::Skipped,
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &layout(), &ReportConfig::default());

        assert!(markdown.starts_with("# Data Analysis Report for data/sales.csv"));
        assert!(markdown.contains("## Insights"));
        assert!(markdown.contains("\"is_columns_common\": true"));
        assert!(markdown.contains("Revenue is price times quantity"));
        assert!(markdown.contains("### Column Statistics"));
        assert!(!markdown.contains("### Narrative"));
    }

    #[test]
    fn test_charts_are_embedded_in_selection_order() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &layout(), &ReportConfig::default());

        let first = markdown.find("(../sales_price_revenue.png)").unwrap();
        let second = markdown.find("(../sales_quantity_revenue.png)").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_generate_metadata_section() {
        let report = create_test_report();
        let section = generate_metadata_section(&report.metadata);

        assert!(section.contains("test-model"));
        assert!(section.contains("Rows Dropped"));
        assert!(section.contains("price, quantity, revenue"));
    }

    #[test]
    fn test_failed_judgment_is_noted() {
        let section = generate_judgment_section(&InsightSection::Failed {
            operation: "correlation judgment".to_string(),
            attempts: 3,
            detail: "API error 503".to_string(),
        });

        assert!(section.contains("failed after 3 attempt(s)"));
        assert!(!section.contains("```json"));
    }

    #[test]
    fn test_narrative_section_renders_draft() {
        let section = generate_narrative_section(&InsightSection::Answered(
            InsightResponse::Report(ReportDraft {
                python_code: "import seaborn".to_string(),
                chart_name: "Price drives revenue".to_string(),
                readme_file_summary: "Revenue rises with price.\n".to_string(),
            }),
        ));

        assert!(section.contains("**Price drives revenue**"));
        assert!(section.contains("Revenue rises with price."));
        assert!(section.contains("import seaborn"));
    }

    #[test]
    fn test_chart_failure_is_reported() {
        let mut report = create_test_report();
        let failed = report.charts.pop().unwrap();
        report.chart_failures.push(ChartFailure {
            pair: failed.pair,
            error: "disk full".to_string(),
        });

        let markdown = generate_markdown_report(&report, &layout(), &ReportConfig::default());
        assert!(markdown.contains("could not be rendered: disk full"));
        assert!(!markdown.contains("(../sales_quantity_revenue.png)"));
    }

    #[test]
    fn test_statistics_can_be_disabled() {
        let report = create_test_report();
        let options = ReportConfig {
            include_statistics: false,
        };
        let markdown = generate_markdown_report(&report, &layout(), &options);
        assert!(!markdown.contains("### Column Statistics"));
    }

    #[test]
    fn test_write_report_creates_directory() {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::for_dataset(&dir.path().join("sales.csv"), None);

        let path = write_report("# hello\n", &layout).unwrap();

        assert_eq!(path, dir.path().join("sales").join("README.md"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# hello\n");
    }

    #[test]
    fn test_write_report_failure_is_error() {
        let dir = TempDir::new().unwrap();
        // A file where the report directory should be.
        std::fs::write(dir.path().join("sales"), "occupied").unwrap();
        let layout = OutputLayout::for_dataset(&dir.path().join("sales.csv"), None);

        let err = write_report("# hello\n", &layout).unwrap_err();
        assert_eq!(err.path, dir.path().join("sales"));
    }
}
