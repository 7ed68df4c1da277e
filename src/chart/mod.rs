//! Chart rendering for the selected column pairs.
//!
//! The driver asks a [`ChartRenderer`] for one scatter-plus-regression
//! image per selected pair. A failed chart is logged and skipped; it does
//! not abort the run.

pub mod scatter;

pub use scatter::ScatterPlotRenderer;

use crate::analysis::AnalysisError;
use crate::dataset::Dataset;
use crate::layout::OutputLayout;
use crate::models::{ChartArtifact, ChartFailure, RankedSelection};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// Rendering failure for a single chart.
#[derive(Debug, Error)]
#[error("Failed to render chart {path}: {detail}")]
pub struct ChartRenderError {
    pub path: PathBuf,
    pub detail: String,
}

/// The data for one chart.
#[derive(Debug, Clone, Copy)]
pub struct ChartSpec<'a> {
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub x: &'a [f64],
    pub y: &'a [f64],
}

/// Produces an image file for a chart.
pub trait ChartRenderer {
    fn render(&self, spec: &ChartSpec<'_>, path: &Path) -> Result<(), ChartRenderError>;
}

/// Charts produced for a selection.
#[derive(Debug, Default)]
pub struct ChartRun {
    /// Rendered charts in selection order.
    pub artifacts: Vec<ChartArtifact>,
    pub failures: Vec<ChartFailure>,
}

/// Render one chart per selected pair: the max pair first, then the second pair if set.
pub fn render_charts(
    dataset: &Dataset,
    selection: &RankedSelection,
    layout: &OutputLayout,
    renderer: &dyn ChartRenderer,
) -> Result<ChartRun, AnalysisError> {
    let mut run = ChartRun::default();

    for pair in selection.pairs() {
        let x = numeric_values(dataset, &pair.first)?;
        let y = numeric_values(dataset, &pair.second)?;
        let path = layout.chart_path(pair);

        let spec = ChartSpec {
            x_label: &pair.first,
            y_label: &pair.second,
            x,
            y,
        };

        match renderer.render(&spec, &path) {
            Ok(()) => {
                info!("Saved chart {}", path.display());
                run.artifacts.push(ChartArtifact {
                    pair: pair.clone(),
                    path,
                });
            }
            Err(e) => {
                error!("{}", e);
                run.failures.push(ChartFailure {
                    pair: pair.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(run)
}

fn numeric_values<'a>(dataset: &'a Dataset, column: &str) -> Result<&'a [f64], AnalysisError> {
    let found = dataset
        .column(column)
        .ok_or_else(|| AnalysisError::ColumnNotFound(column.to_string()))?;
    found
        .as_numeric()
        .ok_or_else(|| AnalysisError::NotNumeric(column.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::parse_dataset;
    use crate::models::{ColumnPair, ColumnSummaryBundle};
    use std::cell::RefCell;

    /// Records calls and fails for charts whose x column is `fail_on`.
    struct RecordingRenderer {
        calls: RefCell<Vec<PathBuf>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingRenderer {
        fn new(fail_on: Option<&'static str>) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail_on,
            }
        }
    }

    impl ChartRenderer for RecordingRenderer {
        fn render(&self, spec: &ChartSpec<'_>, path: &Path) -> Result<(), ChartRenderError> {
            self.calls.borrow_mut().push(path.to_path_buf());
            if self.fail_on == Some(spec.x_label) {
                return Err(ChartRenderError {
                    path: path.to_path_buf(),
                    detail: "disk full".to_string(),
                });
            }
            Ok(())
        }
    }

    fn fixture() -> (Dataset, RankedSelection) {
        let dataset = parse_dataset("sales", "price,quantity,revenue\n1,2,2\n2,3,6\n3,1,3\n").unwrap();
        let selection = RankedSelection {
            max_corr_pair: ColumnPair::new("price", "revenue", 0.6),
            second_max_corr_pair: Some(ColumnPair::new("quantity", "revenue", 0.5)),
            summaries: ColumnSummaryBundle::default(),
        };
        (dataset, selection)
    }

    #[test]
    fn test_one_chart_per_pair_in_selection_order() {
        let (dataset, selection) = fixture();
        let layout = OutputLayout::for_dataset(Path::new("out/sales.csv"), None);
        let renderer = RecordingRenderer::new(None);

        let run = render_charts(&dataset, &selection, &layout, &renderer).unwrap();

        assert_eq!(run.artifacts.len(), 2);
        assert!(run.failures.is_empty());
        assert_eq!(
            run.artifacts[0].path,
            PathBuf::from("out/sales_price_revenue.png")
        );
        assert_eq!(
            run.artifacts[1].path,
            PathBuf::from("out/sales_quantity_revenue.png")
        );
    }

    #[test]
    fn test_single_pair_produces_single_chart() {
        let (dataset, mut selection) = fixture();
        selection.second_max_corr_pair = None;
        let layout = OutputLayout::for_dataset(Path::new("sales.csv"), None);
        let renderer = RecordingRenderer::new(None);

        let run = render_charts(&dataset, &selection, &layout, &renderer).unwrap();

        assert_eq!(run.artifacts.len(), 1);
        assert_eq!(renderer.calls.borrow().len(), 1);
    }

    #[test]
    fn test_failed_chart_is_isolated() {
        let (dataset, selection) = fixture();
        let layout = OutputLayout::for_dataset(Path::new("sales.csv"), None);
        let renderer = RecordingRenderer::new(Some("price"));

        let run = render_charts(&dataset, &selection, &layout, &renderer).unwrap();

        assert_eq!(renderer.calls.borrow().len(), 2);
        assert_eq!(run.artifacts.len(), 1);
        assert_eq!(run.artifacts[0].pair.first, "quantity");
        assert_eq!(run.failures.len(), 1);
        assert!(run.failures[0].error.contains("disk full"));
    }

    #[test]
    fn test_unknown_column_is_fatal() {
        let (dataset, mut selection) = fixture();
        selection.max_corr_pair = ColumnPair::new("price", "ghost", 0.9);
        let layout = OutputLayout::for_dataset(Path::new("sales.csv"), None);
        let renderer = RecordingRenderer::new(None);

        let err = render_charts(&dataset, &selection, &layout, &renderer).unwrap_err();
        assert_eq!(err, AnalysisError::ColumnNotFound("ghost".to_string()));
    }
}
