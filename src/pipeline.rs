//! End-to-end analysis workflow.
//!
//! Stages run strictly in sequence: load, rank, correlation judgment,
//! narrative, charts, report. The cancellation token is checked at every
//! stage boundary and raced against each service request.

use crate::analysis::{rank_pairs, AnalysisError};
use crate::chart::{render_charts, ChartRenderer, ScatterPlotRenderer};
use crate::config::{Config, FailurePolicy};
use crate::dataset::{load_dataset, Dataset, DatasetError};
use crate::insight::{InsightClient, InsightError, InsightRequest, RetryCoordinator, RetryExhausted};
use crate::layout::OutputLayout;
use crate::models::{InsightSection, RankedSelection, Report, ReportMetadata};
use crate::report::{generate_markdown_report, write_report, ReportWriteError};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Only raised when the failure policy is `abort`.
    #[error(transparent)]
    Insight(#[from] RetryExhausted),

    #[error(transparent)]
    Report(#[from] ReportWriteError),

    #[error("Run cancelled before {stage}")]
    Cancelled { stage: &'static str },
}

/// Result of a completed run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub report_path: PathBuf,
    pub report: Report,
}

impl PipelineOutcome {
    /// True when a service request or a chart failed but the run continued.
    pub fn is_degraded(&self) -> bool {
        matches!(self.report.judgment, InsightSection::Failed { .. })
            || matches!(self.report.narrative, InsightSection::Failed { .. })
            || !self.report.chart_failures.is_empty()
    }
}

/// Load and rank a dataset without any external call or file write.
pub fn rank_dataset(path: &Path) -> Result<(Dataset, RankedSelection), PipelineError> {
    let dataset = load_dataset(path)?;
    let selection = rank_pairs(&dataset)?;
    Ok((dataset, selection))
}

/// The analysis pipeline for one dataset.
pub struct Pipeline {
    config: Config,
    client: InsightClient,
    renderer: Box<dyn ChartRenderer>,
    cancel: CancellationToken,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(config: Config, cancel: CancellationToken) -> Result<Self, InsightError> {
        let client = InsightClient::new(config.service.clone())?;
        let renderer = Box::new(ScatterPlotRenderer::from(&config.charts));

        Ok(Self {
            config,
            client,
            renderer,
            cancel,
            show_progress: false,
        })
    }

    /// Replace the chart renderer.
    #[cfg(test)]
    pub fn with_renderer(mut self, renderer: Box<dyn ChartRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Show a spinner while waiting on the reasoning service.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run every stage for the dataset at `dataset_path`.
    pub async fn run(&self, dataset_path: &Path) -> Result<PipelineOutcome, PipelineError> {
        self.checkpoint("loading the dataset")?;
        let dataset = load_dataset(dataset_path)?;

        self.checkpoint("ranking column pairs")?;
        let selection = rank_pairs(&dataset)?;

        let layout =
            OutputLayout::for_dataset(dataset_path, self.config.general.output_dir.as_deref());
        let dataset_label = dataset_path.display().to_string();
        debug!(
            "Outputs for {}: charts in {}, report at {}",
            layout.base_name(),
            layout.root().display(),
            layout.report_path().display()
        );

        let request = InsightRequest::correlation_judgment(
            &dataset_label,
            &dataset.column_names(),
            &selection,
        );
        let judgment = self.request_insight(&request).await?;

        let narrative = if self.config.service.request_narrative {
            let chart_files: Vec<String> =
                selection.pairs().map(|p| layout.chart_file_name(p)).collect();
            let request = InsightRequest::report_generation(
                &dataset_label,
                &selection,
                &chart_files,
                judgment.response(),
            );
            self.request_insight(&request).await?
        } else {
            InsightSection::Skipped
        };

        self.checkpoint("rendering charts")?;
        let charts = render_charts(&dataset, &selection, &layout, self.renderer.as_ref())?;

        self.checkpoint("writing the report")?;
        let report = Report {
            metadata: ReportMetadata {
                dataset: dataset_label,
                dataset_name: dataset.name.clone(),
                generated_at: Utc::now(),
                model_used: self.client.model().to_string(),
                rows_analyzed: dataset.row_count,
                rows_dropped: dataset.dropped_rows,
                numeric_columns: dataset.numeric_column_names(),
            },
            selection,
            charts: charts.artifacts,
            chart_failures: charts.failures,
            judgment,
            narrative,
        };

        let markdown = generate_markdown_report(&report, &layout, &self.config.report);
        let report_path = write_report(&markdown, &layout)?;
        info!("Report written to {}", report_path.display());

        Ok(PipelineOutcome {
            report_path,
            report,
        })
    }

    /// Send one request through the retry coordinator and apply the failure policy.
    async fn request_insight(
        &self,
        request: &InsightRequest,
    ) -> Result<InsightSection, PipelineError> {
        let operation = request.kind.operation();
        self.checkpoint(operation)?;

        let mut coordinator = RetryCoordinator::new(self.config.service.retries);
        let spinner = self.spinner(format!(
            "Waiting for {} (up to {} attempt(s))...",
            operation,
            coordinator.max_attempts()
        ));

        let result = tokio::select! {
            result = coordinator.run(operation, || self.client.request(request)) => result,
            _ = self.cancel.cancelled() => {
                if let Some(pb) = &spinner {
                    pb.finish_and_clear();
                }
                return Err(PipelineError::Cancelled { stage: operation });
            }
        };

        if let Some(pb) = &spinner {
            pb.finish_and_clear();
        }

        match result {
            Ok(response) => {
                if !coordinator.failures().is_empty() {
                    debug!(
                        "{} recovered from {} failed attempt(s)",
                        operation,
                        coordinator.failures().len()
                    );
                }
                Ok(InsightSection::Answered(response))
            }
            Err(exhausted) => match self.config.service.on_failure {
                FailurePolicy::Abort => Err(exhausted.into()),
                FailurePolicy::Degrade => {
                    warn!("Continuing without the {}: {}", operation, exhausted);
                    Ok(InsightSection::Failed {
                        operation: exhausted.operation,
                        attempts: exhausted.attempts,
                        detail: exhausted.last_error,
                    })
                }
            },
        }
    }

    fn checkpoint(&self, stage: &'static str) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            warn!("Cancellation requested; stopping before {}", stage);
            return Err(PipelineError::Cancelled { stage });
        }
        Ok(())
    }

    fn spinner(&self, message: String) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    }
}
