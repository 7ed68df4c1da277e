//! Descriptive statistics for numeric columns.

use super::AnalysisError;
use crate::dataset::Dataset;
use crate::models::{ColumnSummary, ColumnSummaryBundle};

/// Describe the named columns of a dataset.
///
/// Statistics are computed over the full column after missing-value rows
/// were dropped at load time.
pub fn summarize_columns<S: AsRef<str>>(
    dataset: &Dataset,
    columns: &[S],
) -> Result<ColumnSummaryBundle, AnalysisError> {
    let mut bundle = ColumnSummaryBundle::default();

    for name in columns {
        let name = name.as_ref();
        let column = dataset
            .column(name)
            .ok_or_else(|| AnalysisError::ColumnNotFound(name.to_string()))?;
        let values = column
            .as_numeric()
            .ok_or_else(|| AnalysisError::NotNumeric(name.to_string()))?;

        bundle.insert(name, describe(values));
    }

    Ok(bundle)
}

/// Count, mean, sample std, min, quartiles and max of a series.
pub fn describe(values: &[f64]) -> ColumnSummary {
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;

    let std = (count > 1).then(|| {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    });

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    ColumnSummary {
        count,
        mean,
        std,
        min: quantile(&sorted, 0.0),
        p25: quantile(&sorted, 0.25),
        p50: quantile(&sorted, 0.5),
        p75: quantile(&sorted, 0.75),
        max: quantile(&sorted, 1.0),
    }
}

/// Linear interpolation between the closest ranks of a sorted series.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
