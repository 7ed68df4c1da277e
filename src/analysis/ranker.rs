//! Column-pair ranking by Pearson correlation.

use super::summary::summarize_columns;
use super::AnalysisError;
use crate::dataset::Dataset;
use crate::models::{ColumnPair, RankedSelection};
use tracing::{debug, info};

/// Pearson correlation of two equally long series.
///
/// Returns `None` when the coefficient is undefined: fewer than two
/// observations, or zero variance in either series.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }

    let (x, y) = (&x[..n], &y[..n]);
    if is_constant(x) || is_constant(y) {
        return None;
    }

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denominator = sxx.sqrt() * syy.sqrt();
    if denominator == 0.0 {
        return None;
    }

    let r = sxy / denominator;
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Exact comparison: a mean-based variance of a constant series can come
/// out as a tiny positive number when the value is not representable.
fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Score every unordered pair of numeric columns in combination order.
///
/// Pairs whose correlation is undefined are left out.
pub fn scored_pairs(dataset: &Dataset) -> Vec<ColumnPair> {
    let numeric: Vec<(&str, &[f64])> = dataset.numeric_columns().collect();
    let mut pairs = Vec::new();

    for (i, (first, x)) in numeric.iter().enumerate() {
        for (second, y) in &numeric[i + 1..] {
            match pearson(x, y) {
                Some(r) => pairs.push(ColumnPair::new(*first, *second, r)),
                None => debug!("Skipping ({}, {}): correlation undefined", first, second),
            }
        }
    }

    pairs
}

/// Pick the max and second-max pairs and summarise their columns.
///
/// The max pair is the first enumerated pair with the greatest r. The
/// second pair is the first enumerated pair with the greatest r strictly
/// below the max; pairs tying the max are never second.
pub fn rank_pairs(dataset: &Dataset) -> Result<RankedSelection, AnalysisError> {
    let found = dataset.numeric_columns().count();
    if found < 2 {
        return Err(AnalysisError::InsufficientColumns { found });
    }

    let pairs = scored_pairs(dataset);
    debug!("Scored {} column pairs", pairs.len());

    let max_corr_pair = first_greatest(pairs.iter()).ok_or(AnalysisError::NoComparablePairs)?;
    let second_max_corr_pair = first_greatest(
        pairs
            .iter()
            .filter(|p| p.correlation < max_corr_pair.correlation),
    );

    info!("Most correlated pair: {}", max_corr_pair);
    match second_max_corr_pair {
        Some(pair) => info!("Second most correlated pair: {}", pair),
        None => info!("No second pair below the maximum correlation"),
    }

    let mut selection = RankedSelection {
        max_corr_pair: max_corr_pair.clone(),
        second_max_corr_pair: second_max_corr_pair.cloned(),
        summaries: Default::default(),
    };
    selection.summaries = summarize_columns(dataset, &selection.columns())?;

    Ok(selection)
}

/// First pair whose correlation is strictly greater than all earlier ones.
fn first_greatest<'a>(pairs: impl Iterator<Item = &'a ColumnPair>) -> Option<&'a ColumnPair> {
    pairs.fold(None, |best: Option<&'a ColumnPair>, pair| match best {
        Some(current) if pair.correlation <= current.correlation => Some(current),
        _ => Some(pair),
    })
}
