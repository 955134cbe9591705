use super::cleaning::resolve_targets;
use super::frame::TabularFrame;
use super::statistics::{mean, quantile_sorted, sample_std, sorted};
use crate::error::{AnalyzerError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

pub const IQR_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    Iqr,
    Zscore,
}

impl OutlierMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iqr => "iqr",
            Self::Zscore => "zscore",
        }
    }
}

impl FromStr for OutlierMethod {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "iqr" => Ok(Self::Iqr),
            "zscore" => Ok(Self::Zscore),
            other => Err(AnalyzerError::InvalidParameter(format!(
                "Invalid method: '{other}'"
            ))),
        }
    }
}

/// Accepted value range for one column.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutlierBounds {
    pub column: String,
    pub lower: f64,
    pub upper: f64,
    pub outliers: usize,
}

#[derive(Clone, Debug)]
pub struct OutlierOutcome {
    /// Filtered frame; `None` for dry runs.
    pub frame: Option<TabularFrame>,
    pub bounds: Vec<OutlierBounds>,
    pub rows_before: usize,
    pub rows_after: usize,
}

impl OutlierOutcome {
    pub fn outliers_removed(&self) -> usize {
        self.rows_before - self.rows_after
    }
}

/// Bounds for one column, or `None` when no value can be an outlier
/// (no values, or no spread for the z-score rule).
pub fn column_bounds(values: &[f64], method: OutlierMethod, threshold: f64) -> Option<(f64, f64)> {
    match method {
        OutlierMethod::Iqr => {
            let sorted = sorted(values);
            if sorted.is_empty() {
                return None;
            }
            let q1 = quantile_sorted(&sorted, 0.25);
            let q3 = quantile_sorted(&sorted, 0.75);
            let iqr = q3 - q1;
            Some((q1 - IQR_MULTIPLIER * iqr, q3 + IQR_MULTIPLIER * iqr))
        }
        OutlierMethod::Zscore => {
            let m = mean(values)?;
            let s = sample_std(values).filter(|s| *s > 0.0)?;
            Some((m - threshold * s, m + threshold * s))
        }
    }
}

/// Drops every row whose value in ANY target column lies strictly outside that
/// column's bounds. Bounds are computed once, on the input frame. Missing
/// values never cause removal.
pub fn remove_outliers(
    frame: &TabularFrame,
    method: OutlierMethod,
    columns: Option<&[String]>,
    threshold: Option<f64>,
    dry_run: bool,
) -> Result<OutlierOutcome> {
    let threshold = threshold.unwrap_or(DEFAULT_Z_THRESHOLD);
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(AnalyzerError::InvalidParameter(format!(
            "Threshold must be a positive number, got {threshold}"
        )));
    }

    let targets = resolve_targets(frame, columns, true, false)?;
    let mut flagged = vec![false; frame.height()];
    let mut bounds = Vec::new();

    for name in &targets {
        let column = frame.column(name)?;
        let Some(values) = column.as_numeric() else {
            // all-missing column
            continue;
        };
        let Some((lower, upper)) = column_bounds(&column.present_values(), method, threshold)
        else {
            debug!("Column '{name}' has no spread; no outliers possible");
            continue;
        };
        debug!("Outlier bounds for '{name}': [{lower}, {upper}]");

        let mut outliers = 0;
        for (row, value) in values.iter().enumerate() {
            if let Some(v) = value
                && (*v < lower || *v > upper)
            {
                outliers += 1;
                flagged[row] = true;
            }
        }
        bounds.push(OutlierBounds {
            column: name.clone(),
            lower,
            upper,
            outliers,
        });
    }

    let keep: Vec<usize> = (0..frame.height()).filter(|&row| !flagged[row]).collect();
    let rows_after = keep.len();
    let frame = if dry_run {
        None
    } else {
        Some(frame.take_rows(&keep)?)
    };

    Ok(OutlierOutcome {
        frame,
        bounds,
        rows_before: flagged.len(),
        rows_after,
    })
}
