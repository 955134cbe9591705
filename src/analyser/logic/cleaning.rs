use super::frame::{Column, ColumnValues, TabularFrame};
use super::statistics::{mean, median};
use crate::error::{AnalyzerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, warn};

/// Missing-value policy for `clean-missing`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeMethod {
    DropMissing,
    FillMean,
    FillMedian,
    FillMode,
    KnnImpute,
}

impl ImputeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DropMissing => "drop_missing",
            Self::FillMean => "fill_mean",
            Self::FillMedian => "fill_median",
            Self::FillMode => "fill_mode",
            Self::KnnImpute => "knn_impute",
        }
    }

    fn numeric_only(&self) -> bool {
        matches!(self, Self::FillMean | Self::FillMedian | Self::KnnImpute)
    }
}

impl FromStr for ImputeMethod {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "drop_missing" => Ok(Self::DropMissing),
            "fill_mean" => Ok(Self::FillMean),
            "fill_median" => Ok(Self::FillMedian),
            "fill_mode" => Ok(Self::FillMode),
            "knn_impute" => Ok(Self::KnnImpute),
            other => Err(AnalyzerError::InvalidParameter(format!(
                "Invalid operation: '{other}'"
            ))),
        }
    }
}

/// Output of a cleaning operator.
#[derive(Clone, Debug)]
pub struct CleaningOutcome {
    pub frame: TabularFrame,
    /// Resolved target columns the operator worked on.
    pub columns: Vec<String>,
    /// Target columns left untouched because they hold no values at all.
    pub skipped_columns: Vec<String>,
}

/// Resolves an operator's target list.
///
/// `None` or an empty list selects every numeric-compatible column (or every
/// column when `numeric_only` is false and `all_by_default` is set). Named
/// columns must exist and, for numeric operators, hold only numbers.
pub fn resolve_targets(
    frame: &TabularFrame,
    columns: Option<&[String]>,
    numeric_only: bool,
    all_by_default: bool,
) -> Result<Vec<String>> {
    let requested = columns.filter(|c| !c.is_empty());
    let Some(requested) = requested else {
        return Ok(frame
            .columns()
            .iter()
            .filter(|c| all_by_default || c.is_numeric_compatible())
            .map(|c| c.name().to_owned())
            .collect());
    };

    let mut targets: Vec<String> = Vec::with_capacity(requested.len());
    for name in requested {
        let column = frame.column(name)?;
        if numeric_only && !column.is_numeric_compatible() {
            return Err(AnalyzerError::InvalidColumn(format!(
                "Column '{name}' is not numeric"
            )));
        }
        if !targets.contains(name) {
            targets.push(name.clone());
        }
    }
    Ok(targets)
}

/// Applies a missing-value policy, returning a new frame.
pub fn impute_missing(
    frame: &TabularFrame,
    method: ImputeMethod,
    columns: Option<&[String]>,
    knn_neighbors: usize,
) -> Result<CleaningOutcome> {
    let all_by_default = method == ImputeMethod::DropMissing;
    let targets = resolve_targets(frame, columns, method.numeric_only(), all_by_default)?;

    if method == ImputeMethod::DropMissing {
        return Ok(CleaningOutcome {
            frame: drop_missing(frame, &targets)?,
            columns: targets,
            skipped_columns: Vec::new(),
        });
    }

    let (fillable, skipped_columns): (Vec<String>, Vec<String>) = targets
        .into_iter()
        .partition(|name| frame.column(name).is_ok_and(|c| c.null_count() < c.len()));
    for name in &skipped_columns {
        warn!("Column '{name}' has no values to impute from; left as missing");
    }

    let replacements = match method {
        ImputeMethod::KnnImpute => {
            if fillable.is_empty() && skipped_columns.is_empty() {
                return Err(AnalyzerError::InvalidColumn(
                    "No numeric columns to impute".to_owned(),
                ));
            }
            knn_impute(frame, &fillable, knn_neighbors)?
        }
        _ => fillable
            .iter()
            .map(|name| fill_column(frame.column(name)?, method))
            .collect::<Result<Vec<_>>>()?,
    };

    Ok(CleaningOutcome {
        frame: frame.with_columns(replacements)?,
        columns: fillable,
        skipped_columns,
    })
}

/// Removes every row with a missing cell in any of `targets`.
pub fn drop_missing(frame: &TabularFrame, targets: &[String]) -> Result<TabularFrame> {
    let columns = targets
        .iter()
        .map(|name| frame.column(name))
        .collect::<Result<Vec<_>>>()?;
    let keep: Vec<usize> = (0..frame.height())
        .filter(|&row| columns.iter().all(|c| !c.is_missing(row)))
        .collect();
    debug!(
        "drop_missing keeps {} of {} rows",
        keep.len(),
        frame.height()
    );
    frame.take_rows(&keep)
}

fn fill_column(column: &Column, method: ImputeMethod) -> Result<Column> {
    match column.values() {
        ColumnValues::Numeric(values) => {
            let present = column.present_values();
            let fill = match method {
                ImputeMethod::FillMean => mean(&present),
                ImputeMethod::FillMedian => median(&present),
                _ => numeric_mode(values),
            };
            let filled = values.iter().map(|v| v.or(fill)).collect();
            Ok(Column::numeric(column.name(), filled))
        }
        ColumnValues::Categorical(values) => {
            if method != ImputeMethod::FillMode {
                return Err(AnalyzerError::InvalidColumn(format!(
                    "Column '{}' is not numeric",
                    column.name()
                )));
            }
            let fill = text_mode(values);
            let filled = values
                .iter()
                .map(|v| v.clone().or_else(|| fill.clone()))
                .collect();
            Ok(Column::categorical(column.name(), filled))
        }
    }
}

/// Most frequent value; ties go to the value seen first.
fn numeric_mode(values: &[Option<f64>]) -> Option<f64> {
    // -0.0 and 0.0 count as the same value
    let key = |v: f64| if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() };
    most_frequent(values.iter().flatten().map(|&v| (key(v), v)))
}

fn text_mode(values: &[Option<String>]) -> Option<String> {
    most_frequent(values.iter().flatten().map(|v| (v.as_str(), v.clone())))
}

fn most_frequent<K, V, I>(items: I) -> Option<V>
where
    K: std::hash::Hash + Eq + Clone,
    I: Iterator<Item = (K, V)>,
{
    let mut counts: HashMap<K, usize> = HashMap::new();
    let mut first_seen: Vec<(K, V)> = Vec::new();
    for (key, value) in items {
        let count = counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            first_seen.push((key, value));
        }
        *count += 1;
    }

    let mut best: Option<(usize, V)> = None;
    for (key, value) in first_seen {
        let count = counts.get(&key).copied().unwrap_or(0);
        if best.as_ref().is_none_or(|(top, _)| count > *top) {
            best = Some((count, value));
        }
    }
    best.map(|(_, value)| value)
}

/// Nearest-neighbour imputation over the numeric `targets`.
///
/// Distances are NaN-aware Euclidean: only coordinates present in both rows
/// count, and the sum is scaled up by `total / present`. A missing cell takes
/// the mean of the column over the `k` nearest rows that have it; when no row
/// qualifies the column mean is used.
fn knn_impute(frame: &TabularFrame, targets: &[String], k: usize) -> Result<Vec<Column>> {
    let matrix = targets
        .iter()
        .map(|name| frame.numeric_column(name))
        .collect::<Result<Vec<_>>>()?;
    let k = k.max(1);
    let rows = frame.height();

    let mut imputed: Vec<Vec<Option<f64>>> = matrix.iter().map(|c| c.to_vec()).collect();
    let column_means: Vec<Option<f64>> = matrix
        .iter()
        .map(|c| mean(&c.iter().flatten().copied().collect::<Vec<_>>()))
        .collect();

    for row in 0..rows {
        let missing: Vec<usize> = (0..matrix.len())
            .filter(|&c| matrix[c][row].is_none())
            .collect();
        if missing.is_empty() {
            continue;
        }

        let mut neighbours: Vec<(f64, usize)> = (0..rows)
            .filter(|&other| other != row)
            .filter_map(|other| nan_euclidean(&matrix, row, other).map(|d| (d, other)))
            .collect();
        neighbours.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        for c in missing {
            let donors: Vec<f64> = neighbours
                .iter()
                .filter_map(|&(_, other)| matrix[c][other])
                .take(k)
                .collect();
            imputed[c][row] = mean(&donors).or(column_means[c]);
        }
    }

    Ok(targets
        .iter()
        .zip(imputed)
        .map(|(name, values)| Column::numeric(name.as_str(), values))
        .collect())
}

fn nan_euclidean(matrix: &[&[Option<f64>]], a: usize, b: usize) -> Option<f64> {
    let mut present = 0usize;
    let mut total = 0.0;
    for column in matrix {
        if let (Some(x), Some(y)) = (column[a], column[b]) {
            present += 1;
            total += (x - y).powi(2);
        }
    }
    if present == 0 {
        return None;
    }
    Some((matrix.len() as f64 / present as f64 * total).sqrt())
}
