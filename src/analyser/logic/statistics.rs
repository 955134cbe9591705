//! Descriptive statistics over a [`TabularFrame`].
//!
//! Everything here is a pure function of its input. Percentiles use linear
//! interpolation between closest ranks (`h = (n - 1) * q`), the same rule as
//! the default of most dataframe libraries. Undefined results (a standard
//! deviation of one value, a correlation with a constant column) are `None`
//! and serialize as `null`.

use super::frame::TabularFrame;
use crate::error::{AnalyzerError, Result};
use serde::Serialize;
use std::collections::BTreeMap;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();
    if sum.is_finite() {
        return Some(sum / n);
    }
    // The plain sum overflowed; average pre-divided terms instead.
    Some(values.iter().map(|v| v / n).sum())
}

/// Sample variance (Bessel-corrected); needs at least two values.
pub fn variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

pub fn sample_std(values: &[f64]) -> Option<f64> {
    let var = variance(values)?;
    if var.is_finite() {
        return Some(var.sqrt());
    }
    // Squared deviations overflowed; rescale by the largest one.
    let m = mean(values)?;
    let scale = values.iter().map(|v| (v - m).abs()).fold(0.0, f64::max);
    let ss: f64 = values.iter().map(|v| ((v - m) / scale).powi(2)).sum();
    Some(scale * (ss / (values.len() - 1) as f64).sqrt())
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Linear-interpolation quantile of an ascending slice. `sorted` must be non-empty.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(quantile_sorted(&sorted(values), 0.5))
}

/// Adjusted Fisher-Pearson skewness; needs three values and non-zero spread.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 3 {
        return None;
    }
    let m = mean(values)?;
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n;
    if m2 == 0.0 {
        return None;
    }
    Some((n * (n - 1.0)).sqrt() / (n - 2.0) * m3 / m2.powf(1.5))
}

/// Bias-corrected excess kurtosis; needs four values and non-zero spread.
pub fn kurtosis(values: &[f64]) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 4 {
        return None;
    }
    let m = mean(values)?;
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    let m4 = values.iter().map(|v| (v - m).powi(4)).sum::<f64>() / n;
    if m2 == 0.0 {
        return None;
    }
    let g2 = m4 / (m2 * m2) - 3.0;
    Some((n - 1.0) / ((n - 2.0) * (n - 3.0)) * ((n + 1.0) * g2 + 6.0))
}

/// Per-column summary row of `describe`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q1: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub q3: Option<f64>,
    pub max: Option<f64>,
    pub variance: Option<f64>,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
}

impl ColumnSummary {
    pub fn from_values(column: &str, values: &[f64]) -> Self {
        let sorted = sorted(values);
        let quantile = |q| (!sorted.is_empty()).then(|| quantile_sorted(&sorted, q));
        Self {
            column: column.to_owned(),
            count: values.len(),
            mean: mean(values),
            std: sample_std(values),
            min: sorted.first().copied(),
            q1: quantile(0.25),
            median: quantile(0.5),
            q3: quantile(0.75),
            max: sorted.last().copied(),
            variance: variance(values),
            skewness: skewness(values),
            kurtosis: kurtosis(values),
        }
    }
}

/// Summary of every numeric column, in frame order.
pub fn describe(frame: &TabularFrame) -> Vec<ColumnSummary> {
    frame
        .columns()
        .iter()
        .filter(|c| c.as_numeric().is_some())
        .map(|c| ColumnSummary::from_values(c.name(), &c.present_values()))
        .collect()
}

/// Minimum, quartiles and maximum of a sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FiveNumber {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl FiveNumber {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let sorted = sorted(values);
        Some(Self {
            min: *sorted.first()?,
            q1: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            q3: quantile_sorted(&sorted, 0.75),
            max: *sorted.last()?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoxPlot {
    pub name: String,
    #[serde(flatten)]
    pub summary: FiveNumber,
}

/// Box-plot summaries for the first `limit` numeric columns.
pub fn box_plots(frame: &TabularFrame, limit: usize) -> Vec<BoxPlot> {
    frame
        .columns()
        .iter()
        .filter(|c| c.as_numeric().is_some())
        .take(limit)
        .filter_map(|c| {
            FiveNumber::from_values(&c.present_values()).map(|summary| BoxPlot {
                name: c.name().to_owned(),
                summary,
            })
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistogramBin {
    /// Display label, `"start-end"` with two decimals.
    pub bin: String,
    pub start: f64,
    pub end: f64,
    pub count: usize,
    /// Count divided by `n * width`; only set for density histograms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram {
    pub column: String,
    pub bin_edges: Vec<f64>,
    pub data: Vec<HistogramBin>,
}

impl Histogram {
    pub fn counts(&self) -> Vec<usize> {
        self.data.iter().map(|b| b.count).collect()
    }
}

/// Equal-width histogram over `[min, max]`.
///
/// The last bin is closed on both sides. A sample with a single distinct
/// value yields one bin holding every value.
pub fn histogram(column: &str, values: &[f64], bins: usize, density: bool) -> Histogram {
    let (Some(min), Some(max)) = (
        values.iter().copied().reduce(f64::min),
        values.iter().copied().reduce(f64::max),
    ) else {
        return Histogram {
            column: column.to_owned(),
            bin_edges: Vec::new(),
            data: Vec::new(),
        };
    };

    let bins = if max > min { bins.max(1) } else { 1 };
    let width = (max - min) / bins as f64;
    let mut edges: Vec<f64> = (0..bins).map(|i| min + i as f64 * width).collect();
    edges.push(max);

    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = if width > 0.0 {
            (((v - min) / width) as usize).min(bins - 1)
        } else {
            0
        };
        counts[idx] += 1;
    }

    let n = values.len() as f64;
    let data = counts
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            let (start, end) = (edges[i], edges[i + 1]);
            let bin_width = end - start;
            HistogramBin {
                bin: format!("{start:.2}-{end:.2}"),
                start,
                end,
                count,
                density: density.then(|| {
                    if bin_width > 0.0 {
                        count as f64 / (n * bin_width)
                    } else {
                        count as f64 / n
                    }
                }),
            }
        })
        .collect();

    Histogram {
        column: column.to_owned(),
        bin_edges: edges,
        data,
    }
}

/// Histogram of one numeric column of a frame.
pub fn column_histogram(frame: &TabularFrame, column: &str, bins: usize) -> Result<Histogram> {
    let values: Vec<f64> = frame.numeric_column(column)?.iter().flatten().copied().collect();
    Ok(histogram(column, &values, bins, false))
}

/// Pearson correlation over the rows where both values are present.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
        sxy += (a - mx) * (b - my);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeatmapCell {
    pub x: String,
    pub y: String,
    pub value: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub correlation_matrix: BTreeMap<String, BTreeMap<String, Option<f64>>>,
    pub heatmap_data: Vec<HeatmapCell>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        self.correlation_matrix.get(row)?.get(col).copied().flatten()
    }
}

/// Symmetric Pearson matrix over all numeric columns.
///
/// The diagonal is exactly 1.0 for columns with a defined, non-zero variance
/// and `None` otherwise.
pub fn correlation_matrix(frame: &TabularFrame) -> CorrelationMatrix {
    let numeric: Vec<(&str, &[Option<f64>])> = frame
        .columns()
        .iter()
        .filter_map(|c| c.as_numeric().map(|v| (c.name(), v)))
        .collect();

    let k = numeric.len();
    let mut values = vec![vec![None; k]; k];
    for i in 0..k {
        for j in i..k {
            let r = pearson(numeric[i].1, numeric[j].1);
            let r = if i == j { r.map(|_| 1.0) } else { r };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    let mut correlation_matrix = BTreeMap::new();
    let mut heatmap_data = Vec::with_capacity(k * k);
    for (i, (row, _)) in numeric.iter().enumerate() {
        let mut entries = BTreeMap::new();
        for (j, (col, _)) in numeric.iter().enumerate() {
            entries.insert((*col).to_owned(), values[i][j]);
            heatmap_data.push(HeatmapCell {
                x: (*col).to_owned(),
                y: (*row).to_owned(),
                value: values[i][j],
            });
        }
        correlation_matrix.insert((*row).to_owned(), entries);
    }

    CorrelationMatrix {
        columns: numeric.iter().map(|(name, _)| (*name).to_owned()).collect(),
        correlation_matrix,
        heatmap_data,
    }
}

/// Everything `statistics` returns for a frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub summary: Vec<ColumnSummary>,
    pub box_plot_data: Vec<BoxPlot>,
    pub histogram_data: Histogram,
}

pub fn statistics_report(
    frame: &TabularFrame,
    histogram_bins: usize,
    box_plot_columns: usize,
) -> Result<StatisticsReport> {
    let numeric = frame.numeric_column_names();
    let first = numeric
        .first()
        .ok_or_else(|| AnalyzerError::InvalidColumn("No numeric columns found".to_owned()))?;

    Ok(StatisticsReport {
        summary: describe(frame),
        box_plot_data: box_plots(frame, box_plot_columns),
        histogram_data: column_histogram(frame, first, histogram_bins)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::logic::frame::Column;

    #[test]
    fn test_quantiles_interpolate() {
        let s = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&s, 0.25), 1.75);
        assert_eq!(quantile_sorted(&s, 0.5), 2.5);
        assert_eq!(quantile_sorted(&[9.0], 0.75), 9.0);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn test_variance_and_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&v), Some(5.0));
        assert!((variance(&v).unwrap_or(0.0) - 32.0 / 7.0).abs() < 1e-12);
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn test_mean_and_std_near_f64_max() {
        assert_eq!(mean(&[1e308, 1e308]), Some(1e308));
        assert_eq!(mean(&[1e308, -1e308, 0.0]), Some(0.0));
        let s = sample_std(&[1e308, -1e308]).unwrap_or(f64::NAN);
        assert!((s / 1e308 - 2.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_skew_and_kurtosis_symmetry() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(skewness(&v).unwrap_or(f64::NAN).abs() < 1e-12);
        // excess kurtosis of 1..=5 with bias correction is -1.2
        assert!((kurtosis(&v).unwrap_or(f64::NAN) + 1.2).abs() < 1e-12);
        assert_eq!(skewness(&[1.0, 1.0, 1.0]), None);
    }

    #[test]
    fn test_histogram_edges_and_counts() {
        let h = histogram("v", &[0.0, 1.0, 2.0, 3.0, 4.0], 4, false);
        assert_eq!(h.bin_edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(h.counts(), vec![1, 1, 1, 2]);
        assert_eq!(h.data[0].bin, "0.00-1.00");
    }

    #[test]
    fn test_histogram_single_value() {
        let h = histogram("v", &[5.0, 5.0, 5.0], 10, false);
        assert_eq!(h.counts(), vec![3]);
        assert_eq!(h.bin_edges, vec![5.0, 5.0]);
    }

    #[test]
    fn test_density_histogram_integrates_to_one() {
        let values: Vec<f64> = (0..100).map(|i| f64::from(i) * 0.37).collect();
        let h = histogram("v", &values, 30, true);
        let area: f64 = h
            .data
            .iter()
            .map(|b| b.density.unwrap_or(0.0) * (b.end - b.start))
            .sum();
        assert!((area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_correlation_matrix() -> Result<()> {
        let frame = TabularFrame::new(vec![
            Column::numeric("a", vec![Some(1.0), Some(2.0), Some(3.0), None]),
            Column::numeric("b", vec![Some(2.0), Some(4.0), Some(6.5), Some(1.0)]),
            Column::numeric("c", vec![Some(3.0), Some(3.0), Some(3.0), Some(3.0)]),
            Column::categorical("g", vec![Some("x".into()); 4]),
        ])?;
        let m = correlation_matrix(&frame);
        assert_eq!(m.columns, vec!["a", "b", "c"]);
        assert_eq!(m.get("a", "a"), Some(1.0));
        assert_eq!(m.get("c", "c"), None);
        assert_eq!(m.get("a", "c"), None);
        assert_eq!(m.get("a", "b"), m.get("b", "a"));
        assert!(m.get("a", "b").unwrap_or(0.0) > 0.99);
        assert_eq!(m.heatmap_data.len(), 9);
        Ok(())
    }

    #[test]
    fn test_statistics_report_needs_numeric_column() -> Result<()> {
        let frame = TabularFrame::new(vec![Column::categorical("g", vec![Some("x".into())])])?;
        assert!(matches!(
            statistics_report(&frame, 10, 5),
            Err(AnalyzerError::InvalidColumn(_))
        ));
        Ok(())
    }
}
