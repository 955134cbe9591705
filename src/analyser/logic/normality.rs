//! Normality diagnostics for one numeric sample.
//!
//! Shapiro-Wilk follows Royston's AS R94 algorithm (coefficients from the
//! normal order-statistic approximation, p-value from a normalizing
//! transform of `ln(1 - W)`). Kolmogorov-Smirnov compares against a normal
//! with the sample's own mean and standard deviation. Anderson-Darling
//! reports the statistic with the case-3 critical-value table.

use super::distributions::{
    ks_two_sided_sf, normal_cdf, normal_log_cdf, normal_log_sf, normal_pdf, normal_ppf, normal_sf,
};
use super::inference::validate_alpha;
use super::statistics::{Histogram, histogram, mean, sample_std, sorted};
use crate::error::{AnalyzerError, Result};
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use serde::Serialize;
use std::f64::consts::PI;

pub const MIN_SAMPLE_SIZE: usize = 3;

/// Significance levels (percent) of the Anderson-Darling critical values.
pub const AD_SIGNIFICANCE_LEVELS: [f64; 5] = [15.0, 10.0, 5.0, 2.5, 1.0];
const AD_CRITICAL_BASE: [f64; 5] = [0.576, 0.656, 0.787, 0.918, 1.092];

const SW_C1: [f64; 6] = [0.0, 0.221_157, -0.147_981, -2.071_19, 4.434_685, -2.706_056];
const SW_C2: [f64; 6] = [0.0, 0.042_981, -0.293_762, -1.752_461, 5.682_633, -3.582_633];
const SW_C3: [f64; 4] = [0.544, -0.399_78, 0.025_054, -6.714e-4];
const SW_C4: [f64; 4] = [1.3822, -0.778_57, 0.062_767, -0.002_032_2];
const SW_C5: [f64; 4] = [-1.5861, -0.310_82, -0.083_751, 0.003_891_5];
const SW_C6: [f64; 3] = [-0.4803, -0.082_676, 0.003_030_2];
const SW_G: [f64; 2] = [-2.273, 0.459];

/// Tuning knobs, normally taken from the analysis settings.
#[derive(Clone, Copy, Debug)]
pub struct NormalityOptions {
    pub histogram_bins: usize,
    pub curve_points: usize,
    pub shapiro_max_samples: usize,
    pub seed: u64,
}

impl Default for NormalityOptions {
    fn default() -> Self {
        Self {
            histogram_bins: 30,
            curve_points: 100,
            shapiro_max_samples: 5000,
            seed: 42,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p_value: f64,
    pub result: String,
}

impl TestOutcome {
    fn new(statistic: f64, p_value: f64, alpha: f64) -> Self {
        let result = if p_value >= alpha { "normal" } else { "not_normal" };
        Self {
            statistic,
            p_value,
            result: result.to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AndersonDarling {
    pub statistic: f64,
    pub critical_values: Vec<f64>,
    pub significance_levels: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NormalityTests {
    pub shapiro_wilk: TestOutcome,
    pub kolmogorov_smirnov: TestOutcome,
    pub anderson_darling: AndersonDarling,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct QqPoint {
    pub theoretical: f64,
    pub sample: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CurvePoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NormalityResult {
    pub column: String,
    pub sample_size: usize,
    pub alpha: f64,
    pub tests: NormalityTests,
    pub qq_plot_data: Vec<QqPoint>,
    pub histogram_data: Histogram,
    pub normal_curve_data: Vec<CurvePoint>,
}

fn poly(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Antisymmetric Shapiro-Wilk weights for a sorted sample of size `n >= 3`.
fn shapiro_weights(n: usize) -> Vec<f64> {
    let half = n / 2;
    let mut a = vec![0.0; half];
    if n == 3 {
        a[0] = 0.5f64.sqrt();
    } else {
        let an25 = n as f64 + 0.25;
        let m: Vec<f64> = (1..=half)
            .map(|i| normal_ppf((i as f64 - 0.375) / an25))
            .collect();
        let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
        let ssumm2 = summ2.sqrt();
        let rsn = 1.0 / (n as f64).sqrt();
        let a1 = poly(&SW_C1, rsn) - m[0] / ssumm2;

        let (first_scaled, fac) = if n > 5 {
            let a2 = -m[1] / ssumm2 + poly(&SW_C2, rsn);
            a[1] = a2;
            let fac = ((summ2 - 2.0 * m[0].powi(2) - 2.0 * m[1].powi(2))
                / (1.0 - 2.0 * a1.powi(2) - 2.0 * a2.powi(2)))
            .sqrt();
            (2, fac)
        } else {
            let fac = ((summ2 - 2.0 * m[0].powi(2)) / (1.0 - 2.0 * a1.powi(2))).sqrt();
            (1, fac)
        };
        a[0] = a1;
        for i in first_scaled..half {
            a[i] = -m[i] / fac;
        }
    }

    let mut weights = vec![0.0; n];
    for (i, w) in a.iter().enumerate() {
        weights[i] = -w;
        weights[n - 1 - i] = *w;
    }
    weights
}

/// Shapiro-Wilk `(W, p)` for a sample of at least three values with spread.
pub fn shapiro_wilk(values: &[f64]) -> Result<(f64, f64)> {
    let n = values.len();
    if n < MIN_SAMPLE_SIZE {
        return Err(AnalyzerError::InsufficientData(format!(
            "Shapiro-Wilk needs at least {MIN_SAMPLE_SIZE} values, got {n}"
        )));
    }
    let x = sorted(values);
    let m = mean(&x).unwrap_or(0.0);
    let ss: f64 = x.iter().map(|v| (v - m).powi(2)).sum();
    if ss == 0.0 {
        return Err(AnalyzerError::InsufficientData(
            "Shapiro-Wilk is undefined for a constant sample".to_owned(),
        ));
    }

    let weights = shapiro_weights(n);
    let numerator: f64 = weights.iter().zip(&x).map(|(a, v)| a * v).sum();
    let mut w = (numerator * numerator / ss).min(1.0);

    if n == 3 {
        // smallest attainable W for n = 3
        w = w.max(0.75);
        let p = 6.0 / PI * (w.sqrt().asin() - PI / 3.0);
        return Ok((w, p.clamp(0.0, 1.0)));
    }

    let mut y = (1.0 - w).ln();
    let (mu, sigma) = if n <= 11 {
        let gamma = poly(&SW_G, n as f64);
        if y >= gamma {
            return Ok((w, 1e-99));
        }
        y = -(gamma - y).ln();
        (poly(&SW_C3, n as f64), poly(&SW_C4, n as f64).exp())
    } else {
        let ln_n = (n as f64).ln();
        (poly(&SW_C5, ln_n), poly(&SW_C6, ln_n).exp())
    };
    Ok((w, normal_sf((y - mu) / sigma)))
}

/// Kolmogorov-Smirnov `(D, p)` against `N(mean, std)`.
pub fn kolmogorov_smirnov(values: &[f64], mean: f64, std: f64) -> (f64, f64) {
    let x = sorted(values);
    let n = x.len() as f64;
    let d = x.iter().enumerate().fold(0.0f64, |acc, (i, v)| {
        let f = normal_cdf((v - mean) / std);
        acc.max((i as f64 + 1.0) / n - f).max(f - i as f64 / n)
    });
    (d, ks_two_sided_sf(d, x.len()))
}

/// Anderson-Darling A² with estimated mean and std, plus critical values.
pub fn anderson_darling(values: &[f64], mean: f64, std: f64) -> AndersonDarling {
    let x = sorted(values);
    let n = x.len();
    let nf = n as f64;
    let z: Vec<f64> = x.iter().map(|v| (v - mean) / std).collect();
    let s: f64 = (0..n)
        .map(|i| {
            let weight = (2.0 * (i as f64 + 1.0) - 1.0) / nf;
            weight * (normal_log_cdf(z[i]) + normal_log_sf(z[n - 1 - i]))
        })
        .sum();

    let scale = 1.0 + 4.0 / nf - 25.0 / (nf * nf);
    AndersonDarling {
        statistic: -nf - s,
        critical_values: AD_CRITICAL_BASE
            .iter()
            .map(|c| (c / scale * 1000.0).round() / 1000.0)
            .collect(),
        significance_levels: AD_SIGNIFICANCE_LEVELS.to_vec(),
    }
}

/// Sorted sample against normal quantiles of Filliben's order-statistic medians.
pub fn qq_points(values: &[f64]) -> Vec<QqPoint> {
    let x = sorted(values);
    let n = x.len();
    let nf = n as f64;
    let last = 0.5f64.powf(1.0 / nf);
    x.iter()
        .enumerate()
        .map(|(i, &sample)| {
            let median = if i + 1 == n {
                last
            } else if i == 0 {
                1.0 - last
            } else {
                (i as f64 + 1.0 - 0.3175) / (nf + 0.365)
            };
            QqPoint {
                theoretical: normal_ppf(median),
                sample,
            }
        })
        .collect()
}

/// Fitted normal density sampled at `points` evenly spaced x over `[min, max]`.
pub fn normal_curve(values: &[f64], mean: f64, std: f64, points: usize) -> Vec<CurvePoint> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let steps = points.max(2);
    (0..steps)
        .map(|i| {
            let x = min + (max - min) * i as f64 / (steps - 1) as f64;
            CurvePoint {
                x,
                y: normal_pdf(x, mean, std),
            }
        })
        .collect()
}

/// Deterministic subsample used when a sample is too large for Shapiro-Wilk.
fn shapiro_sample(values: &[f64], max: usize, seed: u64) -> Vec<f64> {
    if values.len() <= max {
        return values.to_vec();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    rand::seq::index::sample(&mut rng, values.len(), max)
        .iter()
        .map(|i| values[i])
        .collect()
}

/// Every normality diagnostic for the non-missing values of `column`.
pub fn normality_report(
    column: &str,
    values: &[f64],
    alpha: f64,
    options: &NormalityOptions,
) -> Result<NormalityResult> {
    let alpha = validate_alpha(alpha)?;
    let n = values.len();
    if n < MIN_SAMPLE_SIZE {
        return Err(AnalyzerError::InsufficientData(format!(
            "Normality tests need at least {MIN_SAMPLE_SIZE} values, got {n}"
        )));
    }
    let (Some(m), Some(s)) = (mean(values), sample_std(values).filter(|s| *s > 0.0)) else {
        return Err(AnalyzerError::InsufficientData(format!(
            "Column '{column}' has no variance"
        )));
    };

    let (w, sw_p) = shapiro_wilk(&shapiro_sample(
        values,
        options.shapiro_max_samples.max(MIN_SAMPLE_SIZE),
        options.seed,
    ))?;
    let (d, ks_p) = kolmogorov_smirnov(values, m, s);

    Ok(NormalityResult {
        column: column.to_owned(),
        sample_size: n,
        alpha,
        tests: NormalityTests {
            shapiro_wilk: TestOutcome::new(w, sw_p, alpha),
            kolmogorov_smirnov: TestOutcome::new(d, ks_p, alpha),
            anderson_darling: anderson_darling(values, m, s),
        },
        qq_plot_data: qq_points(values),
        histogram_data: histogram(column, values, options.histogram_bins, true),
        normal_curve_data: normal_curve(values, m, s, options.curve_points),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: [f64; 15] = [
        2.1, 3.4, 1.9, 5.6, 4.4, 3.3, 2.8, 3.9, 4.1, 3.0, 2.5, 3.7, 4.8, 3.1, 2.2,
    ];

    #[test]
    fn test_shapiro_weights_match_table() {
        // published AS R94 coefficients for n = 10
        let w = shapiro_weights(10);
        let expected = [0.5739, 0.3291, 0.2141, 0.1224, 0.0399];
        for (i, e) in expected.iter().enumerate() {
            assert!((w[9 - i] - e).abs() < 1e-3, "a[{i}] = {}", w[9 - i]);
            assert!((w[i] + e).abs() < 1e-3);
        }
        let norm: f64 = w.iter().map(|v| v * v).sum();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_shapiro_three_equally_spaced() -> Result<()> {
        let (w, p) = shapiro_wilk(&[1.0, 2.0, 3.0])?;
        assert!((w - 1.0).abs() < 1e-12);
        assert!((p - 1.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_shapiro_skewed_sample() -> Result<()> {
        let data = [
            148.0, 154.0, 158.0, 160.0, 161.0, 162.0, 166.0, 170.0, 182.0, 195.0, 236.0,
        ];
        let (w, p) = shapiro_wilk(&data)?;
        assert!((w - 0.7888).abs() < 1e-3);
        assert!((p - 0.0067).abs() < 5e-4);
        Ok(())
    }

    #[test]
    fn test_shapiro_rejects_constant_and_tiny_samples() {
        assert!(matches!(
            shapiro_wilk(&[1.0, 1.0, 1.0]),
            Err(AnalyzerError::InsufficientData(_))
        ));
        assert!(matches!(
            shapiro_wilk(&[1.0, 2.0]),
            Err(AnalyzerError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_report_on_roughly_normal_sample() -> Result<()> {
        let report = normality_report("v", &SAMPLE, 0.05, &NormalityOptions::default())?;
        let tests = &report.tests;
        assert!((tests.shapiro_wilk.statistic - 0.9707).abs() < 1e-3);
        assert_eq!(tests.shapiro_wilk.result, "normal");
        assert!((tests.kolmogorov_smirnov.statistic - 0.0949).abs() < 1e-3);
        assert_eq!(tests.kolmogorov_smirnov.result, "normal");
        assert!((tests.anderson_darling.statistic - 0.1541).abs() < 1e-3);
        assert_eq!(
            tests.anderson_darling.critical_values,
            vec![0.498, 0.568, 0.681, 0.794, 0.945]
        );
        assert_eq!(report.qq_plot_data.len(), 15);
        assert!(report.qq_plot_data[0].theoretical < 0.0);
        assert_eq!(report.qq_plot_data[0].sample, 1.9);
        assert_eq!(report.normal_curve_data.len(), 100);
        assert_eq!(report.histogram_data.data.len(), 30);
        Ok(())
    }

    #[test]
    fn test_large_samples_are_subsampled_deterministically() {
        let values: Vec<f64> = (0..50).map(f64::from).collect();
        let a = shapiro_sample(&values, 20, 42);
        let b = shapiro_sample(&values, 20, 42);
        assert_eq!(a.len(), 20);
        assert_eq!(a, b);
        assert_eq!(shapiro_sample(&values, 100, 42).len(), 50);
    }

    #[test]
    fn test_zero_variance_is_insufficient() {
        let res = normality_report("v", &[2.0; 10], 0.05, &NormalityOptions::default());
        assert!(matches!(res, Err(AnalyzerError::InsufficientData(_))));
    }
}
