use super::distributions::{f_sf, student_t_ppf, student_t_two_tailed};
use super::frame::TabularFrame;
use super::statistics::{FiveNumber, mean, sample_std};
use crate::error::{AnalyzerError, Result};
use serde::Serialize;

/// Checks that a significance level lies strictly between 0 and 1.
pub fn validate_alpha(alpha: f64) -> Result<f64> {
    if alpha.is_finite() && alpha > 0.0 && alpha < 1.0 {
        Ok(alpha)
    } else {
        Err(AnalyzerError::InvalidParameter(format!(
            "Significance level must be between 0 and 1, got {alpha}"
        )))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TTestResult {
    pub t_statistic: f64,
    pub p_value: f64,
    pub df: usize,
    pub sample_mean: f64,
    pub sample_std: f64,
    pub sample_size: usize,
    pub decision: String,
    pub interpretation: String,
    pub confidence_interval: ConfidenceInterval,
}

/// Two-tailed one-sample Student's t-test of `mean == mu0`.
///
/// With zero sample spread the statistic is ±inf (p = 0) unless the mean
/// equals `mu0` exactly, in which case both are NaN and H₀ is not rejected.
pub fn one_sample_t_test(values: &[f64], mu0: f64, alpha: f64) -> Result<TTestResult> {
    let alpha = validate_alpha(alpha)?;
    let n = values.len();
    let (Some(m), Some(s)) = (mean(values), sample_std(values)) else {
        return Err(AnalyzerError::InsufficientData(format!(
            "t-test needs at least 2 values, got {n}"
        )));
    };

    let df = n - 1;
    let se = s / (n as f64).sqrt();
    let (t, p) = if se > 0.0 {
        let t = (m - mu0) / se;
        (t, student_t_two_tailed(t, df as f64))
    } else if m == mu0 {
        (f64::NAN, f64::NAN)
    } else {
        let t = if m > mu0 { f64::INFINITY } else { f64::NEG_INFINITY };
        (t, 0.0)
    };

    let critical = student_t_ppf(1.0 - alpha / 2.0, df as f64);
    let margin = if se > 0.0 { critical * se } else { 0.0 };
    let decision = if p < alpha { "reject" } else { "fail_to_reject" };

    Ok(TTestResult {
        t_statistic: t,
        p_value: p,
        df,
        sample_mean: m,
        sample_std: s,
        sample_size: n,
        decision: decision.to_owned(),
        interpretation: format!("At α={alpha}, we {} H₀", decision.replace('_', " ")),
        confidence_interval: ConfidenceInterval {
            lower: m - margin,
            upper: m + margin,
            level: 1.0 - alpha,
        },
    })
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupStatistics {
    pub group: String,
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupBox {
    pub group: String,
    #[serde(flatten)]
    pub summary: FiveNumber,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnovaResult {
    pub f_statistic: f64,
    pub p_value: f64,
    pub alpha: f64,
    pub decision: String,
    pub num_groups: usize,
    pub df_between: usize,
    pub df_within: usize,
    pub group_statistics: Vec<GroupStatistics>,
    pub box_plot_data: Vec<GroupBox>,
}

/// Rows of `value_column` grouped by the label in `group_column`.
///
/// Rows missing either cell are dropped. Groups keep first-seen order.
pub fn group_values(
    frame: &TabularFrame,
    value_column: &str,
    group_column: &str,
) -> Result<Vec<(String, Vec<f64>)>> {
    let values = frame.numeric_column(value_column)?;
    let groups = frame.column(group_column)?;

    let mut grouped: Vec<(String, Vec<f64>)> = Vec::new();
    for (row, value) in values.iter().enumerate() {
        let (Some(value), Some(label)) = (value, groups.label(row)) else {
            continue;
        };
        match grouped.iter_mut().find(|(g, _)| *g == label) {
            Some((_, members)) => members.push(*value),
            None => grouped.push((label, vec![*value])),
        }
    }
    Ok(grouped)
}

/// One-way ANOVA of `value_column` across the groups of `group_column`.
pub fn one_way_anova(
    frame: &TabularFrame,
    value_column: &str,
    group_column: &str,
    alpha: f64,
) -> Result<AnovaResult> {
    let alpha = validate_alpha(alpha)?;
    let groups = group_values(frame, value_column, group_column)?;
    let k = groups.len();
    if k < 2 {
        return Err(AnalyzerError::InsufficientData(format!(
            "ANOVA needs at least 2 groups, found {k}"
        )));
    }

    let total: usize = groups.iter().map(|(_, v)| v.len()).sum();
    let df_between = k - 1;
    let df_within = total - k;
    if df_within == 0 {
        return Err(AnalyzerError::InsufficientData(
            "ANOVA needs at least one group with more than one observation".to_owned(),
        ));
    }

    let grand_mean = groups.iter().flat_map(|(_, v)| v.iter()).sum::<f64>() / total as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    let mut group_statistics = Vec::with_capacity(k);
    let mut box_plot_data = Vec::with_capacity(k);

    for (label, members) in &groups {
        let group_mean = members.iter().sum::<f64>() / members.len() as f64;
        ss_between += members.len() as f64 * (group_mean - grand_mean).powi(2);
        ss_within += members.iter().map(|v| (v - group_mean).powi(2)).sum::<f64>();

        if let Some(summary) = FiveNumber::from_values(members) {
            group_statistics.push(GroupStatistics {
                group: label.clone(),
                count: members.len(),
                mean: group_mean,
                std: sample_std(members),
                min: summary.min,
                max: summary.max,
            });
            box_plot_data.push(GroupBox {
                group: label.clone(),
                summary,
            });
        }
    }

    let ms_between = ss_between / df_between as f64;
    let ms_within = ss_within / df_within as f64;
    let f = ms_between / ms_within;
    let p = f_sf(f, df_between as f64, df_within as f64);
    let decision = if p < alpha { "significant" } else { "not_significant" };

    Ok(AnovaResult {
        f_statistic: f,
        p_value: p,
        alpha,
        decision: decision.to_owned(),
        num_groups: k,
        df_between,
        df_within,
        group_statistics,
        box_plot_data,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ResidualPoint {
    pub fitted: f64,
    pub residual: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelStats {
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub p_value: f64,
    pub slope: f64,
    pub intercept: f64,
    pub n: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegressionResult {
    pub model_stats: ModelStats,
    pub equation: String,
    pub scatter_data: Vec<Point>,
    pub regression_line: Vec<Point>,
    pub residual_data: Vec<ResidualPoint>,
}

/// Renders `y = a·x + b` with four decimals, folding the sign of `b`.
pub fn format_equation(slope: f64, intercept: f64) -> String {
    if intercept < 0.0 {
        format!("y = {slope:.4}x - {:.4}", -intercept)
    } else {
        format!("y = {slope:.4}x + {intercept:.4}")
    }
}

/// Ordinary least squares of `y_column` on `x_column`.
///
/// Rows with either value missing are excluded. Residuals are reported as
/// fitted minus actual. `line_points` evenly spaced points span the x range.
pub fn linear_regression(
    frame: &TabularFrame,
    x_column: &str,
    y_column: &str,
    line_points: usize,
) -> Result<RegressionResult> {
    let xs = frame.numeric_column(x_column)?;
    let ys = frame.numeric_column(y_column)?;
    let points: Vec<Point> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(Point { x: (*x)?, y: (*y)? }))
        .collect();

    let n = points.len();
    if n < 3 {
        return Err(AnalyzerError::InsufficientData(format!(
            "Regression needs at least 3 complete rows, got {n}"
        )));
    }

    let nf = n as f64;
    let x_mean = points.iter().map(|p| p.x).sum::<f64>() / nf;
    let y_mean = points.iter().map(|p| p.y).sum::<f64>() / nf;
    let sxx: f64 = points.iter().map(|p| (p.x - x_mean).powi(2)).sum();
    let sxy: f64 = points.iter().map(|p| (p.x - x_mean) * (p.y - y_mean)).sum();
    if sxx == 0.0 {
        return Err(AnalyzerError::InsufficientData(format!(
            "Column '{x_column}' has no variance; the slope is undefined"
        )));
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let predict = |x: f64| intercept + slope * x;

    let sst: f64 = points.iter().map(|p| (p.y - y_mean).powi(2)).sum();
    let sse: f64 = points.iter().map(|p| (p.y - predict(p.x)).powi(2)).sum();
    let ssr = (sst - sse).max(0.0);
    let r_squared = 1.0 - sse / sst;
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (nf - 1.0) / (nf - 2.0);
    let f = ssr / (sse / (nf - 2.0));
    let p = f_sf(f, 1.0, nf - 2.0);

    let x_min = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let x_max = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let steps = line_points.max(2);
    let regression_line = (0..steps)
        .map(|i| {
            let x = x_min + (x_max - x_min) * i as f64 / (steps - 1) as f64;
            Point { x, y: predict(x) }
        })
        .collect();

    let residual_data = points
        .iter()
        .map(|p| {
            let fitted = predict(p.x);
            ResidualPoint {
                fitted,
                residual: fitted - p.y,
            }
        })
        .collect();

    Ok(RegressionResult {
        model_stats: ModelStats {
            r_squared,
            adj_r_squared,
            f_statistic: f,
            p_value: p,
            slope,
            intercept,
            n,
        },
        equation: format_equation(slope, intercept),
        scatter_data: points,
        regression_line,
        residual_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::logic::frame::Column;

    #[test]
    fn test_t_test_reference_sample() -> Result<()> {
        let res = one_sample_t_test(&[10.0, 12.0, 11.0, 13.0, 9.0], 10.0, 0.05)?;
        assert_eq!(res.sample_mean, 11.0);
        assert_eq!(res.sample_size, 5);
        assert_eq!(res.df, 4);
        assert!((res.t_statistic - 2f64.sqrt()).abs() < 1e-12);
        assert!((res.p_value - 0.230_199_641_080_497).abs() < 1e-9);
        assert_eq!(res.decision, "fail_to_reject");
        assert_eq!(res.interpretation, "At α=0.05, we fail to reject H₀");
        let half_width = 2.776_445_105_197_799 * (2.5f64).sqrt() / 5f64.sqrt();
        assert!((res.confidence_interval.upper - (11.0 + half_width)).abs() < 1e-8);
        assert!((res.confidence_interval.level - 0.95).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_t_test_rejects_with_loose_alpha() -> Result<()> {
        let res = one_sample_t_test(&[10.0, 12.0, 11.0, 13.0, 9.0], 10.0, 0.25)?;
        assert_eq!(res.decision, "reject");
        Ok(())
    }

    #[test]
    fn test_t_test_zero_spread() -> Result<()> {
        let same = one_sample_t_test(&[4.0, 4.0, 4.0], 4.0, 0.05)?;
        assert!(same.t_statistic.is_nan() && same.p_value.is_nan());
        assert_eq!(same.decision, "fail_to_reject");

        let off = one_sample_t_test(&[4.0, 4.0, 4.0], 3.0, 0.05)?;
        assert_eq!(off.t_statistic, f64::INFINITY);
        assert_eq!(off.p_value, 0.0);
        assert_eq!(off.decision, "reject");
        Ok(())
    }

    #[test]
    fn test_t_test_guards() {
        assert!(matches!(
            one_sample_t_test(&[1.0], 0.0, 0.05),
            Err(AnalyzerError::InsufficientData(_))
        ));
        assert!(matches!(
            one_sample_t_test(&[1.0, 2.0], 0.0, 1.5),
            Err(AnalyzerError::InvalidParameter(_))
        ));
    }

    fn anova_frame() -> Result<TabularFrame> {
        TabularFrame::new(vec![
            Column::numeric(
                "score",
                vec![
                    Some(1.0),
                    Some(4.0),
                    Some(7.0),
                    Some(2.0),
                    Some(5.0),
                    Some(8.0),
                    Some(3.0),
                    Some(6.0),
                    Some(9.0),
                    None,
                ],
            ),
            Column::categorical(
                "team",
                ["a", "b", "c", "a", "b", "c", "a", "b", "c", "a"]
                    .iter()
                    .map(|s| Some((*s).to_owned()))
                    .collect(),
            ),
        ])
    }

    #[test]
    fn test_anova_closed_form() -> Result<()> {
        let res = one_way_anova(&anova_frame()?, "score", "team", 0.05)?;
        assert_eq!(res.num_groups, 3);
        assert_eq!((res.df_between, res.df_within), (2, 6));
        assert!((res.f_statistic - 27.0).abs() < 1e-9);
        // F(2, 6) tail: (1 + 2F/6)^-3
        assert!((res.p_value - 0.001).abs() < 1e-9);
        assert_eq!(res.decision, "significant");
        let names: Vec<&str> = res.group_statistics.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(res.group_statistics[0].count, 3);
        assert_eq!(res.box_plot_data[1].summary.median, 5.0);
        Ok(())
    }

    #[test]
    fn test_anova_honours_alpha() -> Result<()> {
        let res = one_way_anova(&anova_frame()?, "score", "team", 0.0005)?;
        assert_eq!(res.decision, "not_significant");
        Ok(())
    }

    #[test]
    fn test_anova_numeric_groups_and_singletons() -> Result<()> {
        let frame = TabularFrame::new(vec![
            Column::numeric("v", vec![Some(1.0), Some(2.0), Some(3.0)]),
            Column::numeric("g", vec![Some(1.0), Some(2.0), Some(2.0)]),
        ])?;
        let res = one_way_anova(&frame, "v", "g", 0.05)?;
        assert_eq!(res.group_statistics[0].group, "1");
        assert_eq!(res.group_statistics[0].std, None);

        let single = TabularFrame::new(vec![
            Column::numeric("v", vec![Some(1.0), Some(2.0)]),
            Column::numeric("g", vec![Some(1.0), Some(2.0)]),
        ])?;
        assert!(matches!(
            one_way_anova(&single, "v", "g", 0.05),
            Err(AnalyzerError::InsufficientData(_))
        ));
        Ok(())
    }

    #[test]
    fn test_regression_collinear() -> Result<()> {
        let frame = TabularFrame::new(vec![
            Column::numeric("x", vec![Some(1.0), Some(2.0), Some(3.0)]),
            Column::numeric("y", vec![Some(2.0), Some(4.0), Some(6.0)]),
        ])?;
        let res = linear_regression(&frame, "x", "y", 100)?;
        let stats = &res.model_stats;
        assert!((stats.slope - 2.0).abs() < 1e-9);
        assert!(stats.intercept.abs() < 1e-9);
        assert!((stats.r_squared - 1.0).abs() < 1e-9);
        assert_eq!(res.regression_line.len(), 100);
        assert_eq!(res.regression_line[0], Point { x: 1.0, y: 2.0 });
        assert_eq!(res.scatter_data.len(), 3);
        assert!(res.residual_data.iter().all(|r| r.residual.abs() < 1e-9));
        assert_eq!(res.equation, "y = 2.0000x + 0.0000");
        Ok(())
    }

    #[test]
    fn test_regression_residual_sign_and_missing_rows() -> Result<()> {
        let frame = TabularFrame::new(vec![
            Column::numeric("x", vec![Some(0.0), Some(1.0), Some(2.0), None, Some(3.0)]),
            Column::numeric("y", vec![Some(1.0), Some(1.0), Some(3.0), Some(9.0), Some(3.0)]),
        ])?;
        let res = linear_regression(&frame, "x", "y", 2)?;
        assert_eq!(res.model_stats.n, 4);
        // slope 0.8, intercept 0.8: first point fitted 0.8, actual 1.0
        assert!((res.residual_data[0].residual - -0.2).abs() < 1e-12);
        assert!(res.model_stats.p_value > 0.0 && res.model_stats.p_value < 1.0);
        Ok(())
    }

    #[test]
    fn test_regression_guards() -> Result<()> {
        let frame = TabularFrame::new(vec![
            Column::numeric("x", vec![Some(1.0), Some(1.0), Some(1.0)]),
            Column::numeric("y", vec![Some(1.0), Some(2.0), None]),
        ])?;
        assert!(matches!(
            linear_regression(&frame, "x", "y", 10),
            Err(AnalyzerError::InsufficientData(_))
        ));
        Ok(())
    }

    #[test]
    fn test_equation_formatting() {
        assert_eq!(format_equation(1.5, -2.25), "y = 1.5000x - 2.2500");
    }
}
