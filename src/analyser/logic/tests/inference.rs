use super::csv_frame;
use crate::analyser::logic::*;
use crate::error::{AnalyzerError, Result};

#[test]
fn test_t_test_scenario() -> Result<()> {
    let frame = csv_frame("score\n10\n12\n11\n13\n9\n")?;
    let values: Vec<f64> = frame.numeric_column("score")?.iter().flatten().copied().collect();
    let result = one_sample_t_test(&values, 10.0, 0.05)?;

    assert_eq!(result.sample_mean, 11.0);
    assert_eq!(result.sample_size, 5);
    assert_eq!(result.df, 4);
    assert!((result.t_statistic - 1.414_213_562_373_095).abs() < 1e-9);
    assert!((result.p_value - 0.230_199_641_080_497).abs() < 1e-6);
    assert_eq!(result.decision, "fail_to_reject");

    // level 0.95 with t(0.975, 4) = 2.7764
    let half = 2.776_445_105_197_799 * result.sample_std / 5f64.sqrt();
    assert!((result.confidence_interval.lower - (11.0 - half)).abs() < 1e-6);
    assert!((result.confidence_interval.upper - (11.0 + half)).abs() < 1e-6);
    Ok(())
}

#[test]
fn test_regression_on_collinear_points() -> Result<()> {
    let frame = csv_frame("x,y\n1,2\n2,4\n3,6\n")?;
    let result = linear_regression(&frame, "x", "y", 100)?;
    let stats = &result.model_stats;
    assert!((stats.slope - 2.0).abs() < 1e-9);
    assert!(stats.intercept.abs() < 1e-9);
    assert!((stats.r_squared - 1.0).abs() < 1e-9);
    assert_eq!(stats.n, 3);
    assert_eq!(result.scatter_data.len(), 3);
    assert_eq!(result.regression_line.len(), 100);
    Ok(())
}

#[test]
fn test_regression_skips_incomplete_rows() -> Result<()> {
    let frame = csv_frame("x,y\n1,2\n2,\n3,6\n4,8\n")?;
    let result = linear_regression(&frame, "x", "y", 2)?;
    assert_eq!(result.model_stats.n, 3);
    assert!(result.residual_data.iter().all(|r| r.residual.abs() < 1e-9));
    Ok(())
}

#[test]
fn test_anova_with_numeric_group_labels() -> Result<()> {
    let frame = csv_frame("value,group\n1,1\n2,1\n3,1\n7,2\n8,2\n9,2\n")?;
    let result = one_way_anova(&frame, "value", "group", 0.05)?;

    assert_eq!(result.num_groups, 2);
    assert_eq!((result.df_between, result.df_within), (1, 4));
    // SSB = 54, SSW = 4
    assert!((result.f_statistic - 54.0).abs() < 1e-9);
    assert_eq!(result.decision, "significant");
    assert_eq!(result.group_statistics[0].group, "1");
    assert_eq!(result.group_statistics[1].mean, 8.0);
    Ok(())
}

#[test]
fn test_anova_merges_signed_zero_labels() -> Result<()> {
    let frame = csv_frame("value,group\n1,0\n2,-0\n3,0.0\n7,1\n8,1\n9,1\n")?;
    let result = one_way_anova(&frame, "value", "group", 0.05)?;

    assert_eq!(result.num_groups, 2);
    assert_eq!(result.group_statistics[0].group, "0");
    assert_eq!(result.group_statistics[0].mean, 2.0);
    Ok(())
}

#[test]
fn test_anova_single_group_is_insufficient() -> Result<()> {
    let frame = csv_frame("value,group\n1,a\n2,a\n3,a\n")?;
    let res = one_way_anova(&frame, "value", "group", 0.05);
    assert!(matches!(res, Err(AnalyzerError::InsufficientData(_))));
    Ok(())
}

#[test]
fn test_normality_floor() -> Result<()> {
    let res = normality_report("v", &[1.0, 2.0], 0.05, &NormalityOptions::default());
    assert!(matches!(res, Err(AnalyzerError::InsufficientData(_))));
    Ok(())
}
