//! Integration tests for the full upload, clean, analyse workflow
//!
//! These tests drive `AnalyzerService` with a fixture file and verify the
//! derived identities and end-to-end results.

#![expect(clippy::indexing_slicing)]

use statanalyzer::commands::{
    AnalyzerService, AnovaRequest, ApplyPipelineRequest, CleanMissingRequest,
    HypothesisTestRequest, NormalityTestRequest, RegressionRequest, RemoveOutliersRequest,
};
use statanalyzer::analyser::lifecycle::TransformSpec;
use statanalyzer::error::{AnalyzerError, Result};
use std::path::PathBuf;

fn upload_students(service: &AnalyzerService) -> Result<String> {
    let bytes = std::fs::read(PathBuf::from("testdata/students.csv"))?;
    Ok(service.upload(&bytes, "students.csv", None)?.data_id)
}

#[test]
fn test_upload_classifies_fixture() -> Result<()> {
    let service = AnalyzerService::default();
    let bytes = std::fs::read("testdata/students.csv")?;
    let response = service.upload(&bytes, "students.csv", None)?;

    assert_eq!(response.info.rows, 10, "Should have 10 rows");
    assert_eq!(response.info.columns, 4, "Should have 4 columns");
    assert_eq!(response.info.numeric_columns, vec!["id", "hours", "score"]);
    assert_eq!(response.info.categorical_columns, vec!["group"]);
    Ok(())
}

#[test]
fn test_upload_workbook_fixture() -> Result<()> {
    let service = AnalyzerService::default();
    let bytes = std::fs::read("testdata/scores.xlsx")?;
    let response = service.upload(&bytes, "scores.xlsx", None)?;

    // The blank fourth sheet row is skipped.
    assert_eq!(response.info.rows, 4);
    assert_eq!(response.info.numeric_columns, vec!["age", "score"]);
    assert_eq!(response.info.categorical_columns, vec!["name", "passed"]);

    let preview = service.data_preview(&response.data_id, None)?;
    assert_eq!(preview.missing_values["age"], 1, "Empty cell is missing");
    assert_eq!(preview.missing_values["score"], 1, "#N/A error cell is missing");
    assert_eq!(preview.missing_values["passed"], 0);
    assert_eq!(preview.preview[0]["score"], 81.5);
    assert_eq!(preview.preview[1]["passed"], "false");
    assert_eq!(preview.preview[3]["name"], "dave");
    Ok(())
}

#[test]
fn test_clean_then_analyse_chain() -> Result<()> {
    let service = AnalyzerService::default();
    let raw_id = upload_students(&service)?;

    let filled = service.clean_missing(&CleanMissingRequest {
        data_id: raw_id.clone(),
        operation: "fill_median".to_owned(),
        columns: Some(vec!["hours".to_owned()]),
        n_neighbors: None,
    })?;
    assert_eq!(filled.missing_before, 1);
    assert_eq!(filled.missing_after, 0);

    let trimmed = service.remove_outliers(&RemoveOutliersRequest {
        data_id: filled.new_data_id.clone(),
        method: "iqr".to_owned(),
        columns: Some(vec!["score".to_owned()]),
        threshold: None,
        dry_run: false,
    })?;
    assert_eq!(trimmed.outliers_removed, 1, "Only the 250 score is an outlier");
    let final_id = trimmed.new_data_id.clone().unwrap_or_default();

    let regression = service.regression(&RegressionRequest {
        data_id: final_id.clone(),
        x_column: "hours".to_owned(),
        y_column: "score".to_owned(),
    })?;
    assert_eq!(regression.model_stats.n, 9);
    assert!(regression.model_stats.slope > 0.0);
    assert!(regression.model_stats.r_squared > 0.5);

    let anova = service.anova(&AnovaRequest {
        data_id: final_id.clone(),
        value_column: "score".to_owned(),
        group_column: "group".to_owned(),
        alpha: None,
    })?;
    assert_eq!(anova.num_groups, 3);
    assert_eq!(anova.decision, "significant");

    let lineage = service.lineage(&final_id)?;
    let ids: Vec<&str> = lineage.iter().map(|e| e.data_id.as_str()).collect();
    assert_eq!(ids, vec![raw_id.as_str(), filled.new_data_id.as_str(), final_id.as_str()]);

    // the upload is still the original snapshot
    let raw = service.data_preview(&raw_id, Some(0))?;
    assert_eq!(raw.shape, [10, 4]);
    assert_eq!(raw.missing_values.get("hours"), Some(&1));
    Ok(())
}

#[test]
fn test_branching_from_one_snapshot() -> Result<()> {
    let service = AnalyzerService::default();
    let raw_id = upload_students(&service)?;

    let t_test = service.hypothesis_test(&HypothesisTestRequest {
        data_id: raw_id.clone(),
        column: "score".to_owned(),
        mu0: 80.0,
        alpha: Some(0.1),
    })?;
    assert_eq!(t_test.sample_size, 10);
    assert_eq!(t_test.df, 9);

    let normality = service.normality_test(&NormalityTestRequest {
        data_id: raw_id.clone(),
        column: "score".to_owned(),
        alpha: None,
    })?;
    // the 250 outlier makes the sample clearly non-normal
    assert_eq!(normality.tests.shapiro_wilk.result, "not_normal");
    assert_eq!(normality.qq_plot_data.len(), 10);

    assert_eq!(service.registry().count()?, 1, "Analyses never register");
    Ok(())
}

#[test]
fn test_pipeline_registers_each_step() -> Result<()> {
    let service = AnalyzerService::default();
    let raw_id = upload_students(&service)?;

    let response = service.apply_pipeline(&ApplyPipelineRequest {
        data_id: raw_id,
        steps: vec![
            TransformSpec::new("clean_missing").with("operation", "drop_missing"),
            TransformSpec::new("remove_outliers")
                .with("method", "zscore")
                .with("threshold", 2.0),
            TransformSpec::new("scale_data").with("method", "standardize"),
        ],
    })?;

    assert_eq!(response.data_ids.len(), 3);
    assert_eq!(service.registry().count()?, 4);

    let datasets = service.datasets()?;
    let operations: Vec<Option<&str>> =
        datasets.iter().map(|d| d.operation.as_deref()).collect();
    assert_eq!(
        operations,
        vec![None, Some("clean_missing"), Some("remove_outliers"), Some("scale_data")]
    );
    Ok(())
}

#[test]
fn test_failures_leave_registry_unchanged() -> Result<()> {
    let service = AnalyzerService::default();
    let raw_id = upload_students(&service)?;

    let missing = service.statistics("not-a-dataset");
    assert!(matches!(missing, Err(AnalyzerError::NotFound(_))));

    let wrong_kind = service.remove_outliers(&RemoveOutliersRequest {
        data_id: raw_id,
        method: "zscore".to_owned(),
        columns: Some(vec!["group".to_owned()]),
        threshold: None,
        dry_run: false,
    });
    assert!(matches!(wrong_kind, Err(AnalyzerError::InvalidColumn(_))));

    assert_eq!(service.registry().count()?, 1);
    Ok(())
}
