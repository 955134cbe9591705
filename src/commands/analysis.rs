use super::AnalyzerService;
use crate::analyser::logic::inference::{
    AnovaResult, RegressionResult, TTestResult, linear_regression, one_sample_t_test,
    one_way_anova,
};
use crate::analyser::logic::normality::{NormalityOptions, NormalityResult, normality_report};
use crate::analyser::logic::statistics::{
    CorrelationMatrix, StatisticsReport, correlation_matrix, statistics_report,
};
use crate::error::{AnalyzerError, Result};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct HypothesisTestRequest {
    pub data_id: String,
    pub column: String,
    pub mu0: f64,
    #[serde(default)]
    pub alpha: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnovaRequest {
    pub data_id: String,
    pub value_column: String,
    pub group_column: String,
    #[serde(default)]
    pub alpha: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegressionRequest {
    pub data_id: String,
    pub x_column: String,
    pub y_column: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NormalityTestRequest {
    pub data_id: String,
    pub column: String,
    #[serde(default)]
    pub alpha: Option<f64>,
}

impl AnalyzerService {
    pub fn statistics(&self, data_id: &str) -> Result<StatisticsReport> {
        let entry = self.resolve(data_id)?;
        statistics_report(
            &entry.frame,
            self.settings.histogram_bins,
            self.settings.box_plot_columns,
        )
    }

    pub fn correlation(&self, data_id: &str) -> Result<CorrelationMatrix> {
        let entry = self.resolve(data_id)?;
        let numeric = entry.info.numeric_columns.len();
        if numeric < 2 {
            return Err(AnalyzerError::InsufficientData(format!(
                "Correlation needs at least 2 numeric columns, found {numeric}"
            )));
        }
        Ok(correlation_matrix(&entry.frame))
    }

    pub fn hypothesis_test(&self, request: &HypothesisTestRequest) -> Result<TTestResult> {
        let entry = self.resolve(&request.data_id)?;
        let values: Vec<f64> = entry
            .frame
            .numeric_column(&request.column)?
            .iter()
            .flatten()
            .copied()
            .collect();

        let result = one_sample_t_test(&values, request.mu0, self.alpha(request.alpha))?;
        debug!(
            "t-test on {}.{}: t={}, p={}",
            entry.id, request.column, result.t_statistic, result.p_value
        );
        Ok(result)
    }

    pub fn anova(&self, request: &AnovaRequest) -> Result<AnovaResult> {
        let entry = self.resolve(&request.data_id)?;
        one_way_anova(
            &entry.frame,
            &request.value_column,
            &request.group_column,
            self.alpha(request.alpha),
        )
    }

    pub fn regression(&self, request: &RegressionRequest) -> Result<RegressionResult> {
        let entry = self.resolve(&request.data_id)?;
        linear_regression(
            &entry.frame,
            &request.x_column,
            &request.y_column,
            self.settings.regression_line_points,
        )
    }

    pub fn normality_test(&self, request: &NormalityTestRequest) -> Result<NormalityResult> {
        let entry = self.resolve(&request.data_id)?;
        let values: Vec<f64> = entry
            .frame
            .numeric_column(&request.column)?
            .iter()
            .flatten()
            .copied()
            .collect();

        let options = NormalityOptions {
            histogram_bins: self.settings.normality_histogram_bins,
            curve_points: self.settings.normal_curve_points,
            shapiro_max_samples: self.settings.shapiro_max_samples,
            seed: self.settings.shapiro_seed,
        };
        normality_report(&request.column, &values, self.alpha(request.alpha), &options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &[u8] = b"score,hours,group\n10,1,a\n12,2,a\n11,3,b\n13,4,b\n9,5,c\n";

    fn service_with_upload() -> Result<(AnalyzerService, String)> {
        let service = AnalyzerService::default();
        let id = service.upload(CSV, "scores.csv", None)?.data_id;
        Ok((service, id))
    }

    #[test]
    fn test_analyses_never_register() -> Result<()> {
        let (service, id) = service_with_upload()?;
        service.statistics(&id)?;
        service.correlation(&id)?;
        service.hypothesis_test(&HypothesisTestRequest {
            data_id: id.clone(),
            column: "score".to_owned(),
            mu0: 10.0,
            alpha: None,
        })?;
        service.normality_test(&NormalityTestRequest {
            data_id: id,
            column: "score".to_owned(),
            alpha: Some(0.05),
        })?;
        assert_eq!(service.registry().count()?, 1);
        Ok(())
    }

    #[test]
    fn test_unknown_id_is_not_found() -> Result<()> {
        let (service, _) = service_with_upload()?;
        assert!(matches!(
            service.statistics("nope"),
            Err(AnalyzerError::NotFound(_))
        ));
        assert_eq!(service.registry().count()?, 1);
        Ok(())
    }

    #[test]
    fn test_t_test_uses_default_alpha() -> Result<()> {
        let (service, id) = service_with_upload()?;
        let result = service.hypothesis_test(&HypothesisTestRequest {
            data_id: id,
            column: "score".to_owned(),
            mu0: 10.0,
            alpha: None,
        })?;
        assert_eq!(result.confidence_interval.level, 0.95);
        assert_eq!(result.interpretation, "At α=0.05, we fail to reject H₀");
        Ok(())
    }

    #[test]
    fn test_categorical_column_is_invalid() -> Result<()> {
        let (service, id) = service_with_upload()?;
        let res = service.hypothesis_test(&HypothesisTestRequest {
            data_id: id,
            column: "group".to_owned(),
            mu0: 0.0,
            alpha: None,
        });
        assert!(matches!(res, Err(AnalyzerError::InvalidColumn(_))));
        Ok(())
    }

    #[test]
    fn test_anova_honors_caller_alpha() -> Result<()> {
        let (service, id) = service_with_upload()?;
        let request = AnovaRequest {
            data_id: id,
            value_column: "score".to_owned(),
            group_column: "group".to_owned(),
            alpha: Some(0.99),
        };
        let result = service.anova(&request)?;
        assert_eq!(result.alpha, 0.99);
        assert_eq!(result.num_groups, 3);
        assert_eq!(result.df_within, 2);
        Ok(())
    }
}
