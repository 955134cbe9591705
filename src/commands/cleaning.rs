use super::AnalyzerService;
use crate::analyser::lifecycle::transforms::{ImputeTransform, OutlierTransform, ScaleTransform};
use crate::analyser::lifecycle::{Transform as _, TransformPipeline, TransformSpec};
use crate::analyser::logic::outliers::OutlierBounds;
use crate::error::{AnalyzerError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct CleanMissingRequest {
    pub data_id: String,
    pub operation: String,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub n_neighbors: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct CleanMissingResponse {
    pub new_data_id: String,
    pub message: String,
    pub rows_before: usize,
    pub rows_after: usize,
    /// Rows holding at least one missing cell
    pub missing_before: usize,
    pub missing_after: usize,
    pub skipped_columns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveOutliersRequest {
    pub data_id: String,
    pub method: String,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct RemoveOutliersResponse {
    /// `None` for a dry run
    pub new_data_id: Option<String>,
    pub message: String,
    pub outliers_removed: usize,
    pub rows_before: usize,
    pub rows_after: usize,
    pub dry_run: bool,
    pub bounds: Vec<OutlierBounds>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScaleDataRequest {
    pub data_id: String,
    pub method: String,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ScaleDataResponse {
    pub new_data_id: String,
    pub message: String,
    pub scaled_columns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyPipelineRequest {
    pub data_id: String,
    pub steps: Vec<TransformSpec>,
}

#[derive(Debug, Serialize)]
pub struct PipelineResponse {
    /// One identity per step, in order
    pub data_ids: Vec<String>,
    pub final_data_id: String,
    pub messages: Vec<String>,
}

impl AnalyzerService {
    pub fn clean_missing(&self, request: &CleanMissingRequest) -> Result<CleanMissingResponse> {
        let entry = self.resolve(&request.data_id)?;
        let transform = ImputeTransform::new(
            request.operation.parse()?,
            request.columns.clone(),
            request.n_neighbors.unwrap_or(self.settings.knn_neighbors),
        );

        let applied = transform.apply(&entry.frame)?;
        let rows_after = applied.frame.height();
        let missing_after = applied.frame.rows_with_missing();
        let derived = self.registry.register(
            applied.frame,
            &entry.info.filename,
            Some(&entry.id),
            Some(transform.spec()),
        )?;

        info!(
            "clean-missing ({}) {} -> {}: {} -> {rows_after} rows",
            request.operation,
            entry.id,
            derived.id,
            entry.frame.height()
        );
        Ok(CleanMissingResponse {
            new_data_id: derived.id,
            message: applied.message,
            rows_before: entry.frame.height(),
            rows_after,
            missing_before: entry.frame.rows_with_missing(),
            missing_after,
            skipped_columns: applied.skipped_columns,
        })
    }

    /// Filter outliers; with `dry_run` only the counts are computed.
    pub fn remove_outliers(&self, request: &RemoveOutliersRequest) -> Result<RemoveOutliersResponse> {
        let entry = self.resolve(&request.data_id)?;
        let transform = OutlierTransform::new(
            request.method.parse()?,
            request.columns.clone(),
            request.threshold,
        );

        let outcome = transform.run(&entry.frame, request.dry_run)?;
        let message = transform.message(&outcome);
        let outliers_removed = outcome.outliers_removed();

        let new_data_id = match outcome.frame {
            Some(frame) => {
                let derived = self.registry.register(
                    frame,
                    &entry.info.filename,
                    Some(&entry.id),
                    Some(transform.spec()),
                )?;
                info!(
                    "remove-outliers ({}) {} -> {}: {} -> {} rows",
                    request.method, entry.id, derived.id, outcome.rows_before, outcome.rows_after
                );
                Some(derived.id)
            }
            None => None,
        };

        Ok(RemoveOutliersResponse {
            new_data_id,
            message,
            outliers_removed,
            rows_before: outcome.rows_before,
            rows_after: outcome.rows_after,
            dry_run: request.dry_run,
            bounds: outcome.bounds,
        })
    }

    pub fn scale_data(&self, request: &ScaleDataRequest) -> Result<ScaleDataResponse> {
        let entry = self.resolve(&request.data_id)?;
        let transform = ScaleTransform::new(request.method.parse()?, request.columns.clone());

        let applied = transform.apply(&entry.frame)?;
        let derived = self.registry.register(
            applied.frame,
            &entry.info.filename,
            Some(&entry.id),
            Some(transform.spec()),
        )?;

        info!(
            "scale-data ({}) {} -> {}: {} columns",
            request.method,
            entry.id,
            derived.id,
            applied.columns.len()
        );
        Ok(ScaleDataResponse {
            new_data_id: derived.id,
            message: applied.message,
            scaled_columns: applied.columns,
        })
    }

    /// Run several cleaning steps, registering one identity per step.
    ///
    /// Nothing is registered unless every step succeeds.
    pub fn apply_pipeline(&self, request: &ApplyPipelineRequest) -> Result<PipelineResponse> {
        let pipeline = TransformPipeline::new(request.steps.clone());
        if pipeline.is_empty() {
            return Err(AnalyzerError::InvalidParameter(
                "Pipeline has no steps".to_owned(),
            ));
        }
        let entry = self.resolve(&request.data_id)?;

        let (steps, messages): (Vec<_>, Vec<_>) = pipeline
            .apply(&entry.frame, self.transform_defaults())?
            .into_iter()
            .map(|(spec, applied)| ((applied.frame, spec), applied.message))
            .unzip();

        let chain = self
            .registry
            .register_chain(steps, &entry.info.filename, &entry.id)?;
        let data_ids: Vec<String> = chain.into_iter().map(|e| e.id).collect();
        let final_data_id = data_ids.last().cloned().unwrap_or_else(|| entry.id.clone());

        info!(
            "apply-pipeline {} -> {final_data_id}: {} steps",
            entry.id,
            data_ids.len()
        );
        Ok(PipelineResponse {
            data_ids,
            final_data_id,
            messages,
        })
    }
}
