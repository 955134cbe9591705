//! Transform trait and pipeline for serializable cleaning operations

use crate::analyser::logic::cleaning::{ImputeMethod, impute_missing};
use crate::analyser::logic::frame::TabularFrame;
use crate::analyser::logic::outliers::{OutlierMethod, OutlierOutcome, remove_outliers};
use crate::analyser::logic::scaling::{ScaleMethod, scale_columns};
use crate::error::{AnalyzerError, Result, ResultExt as _};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Trait for all cleaning transformations
/// Each transform must be:
/// - Serializable (to/from JSON via [`TransformSpec`])
/// - Parameterized (all params in `HashMap`)
/// - Pure (never touches its input frame)
/// - Deterministic (same input + params = same output)
pub trait Transform: Send + Sync {
    /// Apply this transform, producing a new frame
    fn apply(&self, frame: &TabularFrame) -> Result<Applied>;

    /// Get the name of this transform
    fn name(&self) -> &'static str;

    /// Serialize parameters to JSON-compatible map
    fn parameters(&self) -> HashMap<String, serde_json::Value>;

    /// Create a summary of what this transform does
    fn description(&self) -> String;

    /// Serializable spec that recreates this transform
    fn spec(&self) -> TransformSpec {
        TransformSpec {
            transform_type: self.name().to_owned(),
            parameters: self.parameters(),
        }
    }
}

/// Result of applying one transform.
#[derive(Debug, Clone)]
pub struct Applied {
    pub frame: TabularFrame,
    pub message: String,
    /// Columns the operator changed.
    pub columns: Vec<String>,
    /// Targeted columns left as-is (nothing to compute from).
    pub skipped_columns: Vec<String>,
}

/// Serializable specification of a transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSpec {
    pub transform_type: String,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

impl TransformSpec {
    pub fn new(transform_type: &str) -> Self {
        Self {
            transform_type: transform_type.to_owned(),
            parameters: HashMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.to_owned(), value.into());
        self
    }
}

/// Settings a transform may fall back on when its spec omits them.
#[derive(Debug, Clone, Copy)]
pub struct TransformDefaults {
    pub knn_neighbors: usize,
}

impl Default for TransformDefaults {
    fn default() -> Self {
        Self { knn_neighbors: 5 }
    }
}

/// A pipeline of transforms applied sequentially
#[derive(Debug, Clone, Default)]
pub struct TransformPipeline {
    transforms: Vec<TransformSpec>,
}

impl TransformPipeline {
    pub fn new(transforms: Vec<TransformSpec>) -> Self {
        Self { transforms }
    }

    /// Apply all transforms in sequence, keeping every intermediate result.
    ///
    /// Nothing is returned unless every step succeeds.
    pub fn apply(
        &self,
        frame: &TabularFrame,
        defaults: TransformDefaults,
    ) -> Result<Vec<(TransformSpec, Applied)>> {
        let mut steps: Vec<(TransformSpec, Applied)> = Vec::with_capacity(self.transforms.len());

        for (idx, spec) in self.transforms.iter().enumerate() {
            let transform = instantiate_transform(spec, defaults).with_context(|| {
                format!("Step {}: {}", idx + 1, spec.transform_type)
            })?;
            let input = steps.last().map_or(frame, |(_, applied)| &applied.frame);
            let applied = transform
                .apply(input)
                .with_context(|| format!("Step {}: {}", idx + 1, spec.transform_type))?;
            steps.push((transform.spec(), applied));
        }

        Ok(steps)
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

/// Instantiate a concrete transform from a spec
pub fn instantiate_transform(
    spec: &TransformSpec,
    defaults: TransformDefaults,
) -> Result<Box<dyn Transform>> {
    match spec.transform_type.replace('-', "_").as_str() {
        "clean_missing" => Ok(Box::new(ImputeTransform::from_parameters(
            &spec.parameters,
            defaults,
        )?)),
        "remove_outliers" => Ok(Box::new(OutlierTransform::from_parameters(
            &spec.parameters,
        )?)),
        "scale_data" => Ok(Box::new(ScaleTransform::from_parameters(&spec.parameters)?)),
        other => Err(AnalyzerError::InvalidParameter(format!(
            "Unknown transform type: {other}"
        ))),
    }
}

fn required_str<'a>(params: &'a HashMap<String, serde_json::Value>, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| AnalyzerError::InvalidParameter(format!("Missing '{key}' parameter")))
}

fn optional<T: serde::de::DeserializeOwned>(
    params: &HashMap<String, serde_json::Value>,
    key: &str,
) -> Result<Option<T>> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .with_context(|| format!("Invalid '{key}' parameter")),
    }
}

fn columns_value(columns: Option<&Vec<String>>) -> Option<serde_json::Value> {
    columns.map(|cols| serde_json::Value::from(cols.clone()))
}

// ============================================================================
// Concrete Transform Implementations
// ============================================================================

/// Missing-value handling (`clean-missing`)
#[derive(Debug, Clone)]
pub struct ImputeTransform {
    method: ImputeMethod,
    columns: Option<Vec<String>>,
    neighbors: usize,
}

impl ImputeTransform {
    pub fn new(method: ImputeMethod, columns: Option<Vec<String>>, neighbors: usize) -> Self {
        Self {
            method,
            columns,
            neighbors,
        }
    }

    pub fn from_parameters(
        params: &HashMap<String, serde_json::Value>,
        defaults: TransformDefaults,
    ) -> Result<Self> {
        let method = required_str(params, "operation")?.parse()?;
        let columns = optional(params, "columns")?;
        let neighbors = optional(params, "n_neighbors")?.unwrap_or(defaults.knn_neighbors);
        Ok(Self::new(method, columns, neighbors))
    }
}

impl Transform for ImputeTransform {
    fn apply(&self, frame: &TabularFrame) -> Result<Applied> {
        let outcome = impute_missing(frame, self.method, self.columns.as_deref(), self.neighbors)?;
        let message = match self.method {
            ImputeMethod::DropMissing => format!(
                "Removed {} rows with missing values",
                frame.height() - outcome.frame.height()
            ),
            ImputeMethod::FillMean => "Filled missing values with column means".to_owned(),
            ImputeMethod::FillMedian => "Filled missing values with column medians".to_owned(),
            ImputeMethod::FillMode => "Filled missing values with column modes".to_owned(),
            ImputeMethod::KnnImpute => "Filled missing values using KNN imputation".to_owned(),
        };
        Ok(Applied {
            frame: outcome.frame,
            message,
            columns: outcome.columns,
            skipped_columns: outcome.skipped_columns,
        })
    }

    fn name(&self) -> &'static str {
        "clean_missing"
    }

    fn parameters(&self) -> HashMap<String, serde_json::Value> {
        let mut params = HashMap::new();
        params.insert("operation".to_owned(), self.method.as_str().into());
        if let Some(cols) = columns_value(self.columns.as_ref()) {
            params.insert("columns".to_owned(), cols);
        }
        if self.method == ImputeMethod::KnnImpute {
            params.insert("n_neighbors".to_owned(), self.neighbors.into());
        }
        params
    }

    fn description(&self) -> String {
        match &self.columns {
            Some(cols) => format!("{} on {} columns", self.method.as_str(), cols.len()),
            None => self.method.as_str().to_owned(),
        }
    }
}

/// Outlier filtering (`remove-outliers`)
#[derive(Debug, Clone)]
pub struct OutlierTransform {
    method: OutlierMethod,
    columns: Option<Vec<String>>,
    threshold: Option<f64>,
}

impl OutlierTransform {
    pub fn new(method: OutlierMethod, columns: Option<Vec<String>>, threshold: Option<f64>) -> Self {
        Self {
            method,
            columns,
            threshold,
        }
    }

    pub fn from_parameters(params: &HashMap<String, serde_json::Value>) -> Result<Self> {
        let method = required_str(params, "method")?.parse()?;
        Ok(Self::new(
            method,
            optional(params, "columns")?,
            optional(params, "threshold")?,
        ))
    }

    /// Runs the filter; a dry run reports counts without building a frame.
    pub fn run(&self, frame: &TabularFrame, dry_run: bool) -> Result<OutlierOutcome> {
        remove_outliers(
            frame,
            self.method,
            self.columns.as_deref(),
            self.threshold,
            dry_run,
        )
    }

    pub fn message(&self, outcome: &OutlierOutcome) -> String {
        format!(
            "Removed {} outliers using {} method",
            outcome.outliers_removed(),
            self.method.as_str()
        )
    }
}

impl Transform for OutlierTransform {
    fn apply(&self, frame: &TabularFrame) -> Result<Applied> {
        let outcome = self.run(frame, false)?;
        let message = self.message(&outcome);
        let columns = outcome.bounds.iter().map(|b| b.column.clone()).collect();
        let frame = outcome
            .frame
            .ok_or_else(|| AnalyzerError::Other("Outlier filter produced no frame".to_owned()))?;
        Ok(Applied {
            frame,
            message,
            columns,
            skipped_columns: Vec::new(),
        })
    }

    fn name(&self) -> &'static str {
        "remove_outliers"
    }

    fn parameters(&self) -> HashMap<String, serde_json::Value> {
        let mut params = HashMap::new();
        params.insert("method".to_owned(), self.method.as_str().into());
        if let Some(cols) = columns_value(self.columns.as_ref()) {
            params.insert("columns".to_owned(), cols);
        }
        if let Some(threshold) = self.threshold {
            params.insert("threshold".to_owned(), threshold.into());
        }
        params
    }

    fn description(&self) -> String {
        format!("Remove outliers ({})", self.method.as_str())
    }
}

/// Column rescaling (`scale-data`)
#[derive(Debug, Clone)]
pub struct ScaleTransform {
    method: ScaleMethod,
    columns: Option<Vec<String>>,
}

impl ScaleTransform {
    pub fn new(method: ScaleMethod, columns: Option<Vec<String>>) -> Self {
        Self { method, columns }
    }

    pub fn from_parameters(params: &HashMap<String, serde_json::Value>) -> Result<Self> {
        let method = required_str(params, "method")?.parse()?;
        Ok(Self::new(method, optional(params, "columns")?))
    }
}

impl Transform for ScaleTransform {
    fn apply(&self, frame: &TabularFrame) -> Result<Applied> {
        let (scaled, columns) = scale_columns(frame, self.method, self.columns.as_deref())?;
        Ok(Applied {
            frame: scaled,
            message: format!("Applied {}", self.method.description()),
            columns,
            skipped_columns: Vec::new(),
        })
    }

    fn name(&self) -> &'static str {
        "scale_data"
    }

    fn parameters(&self) -> HashMap<String, serde_json::Value> {
        let mut params = HashMap::new();
        params.insert("method".to_owned(), self.method.as_str().into());
        if let Some(cols) = columns_value(self.columns.as_ref()) {
            params.insert("columns".to_owned(), cols);
        }
        params
    }

    fn description(&self) -> String {
        self.method.description().to_owned()
    }
}
