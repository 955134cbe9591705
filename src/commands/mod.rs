//! Request-facing operations
//!
//! [`AnalyzerService`] resolves dataset identities through the shared
//! [`DatasetRegistry`], runs the cleaning and analysis engines, and registers
//! every successful cleaning result as a new identity. Request and response
//! types mirror the JSON the HTTP layer exchanges.

pub mod analysis;
pub mod cleaning;
pub mod datasets;

pub use analysis::{
    AnovaRequest, HypothesisTestRequest, NormalityTestRequest, RegressionRequest,
};
pub use cleaning::{
    ApplyPipelineRequest, CleanMissingRequest, CleanMissingResponse, PipelineResponse,
    RemoveOutliersRequest, RemoveOutliersResponse, ScaleDataRequest, ScaleDataResponse,
};
pub use datasets::{HealthResponse, PreviewResponse, UploadResponse};

use crate::analyser::lifecycle::{DatasetEntry, DatasetRegistry, TransformDefaults};
use crate::config::AnalysisSettings;
use crate::error::Result;

/// Orchestrates the registry and the engines for one process.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone, Default)]
pub struct AnalyzerService {
    registry: DatasetRegistry,
    settings: AnalysisSettings,
}

impl AnalyzerService {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self {
            registry: DatasetRegistry::new(),
            settings,
        }
    }

    pub fn registry(&self) -> &DatasetRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    fn resolve(&self, data_id: &str) -> Result<DatasetEntry> {
        self.registry.resolve(data_id)
    }

    fn transform_defaults(&self) -> TransformDefaults {
        TransformDefaults {
            knn_neighbors: self.settings.knn_neighbors,
        }
    }

    fn alpha(&self, requested: Option<f64>) -> f64 {
        requested.unwrap_or(self.settings.default_alpha)
    }
}
