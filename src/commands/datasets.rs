use super::AnalyzerService;
use crate::analyser::lifecycle::EntrySummary;
use crate::analyser::logic::io::{Format, load_frame};
use crate::analyser::logic::statistics::{ColumnSummary, describe};
use crate::analyser::logic::types::{ColumnKind, DataInfo};
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

type PreviewRow = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub datasets: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub data_id: String,
    #[serde(flatten)]
    pub info: DataInfo,
    pub preview: Vec<PreviewRow>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub data_id: String,
    pub shape: [usize; 2],
    pub columns: Vec<String>,
    pub dtypes: BTreeMap<String, ColumnKind>,
    pub missing_values: BTreeMap<String, usize>,
    pub summary_stats: Vec<ColumnSummary>,
    pub preview: Vec<PreviewRow>,
}

impl AnalyzerService {
    pub fn health(&self) -> Result<HealthResponse> {
        Ok(HealthResponse {
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
            datasets: self.registry.count()?,
        })
    }

    /// Parse uploaded bytes and register them as a root dataset.
    ///
    /// `format` falls back to the filename extension when absent.
    pub fn upload(&self, bytes: &[u8], filename: &str, format: Option<&str>) -> Result<UploadResponse> {
        let format = match format {
            Some(declared) => declared.parse()?,
            None => Format::from_filename(filename)?,
        };
        let frame = load_frame(bytes, format)?;
        let preview = frame.preview(self.settings.preview_rows);
        let entry = self.registry.register(frame, filename, None, None)?;

        info!(
            "Uploaded {filename} as {} ({} numeric, {} categorical columns)",
            entry.id,
            entry.info.numeric_columns.len(),
            entry.info.categorical_columns.len()
        );
        Ok(UploadResponse {
            data_id: entry.id,
            info: entry.info,
            preview,
        })
    }

    pub fn data_preview(&self, data_id: &str, rows: Option<usize>) -> Result<PreviewResponse> {
        let entry = self.resolve(data_id)?;
        let frame = &entry.frame;

        let mut dtypes = BTreeMap::new();
        let mut missing_values = BTreeMap::new();
        for column in frame.columns() {
            dtypes.insert(column.name().to_owned(), column.kind());
            missing_values.insert(column.name().to_owned(), column.null_count());
        }

        Ok(PreviewResponse {
            data_id: entry.id.clone(),
            shape: [frame.height(), frame.width()],
            columns: frame.column_names(),
            dtypes,
            missing_values,
            summary_stats: describe(frame),
            preview: frame.preview(rows.unwrap_or(self.settings.preview_rows)),
        })
    }

    pub fn datasets(&self) -> Result<Vec<EntrySummary>> {
        self.registry.list()
    }

    pub fn lineage(&self, data_id: &str) -> Result<Vec<EntrySummary>> {
        self.registry.lineage(data_id)
    }

    /// Datasets derived directly from `data_id`, oldest first.
    pub fn children(&self, data_id: &str) -> Result<Vec<EntrySummary>> {
        self.registry.children(data_id)
    }

    pub fn evict(&self, data_id: &str) -> Result<EntrySummary> {
        Ok(self.registry.evict(data_id)?.summary())
    }
}
