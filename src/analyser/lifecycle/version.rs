//! Registered dataset entries and their derivation lineage

use super::transforms::TransformSpec;
use crate::analyser::logic::frame::TabularFrame;
use crate::analyser::logic::types::DataInfo;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// One immutable, addressable dataset.
///
/// Entries are never edited after registration; a cleaning operation yields a
/// new entry whose `parent_id` points back here.
#[derive(Debug, Clone)]
pub struct DatasetEntry {
    pub id: String,
    pub frame: Arc<TabularFrame>,
    pub info: DataInfo,
    pub parent_id: Option<String>,
    /// Operation that produced this entry; `None` for uploads.
    pub operation: Option<TransformSpec>,
    pub created_at: DateTime<Utc>,
}

impl DatasetEntry {
    pub fn new(
        frame: TabularFrame,
        info: DataInfo,
        parent_id: Option<String>,
        operation: Option<TransformSpec>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            frame: Arc::new(frame),
            info,
            parent_id,
            operation,
            created_at: Utc::now(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            data_id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            filename: self.info.filename.clone(),
            rows: self.info.rows,
            columns: self.info.columns,
            operation: self.operation.as_ref().map(|op| op.transform_type.clone()),
            created_at: self.created_at,
        }
    }
}

/// Listing row for an entry, without its frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySummary {
    pub data_id: String,
    pub parent_id: Option<String>,
    pub filename: String,
    pub rows: usize,
    pub columns: usize,
    pub operation: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parent links of a set of entries
pub struct VersionTree<'a> {
    entries: &'a HashMap<String, DatasetEntry>,
}

impl<'a> VersionTree<'a> {
    pub fn new(entries: &'a HashMap<String, DatasetEntry>) -> Self {
        Self { entries }
    }

    /// Chain from the oldest reachable ancestor down to `id`.
    ///
    /// The walk stops early at an evicted ancestor.
    pub fn get_lineage(&self, id: &str) -> Vec<&'a DatasetEntry> {
        let mut lineage = Vec::new();
        let mut current = self.entries.get(id);

        while let Some(entry) = current {
            lineage.push(entry);
            current = entry
                .parent_id
                .as_deref()
                .and_then(|parent| self.entries.get(parent));
        }

        lineage.reverse();
        lineage
    }

    /// Entries derived directly from `id`.
    pub fn get_children(&self, id: &str) -> Vec<&'a DatasetEntry> {
        self.entries
            .values()
            .filter(|e| e.parent_id.as_deref() == Some(id))
            .collect()
    }
}
