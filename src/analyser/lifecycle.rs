//! Dataset registry and derivation lineage
//!
//! Every uploaded or derived table lives here as an immutable [`DatasetEntry`]
//! under an opaque identity:
//! - **Uploads** are root entries (`parent_id` is `None`)
//! - **Cleaning operations** register a new entry pointing at the entry they
//!   were applied to, recording the [`TransformSpec`] that produced it
//! - **Pipelines** register one entry per step, all or nothing
//!
//! ## Key Principles
//!
//! - **Immutability**: entries are never overwritten; branching is free
//! - **Serialization**: every operation is a JSON-serializable transform spec
//! - **Classification once**: `DataInfo` is computed at registration and cached
//!
//! ## Example Usage
//!
//! ```
//! use statanalyzer::analyser::lifecycle::{DatasetRegistry, TransformSpec};
//! use statanalyzer::analyser::logic::{Format, load_frame};
//!
//! # fn example() -> statanalyzer::error::Result<()> {
//! let registry = DatasetRegistry::new();
//!
//! let frame = load_frame(b"v\n1\n3\n4\n", Format::Csv)?;
//! let raw = registry.register(frame, "values.csv", None, None)?;
//!
//! let cleaned = registry.register(
//!     raw.frame.as_ref().clone(),
//!     &raw.info.filename,
//!     Some(&raw.id),
//!     Some(TransformSpec::new("clean_missing").with("operation", "drop_missing")),
//! )?;
//!
//! let lineage = registry.lineage(&cleaned.id)?;
//! assert_eq!(lineage.len(), 2);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod transforms;
pub mod version;

pub use transforms::{
    Applied, Transform, TransformDefaults, TransformPipeline, TransformSpec, instantiate_transform,
};
pub use version::{DatasetEntry, EntrySummary, VersionTree};

use crate::analyser::logic::classify::classify;
use crate::analyser::logic::frame::TabularFrame;
use crate::error::{AnalyzerError, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

#[derive(Default)]
struct Entries {
    by_id: HashMap<String, DatasetEntry>,
    /// Identities in registration order.
    order: Vec<String>,
}

impl Entries {
    fn insert(&mut self, entry: DatasetEntry) {
        self.order.push(entry.id.clone());
        self.by_id.insert(entry.id.clone(), entry);
    }
}

/// Central registry for all datasets and their derivations
#[derive(Clone, Default)]
pub struct DatasetRegistry {
    entries: Arc<RwLock<Entries>>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Entries>> {
        self.entries
            .read()
            .map_err(|e| AnalyzerError::Other(format!("Lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Entries>> {
        self.entries
            .write()
            .map_err(|e| AnalyzerError::Other(format!("Lock poisoned: {e}")))
    }

    /// Classify `frame` and store it under a fresh identity
    pub fn register(
        &self,
        frame: TabularFrame,
        filename: &str,
        parent_id: Option<&str>,
        operation: Option<TransformSpec>,
    ) -> Result<DatasetEntry> {
        let info = classify(&frame, filename);
        let entry = DatasetEntry::new(frame, info, parent_id.map(str::to_owned), operation);

        self.write()?.insert(entry.clone());
        info!(
            "Registered dataset {} ({} rows x {} columns, parent: {})",
            entry.id,
            entry.info.rows,
            entry.info.columns,
            entry.parent_id.as_deref().unwrap_or("none")
        );
        Ok(entry)
    }

    /// Register a chain of derived frames, each the parent of the next.
    ///
    /// All entries become visible together under one write lock.
    pub fn register_chain(
        &self,
        steps: Vec<(TabularFrame, TransformSpec)>,
        filename: &str,
        parent_id: &str,
    ) -> Result<Vec<DatasetEntry>> {
        let mut chain: Vec<DatasetEntry> = Vec::with_capacity(steps.len());
        for (frame, spec) in steps {
            let parent = chain.last().map_or(parent_id, |e| e.id.as_str()).to_owned();
            let info = classify(&frame, filename);
            chain.push(DatasetEntry::new(frame, info, Some(parent), Some(spec)));
        }

        let mut entries = self.write()?;
        for entry in &chain {
            entries.insert(entry.clone());
        }
        drop(entries);

        info!(
            "Registered pipeline of {} steps derived from {parent_id}",
            chain.len()
        );
        Ok(chain)
    }

    /// Get an entry by ID
    pub fn resolve(&self, id: &str) -> Result<DatasetEntry> {
        self.read()?
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| AnalyzerError::NotFound(format!("Dataset not found: {id}")))
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.read()?.by_id.len())
    }

    /// All entries in registration order
    pub fn list(&self) -> Result<Vec<EntrySummary>> {
        let entries = self.read()?;
        Ok(entries
            .order
            .iter()
            .filter_map(|id| entries.by_id.get(id))
            .map(DatasetEntry::summary)
            .collect())
    }

    /// Chain of entries from the root upload down to `id`
    pub fn lineage(&self, id: &str) -> Result<Vec<EntrySummary>> {
        let entries = self.read()?;
        if !entries.by_id.contains_key(id) {
            return Err(AnalyzerError::NotFound(format!("Dataset not found: {id}")));
        }
        Ok(VersionTree::new(&entries.by_id)
            .get_lineage(id)
            .into_iter()
            .map(DatasetEntry::summary)
            .collect())
    }

    /// Entries derived directly from `id`
    pub fn children(&self, id: &str) -> Result<Vec<EntrySummary>> {
        let entries = self.read()?;
        if !entries.by_id.contains_key(id) {
            return Err(AnalyzerError::NotFound(format!("Dataset not found: {id}")));
        }
        let mut children: Vec<&DatasetEntry> = VersionTree::new(&entries.by_id).get_children(id);
        children.sort_by_key(|e| e.created_at);
        Ok(children.into_iter().map(DatasetEntry::summary).collect())
    }

    /// Remove one entry. Derived entries keep their own frames.
    pub fn evict(&self, id: &str) -> Result<DatasetEntry> {
        let mut entries = self.write()?;
        let entry = entries
            .by_id
            .remove(id)
            .ok_or_else(|| AnalyzerError::NotFound(format!("Dataset not found: {id}")))?;
        entries.order.retain(|existing| existing != id);
        drop(entries);

        info!("Evicted dataset {id}");
        Ok(entry)
    }
}
