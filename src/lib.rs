//! # statanalyzer - Statistical Analysis Service
//!
//! statanalyzer loads tabular data (CSV/XLSX), tracks every cleaned
//! derivation of it under its own identity, and computes descriptive
//! statistics, hypothesis tests, ANOVA, regression and normality diagnostics
//! against any of those identities.
//!
//! ## Quick Start
//!
//! ```
//! use statanalyzer::commands::{AnalyzerService, CleanMissingRequest};
//!
//! # fn example() -> statanalyzer::error::Result<()> {
//! let service = AnalyzerService::default();
//! let upload = service.upload(b"x,y\n1,2\n2,\n3,6\n", "pairs.csv", None)?;
//!
//! // Cleaning never edits the upload; it registers a new identity
//! let cleaned = service.clean_missing(&CleanMissingRequest {
//!     data_id: upload.data_id.clone(),
//!     operation: "fill_mean".to_owned(),
//!     columns: None,
//!     n_neighbors: None,
//! })?;
//!
//! let stats = service.statistics(&cleaned.new_data_id)?;
//! assert_eq!(stats.summary.len(), 2);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Core Modules
//!
//! - [`analyser`]: Data model and engines
//!   - [`analyser::logic`]: Frames, classification, cleaning, statistics, inference
//!   - [`analyser::lifecycle`]: Dataset registry, lineage and serializable transforms
//! - [`commands`]: Request/response operations over the registry
//! - [`server`]: HTTP routes (axum)
//! - [`config`]: JSON configuration
//! - [`logging`]: tracing setup
//! - [`error`]: Error types and handling utilities
//!
//! ## Key Concepts
//!
//! ### Immutable Identities
//!
//! A registered dataset never changes. Each cleaning operation creates a new
//! entry with a `parent_id`, so a user can clean once and branch several
//! analyses off the exact same snapshot.
//!
//! ### Classification Once
//!
//! Columns are classified as numeric or categorical when a frame is built and
//! the result is cached in its `DataInfo`; engines validate against it instead
//! of re-inferring.
//!
//! ### Type-Safe Error Handling
//!
//! Every core failure is an [`error::AnalyzerError`] carrying a user-facing
//! message and an HTTP-equivalent status.

#![warn(clippy::all, rust_2018_idioms)]

pub mod analyser;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
