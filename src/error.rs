//! Centralized error handling for the statanalyzer service.
//!
//! Every failure the core can produce is one variant of [`AnalyzerError`].
//! Each variant carries a human-readable message that the presentation
//! layer shows verbatim, and maps to an HTTP-equivalent status code:
//!
//! ```
//! use statanalyzer::error::AnalyzerError;
//!
//! let err = AnalyzerError::NotFound("Dataset not found: abc".to_owned());
//! assert_eq!(err.status_code(), 404);
//! assert_eq!(err.error_code(), "NOT_FOUND");
//! ```
//!
//! ## Context Extension Trait
//!
//! The `ResultExt` trait adds `.context()` to any `Result` whose error
//! converts into [`AnalyzerError`]. The variant is preserved, only the
//! message is prefixed:
//!
//! ```
//! use statanalyzer::error::{AnalyzerError, ResultExt as _};
//!
//! let res: Result<(), AnalyzerError> = Err(AnalyzerError::Parse("bad row".to_owned()));
//! let err = res.context("Failed to read upload").unwrap_err();
//! assert_eq!(err.status_code(), 400);
//! assert!(err.to_string().contains("Failed to read upload"));
//! ```

use std::fmt;

/// Main error type for statanalyzer operations.
#[derive(Debug)]
pub enum AnalyzerError {
    /// Unknown dataset identity
    NotFound(String),

    /// Referenced column is missing or has the wrong kind for the operation
    InvalidColumn(String),

    /// Sample size below a statistical method's minimum
    InsufficientData(String),

    /// The operation would produce a frame with zero rows
    EmptyFrame(String),

    /// Malformed upload bytes
    Parse(String),

    /// Unknown operation/method name or out-of-range parameter
    InvalidParameter(String),

    /// I/O errors (config files, log directories, uploads read from disk)
    Io(std::io::Error),

    /// Generic error with context
    Other(String),
}

impl AnalyzerError {
    /// HTTP-equivalent status for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidColumn(_)
            | Self::InsufficientData(_)
            | Self::EmptyFrame(_)
            | Self::Parse(_)
            | Self::InvalidParameter(_) => 400,
            Self::Io(_) | Self::Other(_) => 500,
        }
    }

    /// Stable machine-readable code for clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidColumn(_) => "INVALID_COLUMN",
            Self::InsufficientData(_) => "INSUFFICIENT_DATA",
            Self::EmptyFrame(_) => "EMPTY_FRAME",
            Self::Parse(_) => "PARSE_ERROR",
            Self::InvalidParameter(_) => "INVALID_PARAMETER",
            Self::Io(_) | Self::Other(_) => "INTERNAL",
        }
    }

    /// Same variant, message prefixed with `prefix`.
    fn with_prefix(self, prefix: &str) -> Self {
        match self {
            Self::NotFound(msg) => Self::NotFound(format!("{prefix}: {msg}")),
            Self::InvalidColumn(msg) => Self::InvalidColumn(format!("{prefix}: {msg}")),
            Self::InsufficientData(msg) => Self::InsufficientData(format!("{prefix}: {msg}")),
            Self::EmptyFrame(msg) => Self::EmptyFrame(format!("{prefix}: {msg}")),
            Self::Parse(msg) => Self::Parse(format!("{prefix}: {msg}")),
            Self::InvalidParameter(msg) => Self::InvalidParameter(format!("{prefix}: {msg}")),
            Self::Io(e) => Self::Other(format!("{prefix}: I/O error: {e}")),
            Self::Other(msg) => Self::Other(format!("{prefix}: {msg}")),
        }
    }
}

impl fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg)
            | Self::InvalidColumn(msg)
            | Self::InsufficientData(msg)
            | Self::EmptyFrame(msg)
            | Self::InvalidParameter(msg)
            | Self::Other(msg) => write!(f, "{msg}"),
            Self::Parse(msg) => write!(f, "Parse error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for AnalyzerError {}

impl From<std::io::Error> for AnalyzerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for AnalyzerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<serde_json::Error> for AnalyzerError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidParameter(format!("JSON error: {err}"))
    }
}

impl From<polars::error::PolarsError> for AnalyzerError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<calamine::Error> for AnalyzerError {
    fn from(err: calamine::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<AnalyzerError> for String {
    fn from(err: AnalyzerError) -> Self {
        err.to_string()
    }
}

/// Result type alias for statanalyzer operations.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<AnalyzerError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_prefix(&msg.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_prefix(&f()))
    }
}
