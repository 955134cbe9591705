//! Logging setup for statanalyzer
//!
//! Console output plus daily-rotating log files in the configured directory.
//!
//! ## Files
//!
//! - `statanalyzer.<date>.log`: everything the filter lets through
//! - `error.<date>.log`: warnings and errors only
//!
//! ## Usage
//!
//! ```no_run
//! use statanalyzer::config::LogSettings;
//! use statanalyzer::logging;
//!
//! logging::init(&LogSettings::default()).expect("Failed to initialize logging");
//! tracing::info!("Service started");
//! ```

use crate::config::LogSettings;
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Resolves and creates the log directory.
///
/// Defaults to `<data dir>/statanalyzer/logs`, e.g. `~/.local/share/statanalyzer/logs`
/// on Linux.
pub fn get_log_dir(settings: &LogSettings) -> Result<PathBuf> {
    let log_dir = match &settings.directory {
        Some(dir) => dir.clone(),
        None => dirs::data_dir()
            .context("Failed to determine data directory")?
            .join("statanalyzer")
            .join("logs"),
    };

    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }

    Ok(log_dir)
}

fn file_appender(log_dir: &Path, prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("Failed to create {prefix} file appender"))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns error if the log directory cannot be created, an appender fails, or
/// a subscriber is already installed.
pub fn init(settings: &LogSettings) -> Result<()> {
    // RUST_LOG wins over the configured level
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .context("Failed to create env filter")?;

    // stderr keeps stdout free for command output
    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .with_file(true)
        .with_writer(std::io::stderr);

    let file_layers = if settings.file_logging {
        let log_dir = get_log_dir(settings)?;
        let all_logs_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(file_appender(&log_dir, "statanalyzer")?);
        let error_logs_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(file_appender(&log_dir, "error")?)
            .with_filter(EnvFilter::new("warn"));
        Some((all_logs_layer.and_then(error_logs_layer), log_dir))
    } else {
        None
    };
    let (file_layer, log_dir) = file_layers.unzip();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    match log_dir {
        Some(dir) => tracing::info!("Logging initialized, log directory: {}", dir.display()),
        None => tracing::info!("Logging initialized (console only)"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_log_dir_is_created() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let settings = LogSettings {
            directory: Some(tmp.path().join("logs")),
            ..LogSettings::default()
        };
        let dir = get_log_dir(&settings)?;
        assert!(dir.is_dir());
        assert!(dir.ends_with("logs"));
        Ok(())
    }
}
