use crate::error::{AnalyzerError, Result, ResultExt as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, uploads included
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7860,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Bins of the `statistics` histogram (default: 10)
    pub histogram_bins: usize,
    /// Numeric columns covered by the `statistics` box plot (default: 5)
    pub box_plot_columns: usize,
    pub regression_line_points: usize,
    pub normal_curve_points: usize,
    pub normality_histogram_bins: usize,
    /// Shapiro-Wilk subsamples larger inputs down to this size
    pub shapiro_max_samples: usize,
    pub shapiro_seed: u64,
    pub knn_neighbors: usize,
    /// Rows included in upload and preview responses
    pub preview_rows: usize,
    pub default_alpha: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            histogram_bins: 10,
            box_plot_columns: 5,
            regression_line_points: 100,
            normal_curve_points: 100,
            normality_histogram_bins: 30,
            shapiro_max_samples: 5000,
            shapiro_seed: 42,
            knn_neighbors: 5,
            preview_rows: 10,
            default_alpha: 0.05,
        }
    }
}

impl AnalysisSettings {
    fn validate(&self) -> Result<()> {
        if self.histogram_bins == 0 || self.normality_histogram_bins == 0 {
            return Err(AnalyzerError::InvalidParameter(
                "Histogram bin counts must be positive".to_owned(),
            ));
        }
        if self.knn_neighbors == 0 {
            return Err(AnalyzerError::InvalidParameter(
                "knn_neighbors must be positive".to_owned(),
            ));
        }
        if !(self.default_alpha > 0.0 && self.default_alpha < 1.0) {
            return Err(AnalyzerError::InvalidParameter(format!(
                "default_alpha must be between 0 and 1, got {}",
                self.default_alpha
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Log directory (default: the platform data dir)
    pub directory: Option<PathBuf>,
    pub file_logging: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            directory: None,
            file_logging: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub analysis: AnalysisSettings,
    pub logging: LogSettings,
}

/// Reads a JSON config file.
///
/// A missing file yields the defaults; a malformed one is an error.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: AppConfig = serde_json::from_str(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    config.analysis.validate()?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Default config location: `<data dir>/statanalyzer/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("statanalyzer").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = load_config(&dir.path().join("absent.json"))?;
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.address(), "127.0.0.1:7860");
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"server": {"port": 9000}, "analysis": {"knn_neighbors": 3}}"#)?;

        let config = load_config(&path)?;
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.analysis.knn_neighbors, 3);
        assert_eq!(config.analysis.histogram_bins, 10);
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json")?;
        assert!(load_config(&path).is_err());

        std::fs::write(&path, r#"{"analysis": {"default_alpha": 2.0}}"#)?;
        assert!(matches!(
            load_config(&path),
            Err(AnalyzerError::InvalidParameter(_))
        ));
        Ok(())
    }

    #[test]
    fn test_save_then_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("config.json");
        let mut config = AppConfig::default();
        config.logging.file_logging = false;
        save_config(&path, &config)?;
        assert_eq!(load_config(&path)?, config);
        Ok(())
    }
}
