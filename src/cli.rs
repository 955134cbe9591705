use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use statanalyzer::analyser::logic::types::DataInfo;
use statanalyzer::analyser::logic::statistics::StatisticsReport;
use statanalyzer::commands::AnalyzerService;
use statanalyzer::config::{AppConfig, default_config_path, load_config, save_config};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "statanalyzer",
    version,
    about = "Statistical analysis service with an identity-tracked cleaning pipeline"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Path to a JSON config file
        #[arg(short, long, env = "STATANALYZER_CONFIG")]
        config: Option<PathBuf>,

        /// Address to bind (overrides the config file)
        #[arg(long, env = "STATANALYZER_HOST")]
        host: Option<String>,

        /// Port to bind (overrides the config file)
        #[arg(short, long, env = "STATANALYZER_PORT")]
        port: Option<u16>,
    },
    /// Load a CSV/XLSX file and print its classification and statistics
    Inspect {
        /// File to analyse; the format comes from its extension
        file: PathBuf,

        /// Path to a JSON config file
        #[arg(short, long, env = "STATANALYZER_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Write a config file holding the default settings
    InitConfig {
        /// Destination; defaults to the per-user data directory
        path: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    pub fn config_path(&self) -> Option<&Path> {
        match self {
            Self::Serve { config, .. } | Self::Inspect { config, .. } => config.as_deref(),
            Self::InitConfig { .. } => None,
        }
    }
}

#[derive(Serialize)]
struct InspectReport {
    data_id: String,
    #[serde(flatten)]
    info: DataInfo,
    statistics: Option<StatisticsReport>,
}

/// Config from an explicit path, else the default location, else defaults.
pub fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = path.map(Path::to_path_buf).or_else(default_config_path);
    match path {
        Some(path) => Ok(load_config(&path)?),
        None => Ok(AppConfig::default()),
    }
}

pub async fn run_command(command: Commands, mut config: AppConfig) -> Result<()> {
    match command {
        Commands::Serve { host, port, .. } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            statanalyzer::server::serve(&config).await
        }
        Commands::Inspect { file, .. } => handle_inspect(&file, config),
        Commands::InitConfig { path, force } => handle_init_config(path, force),
    }
}

fn handle_init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path
        .or_else(default_config_path)
        .context("No data directory available; pass a config path")?;
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; use --force to overwrite it",
            path.display()
        );
    }
    save_config(&path, &AppConfig::default())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote default config to {}", path.display());
    println!("{}", path.display());
    Ok(())
}

fn handle_inspect(file: &Path, config: AppConfig) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let service = AnalyzerService::new(config.analysis);
    let upload = service.upload(&bytes, &filename, None)?;

    let statistics = if upload.info.numeric_columns.is_empty() {
        tracing::warn!("{filename} has no numeric columns; skipping statistics");
        None
    } else {
        Some(service.statistics(&upload.data_id)?)
    };

    let report = InspectReport {
        data_id: upload.data_id,
        info: upload.info,
        statistics,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_config_refuses_to_overwrite() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("config.json");

        handle_init_config(Some(path.clone()), false)?;
        assert_eq!(load_config(&path)?, AppConfig::default());
        assert!(handle_init_config(Some(path.clone()), false).is_err());

        std::fs::write(&path, "{ broken")?;
        handle_init_config(Some(path.clone()), true)?;
        assert_eq!(load_config(&path)?, AppConfig::default());
        Ok(())
    }
}
