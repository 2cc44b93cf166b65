//! Dashboard configuration
//!
//! Read from `dashboard.json` in the working directory when present. Every
//! field is optional; missing fields take their defaults.

use crate::charts::{ChartKind, ColorTheme};
use crate::pipeline::DashboardMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const CONFIG_FILE: &str = "dashboard.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub workbook_path: PathBuf,
    pub sales_sheet: String,
    pub export_file_name: String,
    pub export_sheet: String,
    pub default_theme: ColorTheme,
    pub default_chart_kind: ChartKind,
    pub default_mode: DashboardMode,
    /// Rows shown in the data preview
    pub preview_rows: usize,
    /// Saved PNG size in pixels
    pub chart_width: u32,
    pub chart_height: u32,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            workbook_path: PathBuf::from("sales_report.xlsx"),
            sales_sheet: "Sales Data".to_string(),
            export_file_name: "filtered_sales.xlsx".to_string(),
            export_sheet: "Filtered Sales".to_string(),
            default_theme: ColorTheme::Plotly,
            default_chart_kind: ChartKind::Bar,
            default_mode: DashboardMode::Explorer,
            preview_rows: 10,
            chart_width: 1200,
            chart_height: 700,
            log_filter: "info".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Parse the file at `path`, or fall back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}
