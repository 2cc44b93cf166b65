//! Excel Dashboard - Workbook Filters, Charts & Export
//!
//! A Rust application for exploring Excel workbooks and sales data with
//! interactive charts, summary statistics and filtered exports.

mod charts;
mod config;
mod data;
mod gui;
mod pipeline;
mod stats;

use anyhow::Context;
use config::{DashboardConfig, CONFIG_FILE};
use eframe::egui;
use gui::ExcelDashboardApp;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config = DashboardConfig::load_or_default(Path::new(CONFIG_FILE))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::info!(workbook = %config.workbook_path.display(), "Starting Excel Dashboard");

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title("Excel Dashboard"),
        ..Default::default()
    };

    eframe::run_native(
        "Excel Dashboard",
        options,
        Box::new(|cc| Ok(Box::new(ExcelDashboardApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {e}"))
}
