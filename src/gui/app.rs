//! Excel Dashboard Main Application
//! Main window with control panel and chart viewer.

use crate::charts::StaticChartRenderer;
use crate::config::DashboardConfig;
use crate::data::{date_span, distinct_values, sales_columns, DataLoader};
use crate::gui::chart_viewer::{SalesCharts, TablePreview, ViewerContent};
use crate::gui::control_panel::UserSettings;
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use crate::pipeline::{self, DashboardMode, ExplorerView, PipelineError, SalesView, StageResult};
use egui::SidePanel;
use polars::prelude::*;
use std::sync::Arc;
use tracing::{info, warn};

/// Main application window.
pub struct ExcelDashboardApp {
    config: DashboardConfig,
    loader: DataLoader,
    base_table: Option<Arc<DataFrame>>,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,
}

impl ExcelDashboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: DashboardConfig) -> Self {
        let settings = UserSettings {
            workbook_path: config.workbook_path.clone(),
            mode: config.default_mode,
            chart_kind: config.default_chart_kind,
            theme: config.default_theme,
            ..Default::default()
        };
        let mut app = Self {
            loader: DataLoader::new(),
            base_table: None,
            control_panel: ControlPanel::new(settings),
            chart_viewer: ChartViewer::new(),
            config,
        };
        app.reload_base_table();
        app
    }

    /// Load the base table of the active dashboard, then recompute the view.
    fn reload_base_table(&mut self) {
        self.chart_viewer.clear();
        self.control_panel.clear_options();

        let settings = &self.control_panel.settings;
        let loaded = pipeline::load_table(
            &mut self.loader,
            &settings.workbook_path,
            settings.mode,
            &self.config.sales_sheet,
        )
        .and_then(|table| self.prepare_options(&table).map(|_| table));

        match loaded {
            Ok(table) => {
                self.control_panel.set_status(&format!(
                    "Loaded {} rows, {} columns",
                    table.height(),
                    table.width()
                ));
                self.base_table = Some(table);
                self.recompute();
            }
            Err(err) => {
                self.base_table = None;
                self.fail(&err);
            }
        }
        self.sync_panel_state();
    }

    /// Fill the pickers and the preview from a freshly loaded table.
    fn prepare_options(&mut self, table: &DataFrame) -> StageResult<()> {
        self.chart_viewer.preview = Some(TablePreview::from_table(table, self.config.preview_rows)?);
        let columns = table
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.control_panel.update_columns(columns);

        if self.control_panel.settings.mode == DashboardMode::Sales {
            let products = distinct_values(table, sales_columns::PRODUCT)?;
            let span = date_span(table, sales_columns::DATE)?;
            self.control_panel.update_sales_options(products, span);
        }
        Ok(())
    }

    /// Recompute the active view from the cached base table.
    fn recompute(&mut self) {
        let Some(table) = self.base_table.clone() else {
            return;
        };

        let settings = &self.control_panel.settings;
        let content = match settings.mode {
            DashboardMode::Explorer => {
                ExplorerView::compute(
                    &table,
                    &settings.category_col,
                    &settings.value_col,
                    settings.grouping,
                )
                .map(ViewerContent::Explorer)
            }
            DashboardMode::Sales => self
                .control_panel
                .sales_filter()
                .map_err(PipelineError::from)
                .and_then(|filter| SalesView::compute(&table, &filter))
                .and_then(SalesCharts::new)
                .map(ViewerContent::Sales),
        };

        match content {
            Ok(content) => self.chart_viewer.content = content,
            Err(err) => self.fail(&err),
        }
        self.sync_panel_state();
    }

    fn fail(&mut self, err: &PipelineError) {
        warn!(error = %err, "Dashboard stage failed");
        self.chart_viewer.set_error(err);
        self.control_panel.set_status(&format!("Error: {err}"));
    }

    fn sync_panel_state(&mut self) {
        self.control_panel.has_table = self.base_table.is_some();
        self.control_panel.has_chart = self.chart_viewer.has_chart();
    }

    fn handle_browse_workbook(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Spreadsheets", &["xlsx", "xlsm", "xlsb", "xls", "ods"])
            .pick_file()
        {
            info!(path = %path.display(), "Workbook selected");
            self.control_panel.settings.workbook_path = path;
            self.reload_base_table();
        }
    }

    fn handle_reload(&mut self) {
        let dropped = self.loader.invalidate(&self.control_panel.settings.workbook_path);
        info!(dropped, cached = self.loader.cached_tables(), "Workbook cache invalidated");
        self.reload_base_table();
    }

    /// Save the filtered sales rows to a workbook chosen by the user.
    fn handle_export_filtered(&mut self) {
        let ViewerContent::Sales(charts) = &self.chart_viewer.content else {
            self.control_panel.set_status("Nothing to export");
            return;
        };

        let Some(path) = rfd::FileDialog::new()
            .add_filter("Excel Files", &["xlsx"])
            .set_file_name(&self.config.export_file_name)
            .save_file()
        else {
            return;
        };

        match charts.view.save(&path, &self.config.export_sheet) {
            Ok(()) => {
                self.control_panel.set_status(&format!(
                    "Exported {} rows to {}",
                    charts.view.table.height(),
                    path.display()
                ));
            }
            Err(err) => self.fail(&err),
        }
    }

    /// Render the main chart to PNG and open it.
    fn handle_save_chart(&mut self) {
        let settings = &self.control_panel.settings;
        let Some(series) = self.chart_viewer.primary_series(settings) else {
            return;
        };

        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG Image", &["png"])
            .set_file_name("chart.png")
            .save_file()
        else {
            return;
        };

        let saved = StaticChartRenderer::render_png(
            &series,
            settings.chart_kind,
            settings.theme,
            self.config.chart_width,
            self.config.chart_height,
        )
        .map_err(PipelineError::from)
        .and_then(|png| Ok(std::fs::write(&path, png)?));

        match saved {
            Ok(()) => {
                self.control_panel
                    .set_status(&format!("Chart saved to {}", path.display()));
                if let Err(e) = open::that(&path) {
                    warn!(error = %e, "Could not open the saved chart");
                }
            }
            Err(err) => self.fail(&err),
        }
    }
}

impl eframe::App for ExcelDashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(350.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::BrowseWorkbook => self.handle_browse_workbook(),
                        ControlPanelAction::Reload => self.handle_reload(),
                        ControlPanelAction::ModeChanged => self.reload_base_table(),
                        ControlPanelAction::SelectionChanged => self.recompute(),
                        ControlPanelAction::ExportFiltered => self.handle_export_filtered(),
                        ControlPanelAction::SaveChart => self.handle_save_chart(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Chart Viewer
        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer.show(ui, &self.control_panel.settings);
        });
    }
}
