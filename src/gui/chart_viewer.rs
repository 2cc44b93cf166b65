//! Chart Viewer Widget
//! Central scrollable panel: data preview, charts, metrics and errors.

use crate::charts::{ChartKind, ChartPlotter, ChartSeries};
use crate::data::column_cells;
use crate::gui::control_panel::UserSettings;
use crate::pipeline::{ExplorerView, PipelineError, SalesView, StageResult};
use egui::{Color32, RichText, ScrollArea};
use polars::prelude::*;

const CHART_HEIGHT: f32 = 320.0;
const SECTION_SPACING: f32 = 15.0;

/// First rows of the base table, rendered as text.
#[derive(Debug, Clone, Default)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

impl TablePreview {
    pub fn from_table(df: &DataFrame, max_rows: usize) -> PolarsResult<Self> {
        let head = df.head(Some(max_rows));
        let cells = head
            .get_columns()
            .iter()
            .map(column_cells)
            .collect::<PolarsResult<Vec<_>>>()?;
        let rows = (0..head.height())
            .map(|row| {
                cells
                    .iter()
                    .map(|column| column[row].to_text().unwrap_or_default())
                    .collect()
            })
            .collect();
        Ok(Self {
            columns: df.get_column_names().iter().map(|s| s.to_string()).collect(),
            rows,
            total_rows: df.height(),
        })
    }
}

/// Sales view with its chart series.
#[derive(Debug, Clone)]
pub struct SalesCharts {
    pub view: SalesView,
    pub monthly: ChartSeries,
    pub products: ChartSeries,
    pub units: ChartSeries,
}

impl SalesCharts {
    pub fn new(view: SalesView) -> StageResult<Self> {
        Ok(Self {
            monthly: view.monthly_series()?,
            products: view.product_series()?,
            units: view.units_series()?,
            view,
        })
    }
}

#[derive(Debug, Default)]
pub enum ViewerContent {
    #[default]
    Empty,
    Explorer(ExplorerView),
    Sales(SalesCharts),
    Failed {
        message: String,
        hint: Option<&'static str>,
    },
}

/// Scrollable display of the active dashboard.
#[derive(Default)]
pub struct ChartViewer {
    pub preview: Option<TablePreview>,
    pub content: ViewerContent,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.preview = None;
        self.content = ViewerContent::Empty;
    }

    pub fn set_error(&mut self, err: &PipelineError) {
        self.content = ViewerContent::Failed {
            message: err.to_string(),
            hint: err.hint(),
        };
    }

    pub fn has_chart(&self) -> bool {
        matches!(self.content, ViewerContent::Explorer(_) | ViewerContent::Sales(_))
    }

    /// The main chart of the active dashboard, titled as shown.
    pub fn primary_series(&self, settings: &UserSettings) -> Option<ChartSeries> {
        match &self.content {
            ViewerContent::Explorer(view) => {
                let mut series = view.series.clone();
                series.title = settings.title.clone();
                Some(series)
            }
            ViewerContent::Sales(charts) => Some(charts.products.clone()),
            _ => None,
        }
    }

    pub fn show(&self, ui: &mut egui::Ui, settings: &UserSettings) {
        if self.preview.is_none() && matches!(self.content, ViewerContent::Empty) {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        }

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if let Some(preview) = &self.preview {
                    Self::draw_preview(ui, preview);
                    ui.add_space(SECTION_SPACING);
                    ui.separator();
                    ui.add_space(SECTION_SPACING);
                }

                match &self.content {
                    ViewerContent::Empty => {}
                    ViewerContent::Failed { message, hint } => Self::draw_error(ui, message, *hint),
                    ViewerContent::Explorer(view) => Self::draw_explorer(ui, view, settings),
                    ViewerContent::Sales(charts) => Self::draw_sales(ui, charts, settings),
                }
            });
    }

    fn draw_preview(ui: &mut egui::Ui, preview: &TablePreview) {
        ui.label(RichText::new("Data Preview").size(16.0).strong());
        ui.label(
            RichText::new(format!(
                "{} rows × {} columns",
                preview.total_rows,
                preview.columns.len()
            ))
            .size(11.0)
            .color(Color32::GRAY),
        );
        ui.add_space(5.0);

        ScrollArea::horizontal().id_salt("preview_scroll").show(ui, |ui| {
            egui::Grid::new("preview_grid")
                .striped(true)
                .min_col_width(80.0)
                .show(ui, |ui| {
                    for column in &preview.columns {
                        ui.label(RichText::new(column).strong());
                    }
                    ui.end_row();
                    for row in &preview.rows {
                        for cell in row {
                            ui.label(cell);
                        }
                        ui.end_row();
                    }
                });
        });
    }

    fn draw_error(ui: &mut egui::Ui, message: &str, hint: Option<&str>) {
        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(2.0, Color32::from_rgb(220, 53, 69)))
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.label(
                    RichText::new(format!("⚠ {message}"))
                        .size(14.0)
                        .color(Color32::from_rgb(220, 53, 69)),
                );
                if let Some(hint) = hint {
                    ui.add_space(4.0);
                    ui.label(RichText::new(hint).size(12.0).color(Color32::GRAY));
                }
            });
    }

    fn draw_explorer(ui: &mut egui::Ui, view: &ExplorerView, settings: &UserSettings) {
        let mut series = view.series.clone();
        series.title = settings.title.clone();
        ChartPlotter::draw(
            ui,
            "explorer",
            &series,
            settings.chart_kind,
            settings.theme,
            CHART_HEIGHT,
        );

        ui.add_space(SECTION_SPACING);
        ui.label(RichText::new("Summary Statistics").size(16.0).strong());
        ui.label(
            RichText::new(format!("{} valid rows", view.valid_rows))
                .size(11.0)
                .color(Color32::GRAY),
        );
        ui.add_space(5.0);
        ChartPlotter::draw_summary(ui, &view.stats);
    }

    fn draw_sales(ui: &mut egui::Ui, charts: &SalesCharts, settings: &UserSettings) {
        let kpis = &charts.view.kpis;
        ui.horizontal(|ui| {
            ChartPlotter::draw_metric(ui, "Total Revenue", &format!("${:.2}", kpis.total_revenue));
            ChartPlotter::draw_metric(ui, "Units Sold", &format!("{:.0}", kpis.units_sold));
            ChartPlotter::draw_metric(ui, "Orders", &kpis.orders.to_string());
            ChartPlotter::draw_metric(
                ui,
                "Avg Order Value",
                &format!("${:.2}", kpis.average_order_value),
            );
        });

        if charts.view.table.height() == 0 {
            ui.add_space(SECTION_SPACING);
            ui.label(RichText::new("No rows match the current filters").color(Color32::GRAY));
            return;
        }

        ui.add_space(SECTION_SPACING);
        ChartPlotter::draw(ui, "monthly", &charts.monthly, ChartKind::Line, settings.theme, CHART_HEIGHT);
        ui.add_space(SECTION_SPACING);
        ChartPlotter::draw(
            ui,
            "products",
            &charts.products,
            settings.chart_kind,
            settings.theme,
            CHART_HEIGHT,
        );
        ui.add_space(SECTION_SPACING);
        ChartPlotter::draw(ui, "units", &charts.units, ChartKind::Bar, settings.theme, CHART_HEIGHT);
    }
}
