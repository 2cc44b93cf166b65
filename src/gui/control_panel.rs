//! Control Panel Widget
//! Left side panel with the workbook, filter and chart controls.

use crate::charts::{ChartKind, ColorTheme};
use crate::data::{AggFunc, DateRange, FilterError};
use crate::pipeline::{DashboardMode, ExplorerView, SalesFilter};
use chrono::NaiveDate;
use egui::{Color32, ComboBox, RichText, ScrollArea};
use egui_extras::DatePickerButton;
use std::path::PathBuf;

/// Current widget values.
#[derive(Debug, Clone, Default)]
pub struct UserSettings {
    pub workbook_path: PathBuf,
    pub mode: DashboardMode,
    pub category_col: String,
    pub value_col: String,
    /// `None` plots rows as they are
    pub grouping: Option<AggFunc>,
    pub title: String,
    pub chart_kind: ChartKind,
    pub theme: ColorTheme,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Left side control panel.
pub struct ControlPanel {
    pub settings: UserSettings,
    pub columns: Vec<String>,
    pub products: Vec<String>,
    pub selected_products: Vec<bool>,
    pub status: String,
    pub has_table: bool,
    pub has_chart: bool,
}

impl ControlPanel {
    pub fn new(settings: UserSettings) -> Self {
        Self {
            settings,
            columns: Vec::new(),
            products: Vec::new(),
            selected_products: Vec::new(),
            status: "Ready".to_string(),
            has_table: false,
            has_chart: false,
        }
    }

    /// Update the column pickers after a load, keeping valid selections.
    pub fn update_columns(&mut self, columns: Vec<String>) {
        if !columns.contains(&self.settings.category_col) {
            self.settings.category_col = columns.first().cloned().unwrap_or_default();
        }
        if !columns.contains(&self.settings.value_col) || self.settings.value_col == self.settings.category_col {
            self.settings.value_col = columns
                .iter()
                .find(|c| **c != self.settings.category_col)
                .cloned()
                .unwrap_or_default();
        }
        self.columns = columns;
        self.reset_title();
    }

    /// Update the product list and date pickers; everything starts selected.
    pub fn update_sales_options(&mut self, products: Vec<String>, span: Option<DateRange>) {
        self.selected_products = vec![true; products.len()];
        self.products = products;
        if let Some(span) = span {
            self.settings.start_date = span.start();
            self.settings.end_date = span.end();
        }
    }

    pub fn clear_options(&mut self) {
        self.columns.clear();
        self.products.clear();
        self.selected_products.clear();
    }

    fn reset_title(&mut self) {
        self.settings.title =
            ExplorerView::default_title(&self.settings.category_col, &self.settings.value_col);
    }

    /// Selected products and dates as pipeline constraints.
    pub fn sales_filter(&self) -> Result<SalesFilter, FilterError> {
        let date_range = DateRange::new(self.settings.start_date, self.settings.end_date)?;
        let products = self
            .products
            .iter()
            .zip(&self.selected_products)
            .filter(|(_, &selected)| selected)
            .map(|(product, _)| product.clone())
            .collect();
        Ok(SalesFilter {
            date_range: Some(date_range),
            products: Some(products),
        })
    }

    pub fn dates_valid(&self) -> bool {
        self.settings.start_date <= self.settings.end_date
    }

    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("📊 Excel Dashboard")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Workbook Section =====
        ui.label(RichText::new("📁 Workbook").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let name = self
                        .settings
                        .workbook_path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "No file selected".to_string());
                    ui.label(RichText::new(name).size(12.0));

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("📂 Browse").clicked() {
                            action = ControlPanelAction::BrowseWorkbook;
                        }
                        if ui.button("🔄 Reload").clicked() {
                            action = ControlPanelAction::Reload;
                        }
                    });
                });
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Dashboard Section =====
        ui.label(RichText::new("⚙️ Dashboard").size(14.0).strong());
        ui.add_space(5.0);

        ui.horizontal(|ui| {
            for mode in [DashboardMode::Explorer, DashboardMode::Sales] {
                if ui
                    .radio_value(&mut self.settings.mode, mode, mode.to_string())
                    .changed()
                {
                    action = ControlPanelAction::ModeChanged;
                }
            }
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        match self.settings.mode {
            DashboardMode::Explorer => self.show_explorer_controls(ui, &mut action),
            DashboardMode::Sales => self.show_sales_controls(ui, &mut action),
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Chart Style Section =====
        ui.label(RichText::new("🎨 Chart").size(14.0).strong());
        ui.add_space(8.0);

        let label_width = 110.0;
        let combo_width = 150.0;

        ui.horizontal(|ui| {
            ui.add_sized([label_width, 20.0], egui::Label::new("Chart Type:"));
            ComboBox::from_id_salt("chart_kind")
                .width(combo_width)
                .selected_text(self.settings.chart_kind.to_string())
                .show_ui(ui, |ui| {
                    for kind in ChartKind::ALL {
                        ui.selectable_value(&mut self.settings.chart_kind, kind, kind.to_string());
                    }
                });
        });

        ui.add_space(5.0);

        ui.horizontal(|ui| {
            ui.add_sized([label_width, 20.0], egui::Label::new("Color Theme:"));
            ComboBox::from_id_salt("color_theme")
                .width(combo_width)
                .selected_text(self.settings.theme.to_string())
                .show_ui(ui, |ui| {
                    for theme in ColorTheme::ALL {
                        ui.selectable_value(&mut self.settings.theme, theme, theme.to_string());
                    }
                });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Action Buttons =====
        ui.vertical_centered(|ui| {
            let export_enabled = self.has_table && self.settings.mode == DashboardMode::Sales;
            ui.add_enabled_ui(export_enabled, |ui| {
                let button = egui::Button::new(RichText::new("📥 Export Filtered Data").size(14.0))
                    .min_size(egui::vec2(200.0, 32.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::ExportFiltered;
                }
            });

            ui.add_space(8.0);

            ui.add_enabled_ui(self.has_chart, |ui| {
                let button = egui::Button::new(RichText::new("🖼 Save Chart").size(14.0))
                    .min_size(egui::vec2(200.0, 32.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::SaveChart;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(5.0);

        let status_color = if self.status.starts_with("Error") {
            Color32::from_rgb(220, 53, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    fn show_explorer_controls(&mut self, ui: &mut egui::Ui, action: &mut ControlPanelAction) {
        ui.label(RichText::new("🔧 Columns").size(14.0).strong());
        ui.add_space(8.0);

        let label_width = 110.0;
        let combo_width = 150.0;
        let mut columns_changed = false;

        for (label, salt, selected) in [
            ("Category Column:", "category_col", &mut self.settings.category_col),
            ("Value Column:", "value_col", &mut self.settings.value_col),
        ] {
            ui.horizontal(|ui| {
                ui.add_sized([label_width, 20.0], egui::Label::new(label));
                ComboBox::from_id_salt(salt)
                    .width(combo_width)
                    .selected_text(selected.as_str())
                    .show_ui(ui, |ui| {
                        for col in &self.columns {
                            if ui.selectable_label(*selected == *col, col).clicked() && *selected != *col {
                                *selected = col.clone();
                                columns_changed = true;
                            }
                        }
                    });
            });
            ui.add_space(5.0);
        }

        if columns_changed {
            self.reset_title();
            *action = ControlPanelAction::SelectionChanged;
        }

        ui.horizontal(|ui| {
            ui.add_sized([label_width, 20.0], egui::Label::new("Group Rows:"));
            let selected = self
                .settings
                .grouping
                .map_or("None".to_string(), |func| func.to_string());
            ComboBox::from_id_salt("grouping")
                .width(combo_width)
                .selected_text(selected)
                .show_ui(ui, |ui| {
                    let options = std::iter::once(None).chain(AggFunc::ALL.into_iter().map(Some));
                    for option in options {
                        let text = option.map_or("None".to_string(), |func| func.to_string());
                        if ui
                            .selectable_value(&mut self.settings.grouping, option, text)
                            .changed()
                        {
                            *action = ControlPanelAction::SelectionChanged;
                        }
                    }
                });
        });
        ui.add_space(5.0);

        ui.horizontal(|ui| {
            ui.add_sized([label_width, 20.0], egui::Label::new("Chart Title:"));
            ui.add(egui::TextEdit::singleline(&mut self.settings.title).desired_width(combo_width));
        });
    }

    fn show_sales_controls(&mut self, ui: &mut egui::Ui, action: &mut ControlPanelAction) {
        ui.label(RichText::new("📅 Date Range").size(14.0).strong());
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.add_sized([50.0, 20.0], egui::Label::new("From:"));
            if ui
                .add(DatePickerButton::new(&mut self.settings.start_date).id_salt("start_date"))
                .changed()
            {
                *action = ControlPanelAction::SelectionChanged;
            }
        });
        ui.horizontal(|ui| {
            ui.add_sized([50.0, 20.0], egui::Label::new("To:"));
            if ui
                .add(DatePickerButton::new(&mut self.settings.end_date).id_salt("end_date"))
                .changed()
            {
                *action = ControlPanelAction::SelectionChanged;
            }
        });
        if !self.dates_valid() {
            ui.label(
                RichText::new("Start date is after end date")
                    .size(11.0)
                    .color(Color32::from_rgb(220, 53, 69)),
            );
        }

        ui.add_space(10.0);
        ui.label(RichText::new("🏷 Products").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(5.0)
            .show(ui, |ui| {
                ScrollArea::vertical().max_height(140.0).show(ui, |ui| {
                    for (product, selected) in self.products.iter().zip(self.selected_products.iter_mut()) {
                        if ui.checkbox(selected, product).changed() {
                            *action = ControlPanelAction::SelectionChanged;
                        }
                    }
                });
            });

        ui.add_space(5.0);
        ui.horizontal(|ui| {
            if ui.small_button("Select All").clicked() {
                self.selected_products.iter_mut().for_each(|v| *v = true);
                *action = ControlPanelAction::SelectionChanged;
            }
            if ui.small_button("Clear All").clicked() {
                self.selected_products.iter_mut().for_each(|v| *v = false);
                *action = ControlPanelAction::SelectionChanged;
            }
        });
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseWorkbook,
    Reload,
    ModeChanged,
    SelectionChanged,
    ExportFiltered,
    SaveChart,
}
