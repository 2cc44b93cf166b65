//! Chart Plotter Module
//! Creates interactive visualizations using egui_plot.

use crate::charts::{ChartKind, ChartSeries, ColorTheme};
use crate::stats::SummaryStats;
use egui::{Color32, RichText, Sense, Shape, Stroke, Vec2};
use egui_plot::{Bar, BarChart, Line, Plot, PlotPoints, Points};
use std::f32::consts::{FRAC_PI_2, TAU};

/// Max angle covered by a single pie triangle, in radians
const PIE_SEGMENT: f32 = 0.05;

/// Creates dashboard charts using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    pub fn color(theme: ColorTheme, index: usize) -> Color32 {
        let [r, g, b] = theme.color(index);
        Color32::from_rgb(r, g, b)
    }

    /// Draw a series as the requested chart kind.
    pub fn draw(
        ui: &mut egui::Ui,
        id: &str,
        series: &ChartSeries,
        kind: ChartKind,
        theme: ColorTheme,
        height: f32,
    ) {
        ui.label(RichText::new(&series.title).size(16.0).strong());
        if series.is_empty() {
            ui.label(RichText::new("No rows to plot").color(Color32::GRAY));
            return;
        }

        match kind {
            ChartKind::Bar => Self::draw_bar_chart(ui, id, series, theme, height),
            ChartKind::Line => Self::draw_line_chart(ui, id, series, theme, height, false),
            ChartKind::Area => Self::draw_line_chart(ui, id, series, theme, height, true),
            ChartKind::Pie => Self::draw_pie_chart(ui, series, theme, height),
        }
    }

    fn label_formatter(labels: Vec<String>) -> impl Fn(egui_plot::GridMark, &std::ops::RangeInclusive<f64>) -> String {
        move |mark, _range| {
            let rounded = mark.value.round();
            if (mark.value - rounded).abs() > 1e-6 || rounded < 0.0 {
                return String::new();
            }
            labels.get(rounded as usize).cloned().unwrap_or_default()
        }
    }

    /// X-axis: categories, Y-axis: values. One colour per bar.
    pub fn draw_bar_chart(
        ui: &mut egui::Ui,
        id: &str,
        series: &ChartSeries,
        theme: ColorTheme,
        height: f32,
    ) {
        let bars: Vec<Bar> = series
            .values
            .iter()
            .zip(&series.labels)
            .enumerate()
            .map(|(i, (&value, label))| {
                Bar::new(i as f64, value)
                    .width(0.7)
                    .name(label)
                    .fill(Self::color(theme, i))
            })
            .collect();

        Plot::new(format!("bar_{id}"))
            .height(height)
            .allow_scroll(false)
            .x_axis_label(series.x_label.clone())
            .y_axis_label(series.y_label.clone())
            .x_axis_formatter(Self::label_formatter(series.labels.clone()))
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).name(&series.y_label));
            });
    }

    /// Line through the points, optionally filled down to zero.
    pub fn draw_line_chart(
        ui: &mut egui::Ui,
        id: &str,
        series: &ChartSeries,
        theme: ColorTheme,
        height: f32,
        filled: bool,
    ) {
        let color = Self::color(theme, 0);
        let points: Vec<[f64; 2]> = series
            .values
            .iter()
            .enumerate()
            .map(|(i, &v)| [i as f64, v])
            .collect();

        Plot::new(format!("line_{id}"))
            .height(height)
            .allow_scroll(false)
            .x_axis_label(series.x_label.clone())
            .y_axis_label(series.y_label.clone())
            .x_axis_formatter(Self::label_formatter(series.labels.clone()))
            .show(ui, |plot_ui| {
                let mut line = Line::new(PlotPoints::from_iter(points.iter().copied()))
                    .color(color)
                    .width(2.0)
                    .name(&series.y_label);
                if filled {
                    line = line.fill(0.0);
                }
                plot_ui.line(line);
                plot_ui.points(
                    Points::new(PlotPoints::from_iter(points.iter().copied()))
                        .radius(3.0)
                        .color(color),
                );
            });
    }

    /// Pie painted as triangle fans, with a legend underneath.
    ///
    /// Non-positive values have no slice.
    pub fn draw_pie_chart(ui: &mut egui::Ui, series: &ChartSeries, theme: ColorTheme, height: f32) {
        let total: f64 = series.values.iter().filter(|v| **v > 0.0).sum();
        if total <= 0.0 {
            ui.label(RichText::new("Pie charts need positive values").color(Color32::GRAY));
            return;
        }

        let (response, painter) =
            ui.allocate_painter(Vec2::new(ui.available_width(), height), Sense::hover());
        let rect = response.rect;
        let center = rect.center();
        let radius = rect.width().min(rect.height()) * 0.45;

        let mut start = -FRAC_PI_2;
        for (i, &value) in series.values.iter().enumerate() {
            if value <= 0.0 {
                continue;
            }
            let sweep = (value / total) as f32 * TAU;
            let segments = ((sweep / PIE_SEGMENT).ceil() as usize).max(1);
            let color = Self::color(theme, i);
            for s in 0..segments {
                let a0 = start + sweep * s as f32 / segments as f32;
                let a1 = start + sweep * (s + 1) as f32 / segments as f32;
                painter.add(Shape::convex_polygon(
                    vec![
                        center,
                        center + radius * Vec2::angled(a0),
                        center + radius * Vec2::angled(a1),
                    ],
                    color,
                    Stroke::NONE,
                ));
            }
            start += sweep;
        }

        ui.horizontal_wrapped(|ui| {
            for (i, (label, &value)) in series.labels.iter().zip(&series.values).enumerate() {
                if value <= 0.0 {
                    continue;
                }
                let (swatch, _) = ui.allocate_exact_size(Vec2::splat(12.0), Sense::hover());
                ui.painter().rect_filled(swatch, 2.0, Self::color(theme, i));
                ui.label(format!("{label} ({:.1}%)", value / total * 100.0));
                ui.add_space(8.0);
            }
        });
    }

    /// Mean / Median / Max / Min metric row, then count, sum and spread.
    pub fn draw_summary(ui: &mut egui::Ui, stats: &SummaryStats) {
        ui.horizontal(|ui| {
            for (name, value) in [
                ("Mean", stats.mean),
                ("Median", stats.median),
                ("Max", stats.max),
                ("Min", stats.min),
            ] {
                Self::draw_metric(ui, name, &format!("{value:.2}"));
            }
        });
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            Self::draw_metric(ui, "Count", &stats.count.to_string());
            Self::draw_metric(ui, "Sum", &format!("{:.2}", stats.sum));
            Self::draw_metric(ui, "Std Dev", &format!("{:.2}", stats.std));
        });
    }

    /// A framed label/value card.
    pub fn draw_metric(ui: &mut egui::Ui, name: &str, value: &str) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.set_min_width(120.0);
                ui.vertical(|ui| {
                    ui.label(RichText::new(name).size(11.0).color(Color32::GRAY));
                    ui.label(RichText::new(value).size(20.0).strong());
                });
            });
    }
}
