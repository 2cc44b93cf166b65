//! Static Chart Renderer
//! Draws a chart series into a PNG with plotters.
//!
//! Bar, line and area charts share a segmented x-axis with one segment per label.
//! Pie charts drop non-positive values and label each slice with its share.

use crate::charts::{ChartKind, ChartSeries, ColorTheme};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use thiserror::Error;
use tracing::debug;

const TITLE_FONT: (&str, u32) = ("sans-serif", 24);
const LABEL_FONT: (&str, u32) = ("sans-serif", 14);

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Nothing to draw: the chart has no values")]
    EmptySeries,
    #[error("Invalid image size {0}x{1}")]
    InvalidSize(u32, u32),
    #[error("Drawing failed: {0}")]
    Drawing(String),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

fn drawing<E: std::fmt::Display>(err: E) -> RenderError {
    RenderError::Drawing(err.to_string())
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render the series as a `width` x `height` PNG.
    pub fn render_png(
        series: &ChartSeries,
        kind: ChartKind,
        theme: ColorTheme,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, RenderError> {
        if series.is_empty() {
            return Err(RenderError::EmptySeries);
        }
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize(width, height));
        }

        let mut pixels = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(drawing)?;

            match kind {
                ChartKind::Pie => Self::draw_pie(&root, series, theme, width, height)?,
                _ => Self::draw_cartesian(&root, series, kind, theme)?,
            }
            root.present().map_err(drawing)?;
        }

        let mut png = Vec::new();
        PngEncoder::new(&mut png).write_image(&pixels, width, height, ExtendedColorType::Rgb8)?;
        debug!(kind = %kind, bytes = png.len(), "Rendered chart");
        Ok(png)
    }

    fn rgb(theme: ColorTheme, index: usize) -> RGBColor {
        let [r, g, b] = theme.color(index);
        RGBColor(r, g, b)
    }

    fn draw_cartesian(
        root: &Area,
        series: &ChartSeries,
        kind: ChartKind,
        theme: ColorTheme,
    ) -> Result<(), RenderError> {
        let (y_min, y_max) = series.value_bounds();
        let mut chart = ChartBuilder::on(root)
            .caption(&series.title, TITLE_FONT)
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d((0..series.len()).into_segmented(), y_min..y_max * 1.05)
            .map_err(drawing)?;

        let labels = &series.labels;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(series.x_label.as_str())
            .y_desc(series.y_label.as_str())
            .x_labels(series.len())
            .x_label_formatter(&|x| match x {
                SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
                _ => String::new(),
            })
            .label_style(LABEL_FONT)
            .draw()
            .map_err(drawing)?;

        if kind == ChartKind::Bar {
            chart
                .draw_series(series.values.iter().enumerate().map(|(i, &value)| {
                    let mut bar = Rectangle::new(
                        [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), value)],
                        Self::rgb(theme, i).filled(),
                    );
                    bar.set_margin(0, 0, 6, 6);
                    bar
                }))
                .map_err(drawing)?;
            return Ok(());
        }

        let color = Self::rgb(theme, 0);
        let points: Vec<(SegmentValue<usize>, f64)> = series
            .values
            .iter()
            .enumerate()
            .map(|(i, &v)| (SegmentValue::CenterOf(i), v))
            .collect();

        if kind == ChartKind::Area {
            chart
                .draw_series(
                    AreaSeries::new(points.iter().cloned(), 0.0, color.mix(0.35))
                        .border_style(color.stroke_width(2)),
                )
                .map_err(drawing)?;
        } else {
            chart
                .draw_series(LineSeries::new(points.iter().cloned(), color.stroke_width(2)))
                .map_err(drawing)?;
        }
        chart
            .draw_series(points.iter().map(|p| Circle::new(p.clone(), 4, color.filled())))
            .map_err(drawing)?;
        Ok(())
    }

    fn draw_pie(
        root: &Area,
        series: &ChartSeries,
        theme: ColorTheme,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        let area = root.titled(&series.title, TITLE_FONT).map_err(drawing)?;

        let mut sizes = Vec::new();
        let mut colors = Vec::new();
        let mut labels = Vec::new();
        for (i, (label, &value)) in series.labels.iter().zip(&series.values).enumerate() {
            if value > 0.0 {
                sizes.push(value);
                colors.push(Self::rgb(theme, i));
                labels.push(label.clone());
            }
        }
        if sizes.is_empty() {
            return Err(RenderError::EmptySeries);
        }

        let (w, h) = area.dim_in_pixel();
        let center = (w as i32 / 2, h as i32 / 2);
        let radius = f64::from(width.min(height)) * 0.32;

        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.start_angle(-90.0);
        pie.label_style(LABEL_FONT.into_font().color(&BLACK));
        pie.percentages(LABEL_FONT.into_font().color(&WHITE));
        area.draw(&pie).map_err(drawing)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_is_rejected() {
        let series = ChartSeries::default();
        assert!(matches!(
            StaticChartRenderer::render_png(&series, ChartKind::Bar, ColorTheme::Plotly, 640, 480),
            Err(RenderError::EmptySeries)
        ));
    }

    #[test]
    fn zero_size_is_rejected() {
        let series = ChartSeries {
            labels: vec!["a".into()],
            values: vec![1.0],
            ..Default::default()
        };
        assert!(matches!(
            StaticChartRenderer::render_png(&series, ChartKind::Line, ColorTheme::Reds, 0, 480),
            Err(RenderError::InvalidSize(0, 480))
        ));
    }

    #[test]
    fn every_kind_renders_a_png() {
        let series = ChartSeries {
            title: "Sales by Product".into(),
            x_label: "Product".into(),
            y_label: "Total".into(),
            labels: vec!["WidgetA".into(), "WidgetB".into(), "WidgetC".into()],
            values: vec![24.0, 15.0, 9.0],
        };
        for kind in ChartKind::ALL {
            let png =
                StaticChartRenderer::render_png(&series, kind, ColorTheme::Viridis, 640, 480).unwrap();
            assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n", "{kind:?}");
        }
    }
}
