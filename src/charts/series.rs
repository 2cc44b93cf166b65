//! Chart Series Module
//! Chart kinds, colour themes and the label/value series every chart draws.

use crate::data::{column_cells, read_numbers, CellValue};
use chrono::Datelike;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Area,
    Pie,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [ChartKind::Bar, ChartKind::Line, ChartKind::Area, ChartKind::Pie];
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Bar => "Bar",
            ChartKind::Line => "Line",
            ChartKind::Area => "Area",
            ChartKind::Pie => "Pie",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorTheme {
    #[default]
    Plotly,
    Viridis,
    Plasma,
    Blues,
    Reds,
    Greens,
}

const PLOTLY: [[u8; 3]; 10] = [
    [99, 110, 250],
    [239, 85, 59],
    [0, 204, 150],
    [171, 99, 250],
    [255, 161, 90],
    [25, 211, 243],
    [255, 102, 146],
    [182, 232, 128],
    [255, 151, 255],
    [254, 203, 82],
];

const VIRIDIS: [[u8; 3]; 10] = [
    [68, 1, 84],
    [72, 40, 120],
    [62, 73, 137],
    [49, 104, 142],
    [38, 130, 142],
    [31, 158, 137],
    [53, 183, 121],
    [110, 206, 88],
    [181, 222, 43],
    [253, 231, 37],
];

const PLASMA: [[u8; 3]; 10] = [
    [13, 8, 135],
    [70, 3, 159],
    [114, 1, 168],
    [156, 23, 158],
    [189, 55, 134],
    [216, 87, 107],
    [237, 121, 83],
    [251, 159, 58],
    [253, 202, 38],
    [240, 249, 33],
];

const BLUES: [[u8; 3]; 9] = [
    [247, 251, 255],
    [222, 235, 247],
    [198, 219, 239],
    [158, 202, 225],
    [107, 174, 214],
    [66, 146, 198],
    [33, 113, 181],
    [8, 81, 156],
    [8, 48, 107],
];

const REDS: [[u8; 3]; 9] = [
    [255, 245, 240],
    [254, 224, 210],
    [252, 187, 161],
    [252, 146, 114],
    [251, 106, 74],
    [239, 59, 44],
    [203, 24, 29],
    [165, 15, 21],
    [103, 0, 13],
];

const GREENS: [[u8; 3]; 9] = [
    [247, 252, 245],
    [229, 245, 224],
    [199, 233, 192],
    [161, 217, 155],
    [116, 196, 118],
    [65, 171, 93],
    [35, 139, 69],
    [0, 109, 44],
    [0, 68, 27],
];

impl ColorTheme {
    pub const ALL: [ColorTheme; 6] = [
        ColorTheme::Plotly,
        ColorTheme::Viridis,
        ColorTheme::Plasma,
        ColorTheme::Blues,
        ColorTheme::Reds,
        ColorTheme::Greens,
    ];

    pub fn palette(&self) -> &'static [[u8; 3]] {
        match self {
            ColorTheme::Plotly => &PLOTLY,
            ColorTheme::Viridis => &VIRIDIS,
            ColorTheme::Plasma => &PLASMA,
            ColorTheme::Blues => &BLUES,
            ColorTheme::Reds => &REDS,
            ColorTheme::Greens => &GREENS,
        }
    }

    /// Colour of the `index`-th mark, cycling through the palette.
    pub fn color(&self, index: usize) -> [u8; 3] {
        let palette = self.palette();
        palette[index % palette.len()]
    }
}

impl fmt::Display for ColorTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Labels and values of one chart.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartSeries {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSeries {
    /// Build a series from a label column and a numeric value column.
    ///
    /// Rows without a value are skipped; a missing label becomes "".
    pub fn from_table(
        df: &DataFrame,
        label_col: &str,
        value_col: &str,
        title: &str,
    ) -> PolarsResult<Self> {
        let labels = column_cells(df.column(label_col)?)?;
        let values = read_numbers(df, value_col)?;

        let (labels, values): (Vec<String>, Vec<f64>) = labels
            .iter()
            .zip(values)
            .filter_map(|(label, value)| value.map(|v| (format_label(label), v)))
            .unzip();

        Ok(Self {
            title: title.to_string(),
            x_label: label_col.to_string(),
            y_label: value_col.to_string(),
            labels,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Lower and upper value bounds, always including zero.
    pub fn value_bounds(&self) -> (f64, f64) {
        let min = self.values.iter().copied().fold(0.0_f64, f64::min);
        let max = self.values.iter().copied().fold(0.0_f64, f64::max);
        if min == max {
            (min, min + 1.0)
        } else {
            (min, max)
        }
    }
}

/// Month keys render as `YYYY-MM`; other dates keep the day.
fn format_label(cell: &CellValue) -> String {
    match cell {
        CellValue::Date(d) if d.day() == 1 => d.format("%Y-%m").to_string(),
        other => other.to_text().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{date_column, float_column, text_column};
    use chrono::NaiveDate;

    #[test]
    fn series_from_monthly_table() {
        let df = DataFrame::new(vec![
            date_column(
                "Date",
                &[
                    NaiveDate::from_ymd_opt(2024, 1, 1),
                    NaiveDate::from_ymd_opt(2024, 2, 14),
                ],
            )
            .unwrap(),
            float_column("Total (sum)", vec![Some(35.0), Some(4.0)]),
        ])
        .unwrap();

        let series = ChartSeries::from_table(&df, "Date", "Total (sum)", "Revenue").unwrap();
        assert_eq!(series.labels, vec!["2024-01", "2024-02-14"]);
        assert_eq!(series.values, vec![35.0, 4.0]);
        assert_eq!(series.y_label, "Total (sum)");
    }

    #[test]
    fn rows_without_values_are_skipped() {
        let df = DataFrame::new(vec![
            text_column("c", vec![Some("a".into()), None, Some("c".into())]),
            float_column("v", vec![Some(1.0), Some(2.0), None]),
        ])
        .unwrap();
        let series = ChartSeries::from_table(&df, "c", "v", "").unwrap();
        assert_eq!(series.labels, vec!["a", ""]);
        assert_eq!(series.values, vec![1.0, 2.0]);
    }

    #[test]
    fn palettes_cycle() {
        let theme = ColorTheme::Blues;
        assert_eq!(theme.color(0), theme.color(theme.palette().len()));
    }

    #[test]
    fn bounds_include_zero() {
        let series = ChartSeries {
            values: vec![3.0, 5.0],
            ..Default::default()
        };
        assert_eq!(series.value_bounds(), (0.0, 5.0));
        let negative = ChartSeries {
            values: vec![-2.0, 4.0],
            ..Default::default()
        };
        assert_eq!(negative.value_bounds(), (-2.0, 4.0));
    }
}
