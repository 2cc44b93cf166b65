//! Charts module - Chart series, interactive plotting and PNG rendering

mod plotter;
mod renderer;
mod series;

pub use plotter::ChartPlotter;
pub use renderer::{RenderError, StaticChartRenderer};
pub use series::{ChartKind, ChartSeries, ColorTheme};
