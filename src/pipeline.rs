//! Dashboard Pipeline
//! load -> filter -> aggregate -> render, one pure stage at a time.
//!
//! Every stage returns a `StageResult`; the GUI renders either the whole view
//! or the error with its hint, never a partial dashboard.

use crate::charts::{ChartSeries, RenderError};
use crate::data::{
    read_numbers, sales_columns, select_pair, AggFunc, AggregateError, AggregateSpec, Aggregator,
    DataLoader, DateRange, ExportError, FilterError, FilterSpec, GroupKey, GroupOrder, LoadError,
    SheetSelector, TableSchema, XlsxExporter,
};
use crate::stats::{StatsCalculator, StatsError, SummaryStats};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Which dashboard the window shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DashboardMode {
    /// Any two columns of the first sheet
    #[default]
    Explorer,
    /// The sales sheet with date and product filters
    Sales,
}

impl DashboardMode {
    pub fn schema(&self) -> TableSchema {
        match self {
            DashboardMode::Explorer => TableSchema::passthrough(),
            DashboardMode::Sales => TableSchema::sales(),
        }
    }

    pub fn sheet(&self, sales_sheet: &str) -> SheetSelector {
        match self {
            DashboardMode::Explorer => SheetSelector::First,
            DashboardMode::Sales => SheetSelector::Named(sales_sheet.to_string()),
        }
    }
}

impl fmt::Display for DashboardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardMode::Explorer => f.write_str("Explorer"),
            DashboardMode::Sales => f.write_str("Sales"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Error loading the Excel file: {0}")]
    Load(#[from] LoadError),
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),
    #[error("Aggregation error: {0}")]
    Aggregate(#[from] AggregateError),
    #[error("Error calculating statistics: {0}")]
    Stats(#[from] StatsError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
    #[error("Error creating the chart: {0}")]
    Render(#[from] RenderError),
    #[error("The Excel file needs at least 2 columns to create a chart.")]
    TooFewColumns(usize),
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

impl PipelineError {
    /// A corrective hint shown under the error, when one applies.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            PipelineError::Load(LoadError::FileNotFound(_)) => {
                Some("Make sure the Excel file exists, or browse for another workbook.")
            }
            PipelineError::Load(LoadError::SheetNotFound { .. }) => {
                Some("Check the sheet name in the workbook.")
            }
            PipelineError::Load(LoadError::MissingColumns(_)) => Some(
                "Make sure the sheet has the columns Date, Product, Quantity, Unit Price and Total.",
            ),
            PipelineError::Load(_) => Some("Make sure the file is a valid .xlsx workbook."),
            PipelineError::Filter(FilterError::InvalidDateRange { .. }) => {
                Some("Pick a start date on or before the end date.")
            }
            PipelineError::Filter(FilterError::DuplicateSelection(_)) => {
                Some("Choose different columns for the category and the value.")
            }
            PipelineError::Stats(_)
            | PipelineError::Aggregate(AggregateError::NotNumeric(_))
            | PipelineError::Render(RenderError::EmptySeries) => {
                Some("Make sure your value column contains numeric data!")
            }
            PipelineError::Export(ExportError::InvalidSheetName(_)) => {
                Some("Sheet names are 1 to 31 characters without []:*?/\\")
            }
            PipelineError::TooFewColumns(_) => {
                Some("Add a category column and a value column to the first sheet.")
            }
            _ => None,
        }
    }
}

pub type StageResult<T> = Result<T, PipelineError>;

/// Products shown in the units-sold ranking
pub const TOP_PRODUCTS: usize = 10;

/// Load stage: the base table of a dashboard, through the loader cache.
pub fn load_table(
    loader: &mut DataLoader,
    path: &Path,
    mode: DashboardMode,
    sales_sheet: &str,
) -> StageResult<Arc<DataFrame>> {
    let table = loader
        .load(path, &mode.sheet(sales_sheet), &mode.schema())
        .inspect_err(|e| warn!(path = %path.display(), error = %e, "Load failed"))?;
    if mode == DashboardMode::Explorer && table.width() < 2 {
        warn!(columns = table.width(), "Workbook has too few columns");
        return Err(PipelineError::TooFewColumns(table.width()));
    }
    Ok(table)
}

/// Category/value projection with its statistics and chart series.
#[derive(Debug, Clone)]
pub struct ExplorerView {
    pub stats: SummaryStats,
    pub series: ChartSeries,
    pub valid_rows: usize,
}

impl ExplorerView {
    /// Without `grouping` the chart plots every valid row in sheet order;
    /// with it, one mark per category reduced by the function.
    pub fn compute(
        table: &DataFrame,
        category: &str,
        value: &str,
        grouping: Option<AggFunc>,
    ) -> StageResult<Self> {
        if table.width() < 2 {
            return Err(PipelineError::TooFewColumns(table.width()));
        }

        let projected = select_pair(table, category, value)?;
        let stats = StatsCalculator::summarize_column(&projected, value)?;
        let title = Self::default_title(category, value);
        let series = match grouping {
            None => ChartSeries::from_table(&projected, category, value, &title)?,
            Some(func) => {
                let grouped = Aggregator::aggregate(
                    &projected,
                    &AggregateSpec::new(GroupKey::Column(category.to_string())).agg(value, func),
                )?;
                ChartSeries::from_table(
                    &grouped,
                    category,
                    &AggregateSpec::output_name(value, func),
                    &title,
                )?
            }
        };

        info!(category, value, rows = projected.height(), "Explorer view computed");
        Ok(Self {
            valid_rows: projected.height(),
            stats,
            series,
        })
    }

    pub fn default_title(category: &str, value: &str) -> String {
        format!("{value} by {category}")
    }
}

/// User constraints of the sales dashboard. `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesFilter {
    pub date_range: Option<DateRange>,
    pub products: Option<BTreeSet<String>>,
}

impl SalesFilter {
    pub fn to_spec(&self) -> FilterSpec {
        let mut spec = FilterSpec::new();
        if let Some(range) = self.date_range {
            spec = spec.with_date_range(sales_columns::DATE, range);
        }
        if let Some(products) = &self.products {
            spec = spec.with_categories(sales_columns::PRODUCT, products.iter().cloned());
        }
        spec
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SalesKpis {
    pub total_revenue: f64,
    pub units_sold: f64,
    pub orders: usize,
    pub average_order_value: f64,
}

impl SalesKpis {
    pub fn from_table(df: &DataFrame) -> PolarsResult<Self> {
        let total_revenue: f64 = read_numbers(df, sales_columns::TOTAL)?.into_iter().flatten().sum();
        let units_sold: f64 = read_numbers(df, sales_columns::QUANTITY)?.into_iter().flatten().sum();
        let orders = df.height();
        let average_order_value = if orders == 0 {
            0.0
        } else {
            total_revenue / orders as f64
        };
        Ok(Self {
            total_revenue,
            units_sold,
            orders,
            average_order_value,
        })
    }
}

/// Filtered sales rows and every table the sales dashboard draws.
#[derive(Debug, Clone)]
pub struct SalesView {
    pub table: DataFrame,
    pub kpis: SalesKpis,
    pub monthly_revenue: DataFrame,
    pub by_product: DataFrame,
    pub units_by_product: DataFrame,
}

impl SalesView {
    pub fn compute(table: &DataFrame, filter: &SalesFilter) -> StageResult<Self> {
        let filtered = filter.to_spec().apply(table)?;
        let kpis = SalesKpis::from_table(&filtered)?;

        let monthly_revenue = Aggregator::aggregate(
            &filtered,
            &AggregateSpec::new(GroupKey::Month(sales_columns::DATE.to_string()))
                .agg(sales_columns::TOTAL, AggFunc::Sum),
        )?;
        let by_product = Aggregator::aggregate(
            &filtered,
            &AggregateSpec::new(GroupKey::Column(sales_columns::PRODUCT.to_string()))
                .agg(sales_columns::TOTAL, AggFunc::Sum)
                .order(GroupOrder::ValueDescending),
        )?;
        let units_by_product = Aggregator::aggregate(
            &filtered,
            &AggregateSpec::new(GroupKey::Column(sales_columns::PRODUCT.to_string()))
                .agg(sales_columns::QUANTITY, AggFunc::Sum)
                .order(GroupOrder::ValueDescending)
                .limit(TOP_PRODUCTS),
        )?;

        info!(
            rows_in = table.height(),
            rows_out = filtered.height(),
            revenue = kpis.total_revenue,
            "Sales view computed"
        );
        Ok(Self {
            table: filtered,
            kpis,
            monthly_revenue,
            by_product,
            units_by_product,
        })
    }

    pub fn monthly_series(&self) -> StageResult<ChartSeries> {
        Ok(ChartSeries::from_table(
            &self.monthly_revenue,
            sales_columns::DATE,
            &AggregateSpec::output_name(sales_columns::TOTAL, AggFunc::Sum),
            "Monthly Revenue",
        )?)
    }

    pub fn product_series(&self) -> StageResult<ChartSeries> {
        Ok(ChartSeries::from_table(
            &self.by_product,
            sales_columns::PRODUCT,
            &AggregateSpec::output_name(sales_columns::TOTAL, AggFunc::Sum),
            "Sales by Product",
        )?)
    }

    pub fn units_series(&self) -> StageResult<ChartSeries> {
        Ok(ChartSeries::from_table(
            &self.units_by_product,
            sales_columns::PRODUCT,
            &AggregateSpec::output_name(sales_columns::QUANTITY, AggFunc::Sum),
            "Top Products by Units Sold",
        )?)
    }

    /// Write the filtered rows to an `.xlsx` file with a single sheet.
    pub fn save(&self, path: &Path, sheet_name: &str) -> StageResult<()> {
        XlsxExporter::export_to_file(&self.table, sheet_name, path)?;
        info!(path = %path.display(), rows = self.table.height(), "Filtered sales exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{date_column, float_column, text_column};
    use chrono::NaiveDate;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn sales() -> DataFrame {
        DataFrame::new(vec![
            date_column("Date", &[Some(d(1, 5)), Some(d(1, 20)), Some(d(2, 3))]).unwrap(),
            text_column(
                "Product",
                vec![Some("WidgetA".into()), Some("WidgetB".into()), Some("WidgetA".into())],
            ),
            float_column("Quantity", vec![Some(10.0), Some(5.0), Some(2.0)]),
            float_column("Unit Price", vec![Some(2.0), Some(3.0), Some(2.0)]),
            float_column("Total", vec![Some(20.0), Some(15.0), Some(4.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn unfiltered_sales_view() {
        let view = SalesView::compute(&sales(), &SalesFilter::default()).unwrap();
        assert_eq!(view.table.height(), 3);
        assert_eq!(view.kpis.total_revenue, 39.0);
        assert_eq!(view.kpis.units_sold, 17.0);
        assert_eq!(view.kpis.orders, 3);
        assert_eq!(view.kpis.average_order_value, 13.0);

        let monthly = view.monthly_series().unwrap();
        assert_eq!(monthly.labels, vec!["2024-01", "2024-02"]);
        assert_eq!(monthly.values, vec![35.0, 4.0]);

        let ranking = view.product_series().unwrap();
        assert_eq!(ranking.labels, vec!["WidgetA", "WidgetB"]);
        assert_eq!(ranking.values, vec![24.0, 15.0]);

        let units = view.units_series().unwrap();
        assert_eq!(units.values, vec![12.0, 5.0]);
    }

    #[test]
    fn product_filter_keeps_matching_rows() {
        let filter = SalesFilter {
            products: Some(BTreeSet::from(["WidgetA".to_string()])),
            ..Default::default()
        };
        let view = SalesView::compute(&sales(), &filter).unwrap();
        assert_eq!(view.table.height(), 2);
        assert_eq!(view.kpis.total_revenue, 24.0);
    }

    #[test]
    fn empty_selection_gives_zero_kpis() {
        let filter = SalesFilter {
            products: Some(BTreeSet::new()),
            ..Default::default()
        };
        let view = SalesView::compute(&sales(), &filter).unwrap();
        assert_eq!(view.kpis, SalesKpis::default());
        assert_eq!(view.monthly_revenue.height(), 0);
        assert!(view.product_series().unwrap().is_empty());
    }

    #[test]
    fn date_filter_is_inclusive() {
        let filter = SalesFilter {
            date_range: Some(DateRange::new(d(1, 20), d(2, 3)).unwrap()),
            ..Default::default()
        };
        let view = SalesView::compute(&sales(), &filter).unwrap();
        assert_eq!(view.kpis.orders, 2);
        assert_eq!(view.kpis.total_revenue, 19.0);
    }

    #[test]
    fn export_round_trips_filtered_rows() {
        let filter = SalesFilter {
            products: Some(BTreeSet::from(["WidgetA".to_string()])),
            ..Default::default()
        };
        let view = SalesView::compute(&sales(), &filter).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filtered_sales.xlsx");
        view.save(&path, "Filtered Sales").unwrap();

        let mut loader = DataLoader::new();
        let reloaded = loader
            .load(
                &path,
                &SheetSelector::Named("Filtered Sales".into()),
                &TableSchema::sales(),
            )
            .unwrap();
        assert!(reloaded.equals_missing(&view.table));
    }

    #[test]
    fn explorer_view_over_coerced_values() {
        let df = DataFrame::new(vec![
            text_column("Category", vec![Some("a".into()), Some("b".into()), Some("c".into())]),
            text_column(
                "Value",
                vec![Some("12".into()), Some("abc".into()), Some("7.5".into())],
            ),
        ])
        .unwrap();
        let view = ExplorerView::compute(&df, "Category", "Value", None).unwrap();
        assert_eq!(view.valid_rows, 2);
        assert_eq!(view.stats.mean, 9.75);
        assert_eq!(view.series.labels, vec!["a", "c"]);
        assert_eq!(view.series.title, "Value by Category");
    }

    #[test]
    fn explorer_grouping_reduces_per_category() {
        let df = DataFrame::new(vec![
            text_column(
                "Region",
                vec![Some("North".into()), Some("South".into()), Some("North".into())],
            ),
            float_column("Sales", vec![Some(10.0), Some(4.0), Some(6.0)]),
        ])
        .unwrap();

        let summed = ExplorerView::compute(&df, "Region", "Sales", Some(AggFunc::Sum)).unwrap();
        assert_eq!(summed.series.labels, vec!["North", "South"]);
        assert_eq!(summed.series.values, vec![16.0, 4.0]);
        assert_eq!(summed.series.y_label, "Sales (sum)");
        assert_eq!(summed.valid_rows, 3);

        let mean = ExplorerView::compute(&df, "Region", "Sales", Some(AggFunc::Mean)).unwrap();
        assert_eq!(mean.series.values, vec![8.0, 4.0]);
    }

    #[test]
    fn explorer_errors_carry_hints() {
        let single = DataFrame::new(vec![float_column("only", vec![Some(1.0)])]).unwrap();
        let err = ExplorerView::compute(&single, "only", "only", None).unwrap_err();
        assert!(matches!(err, PipelineError::TooFewColumns(1)));
        assert_eq!(
            err.to_string(),
            "The Excel file needs at least 2 columns to create a chart."
        );

        let text = DataFrame::new(vec![
            text_column("c", vec![Some("a".into())]),
            text_column("v", vec![Some("x".into())]),
        ])
        .unwrap();
        let err = ExplorerView::compute(&text, "c", "v", None).unwrap_err();
        assert!(matches!(err, PipelineError::Stats(StatsError::EmptyColumn(_))));
        assert_eq!(err.hint(), Some("Make sure your value column contains numeric data!"));
    }

    #[test]
    fn missing_workbook_is_a_load_error() {
        let mut loader = DataLoader::new();
        let err = load_table(
            &mut loader,
            Path::new("no/such/sales_report.xlsx"),
            DashboardMode::Sales,
            "Sales Data",
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Load(LoadError::FileNotFound(_))));
        assert!(err.hint().is_some());
    }
}
