//! Data module - workbook loading, coercion, filtering, aggregation and export

mod aggregator;
mod coerce;
mod columns;
mod exporter;
mod filter;
mod loader;
mod schema;

pub use aggregator::{AggFunc, AggregateError, AggregateSpec, Aggregator, GroupKey, GroupOrder};
pub use coerce::parse_date;
pub use columns::{
    column_cells, date_column, float_column, read_dates, read_numbers, read_text, text_column,
    CellValue,
};
pub use exporter::{ExportError, XlsxExporter};
pub use filter::{date_span, distinct_values, select_pair, DateRange, FilterError, FilterSpec};
pub use loader::{DataLoader, LoadError, SheetSelector};
pub use schema::{sales_columns, TableSchema};
