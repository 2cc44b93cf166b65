//! Table Schema
//! Required columns and per-column coercion applied after a sheet is read.

use super::{coerce, column_cells, date_column, float_column, text_column};
use chrono::NaiveDate;
use polars::prelude::*;

/// Column names of the sales sheet.
pub mod sales_columns {
    pub const DATE: &str = "Date";
    pub const PRODUCT: &str = "Product";
    pub const QUANTITY: &str = "Quantity";
    pub const UNIT_PRICE: &str = "Unit Price";
    pub const TOTAL: &str = "Total";

    pub const ALL: [&str; 5] = [DATE, PRODUCT, QUANTITY, UNIT_PRICE, TOTAL];
}

/// Target type of a required column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Number,
    Date,
}

/// What happens to a value that fails coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionPolicy {
    /// Remove the whole row
    Drop,
    /// Replace an absent number with 0.0 (dates always drop)
    ZeroFill,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    pub policy: CoercionPolicy,
}

impl ColumnSpec {
    pub fn new(name: &str, kind: ColumnKind, policy: CoercionPolicy) -> Self {
        Self {
            name: name.to_string(),
            kind,
            policy,
        }
    }
}

/// Expected shape of a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Identifies the schema inside the workbook cache
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableSchema {
    /// Accept any sheet as-is.
    pub fn passthrough() -> Self {
        Self {
            name: "passthrough".to_string(),
            columns: Vec::new(),
        }
    }

    /// The `Date, Product, Quantity, Unit Price, Total` sales sheet.
    pub fn sales() -> Self {
        use sales_columns::*;
        Self {
            name: "sales".to_string(),
            columns: vec![
                ColumnSpec::new(DATE, ColumnKind::Date, CoercionPolicy::Drop),
                ColumnSpec::new(PRODUCT, ColumnKind::Text, CoercionPolicy::Drop),
                ColumnSpec::new(QUANTITY, ColumnKind::Number, CoercionPolicy::ZeroFill),
                ColumnSpec::new(UNIT_PRICE, ColumnKind::Number, CoercionPolicy::ZeroFill),
                ColumnSpec::new(TOTAL, ColumnKind::Number, CoercionPolicy::ZeroFill),
            ],
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.columns.is_empty()
    }

    /// Required columns absent from `df`, in schema order.
    pub fn missing_columns(&self, df: &DataFrame) -> Vec<String> {
        let present: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.columns
            .iter()
            .filter(|spec| !present.contains(&spec.name))
            .map(|spec| spec.name.clone())
            .collect()
    }

    /// Coerce the schema's columns and drop rows that failed a `Drop` column.
    ///
    /// Columns outside the schema are kept untouched and column order is
    /// preserved. The input table is never modified.
    pub fn apply(&self, df: &DataFrame) -> PolarsResult<DataFrame> {
        let mut out = df.clone();
        let mut keep = vec![true; df.height()];

        for spec in &self.columns {
            let cells = column_cells(df.column(&spec.name)?)?;
            let column = match spec.kind {
                ColumnKind::Text => {
                    let values: Vec<Option<String>> = cells.iter().map(|c| c.to_text()).collect();
                    if spec.policy == CoercionPolicy::Drop {
                        mark_absent(&mut keep, &values);
                    }
                    text_column(&spec.name, values)
                }
                ColumnKind::Number => {
                    let mut values: Vec<Option<f64>> = cells.iter().map(coerce::to_number).collect();
                    match spec.policy {
                        CoercionPolicy::Drop => mark_absent(&mut keep, &values),
                        CoercionPolicy::ZeroFill => {
                            values.iter_mut().for_each(|v| *v = Some(v.unwrap_or(0.0)))
                        }
                    }
                    float_column(&spec.name, values)
                }
                ColumnKind::Date => {
                    let values: Vec<Option<NaiveDate>> = cells.iter().map(coerce::to_date).collect();
                    mark_absent(&mut keep, &values);
                    date_column(&spec.name, &values)?
                }
            };
            out.with_column(column)?;
        }

        if keep.iter().all(|k| *k) {
            return Ok(out);
        }
        let mask: BooleanChunked = keep.into_iter().collect();
        out.filter(&mask)
    }
}

fn mark_absent<T>(keep: &mut [bool], values: &[Option<T>]) {
    for (k, v) in keep.iter_mut().zip(values) {
        if v.is_none() {
            *k = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{read_dates, read_numbers, read_text};

    fn raw_sales() -> DataFrame {
        DataFrame::new(vec![
            text_column(
                "Date",
                vec![
                    Some("2024-01-05".into()),
                    Some("garbage".into()),
                    Some("2024-02-01".into()),
                ],
            ),
            text_column(
                "Product",
                vec![Some("WidgetA".into()), Some("WidgetB".into()), Some("WidgetA".into())],
            ),
            text_column("Quantity", vec![Some("10".into()), Some("5".into()), Some("n/a".into())]),
            float_column("Unit Price", vec![Some(2.0), Some(3.0), Some(2.0)]),
            float_column("Total", vec![Some(20.0), Some(15.0), None]),
            text_column("Notes", vec![Some("x".into()), None, None]),
        ])
        .unwrap()
    }

    #[test]
    fn sales_schema_drops_bad_dates_and_zero_fills_numbers() {
        let raw = raw_sales();
        let coerced = TableSchema::sales().apply(&raw).unwrap();

        assert_eq!(coerced.height(), 2);
        assert_eq!(
            read_dates(&coerced, "Date").unwrap(),
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 5),
                NaiveDate::from_ymd_opt(2024, 2, 1)
            ]
        );
        assert_eq!(
            read_numbers(&coerced, "Quantity").unwrap(),
            vec![Some(10.0), Some(0.0)]
        );
        assert_eq!(
            read_numbers(&coerced, "Total").unwrap(),
            vec![Some(20.0), Some(0.0)]
        );
        assert_eq!(
            read_text(&coerced, "Notes").unwrap(),
            vec![Some("x".to_string()), None]
        );
        // source table untouched
        assert_eq!(raw.height(), 3);
    }

    #[test]
    fn missing_columns_are_reported_in_schema_order() {
        let df = DataFrame::new(vec![text_column("Product", vec![Some("A".into())])]).unwrap();
        assert_eq!(
            TableSchema::sales().missing_columns(&df),
            vec!["Date", "Quantity", "Unit Price", "Total"]
        );
        assert!(TableSchema::passthrough().missing_columns(&df).is_empty());
    }
}
