//! Column Access Helpers
//! Converts between polars columns and plain Rust vectors.
//!
//! Row tables only ever hold three column kinds: `Float64`, `String` and
//! `Date`. Everything the dashboards need is read back through these helpers
//! so that the rest of the crate never touches physical polars types.

use chrono::{NaiveDate, TimeDelta};
use polars::prelude::*;

/// A single cell of a row table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Text rendering used for labels, previews and text columns.
    pub fn to_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(v) => Some(v.to_string()),
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

fn unix_epoch() -> NaiveDate {
    NaiveDate::default()
}

fn days_from_epoch(date: NaiveDate) -> i32 {
    (date - unix_epoch()).num_days() as i32
}

fn date_from_days(days: i32) -> Option<NaiveDate> {
    TimeDelta::try_days(days as i64).and_then(|delta| unix_epoch().checked_add_signed(delta))
}

/// Whether a dtype holds plain numbers.
pub fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Build a `Float64` column.
pub fn float_column(name: &str, values: Vec<Option<f64>>) -> Column {
    Column::new(name.into(), values)
}

/// Build a `String` column.
pub fn text_column(name: &str, values: Vec<Option<String>>) -> Column {
    Column::new(name.into(), values)
}

/// Build a `Date` column.
pub fn date_column(name: &str, values: &[Option<NaiveDate>]) -> PolarsResult<Column> {
    let days: Vec<Option<i32>> = values.iter().map(|d| d.map(days_from_epoch)).collect();
    Column::new(name.into(), days).cast(&DataType::Date)
}

/// Read every cell of a column, whatever its dtype.
pub fn column_cells(column: &Column) -> PolarsResult<Vec<CellValue>> {
    match column.dtype() {
        DataType::Date => {
            let physical = column.cast(&DataType::Int32)?;
            Ok(physical
                .i32()?
                .into_iter()
                .map(|v| match v.and_then(date_from_days) {
                    Some(d) => CellValue::Date(d),
                    None => CellValue::Empty,
                })
                .collect())
        }
        DataType::String => Ok(column
            .str()?
            .into_iter()
            .map(|v| match v {
                Some(s) => CellValue::Text(s.to_string()),
                None => CellValue::Empty,
            })
            .collect()),
        dtype if is_numeric(dtype) => {
            let floats = column.cast(&DataType::Float64)?;
            Ok(floats
                .f64()?
                .into_iter()
                .map(|v| match v {
                    Some(x) => CellValue::Number(x),
                    None => CellValue::Empty,
                })
                .collect())
        }
        _ => {
            let strings = column.cast(&DataType::String)?;
            Ok(strings
                .str()?
                .into_iter()
                .map(|v| match v {
                    Some(s) => CellValue::Text(s.to_string()),
                    None => CellValue::Empty,
                })
                .collect())
        }
    }
}

/// Read a numeric column as `f64`. Fails on non-numeric dtypes.
pub fn read_numbers(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let column = df.column(name)?;
    if !is_numeric(column.dtype()) {
        return Err(PolarsError::InvalidOperation(
            format!("column '{name}' is not numeric").into(),
        ));
    }
    let floats = column.cast(&DataType::Float64)?;
    Ok(floats.f64()?.into_iter().collect())
}

/// Read a `Date` column. Fails on other dtypes.
pub fn read_dates(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<NaiveDate>>> {
    let column = df.column(name)?;
    if column.dtype() != &DataType::Date {
        return Err(PolarsError::InvalidOperation(
            format!("column '{name}' is not a date column").into(),
        ));
    }
    let physical = column.cast(&DataType::Int32)?;
    Ok(physical
        .i32()?
        .into_iter()
        .map(|v| v.and_then(date_from_days))
        .collect())
}

/// Read any column as text.
pub fn read_text(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?;
    Ok(column_cells(column)?.iter().map(CellValue::to_text).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_column_round_trips_through_days() {
        let dates = vec![
            NaiveDate::from_ymd_opt(2024, 1, 15),
            None,
            NaiveDate::from_ymd_opt(1969, 12, 31),
        ];
        let df = DataFrame::new(vec![date_column("Date", &dates).unwrap()]).unwrap();

        assert_eq!(df.column("Date").unwrap().dtype(), &DataType::Date);
        assert_eq!(read_dates(&df, "Date").unwrap(), dates);
    }

    #[test]
    fn read_text_renders_every_kind() {
        let df = DataFrame::new(vec![
            float_column("n", vec![Some(12.0), Some(7.5), None]),
            text_column("t", vec![Some("a".into()), None, Some("c".into())]),
        ])
        .unwrap();

        assert_eq!(
            read_text(&df, "n").unwrap(),
            vec![Some("12".to_string()), Some("7.5".to_string()), None]
        );
        assert_eq!(
            read_text(&df, "t").unwrap(),
            vec![Some("a".to_string()), None, Some("c".to_string())]
        );
    }

    #[test]
    fn read_numbers_rejects_text_columns() {
        let df = DataFrame::new(vec![text_column("t", vec![Some("1".into())])]).unwrap();
        assert!(read_numbers(&df, "t").is_err());
    }
}
