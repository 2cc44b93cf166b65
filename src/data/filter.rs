//! Filter / Selector Module
//! Row filtering by date range and category, and two-column projection.
//! Every function returns a new table; the source is never modified.

use super::{coerce, column_cells, float_column, read_dates, read_text, text_column};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("Category and value must be different columns (both are '{0}')")]
    DuplicateSelection(String),
    #[error("Column '{0}' does not hold dates")]
    NotADateColumn(String),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FilterError> {
        if start > end {
            return Err(FilterError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateConstraint {
    pub column: String,
    pub range: DateRange,
}

/// Rows whose text value is in `allowed`. An empty set matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryConstraint {
    pub column: String,
    pub allowed: BTreeSet<String>,
}

/// Constraints combined with logical AND. The default has none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub date: Option<DateConstraint>,
    pub category: Option<CategoryConstraint>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, column: &str, range: DateRange) -> Self {
        self.date = Some(DateConstraint {
            column: column.to_string(),
            range,
        });
        self
    }

    pub fn with_categories<I, S>(mut self, column: &str, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.category = Some(CategoryConstraint {
            column: column.to_string(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.category.is_none()
    }

    /// Apply every constraint to `df` as one lazy filter.
    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame, FilterError> {
        let mut predicates = Vec::new();

        if let Some(constraint) = &self.date {
            ensure_date_column(df, &constraint.column)?;
            predicates.push(col(constraint.column.as_str()).is_between(
                lit(constraint.range.start),
                lit(constraint.range.end),
                ClosedInterval::Both,
            ));
        }

        if let Some(constraint) = &self.category {
            ensure_column(df, &constraint.column)?;
            let allowed: Vec<String> = constraint.allowed.iter().cloned().collect();
            let allowed = Series::new("allowed".into(), allowed);
            predicates.push(
                col(constraint.column.as_str())
                    .cast(DataType::String)
                    .is_in(lit(allowed)),
            );
        }

        let Some(predicate) = predicates.into_iter().reduce(|all, next| all.and(next)) else {
            return Ok(df.clone());
        };
        let filtered = df.clone().lazy().filter(predicate).collect()?;
        debug!(rows_in = df.height(), rows_out = filtered.height(), "filter applied");
        Ok(filtered)
    }
}

fn ensure_column(df: &DataFrame, name: &str) -> Result<(), FilterError> {
    if df.column(name).is_err() {
        return Err(FilterError::UnknownColumn(name.to_string()));
    }
    Ok(())
}

fn ensure_date_column(df: &DataFrame, name: &str) -> Result<(), FilterError> {
    ensure_column(df, name)?;
    if df.column(name)?.dtype() != &DataType::Date {
        return Err(FilterError::NotADateColumn(name.to_string()));
    }
    Ok(())
}

/// Project `[category, value]`, coercing the value column to numbers.
///
/// Rows with a missing category or a value that does not coerce are dropped.
pub fn select_pair(df: &DataFrame, category: &str, value: &str) -> Result<DataFrame, FilterError> {
    ensure_column(df, category)?;
    ensure_column(df, value)?;
    if category == value {
        return Err(FilterError::DuplicateSelection(category.to_string()));
    }

    let labels = read_text(df, category)?;
    let cells = column_cells(df.column(value)?)?;

    let (labels, values): (Vec<Option<String>>, Vec<Option<f64>>) = labels
        .into_iter()
        .zip(cells.iter().map(coerce::to_number))
        .filter(|(label, value)| label.is_some() && value.is_some())
        .unzip();

    debug!(rows_in = df.height(), rows_out = labels.len(), "columns projected");
    Ok(DataFrame::new(vec![
        text_column(category, labels),
        float_column(value, values),
    ])?)
}

/// Sorted distinct non-null values of a column, as text.
pub fn distinct_values(df: &DataFrame, column: &str) -> Result<Vec<String>, FilterError> {
    ensure_column(df, column)?;
    let unique = df
        .clone()
        .lazy()
        .select([col(column).drop_nulls().unique().sort(SortOptions::default())])
        .collect()?;
    Ok(read_text(&unique, column)?.into_iter().flatten().collect())
}

/// Earliest and latest date of a column, or `None` when it holds no dates.
pub fn date_span(df: &DataFrame, column: &str) -> Result<Option<DateRange>, FilterError> {
    ensure_date_column(df, column)?;
    let bounds = df
        .clone()
        .lazy()
        .select([col(column).min().alias("start"), col(column).max().alias("end")])
        .collect()?;
    let first = |name: &str| -> Result<Option<NaiveDate>, FilterError> {
        Ok(read_dates(&bounds, name)?.into_iter().next().flatten())
    };
    match (first("start")?, first("end")?) {
        (Some(start), Some(end)) => Ok(Some(DateRange { start, end })),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{date_column, read_numbers};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn sales() -> DataFrame {
        DataFrame::new(vec![
            date_column(
                "Date",
                &[Some(d(1, 5)), Some(d(1, 20)), Some(d(2, 3)), None],
            )
            .unwrap(),
            text_column(
                "Product",
                vec![
                    Some("WidgetA".into()),
                    Some("WidgetB".into()),
                    Some("WidgetA".into()),
                    Some("WidgetC".into()),
                ],
            ),
            float_column("Total", vec![Some(20.0), Some(15.0), Some(4.0), Some(9.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn no_constraint_passes_through() {
        let df = sales();
        let out = FilterSpec::new().apply(&df).unwrap();
        assert!(out.equals_missing(&df));
    }

    #[test]
    fn date_range_is_inclusive() {
        let df = sales();
        let range = DateRange::new(d(1, 5), d(1, 20)).unwrap();
        let out = FilterSpec::new()
            .with_date_range("Date", range)
            .apply(&df)
            .unwrap();

        let dates = read_dates(&out, "Date").unwrap();
        assert_eq!(dates, vec![Some(d(1, 5)), Some(d(1, 20))]);
        assert!(dates.iter().flatten().all(|x| range.start() <= *x && *x <= range.end()));
    }

    #[test]
    fn full_span_keeps_every_dated_row() {
        let df = sales().slice(0, 3);
        let span = date_span(&df, "Date").unwrap().unwrap();
        let out = FilterSpec::new()
            .with_date_range("Date", span)
            .apply(&df)
            .unwrap();
        assert_eq!(out.height(), df.height());
    }

    #[test]
    fn category_filter_keeps_members_only() {
        let df = sales();
        let out = FilterSpec::new()
            .with_categories("Product", ["WidgetA"])
            .apply(&df)
            .unwrap();

        assert_eq!(out.height(), 2);
        assert_eq!(read_numbers(&out, "Total").unwrap(), vec![Some(20.0), Some(4.0)]);
        let total: f64 = read_numbers(&out, "Total").unwrap().into_iter().flatten().sum();
        assert_eq!(total, 24.0);
    }

    #[test]
    fn per_category_counts_add_up() {
        let df = sales();
        let subset = ["WidgetA", "WidgetC"];
        let combined = FilterSpec::new()
            .with_categories("Product", subset)
            .apply(&df)
            .unwrap();
        let per_category: usize = subset
            .iter()
            .map(|p| {
                FilterSpec::new()
                    .with_categories("Product", [*p])
                    .apply(&df)
                    .unwrap()
                    .height()
            })
            .sum();
        assert_eq!(per_category, combined.height());
    }

    #[test]
    fn empty_category_set_matches_nothing() {
        let out = FilterSpec::new()
            .with_categories("Product", Vec::<String>::new())
            .apply(&sales())
            .unwrap();
        assert_eq!(out.height(), 0);
    }

    #[test]
    fn constraints_combine_with_and() {
        let range = DateRange::new(d(1, 1), d(1, 31)).unwrap();
        let out = FilterSpec::new()
            .with_date_range("Date", range)
            .with_categories("Product", ["WidgetA"])
            .apply(&sales())
            .unwrap();
        assert_eq!(out.height(), 1);
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(matches!(
            DateRange::new(d(2, 1), d(1, 1)),
            Err(FilterError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn select_pair_coerces_and_drops() {
        let df = DataFrame::new(vec![
            text_column("Category", vec![Some("a".into()), Some("b".into()), Some("c".into())]),
            text_column(
                "Value",
                vec![Some("12".into()), Some("abc".into()), Some("7.5".into())],
            ),
        ])
        .unwrap();

        let out = select_pair(&df, "Category", "Value").unwrap();
        assert_eq!(read_numbers(&out, "Value").unwrap(), vec![Some(12.0), Some(7.5)]);
        assert_eq!(
            read_text(&out, "Category").unwrap(),
            vec![Some("a".to_string()), Some("c".to_string())]
        );
    }

    #[test]
    fn select_pair_rejects_same_column_twice() {
        let err = select_pair(&sales(), "Total", "Total").unwrap_err();
        assert!(matches!(err, FilterError::DuplicateSelection(_)));
        let err = select_pair(&sales(), "Nope", "Total").unwrap_err();
        assert!(matches!(err, FilterError::UnknownColumn(_)));
    }

    #[test]
    fn distinct_values_are_sorted() {
        assert_eq!(
            distinct_values(&sales(), "Product").unwrap(),
            vec!["WidgetA", "WidgetB", "WidgetC"]
        );
    }
}
