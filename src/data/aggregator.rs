//! Aggregator Module
//! Group-by reductions over numeric columns, run as polars lazy queries.

use super::columns::is_numeric;
use polars::prelude::*;
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),
    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),
    #[error("Column '{0}' does not hold dates")]
    NotADateColumn(String),
    #[error("No aggregate requested")]
    NoAggregates,
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Reduction applied to each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggFunc {
    Sum,
    Mean,
    Min,
    Max,
    Median,
    Count,
}

impl AggFunc {
    pub const ALL: [AggFunc; 6] = [
        AggFunc::Sum,
        AggFunc::Mean,
        AggFunc::Min,
        AggFunc::Max,
        AggFunc::Median,
        AggFunc::Count,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Median => "median",
            AggFunc::Count => "count",
        }
    }

    /// Reduction of `column` as a `Float64` expression.
    fn expr(&self, column: &str) -> Expr {
        let values = col(column).cast(DataType::Float64);
        let reduced = match self {
            AggFunc::Sum => values.sum(),
            AggFunc::Mean => values.mean(),
            AggFunc::Min => values.min(),
            AggFunc::Max => values.max(),
            AggFunc::Median => values.median(),
            AggFunc::Count => values.count(),
        };
        reduced.cast(DataType::Float64)
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How group keys are derived from a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    /// The text value of the column
    Column(String),
    /// Calendar month of a date column, keyed by its first day
    Month(String),
}

impl GroupKey {
    pub fn column(&self) -> &str {
        match self {
            GroupKey::Column(name) | GroupKey::Month(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupOrder {
    /// Ascending by key (time series)
    #[default]
    Key,
    /// Descending by the first aggregate, ties by key (rankings)
    ValueDescending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSpec {
    pub key: GroupKey,
    pub aggregates: Vec<(String, AggFunc)>,
    pub order: GroupOrder,
    pub limit: Option<usize>,
}

impl AggregateSpec {
    pub fn new(key: GroupKey) -> Self {
        Self {
            key,
            aggregates: Vec::new(),
            order: GroupOrder::Key,
            limit: None,
        }
    }

    pub fn agg(mut self, column: &str, func: AggFunc) -> Self {
        self.aggregates.push((column.to_string(), func));
        self
    }

    pub fn order(mut self, order: GroupOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Name of the output column for an aggregate.
    pub fn output_name(column: &str, func: AggFunc) -> String {
        format!("{column} ({func})")
    }
}

/// Computes grouped summaries.
pub struct Aggregator;

impl Aggregator {
    /// One row per key with every requested aggregate.
    ///
    /// Rows with a null key or a null in any requested value column are
    /// dropped first, so every group has at least one contributing row.
    pub fn aggregate(df: &DataFrame, spec: &AggregateSpec) -> Result<DataFrame, AggregateError> {
        let (first_column, first_func) =
            spec.aggregates.first().ok_or(AggregateError::NoAggregates)?;
        let key_name = spec.key.column();
        let key = Self::key_expr(df, &spec.key)?;

        let mut present = col(key_name).is_not_null();
        let mut aggs = Vec::with_capacity(spec.aggregates.len());
        for (column, func) in &spec.aggregates {
            let dtype = df
                .column(column)
                .map_err(|_| AggregateError::UnknownColumn(column.clone()))?
                .dtype();
            if !is_numeric(dtype) {
                return Err(AggregateError::NotNumeric(column.clone()));
            }
            present = present.and(col(column.as_str()).is_not_null());
            aggs.push(func.expr(column).alias(AggregateSpec::output_name(column, *func)));
        }

        let first = AggregateSpec::output_name(first_column, *first_func);
        let (order_by, descending) = match spec.order {
            GroupOrder::Key => (vec![col(key_name)], vec![false]),
            GroupOrder::ValueDescending => {
                (vec![col(first.as_str()), col(key_name)], vec![true, false])
            }
        };

        let mut query = df
            .clone()
            .lazy()
            .filter(present)
            .group_by([key.alias(key_name)])
            .agg(aggs)
            .sort_by_exprs(
                order_by,
                SortMultipleOptions::default().with_order_descending_multi(descending),
            );
        if let Some(limit) = spec.limit {
            query = query.limit(limit as IdxSize);
        }

        let grouped = query.collect()?;
        debug!(key = key_name, groups = grouped.height(), "aggregated");
        Ok(grouped)
    }

    fn key_expr(df: &DataFrame, key: &GroupKey) -> Result<Expr, AggregateError> {
        let name = key.column();
        let dtype = df
            .column(name)
            .map_err(|_| AggregateError::UnknownColumn(name.to_string()))?
            .dtype();
        match key {
            GroupKey::Column(_) => Ok(col(name).cast(DataType::String)),
            GroupKey::Month(_) if dtype == &DataType::Date => {
                Ok(col(name).dt().truncate(lit("1mo")))
            }
            GroupKey::Month(_) => Err(AggregateError::NotADateColumn(name.to_string())),
        }
    }
}
