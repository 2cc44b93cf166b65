//! Statistics Calculator Module
//! Summary statistics over a numeric column.

use crate::data::read_numbers;
use polars::prelude::*;
use statrs::statistics::{Data, Median, Statistics};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Column '{0}' has no numeric values")]
    EmptyColumn(String),
    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),
}

/// Summary statistics for one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub std: f64,
}

impl Default for SummaryStats {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            mean: f64::NAN,
            median: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            std: f64::NAN,
        }
    }
}

/// Handles statistical calculations.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute summary statistics for an array of values.
    ///
    /// Returns the default (count 0, NaN moments) for an empty slice.
    pub fn compute_summary(values: &[f64]) -> SummaryStats {
        let n = values.len();
        if n == 0 {
            return SummaryStats::default();
        }

        let sum: f64 = values.iter().sum();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // sample standard deviation; a single value has no spread
        let std = if n > 1 { values.iter().std_dev() } else { 0.0 };

        SummaryStats {
            count: n,
            sum,
            mean: sum / n as f64,
            median: Self::median(values),
            min,
            max,
            std,
        }
    }

    /// Median of the values (mean of the two middle values for even counts).
    pub fn median(values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }
        Data::new(values.to_vec()).median()
    }

    /// Summary of the non-null values of a numeric column.
    pub fn summarize_column(df: &DataFrame, column: &str) -> Result<SummaryStats, StatsError> {
        let values: Vec<f64> = read_numbers(df, column)
            .map_err(|_| StatsError::NotNumeric(column.to_string()))?
            .into_iter()
            .flatten()
            .collect();
        if values.is_empty() {
            return Err(StatsError::EmptyColumn(column.to_string()));
        }
        Ok(Self::compute_summary(&values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{float_column, select_pair, text_column};

    #[test]
    fn summary_of_known_values() {
        let stats = StatsCalculator::compute_summary(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.sum, 10.0);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.std - 1.290_994_448_735_805_6).abs() < 1e-12);
    }

    #[test]
    fn single_value_has_zero_spread() {
        let stats = StatsCalculator::compute_summary(&[7.0]);
        assert_eq!(stats.median, 7.0);
        assert_eq!(stats.std, 0.0);
    }

    #[test]
    fn mean_over_coerced_values() {
        let df = DataFrame::new(vec![
            text_column("Category", vec![Some("a".into()), Some("b".into()), Some("c".into())]),
            text_column(
                "Value",
                vec![Some("12".into()), Some("abc".into()), Some("7.5".into())],
            ),
        ])
        .unwrap();
        let projected = select_pair(&df, "Category", "Value").unwrap();
        let stats = StatsCalculator::summarize_column(&projected, "Value").unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, 9.75);
    }

    #[test]
    fn empty_column_is_an_error() {
        let df = DataFrame::new(vec![float_column("v", vec![None, None])]).unwrap();
        assert!(matches!(
            StatsCalculator::summarize_column(&df, "v"),
            Err(StatsError::EmptyColumn(_))
        ));
    }
}
