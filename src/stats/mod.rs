//! Stats module - summary statistics

mod calculator;

pub use calculator::{StatsCalculator, StatsError, SummaryStats};
