//! Data error types

use chrono::NaiveDate;
use thiserror::Error;

use super::features::Feature;

/// Errors that can occur while loading, deriving or splitting price data
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid date {value:?} at line {line}")]
    InvalidDate { line: u64, value: String },

    #[error("Feature column not derived: {0}")]
    MissingFeature(Feature),

    #[error("Column {feature} has {got} values, expected {expected}")]
    ColumnLength {
        feature: Feature,
        expected: usize,
        got: usize,
    },

    #[error("Start date {start} is after cutoff date {cutoff}")]
    InvalidDateRange { start: NaiveDate, cutoff: NaiveDate },

    #[error("No price records available")]
    EmptyDataset,
}

/// Result type alias for data operations
pub type DataResult<T> = Result<T, DataError>;
