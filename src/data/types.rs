//! Core data types
//!
//! - PriceRecord: one trading day of the price history
//! - Dataset: features, target and optional sample weights for a model

use chrono::NaiveDate;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// One day of price history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Trading date
    pub date: NaiveDate,
    /// Opening price
    pub open: Option<f64>,
    /// Highest price
    pub high: Option<f64>,
    /// Lowest price
    pub low: Option<f64>,
    /// Closing price
    pub close: f64,
    /// Traded volume
    pub volume: Option<f64>,
    /// Adjusted close
    pub adj_close: Option<f64>,
}

impl PriceRecord {
    /// Create a record carrying only a date and a close
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
            adj_close: None,
        }
    }
}

/// Model-ready dataset
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Feature matrix (n_samples x n_features)
    pub x: Array2<f64>,
    /// Target vector (n_samples)
    pub y: Array1<f64>,
    /// Per-sample weights used for evaluation
    pub weights: Option<Array1<f64>>,
    /// Feature names, in column order
    pub feature_names: Vec<String>,
    /// Date of each sample
    pub dates: Vec<NaiveDate>,
}

impl Dataset {
    /// Get number of samples
    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    /// Get number of features
    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.n_samples() == 0
    }
}
