//! Regression metrics for evaluating model performance

use ndarray::Array1;
use serde::Serialize;
use thiserror::Error;

/// Errors raised by metrics that validate their inputs
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Length mismatch: {y_true} targets, {y_pred} predictions, {weights} weights")]
    LengthMismatch {
        y_true: usize,
        y_pred: usize,
        weights: usize,
    },

    #[error("Invalid sample weight {value} at index {index}")]
    InvalidWeight { index: usize, value: f64 },

    #[error("Sample weights sum to zero")]
    ZeroTotalWeight,
}

/// Collection of regression metrics
#[derive(Debug, Clone, Serialize)]
pub struct RegressionMetrics {
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// R-squared (coefficient of determination)
    pub r2: f64,
    /// Number of samples
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Calculate all regression metrics
    pub fn calculate(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mse = Self::mean_squared_error(y_true, y_pred);

        Self {
            mse,
            rmse: mse.sqrt(),
            mae: Self::mean_absolute_error(y_true, y_pred),
            r2: Self::r_squared(y_true, y_pred),
            n_samples: y_true.len(),
        }
    }

    /// Mean Squared Error: (1/n) * Σ(y_true - y_pred)²
    pub fn mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        let n = y_true.len() as f64;
        y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&t, &p)| (t - p).powi(2))
            .sum::<f64>()
            / n
    }

    /// Mean Absolute Error: (1/n) * Σ|y_true - y_pred|
    pub fn mean_absolute_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        let n = y_true.len() as f64;
        y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&t, &p)| (t - p).abs())
            .sum::<f64>()
            / n
    }

    /// Weighted Mean Absolute Error: Σ w·|y_true - y_pred| / Σ w
    ///
    /// Weights must be finite, non-negative and not all zero.
    pub fn weighted_mean_absolute_error(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        weights: &Array1<f64>,
    ) -> Result<f64, MetricsError> {
        if y_true.len() != y_pred.len() || y_true.len() != weights.len() {
            return Err(MetricsError::LengthMismatch {
                y_true: y_true.len(),
                y_pred: y_pred.len(),
                weights: weights.len(),
            });
        }

        if let Some((index, &value)) = weights
            .iter()
            .enumerate()
            .find(|(_, &w)| !w.is_finite() || w < 0.0)
        {
            return Err(MetricsError::InvalidWeight { index, value });
        }

        let total: f64 = weights.sum();
        if total <= 0.0 {
            return Err(MetricsError::ZeroTotalWeight);
        }

        let weighted: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .zip(weights.iter())
            .map(|((&t, &p), &w)| w * (t - p).abs())
            .sum();

        Ok(weighted / total)
    }

    /// R-squared (coefficient of determination)
    /// R² = 1 - SS_res / SS_tot
    pub fn r_squared(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        let y_mean = y_true.mean().unwrap_or(0.0);

        let ss_res: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&t, &p)| (t - p).powi(2))
            .sum();

        let ss_tot: f64 = y_true.iter().map(|&t| (t - y_mean).powi(2)).sum();

        if ss_tot < 1e-10 {
            return 0.0;
        }

        1.0 - ss_res / ss_tot
    }
}
