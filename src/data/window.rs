//! Rolling-window aggregation
//!
//! A single primitive, parameterized by window size, aggregation and whether
//! the current observation is part of its own window. Every trailing
//! statistic in [`crate::data::features`] is built from it.

use serde::{Deserialize, Serialize};

/// Statistic computed over a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Arithmetic mean
    Mean,
    /// Sample standard deviation (n - 1 denominator)
    SampleStd,
}

impl Aggregation {
    /// Evaluate the statistic over a window.
    ///
    /// Returns NaN when the window is too short for the statistic.
    pub fn evaluate(&self, window: &[f64]) -> f64 {
        match self {
            Aggregation::Mean => mean(window),
            Aggregation::SampleStd => sample_std(window),
        }
    }
}

fn mean(window: &[f64]) -> f64 {
    if window.is_empty() {
        return f64::NAN;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

fn sample_std(window: &[f64]) -> f64 {
    let n = window.len();
    if n < 2 {
        return f64::NAN;
    }

    let m = mean(window);
    let variance: f64 = window.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt()
}

/// Fixed-size window sliding over an ordered series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingWindow {
    /// Number of observations in each window
    pub size: usize,
    /// Statistic computed over the window
    pub aggregation: Aggregation,
    /// Aggregate the `size` values strictly before each position instead of
    /// the `size` values ending at it
    pub exclude_current: bool,
}

impl RollingWindow {
    pub fn new(size: usize, aggregation: Aggregation, exclude_current: bool) -> Self {
        Self {
            size,
            aggregation,
            exclude_current,
        }
    }

    /// Window over the `size` observations strictly before each position
    pub fn trailing(size: usize, aggregation: Aggregation) -> Self {
        Self::new(size, aggregation, true)
    }

    /// Apply the window to a series.
    ///
    /// The output has the same length as the input. Positions without a full
    /// window of history are NaN. A zero-sized window yields NaN everywhere.
    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        if self.size == 0 {
            return vec![f64::NAN; values.len()];
        }

        (0..values.len())
            .map(|i| {
                let end = if self.exclude_current { i } else { i + 1 };
                if end < self.size {
                    f64::NAN
                } else {
                    self.aggregation.evaluate(&values[end - self.size..end])
                }
            })
            .collect()
    }
}
