//! # Price Regression
//!
//! Trailing-window feature engineering and ordinary least squares models for
//! predicting a daily closing price from its own history.
//!
//! ## Modules
//!
//! - `data` - Loading, rolling-window features and date-based splitting
//! - `models` - Linear regression (OLS)
//! - `metrics` - Model evaluation metrics
//! - `pipeline` - End-to-end experiment runner and report
//! - `config` - Pipeline configuration

pub mod config;
pub mod data;
pub mod metrics;
pub mod models;
pub mod pipeline;

pub use config::PipelineConfig;
pub use data::error::DataError;
pub use data::features::{Feature, FeatureEngineering, FeatureFrame};
pub use data::loader::DataLoader;
pub use data::split::{DateSplitter, Split};
pub use data::types::{Dataset, PriceRecord};
pub use data::window::{Aggregation, RollingWindow};
pub use metrics::regression::{MetricsError, RegressionMetrics};
pub use models::linear::{LinearRegression, LinearRegressionError, Solver};
pub use pipeline::{Experiment, ExperimentResult, Pipeline, PipelineError, PipelineReport};
