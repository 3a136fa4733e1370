//! End-to-end experiment runner
//!
//! Load → derive features → split by date → fit and evaluate one OLS model
//! per experiment. Each stage consumes the previous stage's output and
//! returns a new value.

use crate::config::PipelineConfig;
use crate::data::{
    DataError, DataLoader, DateSplitter, Feature, FeatureEngineering, FeatureFrame, PriceRecord,
    Split,
};
use crate::metrics::{MetricsError, RegressionMetrics};
use crate::models::{LinearRegression, LinearRegressionError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can abort a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Model error in experiment {experiment}: {source}")]
    Model {
        experiment: String,
        #[source]
        source: LinearRegressionError,
    },

    #[error("Metrics error in experiment {experiment}: {source}")]
    Metrics {
        experiment: String,
        #[source]
        source: MetricsError,
    },

    #[error("{partition} partition is empty")]
    EmptyPartition { partition: &'static str },
}

/// One model fit: which features to regress on and how to weight the error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub name: String,
    pub features: Vec<Feature>,
    /// Feature column used as per-sample weight for the test MAE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_weight: Option<Feature>,
}

impl Experiment {
    pub fn new(name: impl Into<String>, features: Vec<Feature>) -> Self {
        Self {
            name: name.into(),
            features,
            sample_weight: None,
        }
    }

    pub fn weighted_by(mut self, feature: Feature) -> Self {
        self.sample_weight = Some(feature);
        self
    }

    /// The three runs of the reference study
    pub fn defaults() -> Vec<Experiment> {
        let refined = vec![Feature::AvgP5, Feature::AvgP30, Feature::WavgP5P365];
        vec![
            Experiment::new(
                "baseline",
                vec![Feature::AvgP5, Feature::WavgP5P365, Feature::StdP365],
            ),
            Experiment::new("refined", refined.clone()),
            Experiment::new("refined_weighted", refined).weighted_by(Feature::WavgStdP5P365),
        ]
    }
}

/// Outcome of a single experiment
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentResult {
    pub name: String,
    pub features: Vec<Feature>,
    pub sample_weight: Option<Feature>,
    /// Test MAE, weighted when `sample_weight` is set
    pub mae: f64,
    /// Unweighted test metrics
    pub test_metrics: RegressionMetrics,
    pub train_r2: f64,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

/// Summary of a full run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub n_records: usize,
    pub n_eligible: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub start_date: NaiveDate,
    pub cutoff_date: NaiveDate,
    pub preview: Vec<PriceRecord>,
    pub results: Vec<ExperimentResult>,
}

impl PipelineReport {
    /// Human-readable report
    pub fn render(&self) -> String {
        let mut s = String::new();

        if !self.preview.is_empty() {
            s.push_str("Dataset preview:\n");
            let _ = writeln!(
                s,
                "  {:<10} {:>10} {:>10} {:>10} {:>10} {:>14}",
                "Date", "Open", "High", "Low", "Close", "Volume"
            );
            for r in &self.preview {
                let _ = writeln!(
                    s,
                    "  {:<10} {:>10} {:>10} {:>10} {:>10.2} {:>14}",
                    r.date,
                    fmt_opt(r.open, 2),
                    fmt_opt(r.high, 2),
                    fmt_opt(r.low, 2),
                    r.close,
                    fmt_opt(r.volume, 0)
                );
            }
            s.push('\n');
        }

        let span = match (self.first_date, self.last_date) {
            (Some(first), Some(last)) => format!("{first} to {last}"),
            _ => "empty".to_string(),
        };
        let _ = writeln!(s, "Records loaded: {} ({})", self.n_records, span);
        let _ = writeln!(
            s,
            "Eligible from {}: {} (train {} before {}, test {})",
            self.start_date, self.n_eligible, self.n_train, self.cutoff_date, self.n_test
        );

        for result in &self.results {
            let names: Vec<&str> = result.features.iter().map(|f| f.name()).collect();
            s.push('\n');
            let _ = writeln!(s, "[{}] features: {}", result.name, names.join(", "));
            match result.sample_weight {
                Some(w) => {
                    let _ = writeln!(s, "  Mean absolute error (weighted by {}): {:.6}", w, result.mae);
                }
                None => {
                    let _ = writeln!(s, "  Mean absolute error: {:.6}", result.mae);
                }
            }
            let _ = writeln!(
                s,
                "  Test RMSE: {:.6}  Test R²: {:.6}  Train R²: {:.6}",
                result.test_metrics.rmse, result.test_metrics.r2, result.train_r2
            );
        }

        s
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "-".to_string())
}

/// Runs the configured experiments over a price history
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Load records from a CSV file and run every experiment
    pub fn run_path<P: AsRef<Path>>(&self, path: P) -> Result<PipelineReport, PipelineError> {
        let records = DataLoader::load_records(path)?;
        self.run(records)
    }

    /// Run every experiment. Records are stably sorted by date first, so
    /// windows always trail in time whatever order the caller passes.
    pub fn run(&self, mut records: Vec<PriceRecord>) -> Result<PipelineReport, PipelineError> {
        records.sort_by_key(|r| r.date);
        let n_records = records.len();
        let first_date = records.first().map(|r| r.date);
        let last_date = records.last().map(|r| r.date);

        let frame = FeatureEngineering::derive(records)?;
        let preview = frame.head(self.config.preview_rows).to_vec();
        info!("Derived {} features over {} records", Feature::ALL.len(), frame.len());

        let split = self.split(&frame)?;

        let results = self
            .config
            .experiments
            .iter()
            .map(|experiment| self.evaluate(experiment, &split))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PipelineReport {
            n_records,
            n_eligible: split.n_eligible(),
            n_train: split.train.len(),
            n_test: split.test.len(),
            first_date,
            last_date,
            start_date: self.config.start_date,
            cutoff_date: self.config.cutoff_date,
            preview,
            results,
        })
    }

    /// Split a derived frame. Every feature is required, so all experiments
    /// see the same rows.
    pub fn split(&self, frame: &FeatureFrame) -> Result<Split, PipelineError> {
        let splitter = DateSplitter::new(self.config.start_date, self.config.cutoff_date)?;
        let split = splitter.split(frame, &Feature::ALL);

        if split.train.is_empty() {
            return Err(PipelineError::EmptyPartition { partition: "train" });
        }
        if split.test.is_empty() {
            return Err(PipelineError::EmptyPartition { partition: "test" });
        }
        Ok(split)
    }

    /// Fit on the train partition, evaluate on the test partition
    pub fn evaluate(
        &self,
        experiment: &Experiment,
        split: &Split,
    ) -> Result<ExperimentResult, PipelineError> {
        let model_err = |source| PipelineError::Model {
            experiment: experiment.name.clone(),
            source,
        };

        let train = split.train.to_dataset(&experiment.features, None)?;
        let test = split
            .test
            .to_dataset(&experiment.features, experiment.sample_weight)?;

        let mut model = LinearRegression::new(self.config.fit_intercept)
            .with_solver(self.config.solver)
            .with_feature_names(train.feature_names.clone());
        model.fit(&train.x, &train.y).map_err(model_err)?;
        debug!("[{}]\n{}", experiment.name, model.summary());

        let predictions = model.predict(&test.x).map_err(model_err)?;
        let test_metrics = RegressionMetrics::calculate(&test.y, &predictions);

        let mae = match &test.weights {
            Some(weights) => {
                RegressionMetrics::weighted_mean_absolute_error(&test.y, &predictions, weights)
                    .map_err(|source| PipelineError::Metrics {
                        experiment: experiment.name.clone(),
                        source,
                    })?
            }
            None => test_metrics.mae,
        };

        info!(
            "[{}] features {:?}: MAE {:.6}{}",
            experiment.name,
            train.feature_names,
            mae,
            experiment
                .sample_weight
                .map(|w| format!(" (weighted by {w})"))
                .unwrap_or_default()
        );

        Ok(ExperimentResult {
            name: experiment.name.clone(),
            features: experiment.features.clone(),
            sample_weight: experiment.sample_weight,
            mae,
            test_metrics,
            train_r2: model.r_squared.unwrap_or(f64::NAN),
            intercept: model.intercept.unwrap_or(0.0),
            coefficients: model
                .coefficients
                .as_ref()
                .map(|c| c.to_vec())
                .unwrap_or_default(),
        })
    }
}
