//! Configuration management
//!
//! Defaults reproduce the reference study: rows before 1951-01-03 are
//! discarded and the test period starts on 2013-01-01. A TOML file can
//! override any field; dates are written as quoted `YYYY-MM-DD` strings.

use crate::models::Solver;
use crate::pipeline::Experiment;
use anyhow::{ensure, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Price history CSV
    pub data_path: PathBuf,
    /// Rows dated before this are discarded
    pub start_date: NaiveDate,
    /// First date of the test period
    pub cutoff_date: NaiveDate,
    pub fit_intercept: bool,
    pub solver: Solver,
    /// Records shown in the report preview
    pub preview_rows: usize,
    pub experiments: Vec<Experiment>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("sphist.csv"),
            start_date: NaiveDate::from_ymd_opt(1951, 1, 3).unwrap_or_default(),
            cutoff_date: NaiveDate::from_ymd_opt(2013, 1, 1).unwrap_or_default(),
            fit_intercept: true,
            solver: Solver::Qr,
            preview_rows: 5,
            experiments: Experiment::defaults(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {:?}", path.as_ref()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check that the configuration describes a runnable pipeline
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.start_date <= self.cutoff_date,
            "start_date {} is after cutoff_date {}",
            self.start_date,
            self.cutoff_date
        );
        ensure!(!self.experiments.is_empty(), "no experiments configured");
        for experiment in &self.experiments {
            ensure!(
                !experiment.features.is_empty(),
                "experiment {:?} has no features",
                experiment.name
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Feature;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();

        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(1951, 1, 3).unwrap());
        assert_eq!(config.cutoff_date, NaiveDate::from_ymd_opt(2013, 1, 1).unwrap());
        assert_eq!(config.experiments.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
            cutoff_date = "2010-06-30"
            solver = "normal-equations"

            [[experiments]]
            name = "short_term"
            features = ["avg_p5_days", "std_p5"]
            sample_weight = "wavg_std_p5_p365"
            "#,
        )
        .unwrap();

        assert_eq!(config.cutoff_date, NaiveDate::from_ymd_opt(2010, 6, 30).unwrap());
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(1951, 1, 3).unwrap());
        assert_eq!(config.solver, Solver::NormalEquations);
        assert_eq!(config.experiments.len(), 1);
        assert_eq!(
            config.experiments[0].features,
            vec![Feature::AvgP5, Feature::StdP5]
        );
        assert_eq!(
            config.experiments[0].sample_weight,
            Some(Feature::WavgStdP5P365)
        );
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let config = PipelineConfig::from_toml(include_str!("../config.example.toml")).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = PipelineConfig::default();
        let parsed = PipelineConfig::from_toml(&config.to_toml().unwrap()).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validate_rejects_bad_dates() {
        let result = PipelineConfig::from_toml(
            r#"
            start_date = "2014-01-01"
            cutoff_date = "2013-01-01"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_empty_features() {
        let config = PipelineConfig {
            experiments: vec![Experiment::new("empty", vec![])],
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_feature_is_rejected() {
        let result = PipelineConfig::from_toml(
            r#"
            [[experiments]]
            name = "bad"
            features = ["rsi_14"]
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "preview_rows = 2").unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.preview_rows, 2);
        assert_eq!(config.experiments, Experiment::defaults());
    }
}
