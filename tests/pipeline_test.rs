//! Integration tests for the price regression pipeline

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use price_regression::{
    DataError, DataLoader, DateSplitter, Experiment, Feature, FeatureEngineering, Pipeline,
    PipelineConfig, PipelineError, RegressionMetrics, Solver,
};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn synthetic_close(i: usize) -> f64 {
    let t = i as f64;
    250.0 + 0.2 * t + 12.0 * (t / 23.0).sin() + 3.0 * (t / 5.0).cos()
}

/// Write `n` daily rows starting 1990-01-01, newest first
fn write_history(path: &Path, n: usize) {
    let start = ymd(1990, 1, 1);
    let mut file = File::create(path).unwrap();
    writeln!(file, "Date,Open,High,Low,Close,Volume,Adj Close").unwrap();
    for i in (0..n).rev() {
        let close = synthetic_close(i);
        writeln!(
            file,
            "{},{:.4},{:.4},{:.4},{:.4},{},{:.4}",
            start + Duration::days(i as i64),
            close - 1.0,
            close + 2.0,
            close - 2.0,
            close,
            1_000_000 + i * 10,
            close
        )
        .unwrap();
    }
}

fn config() -> PipelineConfig {
    PipelineConfig {
        start_date: ymd(1990, 6, 1),
        cutoff_date: ymd(1992, 1, 1),
        ..PipelineConfig::default()
    }
}

/// Loading a newest-first file yields ascending dates
#[test]
fn test_load_sorts_history() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.csv");
    write_history(&path, 50);

    let records = DataLoader::load_records(&path).unwrap();

    assert_eq!(records.len(), 50);
    assert_eq!(records[0].date, ymd(1990, 1, 1));
    assert!(records.windows(2).all(|w| w[0].date < w[1].date));
}

/// Features at index i only see the closes at i-w..i
#[test]
fn test_features_never_see_current_close() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.csv");
    write_history(&path, 400);

    let records = DataLoader::load_records(&path).unwrap();
    let closes: Vec<f64> = records.iter().map(|r| r.close).collect();
    let frame = FeatureEngineering::derive(records.clone()).unwrap();

    // Changing today's close must not change today's features
    let mut bumped = records;
    bumped[380].close += 1000.0;
    let bumped_frame = FeatureEngineering::derive(bumped).unwrap();

    for feature in Feature::ALL {
        assert_eq!(
            frame.column(feature).unwrap()[380].to_bits(),
            bumped_frame.column(feature).unwrap()[380].to_bits(),
            "{} leaked the current close",
            feature
        );
    }

    let avg365 = frame.column(Feature::AvgP365).unwrap();
    let expected = closes[15..380].iter().sum::<f64>() / 365.0;
    assert_relative_eq!(avg365[380], expected, epsilon = 1e-9);
}

/// Train and test partition the eligible rows at the cutoff
#[test]
fn test_split_partitions_eligible_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.csv");
    write_history(&path, 1000);

    let frame = FeatureEngineering::derive(DataLoader::load_records(&path).unwrap()).unwrap();
    let splitter = DateSplitter::new(ymd(1990, 6, 1), ymd(1992, 1, 1)).unwrap();

    let eligible = splitter.eligible(&frame, &Feature::ALL);
    let split = splitter.split(&frame, &Feature::ALL);

    assert_eq!(split.train.len() + split.test.len(), eligible.len());
    assert!(split.train.dates().iter().all(|d| *d < splitter.cutoff));
    assert!(split.test.dates().iter().all(|d| *d >= splitter.cutoff));
    assert!(eligible.dates().iter().all(|d| *d >= ymd(1991, 1, 1)));
}

/// Running twice on the same file gives bit-identical results
#[test]
fn test_pipeline_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.csv");
    write_history(&path, 1000);

    let pipeline = Pipeline::new(config());
    let first = pipeline.run_path(&path).unwrap();
    let second = pipeline.run_path(&path).unwrap();

    assert_eq!(first.results.len(), 3);
    for (a, b) in first.results.iter().zip(second.results.iter()) {
        assert_eq!(a.mae.to_bits(), b.mae.to_bits());
        assert_eq!(a.coefficients, b.coefficients);
        assert_eq!(a.intercept.to_bits(), b.intercept.to_bits());
    }
}

/// Both solvers agree on the fitted model
#[test]
fn test_solvers_agree() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.csv");
    write_history(&path, 1000);

    let qr = Pipeline::new(config()).run_path(&path).unwrap();
    let normal = Pipeline::new(PipelineConfig {
        solver: Solver::NormalEquations,
        ..config()
    })
    .run_path(&path)
    .unwrap();

    for (a, b) in qr.results.iter().zip(normal.results.iter()) {
        assert_relative_eq!(a.mae, b.mae, max_relative = 1e-4);
    }
}

/// The weighted run shares its model with the unweighted run
#[test]
fn test_weighted_run_reuses_model() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.csv");
    write_history(&path, 1000);

    let report = Pipeline::new(config()).run_path(&path).unwrap();
    let refined = &report.results[1];
    let weighted = &report.results[2];

    assert_eq!(refined.coefficients, weighted.coefficients);
    assert_eq!(refined.test_metrics.mae, weighted.test_metrics.mae);
    assert_eq!(weighted.sample_weight, Some(Feature::WavgStdP5P365));
    assert!(weighted.mae.is_finite());
}

/// A unit-weight column gives the unweighted MAE
#[test]
fn test_unit_weights_equal_unweighted_mae() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.csv");
    write_history(&path, 1000);

    let frame = FeatureEngineering::derive(DataLoader::load_records(&path).unwrap()).unwrap();
    let splitter = DateSplitter::new(ymd(1990, 6, 1), ymd(1992, 1, 1)).unwrap();
    let split = splitter.split(&frame, &Feature::ALL);

    let pipeline = Pipeline::new(config());
    let result = pipeline
        .evaluate(&Experiment::new("plain", vec![Feature::AvgP5]), &split)
        .unwrap();

    let test = split.test.to_dataset(&[Feature::AvgP5], None).unwrap();
    let predictions = test.x.column(0).mapv(|v| result.intercept + result.coefficients[0] * v);
    let ones = ndarray::Array1::ones(predictions.len());
    let weighted =
        RegressionMetrics::weighted_mean_absolute_error(&test.y, &predictions, &ones).unwrap();

    assert_relative_eq!(weighted, result.mae, epsilon = 1e-9);
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let err = Pipeline::new(config())
        .run_path(dir.path().join("missing.csv"))
        .unwrap_err();

    assert!(matches!(err, PipelineError::Data(DataError::Io(_))));
}

#[test]
fn test_bad_date_aborts_run() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.csv");
    std::fs::write(&path, "Date,Close\n1990-01-01,1.0\n1990-13-01,2.0\n").unwrap();

    let err = Pipeline::new(config()).run_path(&path).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Data(DataError::InvalidDate { line: 3, .. })
    ));
}

#[test]
fn test_report_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.csv");
    write_history(&path, 800);

    let report = Pipeline::new(config()).run_path(&path).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["results"][0]["name"], "baseline");
    assert_eq!(json["results"][2]["sample_weight"], "wavg_std_p5_p365");
    assert_eq!(json["results"][0]["features"][1], "wavg_p5_p365");
}
