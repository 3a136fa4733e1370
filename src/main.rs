//! Price Regression - predict the daily close from trailing price statistics
//!
//! Run with:
//! ```bash
//! cargo run --release -- --data sphist.csv
//! cargo run --release -- --data sphist.csv --config experiments.toml --json
//! ```

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use price_regression::{Pipeline, PipelineConfig, Solver};
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "price_regression")]
#[command(about = "Linear regression on trailing-window price features")]
struct Cli {
    /// Path to the price history CSV
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Discard rows dated before this (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// First date of the test period (YYYY-MM-DD)
    #[arg(long)]
    cutoff: Option<NaiveDate>,

    /// Least squares solver
    #[arg(long, value_enum)]
    solver: Option<SolverArg>,

    /// Number of records to show in the dataset preview
    #[arg(long)]
    preview: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SolverArg {
    Qr,
    NormalEquations,
}

impl From<SolverArg> for Solver {
    fn from(arg: SolverArg) -> Self {
        match arg {
            SolverArg::Qr => Solver::Qr,
            SolverArg::NormalEquations => Solver::NormalEquations,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(data) = cli.data {
        config.data_path = data;
    }
    if let Some(start) = cli.start {
        config.start_date = start;
    }
    if let Some(cutoff) = cli.cutoff {
        config.cutoff_date = cutoff;
    }
    if let Some(solver) = cli.solver {
        config.solver = solver.into();
    }
    if let Some(preview) = cli.preview {
        config.preview_rows = preview;
    }
    config.validate()?;

    info!(
        "Running {} experiments on {:?}",
        config.experiments.len(),
        config.data_path
    );

    let data_path = config.data_path.clone();
    let pipeline = Pipeline::new(config);
    let report = pipeline
        .run_path(&data_path)
        .with_context(|| format!("Pipeline failed for {:?}", data_path))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }

    Ok(())
}
