//! Data loading utilities
//!
//! Reads daily price history from CSV. Header names are matched
//! case-insensitively, so both `Date,Close` and `date,close` load.

use super::error::{DataError, DataResult};
use super::types::PriceRecord;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";
const REQUIRED_COLUMNS: [&str; 2] = ["date", "close"];

/// Row as it appears in the file, before the date is parsed
#[derive(Debug, Deserialize)]
struct RawRecord {
    date: String,
    #[serde(default)]
    open: Option<f64>,
    #[serde(default)]
    high: Option<f64>,
    #[serde(default)]
    low: Option<f64>,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
    #[serde(default, rename = "adj close")]
    adj_close: Option<f64>,
}

/// Data loader for CSV files
pub struct DataLoader;

impl DataLoader {
    /// Load price records from a CSV file, sorted ascending by date
    pub fn load_records<P: AsRef<Path>>(path: P) -> DataResult<Vec<PriceRecord>> {
        let file = File::open(&path)?;
        info!("Reading price history from {:?}", path.as_ref());
        Self::from_reader(file)
    }

    /// Load price records from any reader, sorted ascending by date
    pub fn from_reader<R: Read>(rdr: R) -> DataResult<Vec<PriceRecord>> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(rdr);

        let headers: StringRecord = reader
            .headers()?
            .iter()
            .map(|h| h.to_ascii_lowercase())
            .collect();

        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(DataError::MissingColumn(column.to_string()));
            }
        }

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            let raw: RawRecord = row.deserialize(Some(&headers))?;

            let date = NaiveDate::parse_from_str(raw.date.trim(), DATE_FORMAT).map_err(|_| {
                DataError::InvalidDate {
                    line,
                    value: raw.date.clone(),
                }
            })?;

            records.push(PriceRecord {
                date,
                open: raw.open,
                high: raw.high,
                low: raw.low,
                close: raw.close,
                volume: raw.volume,
                adj_close: raw.adj_close,
            });
        }

        if records.is_empty() {
            return Err(DataError::EmptyDataset);
        }

        // Stable, so equal dates keep file order
        records.sort_by_key(|r| r.date);

        debug!(
            "Loaded {} records from {} to {}",
            records.len(),
            records[0].date,
            records[records.len() - 1].date
        );

        Ok(records)
    }
}
