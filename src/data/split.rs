//! Date-based train/test splitting
//!
//! Time series must not be shuffled: every training row precedes every test
//! row. Rows without full feature history are dropped first.

use super::error::{DataError, DataResult};
use super::features::{Feature, FeatureFrame};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Train and test partitions of the eligible rows
#[derive(Debug, Clone)]
pub struct Split {
    pub train: FeatureFrame,
    pub test: FeatureFrame,
}

impl Split {
    /// Number of eligible rows across both partitions
    pub fn n_eligible(&self) -> usize {
        self.train.len() + self.test.len()
    }
}

/// Splits a frame on two dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSplitter {
    /// Rows dated before this are discarded
    pub start: NaiveDate,
    /// First date of the test partition
    pub cutoff: NaiveDate,
}

impl DateSplitter {
    pub fn new(start: NaiveDate, cutoff: NaiveDate) -> DataResult<Self> {
        if start > cutoff {
            return Err(DataError::InvalidDateRange { start, cutoff });
        }
        Ok(Self { start, cutoff })
    }

    /// Indices of rows on or after `start` whose close and `required`
    /// features are all defined
    fn eligible_indices(&self, frame: &FeatureFrame, required: &[Feature]) -> Vec<usize> {
        frame
            .records()
            .iter()
            .enumerate()
            .filter(|(i, r)| r.date >= self.start && frame.is_complete(*i, required))
            .map(|(i, _)| i)
            .collect()
    }

    /// New frame holding only eligible rows
    pub fn eligible(&self, frame: &FeatureFrame, required: &[Feature]) -> FeatureFrame {
        frame.select(&self.eligible_indices(frame, required))
    }

    /// Partition eligible rows into train (`date < cutoff`) and test
    /// (`date >= cutoff`)
    pub fn split(&self, frame: &FeatureFrame, required: &[Feature]) -> Split {
        let eligible = self.eligible_indices(frame, required);

        let before_start = frame.records().iter().filter(|r| r.date < self.start).count();
        let incomplete = frame.len() - before_start - eligible.len();
        if incomplete > 0 {
            warn!(
                "Dropped {} rows on or after {} with undefined features",
                incomplete, self.start
            );
        }

        let (train_idx, test_idx): (Vec<usize>, Vec<usize>) = eligible
            .into_iter()
            .partition(|&i| frame.records()[i].date < self.cutoff);

        info!(
            "Split at {}: {} train rows, {} test rows ({} before {} discarded)",
            self.cutoff,
            train_idx.len(),
            test_idx.len(),
            before_start,
            self.start
        );

        Split {
            train: frame.select(&train_idx),
            test: frame.select(&test_idx),
        }
    }
}
