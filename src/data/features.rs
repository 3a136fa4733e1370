//! Feature engineering for daily close prediction
//!
//! Every feature is either a trailing rolling statistic of the close or a
//! fixed-weight blend of other features. Trailing windows never include the
//! day being predicted.

use super::error::{DataError, DataResult};
use super::types::{Dataset, PriceRecord};
use super::window::{Aggregation, RollingWindow};
use chrono::NaiveDate;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Derived feature columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Feature {
    #[serde(rename = "avg_p5_days", alias = "avg_p5")]
    AvgP5,
    #[serde(rename = "avg_p30_days", alias = "avg_p30")]
    AvgP30,
    #[serde(rename = "avg_p365_days", alias = "avg_p365")]
    AvgP365,
    #[serde(rename = "std_p5_days", alias = "std_p5")]
    StdP5,
    #[serde(rename = "std_p365_days", alias = "std_p365")]
    StdP365,
    #[serde(rename = "wavg_p5_p365", alias = "wavg_5_365")]
    WavgP5P365,
    #[serde(rename = "wavg_std_p5_p365", alias = "wavg_std_5_365")]
    WavgStdP5P365,
}

/// How a feature is computed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureKind {
    /// Rolling statistic of the close
    Rolling(RollingWindow),
    /// Weighted sum of other features
    Blend(&'static [(Feature, f64)]),
}

impl Feature {
    /// All features, ordered so that blend inputs come before the blend
    pub const ALL: [Feature; 7] = [
        Feature::AvgP5,
        Feature::AvgP30,
        Feature::AvgP365,
        Feature::StdP5,
        Feature::StdP365,
        Feature::WavgP5P365,
        Feature::WavgStdP5P365,
    ];

    /// Column name
    pub fn name(&self) -> &'static str {
        match self {
            Feature::AvgP5 => "avg_p5_days",
            Feature::AvgP30 => "avg_p30_days",
            Feature::AvgP365 => "avg_p365_days",
            Feature::StdP5 => "std_p5_days",
            Feature::StdP365 => "std_p365_days",
            Feature::WavgP5P365 => "wavg_p5_p365",
            Feature::WavgStdP5P365 => "wavg_std_p5_p365",
        }
    }

    pub fn kind(&self) -> FeatureKind {
        match self {
            Feature::AvgP5 => FeatureKind::Rolling(RollingWindow::trailing(5, Aggregation::Mean)),
            Feature::AvgP30 => FeatureKind::Rolling(RollingWindow::trailing(30, Aggregation::Mean)),
            Feature::AvgP365 => {
                FeatureKind::Rolling(RollingWindow::trailing(365, Aggregation::Mean))
            }
            Feature::StdP5 => {
                FeatureKind::Rolling(RollingWindow::trailing(5, Aggregation::SampleStd))
            }
            Feature::StdP365 => {
                FeatureKind::Rolling(RollingWindow::trailing(365, Aggregation::SampleStd))
            }
            Feature::WavgP5P365 => {
                FeatureKind::Blend(&[(Feature::AvgP5, 0.7), (Feature::AvgP365, 0.3)])
            }
            Feature::WavgStdP5P365 => {
                FeatureKind::Blend(&[(Feature::StdP5, 0.2), (Feature::StdP365, 0.8)])
            }
        }
    }

    /// Number of preceding records needed before the feature is defined
    pub fn lookback(&self) -> usize {
        match self.kind() {
            FeatureKind::Rolling(window) => window.size,
            FeatureKind::Blend(terms) => terms.iter().map(|(f, _)| f.lookback()).max().unwrap_or(0),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "avg_p5_days" | "avg_p5" => Ok(Feature::AvgP5),
            "avg_p30_days" | "avg_p30" => Ok(Feature::AvgP30),
            "avg_p365_days" | "avg_p365" => Ok(Feature::AvgP365),
            "std_p5_days" | "std_p5" => Ok(Feature::StdP5),
            "std_p365_days" | "std_p365" => Ok(Feature::StdP365),
            "wavg_p5_p365" | "wavg_5_365" => Ok(Feature::WavgP5P365),
            "wavg_std_p5_p365" | "wavg_std_5_365" => Ok(Feature::WavgStdP5P365),
            other => Err(format!("unknown feature: {other}")),
        }
    }
}

/// Price records plus derived feature columns.
///
/// Undefined feature values are NaN. Frames are never modified in place:
/// adding a column or selecting rows produces a new frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    records: Vec<PriceRecord>,
    columns: BTreeMap<Feature, Vec<f64>>,
}

impl FeatureFrame {
    /// Create a frame without derived columns
    pub fn new(records: Vec<PriceRecord>) -> Self {
        Self {
            records,
            columns: BTreeMap::new(),
        }
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.close).collect()
    }

    /// Values of a derived column
    pub fn column(&self, feature: Feature) -> Option<&[f64]> {
        self.columns.get(&feature).map(|c| c.as_slice())
    }

    /// Return a new frame with `values` stored under `feature`
    pub fn with_column(mut self, feature: Feature, values: Vec<f64>) -> DataResult<Self> {
        if values.len() != self.records.len() {
            return Err(DataError::ColumnLength {
                feature,
                expected: self.records.len(),
                got: values.len(),
            });
        }
        self.columns.insert(feature, values);
        Ok(self)
    }

    /// Return a new frame holding only the rows at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> Self {
        let records = indices.iter().map(|&i| self.records[i].clone()).collect();
        let columns = self
            .columns
            .iter()
            .map(|(&f, values)| (f, indices.iter().map(|&i| values[i]).collect()))
            .collect();

        Self { records, columns }
    }

    /// Whether the close and every `required` column are defined at row `i`.
    ///
    /// A required column that was never derived counts as undefined.
    pub fn is_complete(&self, i: usize, required: &[Feature]) -> bool {
        self.records[i].close.is_finite()
            && required.iter().all(|f| {
                self.columns
                    .get(f)
                    .map(|values| values[i].is_finite())
                    .unwrap_or(false)
            })
    }

    /// First `n` records
    pub fn head(&self, n: usize) -> &[PriceRecord] {
        &self.records[..n.min(self.records.len())]
    }

    /// Build a model dataset from the chosen feature columns, with the close
    /// as target and an optional weight column
    pub fn to_dataset(&self, features: &[Feature], weight: Option<Feature>) -> DataResult<Dataset> {
        let columns = features
            .iter()
            .map(|&f| self.column(f).ok_or(DataError::MissingFeature(f)))
            .collect::<DataResult<Vec<_>>>()?;

        let n = self.len();
        let x = Array2::from_shape_fn((n, columns.len()), |(i, j)| columns[j][i]);
        let y = Array1::from_vec(self.closes());

        let weights = match weight {
            Some(f) => {
                let values = self.column(f).ok_or(DataError::MissingFeature(f))?;
                Some(Array1::from_vec(values.to_vec()))
            }
            None => None,
        };

        Ok(Dataset {
            x,
            y,
            weights,
            feature_names: features.iter().map(|f| f.name().to_string()).collect(),
            dates: self.dates(),
        })
    }
}

/// Feature engineering utilities
#[derive(Debug, Default)]
pub struct FeatureEngineering;

impl FeatureEngineering {
    /// Compute one feature for every row of `frame`.
    ///
    /// Blend inputs must already be present in the frame.
    pub fn compute(frame: &FeatureFrame, feature: Feature) -> DataResult<Vec<f64>> {
        match feature.kind() {
            FeatureKind::Rolling(window) => Ok(window.apply(&frame.closes())),
            FeatureKind::Blend(terms) => {
                let inputs = terms
                    .iter()
                    .map(|&(f, w)| frame.column(f).map(|c| (c, w)).ok_or(DataError::MissingFeature(f)))
                    .collect::<DataResult<Vec<_>>>()?;

                Ok((0..frame.len())
                    .map(|i| {
                        inputs
                            .iter()
                            .map(|(c, w)| w * c[i])
                            .reduce(|a, b| a + b)
                            .unwrap_or(f64::NAN)
                    })
                    .collect())
            }
        }
    }

    /// Derive every feature in [`Feature::ALL`] from records sorted by date
    pub fn derive(records: Vec<PriceRecord>) -> DataResult<FeatureFrame> {
        Self::derive_features(FeatureFrame::new(records), &Feature::ALL)
    }

    /// Return a new frame with `features` added, in the given order
    pub fn derive_features(frame: FeatureFrame, features: &[Feature]) -> DataResult<FeatureFrame> {
        features.iter().try_fold(frame, |frame, &feature| {
            let values = Self::compute(&frame, feature)?;
            let defined = values.iter().filter(|v| v.is_finite()).count();
            debug!("Derived {}: {} of {} rows defined", feature, defined, values.len());
            frame.with_column(feature, values)
        })
    }
}
