//! Data structures and utilities for daily price history

pub mod error;
pub mod features;
pub mod loader;
pub mod split;
pub mod types;
pub mod window;

pub use error::{DataError, DataResult};
pub use features::{Feature, FeatureEngineering, FeatureFrame};
pub use loader::DataLoader;
pub use split::{DateSplitter, Split};
pub use types::{Dataset, PriceRecord};
pub use window::{Aggregation, RollingWindow};
