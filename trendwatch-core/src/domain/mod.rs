//! Domain types for TrendWatch

pub mod bar;
pub mod pair;
pub mod trend;

pub use bar::{BarError, BarSeries, PriceBar};
pub use pair::{base_asset, Interval, PairKey, ParseIntervalError};
pub use trend::{IndicatorSnapshot, TrendLabel, TrendResult};

/// Symbol type alias
pub type Symbol = String;
