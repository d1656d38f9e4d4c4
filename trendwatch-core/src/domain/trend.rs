//! Trend labels and classification results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::pair::{Interval, PairKey};

/// Closed set of trend labels produced by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendLabel {
    #[serde(rename = "BUYMACD")]
    Buy,
    #[serde(rename = "SELLMACD")]
    Sell,
    #[serde(rename = "RANGE")]
    Range,
}

impl TrendLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendLabel::Buy => "BUYMACD",
            TrendLabel::Sell => "SELLMACD",
            TrendLabel::Range => "RANGE",
        }
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indicator values that produced a label, all taken at the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub price: f64,
    pub ema_short: f64,
    pub ema_long: f64,
    pub ma: f64,
    pub dif: f64,
    pub dea: f64,
    pub histogram: f64,
}

/// Immutable classification outcome for one pair in one evaluation cycle.
///
/// Superseded by the next cycle's result for the same pair, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub symbol: String,
    pub interval: Interval,
    pub label: TrendLabel,
    pub indicators: IndicatorSnapshot,
    pub evaluated_at: DateTime<Utc>,
}

impl TrendResult {
    pub fn pair(&self) -> PairKey {
        PairKey::new(self.symbol.clone(), self.interval)
    }

    /// One-line human-readable rendering used by the log sink.
    pub fn summary_line(&self) -> String {
        format!(
            "[{}] {} {}: price={:.2}, ema_short={:.2}, ema_long={:.2}, trend={}",
            self.evaluated_at.format("%Y-%m-%d %H:%M:%S"),
            self.symbol,
            self.interval,
            self.indicators.price,
            self.indicators.ema_short,
            self.indicators.ema_long,
            self.label,
        )
    }
}
