//! Indicator library: SMA, EMA and the MACD-style momentum oscillator.
//!
//! Everything here is a pure function over a close-price slice. The indicator
//! set is closed, so a tagged [`IndicatorKind`] with a `match` dispatch stands
//! in for trait objects.

pub mod ema;
pub mod macd;
pub mod sma;

pub use ema::{ema, ema_series};
pub use macd::{macd, Macd, MacdError, MacdParams};
pub use sma::{sma, sma_series};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One configured moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "period", rename_all = "lowercase")]
pub enum IndicatorKind {
    Sma(usize),
    Ema(usize),
}

impl IndicatorKind {
    pub fn period(&self) -> usize {
        match self {
            IndicatorKind::Sma(p) | IndicatorKind::Ema(p) => *p,
        }
    }

    /// Value at the latest index, `None` on insufficient data.
    pub fn latest(&self, prices: &[f64]) -> Option<f64> {
        match self {
            IndicatorKind::Sma(p) => sma(prices, *p),
            IndicatorKind::Ema(p) => ema(prices, *p),
        }
    }

    /// Conventional identifier, e.g. `EMA25` or `MA60`.
    pub fn label(&self) -> String {
        match self {
            IndicatorKind::Sma(p) => format!("MA{p}"),
            IndicatorKind::Ema(p) => format!("EMA{p}"),
        }
    }
}

/// Named mapping from identifier to indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSet {
    indicators: BTreeMap<String, IndicatorKind>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under the indicator's conventional label.
    pub fn with(mut self, kind: IndicatorKind) -> Self {
        self.indicators.insert(kind.label(), kind);
        self
    }

    pub fn get(&self, name: &str) -> Option<IndicatorKind> {
        self.indicators.get(name).copied()
    }

    /// Longest period in the set; the number of bars classification requires.
    pub fn max_period(&self) -> usize {
        self.indicators
            .values()
            .map(IndicatorKind::period)
            .max()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
