//! PriceBar and BarSeries: the fundamental market data units.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::pair::{Interval, PairKey};

/// One fixed-interval kline for a single instrument.
///
/// Immutable once fetched. Prices and volumes are decoded from the exchange's
/// decimal strings into `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: DateTime<Utc>,
    pub quote_volume: f64,
    pub trade_count: u64,
    pub taker_buy_base_volume: f64,
    pub taker_buy_quote_volume: f64,
}

impl PriceBar {
    /// High bounds open and close from above, low from below, and the bar
    /// closes no earlier than it opens. Any NaN price fails.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close_time >= self.open_time
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BarError {
    #[error("bars out of order at index {index}: {previous} is not before {current}")]
    OutOfOrder {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
}

/// Ordered, time-ascending bars for one (instrument, interval) pair.
///
/// Construction enforces strictly ascending `open_time` with no duplicates.
/// Gaps at the interval's cadence are a data-source fault; they are reported
/// by [`BarSeries::gaps`] but never repaired here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    pair: PairKey,
    bars: Vec<PriceBar>,
}

impl BarSeries {
    pub fn new(pair: PairKey, bars: Vec<PriceBar>) -> Result<Self, BarError> {
        for (index, window) in bars.windows(2).enumerate() {
            if window[1].open_time <= window[0].open_time {
                return Err(BarError::OutOfOrder {
                    index: index + 1,
                    previous: window[0].open_time,
                    current: window[1].open_time,
                });
            }
        }
        Ok(Self { pair, bars })
    }

    pub fn pair(&self) -> &PairKey {
        &self.pair
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Close prices in series order.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Indices `i` where bar `i` does not open exactly one interval after bar `i-1`.
    ///
    /// Monthly bars step by calendar month.
    pub fn gaps(&self) -> Vec<usize> {
        let interval = self.pair.interval;
        let step = Duration::milliseconds(interval.duration_ms());
        let next_open = |t: DateTime<Utc>| match interval {
            Interval::Mo1 => t.checked_add_months(Months::new(1)),
            _ => t.checked_add_signed(step),
        };
        self.bars
            .windows(2)
            .enumerate()
            .filter(|(_, w)| next_open(w[0].open_time) != Some(w[1].open_time))
            .map(|(i, _)| i + 1)
            .collect()
    }
}
