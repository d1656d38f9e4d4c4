//! Dual-EMA momentum oscillator (MACD).
//!
//! DIF       = EMA(prices, fast) - EMA(prices, slow)   (elementwise)
//! DEA       = EMA(DIF, signal)
//! histogram = DIF - DEA                               (elementwise)
//!
//! All three series have the input's length. Only indices >= slow + signal
//! are numerically meaningful: before that, the slow EMA's zero warm-up
//! leaks into DIF and through it into the DEA seed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ema::ema_series;

#[derive(Debug, Error, PartialEq)]
pub enum MacdError {
    #[error("fast period ({fast}) must be >= 1 and below slow period ({slow})")]
    FastNotBelowSlow { fast: usize, slow: usize },
    #[error("signal period must be >= 1")]
    ZeroSignal,
}

/// Oscillator periods. Construct through [`MacdParams::new`] to validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl MacdParams {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, MacdError> {
        let params = Self { fast, slow, signal };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), MacdError> {
        if self.fast == 0 || self.fast >= self.slow {
            return Err(MacdError::FastNotBelowSlow {
                fast: self.fast,
                slow: self.slow,
            });
        }
        if self.signal == 0 {
            return Err(MacdError::ZeroSignal);
        }
        Ok(())
    }

    /// First index whose values are meaningful.
    pub fn meaningful_from(&self) -> usize {
        self.slow + self.signal
    }

    /// Minimum input length for pattern predicates.
    pub fn min_len(&self) -> usize {
        self.slow + self.signal + 1
    }
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 6,
            slow: 13,
            signal: 5,
        }
    }
}

/// The three oscillator series.
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Macd {
    pub fn len(&self) -> usize {
        self.dif.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dif.is_empty()
    }

    /// Latest (dif, dea, histogram), if any.
    pub fn latest(&self) -> Option<(f64, f64, f64)> {
        let i = self.len().checked_sub(1)?;
        Some((self.dif[i], self.dea[i], self.histogram[i]))
    }
}

/// Compute the oscillator over `prices`.
pub fn macd(prices: &[f64], params: MacdParams) -> Macd {
    let fast = ema_series(prices, params.fast);
    let slow = ema_series(prices, params.slow);

    let dif: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let dea = ema_series(&dif, params.signal);
    let histogram = dif.iter().zip(&dea).map(|(d, e)| d - e).collect();

    Macd {
        dif,
        dea,
        histogram,
    }
}
