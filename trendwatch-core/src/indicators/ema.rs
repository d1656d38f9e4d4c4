//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = EMA[t-1] + alpha * (price[t] - EMA[t-1]), alpha = 2 / (period + 1)
//! Seed: EMA[period-1] = SMA of the first `period` values.
//! Warm-up indices (before period-1) hold 0.0 and carry no meaning.
//!
//! The zero warm-up is load-bearing: the momentum oscillator feeds the raw
//! fast-minus-slow difference, zeros included, into a second EMA, and its
//! output must match that exact recursion.

/// Smoothing factor for a period.
pub fn alpha(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// Compute the EMA for every index of `values`.
///
/// Returns a vector of the same length. If `values.len() < period` (or
/// `period == 0`) every element is 0.0.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![0.0; n];

    if period == 0 || n < period {
        return result;
    }

    let alpha = alpha(period);

    // Seed: SMA of first `period` values
    let seed = values[..period].iter().sum::<f64>() / period as f64;
    result[period - 1] = seed;

    let mut prev = seed;
    for i in period..n {
        let ema = prev + alpha * (values[i] - prev);
        result[i] = ema;
        prev = ema;
    }

    result
}

/// Latest EMA value, or `None` when there are fewer than `period` values.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    ema_series(values, period).last().copied()
}
