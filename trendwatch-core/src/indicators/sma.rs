//! Simple Moving Average (SMA).
//!
//! Unweighted mean of the last `period` values.

/// Mean of the last `period` values, or `None` when fewer than `period` exist.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Rolling SMA over the whole series.
///
/// Same length as `values`; the first `period - 1` entries are `f64::NAN`.
pub fn sma_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    let mut sum: f64 = values[..period].iter().sum();
    result[period - 1] = sum / period as f64;

    // Roll the window forward
    for i in period..n {
        sum = sum - values[i - period] + values[i];
        result[i] = sum / period as f64;
    }

    result
}
