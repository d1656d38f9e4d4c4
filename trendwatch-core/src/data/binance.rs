//! Binance kline provider.
//!
//! Fetches the most recent klines from the futures REST endpoint. The payload
//! is an array of 12-column rows:
//!
//! `[open_time, open, high, low, close, volume, close_time, quote_volume,
//!   trade_count, taker_buy_base, taker_buy_quote, ignore]`
//!
//! Times are integer milliseconds, prices and volumes are decimal strings.
//! Rows with fewer than 11 columns or unparseable fields fail the whole
//! response as [`DataError::Malformed`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::provider::{BarProvider, BarRequest, DataError};
use crate::domain::{BarSeries, PairKey, PriceBar};

pub const DEFAULT_BASE_URL: &str = "https://fapi.binance.com";
pub const DEFAULT_KLINE_PATH: &str = "/fapi/v1/klines";

const MIN_COLUMNS: usize = 11;

/// Connection settings for [`BinanceProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct BinanceConfig {
    pub base_url: String,
    pub kline_path: String,
    /// Outbound proxy URL applied to every request.
    pub proxy: Option<String>,
    pub request_timeout: Duration,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            kline_path: DEFAULT_KLINE_PATH.to_string(),
            proxy: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

pub struct BinanceProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl BinanceProvider {
    pub fn new(config: &BinanceConfig) -> Result<Self, DataError> {
        let mut builder = reqwest::Client::builder().timeout(config.request_timeout);
        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| DataError::Client(format!("invalid proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| DataError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}{}",
                config.base_url.trim_end_matches('/'),
                config.kline_path
            ),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BarProvider for BinanceProvider {
    fn name(&self) -> &str {
        "binance"
    }

    async fn fetch(&self, request: &BarRequest) -> Result<BarSeries, DataError> {
        let pair = &request.pair;
        let query = [
            ("symbol", pair.symbol.clone()),
            ("interval", pair.interval.to_string()),
            ("limit", request.limit.to_string()),
        ];

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let body = resp.text().await.map_err(from_reqwest)?;
        if !status.is_success() {
            return Err(DataError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        let series = parse_klines(pair.clone(), &body)?;
        debug!(pair = %pair, bars = series.len(), "fetched klines");
        Ok(series)
    }
}

fn from_reqwest(e: reqwest::Error) -> DataError {
    if e.is_timeout() {
        DataError::Timeout
    } else {
        DataError::Network(e.to_string())
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Parse a kline response body into a validated series.
pub fn parse_klines(pair: PairKey, body: &str) -> Result<BarSeries, DataError> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(body)
        .map_err(|e| DataError::Malformed(format!("expected kline array: {e}")))?;

    let bars = rows
        .iter()
        .enumerate()
        .map(|(i, row)| parse_row(row).map_err(|e| DataError::Malformed(format!("row {i}: {e}"))))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BarSeries::new(pair, bars)?)
}

fn parse_row(row: &[Value]) -> Result<PriceBar, String> {
    if row.len() < MIN_COLUMNS {
        return Err(format!(
            "expected at least {MIN_COLUMNS} columns, got {}",
            row.len()
        ));
    }

    let bar = PriceBar {
        open_time: timestamp(&row[0], "open_time")?,
        open: decimal(&row[1], "open")?,
        high: decimal(&row[2], "high")?,
        low: decimal(&row[3], "low")?,
        close: decimal(&row[4], "close")?,
        volume: decimal(&row[5], "volume")?,
        close_time: timestamp(&row[6], "close_time")?,
        quote_volume: decimal(&row[7], "quote_volume")?,
        trade_count: row[8]
            .as_u64()
            .ok_or_else(|| format!("trade_count: expected integer, got {}", row[8]))?,
        taker_buy_base_volume: decimal(&row[9], "taker_buy_base_volume")?,
        taker_buy_quote_volume: decimal(&row[10], "taker_buy_quote_volume")?,
    };
    if !bar.is_sane() {
        return Err(format!(
            "inconsistent bar: open={} high={} low={} close={}",
            bar.open, bar.high, bar.low, bar.close
        ));
    }
    Ok(bar)
}

/// Decimal field: a string on the wire, though plain numbers are accepted too.
fn decimal(v: &Value, field: &str) -> Result<f64, String> {
    let parsed = match v {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed
        .filter(|x| x.is_finite())
        .ok_or_else(|| format!("{field}: expected decimal, got {v}"))
}

fn timestamp(v: &Value, field: &str) -> Result<DateTime<Utc>, String> {
    v.as_i64()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| format!("{field}: expected millisecond timestamp, got {v}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BarError, Interval};

    fn pair() -> PairKey {
        PairKey::new("BTCUSDT", Interval::H1)
    }

    const TWO_ROWS: &str = r#"[
        [1700000000000, "37000.10", "37100.00", "36950.50", "37050.25", "1234.567",
         1700003599999, "45678901.23", 15234, "600.1", "22200000.5", "0"],
        [1700003600000, "37050.25", "37200.00", "37000.00", "37180.00", "987.654",
         1700007199999, "36543210.98", 12001, "500.2", "18500000.1", "0"]
    ]"#;

    #[test]
    fn parses_string_decimals_and_integer_times() {
        let series = parse_klines(pair(), TWO_ROWS).unwrap();
        assert_eq!(series.len(), 2);
        let first = &series.bars()[0];
        assert_eq!(first.open_time.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(first.close_time.timestamp_millis(), 1_700_003_599_999);
        assert_eq!(first.open, 37000.10);
        assert_eq!(first.close, 37050.25);
        assert_eq!(first.trade_count, 15234);
        assert_eq!(series.closes(), vec![37050.25, 37180.00]);
        assert!(first.is_sane());
    }

    #[test]
    fn eleven_columns_are_enough() {
        let body = r#"[[1700000000000, "1", "2", "0.5", "1.5", "10",
                        1700003599999, "15", 3, "4", "6"]]"#;
        let series = parse_klines(pair(), body).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn short_row_is_malformed() {
        let body = r#"[[1700000000000, "1", "2", "0.5", "1.5"]]"#;
        let err = parse_klines(pair(), body).unwrap_err();
        assert!(matches!(err, DataError::Malformed(ref m) if m.contains("row 0")));
        assert!(!err.is_retryable());
    }

    #[test]
    fn non_numeric_price_is_malformed() {
        let body = r#"[[1700000000000, "abc", "2", "0.5", "1.5", "10",
                        1700003599999, "15", 3, "4", "6", "0"]]"#;
        let err = parse_klines(pair(), body).unwrap_err();
        assert!(matches!(err, DataError::Malformed(ref m) if m.contains("open")));
    }

    #[test]
    fn inconsistent_ohlc_is_malformed() {
        // high below close
        let body = r#"[
            [1700000000000, "1", "2", "0.5", "1.5", "10", 1700003599999, "15", 3, "4", "6", "0"],
            [1700003600000, "1", "1.2", "0.5", "1.5", "10", 1700007199999, "15", 3, "4", "6", "0"]
        ]"#;
        let err = parse_klines(pair(), body).unwrap_err();
        assert!(matches!(err, DataError::Malformed(ref m) if m.contains("row 1: inconsistent bar")));
        assert!(!err.is_retryable());
    }

    #[test]
    fn error_object_is_malformed() {
        let body = r#"{"code":-1121,"msg":"Invalid symbol."}"#;
        assert!(matches!(
            parse_klines(pair(), body),
            Err(DataError::Malformed(_))
        ));
    }

    #[test]
    fn out_of_order_rows_rejected() {
        let body = r#"[
            [1700003600000, "1", "2", "0.5", "1.5", "10", 1700007199999, "15", 3, "4", "6", "0"],
            [1700000000000, "1", "2", "0.5", "1.5", "10", 1700003599999, "15", 3, "4", "6", "0"]
        ]"#;
        let err = parse_klines(pair(), body).unwrap_err();
        assert!(matches!(
            err,
            DataError::InvalidSeries(BarError::OutOfOrder { index: 1, .. })
        ));
    }

    #[test]
    fn empty_array_is_empty_series() {
        let series = parse_klines(pair(), "[]").unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn endpoint_joins_base_and_path() {
        let cfg = BinanceConfig {
            base_url: "https://fapi.binance.com/".into(),
            ..BinanceConfig::default()
        };
        let provider = BinanceProvider::new(&cfg).unwrap();
        assert_eq!(provider.endpoint(), "https://fapi.binance.com/fapi/v1/klines");
        assert_eq!(provider.name(), "binance");
    }

    #[test]
    fn invalid_proxy_is_setup_error() {
        let cfg = BinanceConfig {
            proxy: Some("not a url".into()),
            ..BinanceConfig::default()
        };
        assert!(matches!(
            BinanceProvider::new(&cfg),
            Err(DataError::Client(_))
        ));
    }
}
