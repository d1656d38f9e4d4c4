//! Instrument/interval identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const MS_IN_MIN: i64 = 60_000;
const MS_IN_H: i64 = 60 * MS_IN_MIN;
const MS_IN_D: i64 = 24 * MS_IN_H;

/// Kline interval as understood by the exchange API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    M1,
    M3,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    H6,
    H8,
    H12,
    D1,
    D3,
    W1,
    Mo1,
}

impl Interval {
    pub const ALL: [Interval; 15] = [
        Interval::M1,
        Interval::M3,
        Interval::M5,
        Interval::M15,
        Interval::M30,
        Interval::H1,
        Interval::H2,
        Interval::H4,
        Interval::H6,
        Interval::H8,
        Interval::H12,
        Interval::D1,
        Interval::D3,
        Interval::W1,
        Interval::Mo1,
    ];

    /// Wire name, e.g. `"15m"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M3 => "3m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::H2 => "2h",
            Interval::H4 => "4h",
            Interval::H6 => "6h",
            Interval::H8 => "8h",
            Interval::H12 => "12h",
            Interval::D1 => "1d",
            Interval::D3 => "3d",
            Interval::W1 => "1w",
            Interval::Mo1 => "1M",
        }
    }

    /// Nominal bar length in milliseconds. Months are counted as 30 days.
    pub fn duration_ms(&self) -> i64 {
        match self {
            Interval::M1 => MS_IN_MIN,
            Interval::M3 => 3 * MS_IN_MIN,
            Interval::M5 => 5 * MS_IN_MIN,
            Interval::M15 => 15 * MS_IN_MIN,
            Interval::M30 => 30 * MS_IN_MIN,
            Interval::H1 => MS_IN_H,
            Interval::H2 => 2 * MS_IN_H,
            Interval::H4 => 4 * MS_IN_H,
            Interval::H6 => 6 * MS_IN_H,
            Interval::H8 => 8 * MS_IN_H,
            Interval::H12 => 12 * MS_IN_H,
            Interval::D1 => MS_IN_D,
            Interval::D3 => 3 * MS_IN_D,
            Interval::W1 => 7 * MS_IN_D,
            Interval::Mo1 => 30 * MS_IN_D,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unsupported interval '{0}'")]
pub struct ParseIntervalError(pub String);

impl FromStr for Interval {
    type Err = ParseIntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .iter()
            .find(|i| i.as_str() == s)
            .copied()
            .ok_or_else(|| ParseIntervalError(s.to_string()))
    }
}

impl TryFrom<String> for Interval {
    type Error = ParseIntervalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One monitored (instrument, interval) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub symbol: String,
    pub interval: Interval,
}

impl PairKey {
    pub fn new(symbol: impl Into<String>, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
        }
    }

    /// Base asset of the symbol (`BTC` for `BTCUSDT`), or the full symbol if
    /// no known quote suffix matches.
    pub fn base_asset(&self) -> &str {
        base_asset(&self.symbol)
    }
}

/// Strip a known quote-asset suffix from an exchange symbol.
pub fn base_asset(symbol: &str) -> &str {
    static QUOTES: &[&str] = &["USDT", "USDC", "FDUSD", "BUSD", "BTC", "ETH"];
    QUOTES
        .iter()
        .filter_map(|q| symbol.strip_suffix(q))
        .find(|base| !base.is_empty())
        .unwrap_or(symbol)
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.symbol, self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_parses_every_wire_name() {
        for interval in Interval::ALL {
            assert_eq!(interval.as_str().parse::<Interval>().unwrap(), interval);
        }
    }

    #[test]
    fn interval_month_and_minute_are_distinct() {
        assert_eq!("1M".parse::<Interval>().unwrap(), Interval::Mo1);
        assert_eq!("1m".parse::<Interval>().unwrap(), Interval::M1);
    }

    #[test]
    fn interval_rejects_unknown() {
        assert_eq!(
            "7m".parse::<Interval>(),
            Err(ParseIntervalError("7m".into()))
        );
    }

    #[test]
    fn interval_serde_uses_wire_name() {
        let json = serde_json::to_string(&Interval::H4).unwrap();
        assert_eq!(json, "\"4h\"");
        let back: Interval = serde_json::from_str("\"3d\"").unwrap();
        assert_eq!(back, Interval::D3);
    }

    #[test]
    fn pair_key_display_matches_store_key() {
        let key = PairKey::new("BTCUSDT", Interval::H1);
        assert_eq!(key.to_string(), "BTCUSDT_1h");
    }

    #[test]
    fn base_asset_strips_quote() {
        assert_eq!(base_asset("BTCUSDT"), "BTC");
        assert_eq!(base_asset("ETHBTC"), "ETH");
        assert_eq!(base_asset("FOO"), "FOO");
        assert_eq!(base_asset("USDT"), "USDT");
    }
}
