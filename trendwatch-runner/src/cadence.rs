//! Wall-clock cadence for re-evaluation.
//!
//! Boundaries are aligned to the Unix epoch in UTC, so a 5-minute cadence
//! fires at :00, :05, :10 and so on. A time that sits exactly on a boundary
//! waits a full cadence for the next one.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("invalid cadence '{0}': expected a positive count with unit s, m, h or d (e.g. \"5m\")")]
pub struct ParseCadenceError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cadence {
    secs: u64,
}

impl Cadence {
    pub fn from_secs(secs: u64) -> Option<Self> {
        (secs > 0).then_some(Self { secs })
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.secs)
    }

    /// First boundary strictly after `now`.
    pub fn next_boundary(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let step = self.secs as i64 * 1000;
        let ms = now.timestamp_millis();
        let next = (ms.div_euclid(step) + 1) * step;
        DateTime::from_timestamp_millis(next).unwrap_or(now + ChronoDuration::milliseconds(step))
    }

    /// Time to sleep from `now` until the next boundary plus `settle`.
    pub fn delay_until_next(&self, now: DateTime<Utc>, settle: Duration) -> Duration {
        let wait = (self.next_boundary(now) - now)
            .to_std()
            .unwrap_or(Duration::ZERO);
        wait + settle
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self { secs: 300 }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.secs;
        if s % 86_400 == 0 {
            write!(f, "{}d", s / 86_400)
        } else if s % 3_600 == 0 {
            write!(f, "{}h", s / 3_600)
        } else if s % 60 == 0 {
            write!(f, "{}m", s / 60)
        } else {
            write!(f, "{s}s")
        }
    }
}

impl FromStr for Cadence {
    type Err = ParseCadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCadenceError(s.to_string());
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(err)?;
        let (count, unit) = trimmed.split_at(split);
        let count: u64 = count.parse().map_err(|_| err())?;
        let scale = match unit {
            "s" => 1,
            "m" => 60,
            "h" => 3_600,
            "d" => 86_400,
            _ => return Err(err()),
        };
        count
            .checked_mul(scale)
            .and_then(Cadence::from_secs)
            .ok_or_else(err)
    }
}

impl TryFrom<String> for Cadence {
    type Error = ParseCadenceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Cadence> for String {
    fn from(c: Cadence) -> Self {
        c.to_string()
    }
}
