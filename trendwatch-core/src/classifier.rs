//! Trend classification: EMA band + moving-average confirmation + momentum.
//!
//! Decision table, evaluated on the latest bar:
//!
//! | band    | momentum             | price vs EMA short | MA confirmation              | label |
//! |---------|----------------------|--------------------|------------------------------|-------|
//! | bullish | continuation up      | price > ema_short  | price > ma or ma < ema_short | Buy   |
//! | bearish | reversal up (golden) | price > ema_short  | price > ma or ma < ema_short | Buy   |
//! | bearish | continuation down    | price < ema_short  | price < ma or ma > ema_short | Sell  |
//! | bullish | reversal down (dead) | price < ema_short  | price < ma or ma > ema_short | Sell  |
//!
//! The band is bullish iff `ema_short > ema_long`. Buy is checked first, so it
//! wins if both sides hold. Anything else is `Range`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{BarSeries, IndicatorSnapshot, TrendLabel, TrendResult};
use crate::indicators::{macd, IndicatorKind, IndicatorSet, MacdError, MacdParams};
use crate::patterns::{CrossRules, Momentum};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassifyError {
    #[error("insufficient history: {available} bars available, {required} required")]
    InsufficientHistory { required: usize, available: usize },
    #[error("invalid classifier config: {0}")]
    InvalidConfig(String),
}

impl From<MacdError> for ClassifyError {
    fn from(e: MacdError) -> Self {
        ClassifyError::InvalidConfig(e.to_string())
    }
}

/// Indicator periods and rule table for the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub ema_short: usize,
    pub ema_long: usize,
    pub ma: usize,
    pub macd: MacdParams,
    pub cross_rules: CrossRules,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            ema_short: 25,
            ema_long: 50,
            ma: 60,
            macd: MacdParams::default(),
            cross_rules: CrossRules::FiveBar,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), ClassifyError> {
        if self.ema_short == 0 || self.ema_long == 0 || self.ma == 0 {
            return Err(ClassifyError::InvalidConfig(
                "indicator periods must be >= 1".into(),
            ));
        }
        if self.ema_short >= self.ema_long {
            return Err(ClassifyError::InvalidConfig(format!(
                "ema_short ({}) must be below ema_long ({})",
                self.ema_short, self.ema_long
            )));
        }
        self.macd.validate()?;
        Ok(())
    }

    pub fn indicator_set(&self) -> IndicatorSet {
        IndicatorSet::new()
            .with(IndicatorKind::Ema(self.ema_short))
            .with(IndicatorKind::Ema(self.ema_long))
            .with(IndicatorKind::Sma(self.ma))
    }

    /// Bars needed before a series can be classified.
    pub fn required_bars(&self) -> usize {
        self.indicator_set().max_period()
    }
}

/// Stateless rule engine; holds only its configuration.
#[derive(Debug, Clone)]
pub struct TrendClassifier {
    config: ClassifierConfig,
}

impl TrendClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifyError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify a bar series, stamping the result with `evaluated_at`.
    pub fn classify(
        &self,
        series: &BarSeries,
        evaluated_at: DateTime<Utc>,
    ) -> Result<TrendResult, ClassifyError> {
        let (label, indicators) = self.classify_closes(&series.closes())?;
        Ok(TrendResult {
            symbol: series.pair().symbol.clone(),
            interval: series.pair().interval,
            label,
            indicators,
            evaluated_at,
        })
    }

    /// Classify a bare close-price sequence.
    pub fn classify_closes(
        &self,
        closes: &[f64],
    ) -> Result<(TrendLabel, IndicatorSnapshot), ClassifyError> {
        let cfg = &self.config;
        let set = cfg.indicator_set();
        let required = set.max_period();
        let insufficient = || ClassifyError::InsufficientHistory {
            required,
            available: closes.len(),
        };
        if closes.len() < required {
            return Err(insufficient());
        }

        let latest = |kind: IndicatorKind| {
            set.get(&kind.label())
                .and_then(|k| k.latest(closes))
                .ok_or_else(insufficient)
        };
        let price = *closes.last().ok_or_else(insufficient)?;
        let ema_short = latest(IndicatorKind::Ema(cfg.ema_short))?;
        let ema_long = latest(IndicatorKind::Ema(cfg.ema_long))?;
        let ma = latest(IndicatorKind::Sma(cfg.ma))?;

        let oscillator = macd(closes, cfg.macd);
        let momentum = Momentum::from_macd(closes.len(), &oscillator, cfg.macd);
        let (dif, dea, histogram) = oscillator.latest().ok_or_else(insufficient)?;

        let snapshot = IndicatorSnapshot {
            price,
            ema_short,
            ema_long,
            ma,
            dif,
            dea,
            histogram,
        };
        let label = decide(&snapshot, &momentum, cfg.cross_rules);
        Ok((label, snapshot))
    }
}

/// The decision table. Pure; exposed for table-driven tests.
pub fn decide(s: &IndicatorSnapshot, momentum: &Momentum, rules: CrossRules) -> TrendLabel {
    let bullish_band = s.ema_short > s.ema_long;
    let (continuation_up, continuation_down) = momentum.continuation(rules);
    let (reversal_up, reversal_down) = momentum.reversal();

    let above = s.price > s.ema_short && (s.price > s.ma || s.ma < s.ema_short);
    let below = s.price < s.ema_short && (s.price < s.ma || s.ma > s.ema_short);

    let buy = above
        && ((bullish_band && continuation_up) || (!bullish_band && reversal_up));
    if buy {
        return TrendLabel::Buy;
    }

    let sell = below
        && ((!bullish_band && continuation_down) || (bullish_band && reversal_down));
    if sell {
        return TrendLabel::Sell;
    }

    TrendLabel::Range
}
