//! Momentum pattern detection over the oscillator histogram.
//!
//! Predicates read the last five histogram values `A, B, C, D, E`
//! (oldest to newest) and the latest DIF. Every predicate returns `false`
//! when the price series is shorter than `slow + signal + 1`; that is
//! insufficient history, not an error.
//!
//! Two families exist:
//! - the exhaustion-aware crosses ([`is_bullish_cross`], [`is_bearish_cross`]),
//!   which also look at a 4-bar monotonic run;
//! - the relaxed two-bar forms ([`is_golden`], [`is_dead`]).
//!
//! [`CrossRules`] picks which family drives the in-band continuation signal.

use serde::{Deserialize, Serialize};

use crate::indicators::{macd, Macd, MacdParams};

/// Rule table used for in-band continuation signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossRules {
    /// Exhaustion-aware crosses in-band, relaxed crosses for counter-band reversals.
    #[default]
    FiveBar,
    /// Relaxed two-bar crosses everywhere.
    TwoBar,
}

/// The five most recent histogram values plus the latest DIF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramWindow {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub dif: f64,
}

impl HistogramWindow {
    /// `None` when the oscillator holds fewer than five values.
    pub fn from_macd(m: &Macd) -> Option<Self> {
        let n = m.histogram.len();
        if n < 5 {
            return None;
        }
        let h = &m.histogram[n - 5..];
        Some(Self {
            a: h[0],
            b: h[1],
            c: h[2],
            d: h[3],
            e: h[4],
            dif: m.dif[n - 1],
        })
    }

    /// Histogram flipped from negative to positive on the last bar.
    fn fresh_positive_flip(&self) -> bool {
        self.d < 0.0 && self.e > 0.0
    }

    fn fresh_negative_flip(&self) -> bool {
        self.d > 0.0 && self.e < 0.0
    }

    /// A > B > C > D, all positive: a fading positive run.
    fn exhausted_positive(&self) -> bool {
        self.a > 0.0
            && self.b > 0.0
            && self.c > 0.0
            && self.d > 0.0
            && self.a > self.b
            && self.b > self.c
            && self.c > self.d
    }

    /// A < B < C < D, all negative: a fading negative run.
    fn exhausted_negative(&self) -> bool {
        self.a < 0.0
            && self.b < 0.0
            && self.c < 0.0
            && self.d < 0.0
            && self.a < self.b
            && self.b < self.c
            && self.c < self.d
    }

    pub fn bullish_cross(&self) -> bool {
        if self.dif > 0.0 && self.fresh_positive_flip() {
            return true;
        }
        // A fresh negative flip overrides everything below.
        if self.fresh_negative_flip() {
            return false;
        }
        if self.dif > 0.0 && self.d > 0.0 && !self.exhausted_positive() {
            return true;
        }
        // Both recent bars negative, but the histogram is turning up.
        self.dif > 0.0 && self.d > self.c
    }

    pub fn bearish_cross(&self) -> bool {
        if self.dif < 0.0 && self.fresh_negative_flip() {
            return true;
        }
        if self.fresh_positive_flip() {
            return false;
        }
        if self.dif < 0.0 && self.d < 0.0 && !self.exhausted_negative() {
            return true;
        }
        self.dif < 0.0 && self.d < self.c
    }

    pub fn golden(&self) -> bool {
        if self.dif > 0.0 && self.fresh_positive_flip() {
            return true;
        }
        if self.fresh_negative_flip() {
            return false;
        }
        self.dif > 0.0 && self.d > 0.0
    }

    pub fn dead(&self) -> bool {
        if self.dif < 0.0 && self.fresh_negative_flip() {
            return true;
        }
        if self.fresh_positive_flip() {
            return false;
        }
        self.dif < 0.0 && self.d < 0.0
    }
}

/// All four predicates for one price series, from a single oscillator pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Momentum {
    pub bullish_cross: bool,
    pub bearish_cross: bool,
    pub golden: bool,
    pub dead: bool,
}

impl Momentum {
    /// Evaluate against an oscillator already computed over `price_len` prices.
    pub fn from_macd(price_len: usize, m: &Macd, params: MacdParams) -> Self {
        if price_len < params.min_len() {
            return Self::default();
        }
        match HistogramWindow::from_macd(m) {
            Some(w) => Self {
                bullish_cross: w.bullish_cross(),
                bearish_cross: w.bearish_cross(),
                golden: w.golden(),
                dead: w.dead(),
            },
            None => Self::default(),
        }
    }

    pub fn detect(prices: &[f64], params: MacdParams) -> Self {
        if prices.len() < params.min_len() {
            return Self::default();
        }
        Self::from_macd(prices.len(), &macd(prices, params), params)
    }

    /// In-band continuation signals `(up, down)` under the given rule table.
    pub fn continuation(&self, rules: CrossRules) -> (bool, bool) {
        match rules {
            CrossRules::FiveBar => (self.bullish_cross, self.bearish_cross),
            CrossRules::TwoBar => (self.golden, self.dead),
        }
    }

    /// Counter-band reversal signals `(up, down)`.
    pub fn reversal(&self) -> (bool, bool) {
        (self.golden, self.dead)
    }
}

pub fn is_bullish_cross(prices: &[f64], params: MacdParams) -> bool {
    Momentum::detect(prices, params).bullish_cross
}

pub fn is_bearish_cross(prices: &[f64], params: MacdParams) -> bool {
    Momentum::detect(prices, params).bearish_cross
}

pub fn is_golden(prices: &[f64], params: MacdParams) -> bool {
    Momentum::detect(prices, params).golden
}

pub fn is_dead(prices: &[f64], params: MacdParams) -> bool {
    Momentum::detect(prices, params).dead
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(h: [f64; 5], dif: f64) -> HistogramWindow {
        HistogramWindow {
            a: h[0],
            b: h[1],
            c: h[2],
            d: h[3],
            e: h[4],
            dif,
        }
    }

    #[test]
    fn bullish_fresh_positive_flip() {
        let w = window([-3.0, -2.0, -1.0, -0.5, 0.5], 1.0);
        assert!(w.bullish_cross());
        assert!(w.golden());
        assert!(!w.bearish_cross());
    }

    #[test]
    fn fresh_flip_needs_positive_dif() {
        // DIF <= 0: rule 1 does not fire; D > C (rule 4) also needs DIF > 0.
        let w = window([-3.0, -2.0, -1.0, -0.5, 0.5], -1.0);
        assert!(!w.bullish_cross());
        assert!(!w.golden());
    }

    #[test]
    fn fresh_negative_flip_overrides_bullish() {
        // D > 0, E < 0 with a positive non-exhausted run: still false.
        let w = window([1.0, 2.0, 3.0, 4.0, -0.1], 5.0);
        assert!(!w.bullish_cross());
        assert!(!w.golden());
    }

    #[test]
    fn sustained_positive_without_exhaustion() {
        let w = window([1.0, 2.0, 3.0, 4.0, 5.0], 2.0);
        assert!(w.bullish_cross());
        assert!(w.golden());
    }

    #[test]
    fn exhausted_positive_run_falls_through_to_slope_rule() {
        // A > B > C > D > 0: rule 3 blocked; rule 4 needs D > C, which fails.
        let w = window([4.0, 3.0, 2.0, 1.0, 0.5], 2.0);
        assert!(!w.bullish_cross());
        // The relaxed form has no exhaustion check.
        assert!(w.golden());
    }

    #[test]
    fn plateau_is_not_exhaustion() {
        // Equal bars break the strict decline, so rule 3 fires.
        let w = window([3.0, 3.0, 2.0, 1.0, 0.5], 2.0);
        assert!(w.bullish_cross());
    }

    #[test]
    fn negative_bars_turning_up() {
        // D < 0, E < 0, D > C: rule 4.
        let w = window([-5.0, -4.0, -3.0, -2.0, -1.0], 0.5);
        assert!(w.bullish_cross());
        assert!(!w.golden());
    }

    #[test]
    fn zero_histogram_is_neutral() {
        let w = window([0.0; 5], 1.0);
        assert!(!w.bullish_cross());
        assert!(!w.golden());
        let w = window([0.0; 5], -1.0);
        assert!(!w.bearish_cross());
        assert!(!w.dead());
    }

    #[test]
    fn bearish_mirrors_bullish() {
        let cases: [([f64; 5], f64); 6] = [
            ([-3.0, -2.0, -1.0, -0.5, 0.5], 1.0),
            ([1.0, 2.0, 3.0, 4.0, -0.1], 5.0),
            ([1.0, 2.0, 3.0, 4.0, 5.0], 2.0),
            ([4.0, 3.0, 2.0, 1.0, 0.5], 2.0),
            ([-5.0, -4.0, -3.0, -2.0, -1.0], 0.5),
            ([0.5, -0.5, 0.25, 0.0, 1.0], 0.1),
        ];
        for (h, dif) in cases {
            let up = window(h, dif);
            let down = window(h.map(|v| -v), -dif);
            assert_eq!(up.bullish_cross(), down.bearish_cross(), "case {h:?} {dif}");
            assert_eq!(up.golden(), down.dead(), "case {h:?} {dif}");
        }
    }

    #[test]
    fn predicates_false_below_min_len() {
        let params = MacdParams::default();
        let prices: Vec<f64> = (0..params.min_len() - 1)
            .map(|i| 100.0 * 1.05_f64.powi(i as i32))
            .collect();
        assert!(!is_bullish_cross(&prices, params));
        assert!(!is_bearish_cross(&prices, params));
        assert!(!is_golden(&prices, params));
        assert!(!is_dead(&prices, params));
        assert_eq!(Momentum::detect(&prices, params), Momentum::default());
    }

    #[test]
    fn detect_is_deterministic() {
        let prices: Vec<f64> = (0..120)
            .map(|i| 100.0 + (i as f64 * 0.2).sin() * 4.0)
            .collect();
        let params = MacdParams::default();
        assert_eq!(
            Momentum::detect(&prices, params),
            Momentum::detect(&prices, params)
        );
    }

    #[test]
    fn continuation_follows_rule_table() {
        let m = Momentum {
            bullish_cross: false,
            bearish_cross: false,
            golden: true,
            dead: false,
        };
        assert_eq!(m.continuation(CrossRules::FiveBar), (false, false));
        assert_eq!(m.continuation(CrossRules::TwoBar), (true, false));
        assert_eq!(m.reversal(), (true, false));
    }

    #[test]
    fn cross_rules_serde_names() {
        assert_eq!(
            serde_json::to_string(&CrossRules::FiveBar).unwrap(),
            "\"five_bar\""
        );
        let rules: CrossRules = serde_json::from_str("\"two_bar\"").unwrap();
        assert_eq!(rules, CrossRules::TwoBar);
    }
}
