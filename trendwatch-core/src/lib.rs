//! TrendWatch Core: bar series, indicators, momentum patterns, trend classification.
//!
//! This crate contains the pure heart of the monitor plus its data seam:
//! - Domain types (bars, pairs, intervals, trend labels and results)
//! - Indicator library (SMA, EMA, MACD oscillator)
//! - Momentum pattern predicates over the oscillator histogram
//! - The trend classifier decision table
//! - The bar provider trait, the Binance implementation and the retry wrapper

pub mod classifier;
pub mod data;
pub mod domain;
pub mod indicators;
pub mod patterns;

pub use classifier::{ClassifierConfig, ClassifyError, TrendClassifier};
pub use patterns::{CrossRules, Momentum};
