//! Monitor configuration, loaded once from TOML and frozen.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration watching BTCUSDT and ETHUSDT on six intervals.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use trendwatch_core::data::{BinanceConfig, RetryPolicy, DEFAULT_LIMIT};
use trendwatch_core::domain::{Interval, PairKey};
use trendwatch_core::indicators::MacdParams;
use trendwatch_core::{ClassifierConfig, ClassifyError, CrossRules};

use crate::cadence::Cadence;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("render config TOML: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Classifier(#[from] ClassifyError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub data: DataConfig,
    pub monitor: ScheduleConfig,
    pub indicators: IndicatorConfig,
    pub classifier: ClassifierRules,
    pub output: OutputConfig,
    pub status: StatusConfig,
}

/// Exchange endpoint and acquisition policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub base_url: String,
    pub kline_path: String,
    pub proxy: Option<String>,
    /// Bars requested per pair.
    pub limit: usize,
    pub request_timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_delay_secs: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        let binance = BinanceConfig::default();
        let retry = RetryPolicy::default();
        Self {
            base_url: binance.base_url,
            kline_path: binance.kline_path,
            proxy: None,
            limit: DEFAULT_LIMIT,
            request_timeout_secs: binance.request_timeout.as_secs(),
            retry_attempts: retry.max_attempts,
            retry_delay_secs: retry.delay.as_secs(),
        }
    }
}

impl DataConfig {
    pub fn binance_config(&self) -> BinanceConfig {
        BinanceConfig {
            base_url: self.base_url.clone(),
            kline_path: self.kline_path.clone(),
            proxy: self.proxy.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            delay: Duration::from_secs(self.retry_delay_secs),
            // Outer cap, one second past the client's own timeout.
            attempt_timeout: Duration::from_secs(self.request_timeout_secs + 1),
        }
    }
}

/// What to watch and how often.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub symbols: Vec<String>,
    pub intervals: Vec<Interval>,
    pub cadence: Cadence,
    /// Seconds to wait past each boundary so the just-closed bar is published.
    pub settle_delay_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BTCUSDT".into(), "ETHUSDT".into()],
            intervals: vec![
                Interval::M5,
                Interval::M15,
                Interval::H1,
                Interval::H4,
                Interval::D1,
                Interval::D3,
            ],
            cadence: Cadence::default(),
            settle_delay_secs: 7,
        }
    }
}

impl ScheduleConfig {
    /// Symbol-major order: every interval of the first symbol, then the next.
    pub fn pairs(&self) -> Vec<PairKey> {
        self.symbols
            .iter()
            .flat_map(|s| self.intervals.iter().map(move |i| PairKey::new(s.clone(), *i)))
            .collect()
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub ema_short: usize,
    pub ema_long: usize,
    pub ma: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        let c = ClassifierConfig::default();
        Self {
            ema_short: c.ema_short,
            ema_long: c.ema_long,
            ma: c.ma,
            macd_fast: c.macd.fast,
            macd_slow: c.macd.slow,
            macd_signal: c.macd.signal,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    pub cross_rules: CrossRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub log_dir: PathBuf,
    /// Log every result through tracing after each cycle.
    pub console: bool,
    /// Write the daily trend and error log files under `log_dir`.
    pub file: bool,
    /// JSON snapshot upserted per (symbol, interval); disabled when unset.
    pub snapshot: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            console: true,
            file: true,
            snapshot: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
    pub default_symbol: String,
    pub default_interval: Interval,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0".into(),
            port: 8080,
            default_symbol: "BTCUSDT".into(),
            default_interval: Interval::H1,
        }
    }
}

impl StatusConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl MonitorConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        let i = &self.indicators;
        ClassifierConfig {
            ema_short: i.ema_short,
            ema_long: i.ema_long,
            ma: i.ma,
            macd: MacdParams {
                fast: i.macd_fast,
                slow: i.macd_slow,
                signal: i.macd_signal,
            },
            cross_rules: self.classifier.cross_rules,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.monitor;
        if m.symbols.is_empty() {
            return Err(ConfigError::Invalid("monitor.symbols is empty".into()));
        }
        if let Some(bad) = m.symbols.iter().find(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("blank symbol {bad:?}")));
        }
        if m.intervals.is_empty() {
            return Err(ConfigError::Invalid("monitor.intervals is empty".into()));
        }

        let classifier = self.classifier_config();
        classifier.validate()?;

        let required = classifier.required_bars();
        if self.data.limit < required {
            return Err(ConfigError::Invalid(format!(
                "data.limit ({}) is below the {required} bars the indicators need",
                self.data.limit
            )));
        }
        if self.data.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "data.request_timeout_secs must be >= 1".into(),
            ));
        }
        Ok(())
    }
}
