//! End-to-end cycles: mock provider → scheduler → store, sinks and status endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;

use trendwatch_core::data::{BarProvider, BarRequest, DataError, RetryPolicy};
use trendwatch_core::domain::{BarSeries, Interval, PairKey, PriceBar, TrendLabel};
use trendwatch_core::{ClassifierConfig, ClassifyError, TrendClassifier};
use trendwatch_runner::{
    serve, EvaluationError, LatestResults, MonitorConfig, Scheduler, SchedulerConfig,
    SnapshotSink, StatusState, TrendLogSink, TrendView,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_series(pair: &PairKey, closes: &[f64]) -> BarSeries {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let step = pair.interval.duration_ms();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open_time = start + chrono::Duration::milliseconds(step * i as i64);
            PriceBar {
                open_time,
                open: close,
                high: close * 1.002,
                low: close * 0.998,
                close,
                volume: 10.0,
                close_time: open_time + chrono::Duration::milliseconds(step - 1),
                quote_volume: 10.0 * close,
                trade_count: 7,
                taker_buy_base_volume: 5.0,
                taker_buy_quote_volume: 5.0 * close,
            }
        })
        .collect();
    BarSeries::new(pair.clone(), bars).unwrap()
}

/// Serves an accelerating uptrend for every pair except the scripted ones.
#[derive(Default)]
struct MockExchange {
    timeouts: Vec<PairKey>,
    short: Vec<PairKey>,
    attempts: Mutex<HashMap<PairKey, u32>>,
}

impl MockExchange {
    fn attempts(&self, pair: &PairKey) -> u32 {
        self.attempts.lock().get(pair).copied().unwrap_or(0)
    }
}

#[async_trait]
impl BarProvider for MockExchange {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, request: &BarRequest) -> Result<BarSeries, DataError> {
        *self.attempts.lock().entry(request.pair.clone()).or_default() += 1;
        if self.timeouts.contains(&request.pair) {
            return Err(DataError::Timeout);
        }
        let len = if self.short.contains(&request.pair) {
            25
        } else {
            200
        };
        let closes: Vec<f64> = (0..len).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        Ok(make_series(&request.pair, &closes))
    }
}

fn fast_config() -> SchedulerConfig {
    let mut config = SchedulerConfig::from_monitor(&MonitorConfig::default());
    config.retry = RetryPolicy {
        max_attempts: 3,
        delay: Duration::ZERO,
        attempt_timeout: Duration::from_secs(5),
    };
    config.settle_delay = Duration::ZERO;
    config
}

fn classifier() -> TrendClassifier {
    TrendClassifier::new(ClassifierConfig::default()).unwrap()
}

// ── Failure isolation ────────────────────────────────────────────────

#[tokio::test]
async fn timed_out_pair_is_retried_then_isolated() {
    let failing = PairKey::new("ETHUSDT", Interval::H4);
    let exchange = Arc::new(MockExchange {
        timeouts: vec![failing.clone()],
        ..MockExchange::default()
    });
    let scheduler = Scheduler::new(fast_config(), exchange.clone(), classifier(), LatestResults::new());

    let cycle = scheduler.run_cycle().await;

    assert_eq!(cycle.results.len(), 11);
    assert_eq!(cycle.failures.len(), 1);
    assert_eq!(cycle.failures[0].pair, failing);
    assert_eq!(
        cycle.failures[0].error,
        EvaluationError::Data(DataError::Timeout)
    );
    assert_eq!(exchange.attempts(&failing), 3);
    assert_eq!(exchange.attempts(&PairKey::new("BTCUSDT", Interval::H4)), 1);
    assert!(cycle.results.iter().all(|r| r.label == TrendLabel::Buy));
}

#[tokio::test]
async fn short_history_is_not_retried() {
    let short = PairKey::new("BTCUSDT", Interval::D3);
    let exchange = Arc::new(MockExchange {
        short: vec![short.clone()],
        ..MockExchange::default()
    });
    let scheduler = Scheduler::new(fast_config(), exchange.clone(), classifier(), LatestResults::new());

    let cycle = scheduler.run_cycle().await;

    assert_eq!(cycle.results.len(), 11);
    assert!(matches!(
        cycle.failures[0].error,
        EvaluationError::Classify(ClassifyError::InsufficientHistory { .. })
    ));
    assert_eq!(exchange.attempts(&short), 1);
}

#[tokio::test]
async fn store_keeps_last_good_result_for_failed_pair() {
    let pair = PairKey::new("BTCUSDT", Interval::H1);
    let store = LatestResults::new();

    let healthy = Scheduler::new(
        fast_config(),
        Arc::new(MockExchange::default()),
        classifier(),
        store.clone(),
    );
    let first = healthy.run_cycle().await;
    let before = store.get(&pair).unwrap();
    assert_eq!(before.evaluated_at, first.started_at);

    let broken = Scheduler::new(
        fast_config(),
        Arc::new(MockExchange {
            timeouts: vec![pair.clone()],
            ..MockExchange::default()
        }),
        classifier(),
        store.clone(),
    );
    broken.run_cycle().await;

    assert_eq!(store.get(&pair).unwrap(), before);
    assert_eq!(store.batches(), 2);
    assert_eq!(store.len(), 12);
}

// ── Sinks ────────────────────────────────────────────────────────────

#[tokio::test]
async fn cycle_writes_logs_and_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let log_sink = Arc::new(TrendLogSink::new(dir.path().join("logs")).unwrap());
    let snapshot = Arc::new(SnapshotSink::new(dir.path().join("trends.json")).unwrap());
    let failing = PairKey::new("ETHUSDT", Interval::M5);

    let scheduler = Scheduler::new(
        fast_config(),
        Arc::new(MockExchange {
            timeouts: vec![failing],
            ..MockExchange::default()
        }),
        classifier(),
        LatestResults::new(),
    )
    .with_sink(log_sink.clone())
    .with_sink(snapshot.clone());

    let cycle = scheduler.run_cycle().await;

    let log = std::fs::read_to_string(log_sink.trend_log_path(cycle.started_at)).unwrap();
    assert_eq!(log.matches("trend=BUYMACD").count(), 11);
    let errors = std::fs::read_to_string(log_sink.error_log_path(cycle.started_at)).unwrap();
    assert!(errors.contains("ETHUSDT_5m"));

    let table = snapshot.load().unwrap();
    assert_eq!(table.len(), 11);
    assert!(table.contains_key("BTCUSDT_3d"));
    assert!(!table.contains_key("ETHUSDT_5m"));
}

// ── Status endpoint ──────────────────────────────────────────────────

#[tokio::test]
async fn status_endpoint_serves_latest_results() {
    let store = LatestResults::new();
    let scheduler = Scheduler::new(
        fast_config(),
        Arc::new(MockExchange::default()),
        classifier(),
        store.clone(),
    );
    scheduler.run_cycle().await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = watch::channel(false);
    let server = tokio::spawn(serve(
        listener,
        StatusState {
            store,
            default_symbol: "BTCUSDT".into(),
            default_interval: Interval::H1,
        },
        rx,
    ));

    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let view: TrendView = client
        .get(format!("{base}/trend?interval=4h"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view.symbol, "BTC");
    assert_eq!(view.interval, "4h");
    assert_eq!(view.trend, "BUYMACD");

    let text = client
        .get(format!("{base}/api/trend/btc?format=text"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(text, "BTC Trend: BUYMACD");

    let missing = client
        .get(format!("{base}/trend?interval=1w"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);

    let bad = client
        .get(format!("{base}/trend?interval=banana"))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status().as_u16(), 400);

    let all: Vec<TrendView> = client
        .get(format!("{base}/trends"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 12);

    tx.send(true).unwrap();
    server.await.unwrap().unwrap();
}
