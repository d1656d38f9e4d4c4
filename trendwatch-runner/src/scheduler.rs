//! Evaluation scheduler.
//!
//! One cycle fetches and classifies every configured pair concurrently, then
//! publishes the whole batch: the latest-results store first, then each sink.
//! A failing pair becomes a [`PairFailure`] and never aborts the cycle.
//!
//! `run` performs one eager cycle, then sleeps until the next cadence
//! boundary plus the settle delay, and repeats. Shutdown is honoured while
//! idle and after an in-flight cycle; a started cycle always completes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use trendwatch_core::data::{fetch_with_retry, BarProvider, BarRequest, DataError, RetryPolicy};
use trendwatch_core::domain::{PairKey, TrendResult};
use trendwatch_core::{ClassifyError, TrendClassifier};

use crate::cadence::Cadence;
use crate::config::MonitorConfig;
use crate::sinks::ResultSink;
use crate::store::LatestResults;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvaluationError {
    #[error("acquisition failed: {0}")]
    Data(#[from] DataError),

    #[error("classification failed: {0}")]
    Classify(#[from] ClassifyError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairFailure {
    pub pair: PairKey,
    pub error: EvaluationError,
}

/// The complete outcome of one scheduled pass, in configured pair order.
#[derive(Debug, Clone)]
pub struct EvaluationCycle {
    pub started_at: DateTime<Utc>,
    pub results: Vec<TrendResult>,
    pub failures: Vec<PairFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Evaluating,
}

/// Everything the scheduler needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub pairs: Vec<PairKey>,
    pub limit: usize,
    pub retry: RetryPolicy,
    pub cadence: Cadence,
    pub settle_delay: Duration,
}

impl SchedulerConfig {
    pub fn from_monitor(config: &MonitorConfig) -> Self {
        Self {
            pairs: config.monitor.pairs(),
            limit: config.data.limit,
            retry: config.data.retry_policy(),
            cadence: config.monitor.cadence,
            settle_delay: config.monitor.settle_delay(),
        }
    }
}

pub struct Scheduler {
    config: SchedulerConfig,
    provider: Arc<dyn BarProvider>,
    classifier: TrendClassifier,
    store: LatestResults,
    sinks: Vec<Arc<dyn ResultSink>>,
    state: Mutex<SchedulerState>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        provider: Arc<dyn BarProvider>,
        classifier: TrendClassifier,
        store: LatestResults,
    ) -> Self {
        Self {
            config,
            provider,
            classifier,
            store,
            sinks: Vec::new(),
            state: Mutex::new(SchedulerState::Idle),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    pub fn store(&self) -> &LatestResults {
        &self.store
    }

    pub fn pairs(&self) -> &[PairKey] {
        &self.config.pairs
    }

    /// Fetch and classify one pair.
    pub async fn evaluate_pair(
        &self,
        pair: &PairKey,
        evaluated_at: DateTime<Utc>,
    ) -> Result<TrendResult, EvaluationError> {
        let request = BarRequest::new(pair.clone(), self.config.limit);
        let series = fetch_with_retry(self.provider.as_ref(), &request, &self.config.retry).await?;

        let gaps = series.gaps();
        if !gaps.is_empty() {
            warn!(pair = %pair, gaps = gaps.len(), first = gaps[0], "bar series has gaps");
        }

        let result = self.classifier.classify(&series, evaluated_at)?;
        debug!(pair = %pair, label = %result.label, bars = series.len(), "classified");
        Ok(result)
    }

    /// Run a single cycle over every pair and publish the batch.
    pub async fn run_cycle(&self) -> EvaluationCycle {
        *self.state.lock() = SchedulerState::Evaluating;
        let started_at = Utc::now();
        let clock = Instant::now();

        let outcomes = join_all(
            self.config
                .pairs
                .iter()
                .map(|pair| self.evaluate_pair(pair, started_at)),
        )
        .await;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (pair, outcome) in self.config.pairs.iter().zip(outcomes) {
            match outcome {
                Ok(result) => results.push(result),
                Err(error) => {
                    warn!(pair = %pair, error = %error, "pair evaluation failed");
                    failures.push(PairFailure {
                        pair: pair.clone(),
                        error,
                    });
                }
            }
        }

        let cycle = EvaluationCycle {
            started_at,
            results,
            failures,
        };
        self.publish(&cycle).await;

        info!(
            ok = cycle.results.len(),
            failed = cycle.failures.len(),
            elapsed_ms = clock.elapsed().as_millis() as u64,
            "evaluation cycle complete"
        );
        *self.state.lock() = SchedulerState::Idle;
        cycle
    }

    /// Store first, then sinks. Sink I/O runs on the blocking pool.
    async fn publish(&self, cycle: &EvaluationCycle) {
        self.store.publish(cycle.started_at, &cycle.results);
        if self.sinks.is_empty() {
            return;
        }

        let sinks = self.sinks.clone();
        let cycle = cycle.clone();
        let written = tokio::task::spawn_blocking(move || publish_to_sinks(&sinks, &cycle)).await;
        if let Err(e) = written {
            error!(error = %e, "sink task panicked");
        }
    }

    /// Drive cycles until `shutdown` flips to true or its sender is dropped.
    ///
    /// Returns the number of cycles run.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut cycles = 0;
        info!(
            pairs = self.config.pairs.len(),
            cadence = %self.config.cadence,
            settle_secs = self.config.settle_delay.as_secs(),
            "scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            self.run_cycle().await;
            cycles += 1;
            if *shutdown.borrow() {
                break;
            }

            let now = Utc::now();
            let wait = self
                .config
                .cadence
                .delay_until_next(now, self.config.settle_delay);
            debug!(
                next = %self.config.cadence.next_boundary(now),
                wait_ms = wait.as_millis() as u64,
                "idle until next boundary"
            );

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("shutdown sender dropped");
                        break;
                    }
                }
            }
        }

        info!(cycles, "scheduler stopped");
        cycles
    }
}

fn publish_to_sinks(sinks: &[Arc<dyn ResultSink>], cycle: &EvaluationCycle) {
    for (i, sink) in sinks.iter().enumerate() {
        if let Err(e) = sink.publish(cycle) {
            error!(sink = sink.name(), error = %e, "sink failed");
            let message = format!("sink {} failed: {e}", sink.name());
            for (j, other) in sinks.iter().enumerate() {
                if i == j {
                    continue;
                }
                if let Err(e) = other.record_error(cycle.started_at, &message) {
                    warn!(sink = other.name(), error = %e, "could not record sink failure");
                }
            }
        }
    }
}
