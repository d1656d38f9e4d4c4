//! Latest-results store shared between the scheduler and the status endpoint.
//!
//! Writes happen once per evaluation cycle under a single write lock, so a
//! reader never sees half of a batch. Pairs that failed in a cycle keep their
//! previous result.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use trendwatch_core::domain::{PairKey, TrendResult};

#[derive(Debug, Default)]
struct Inner {
    results: HashMap<PairKey, TrendResult>,
    published_at: Option<DateTime<Utc>>,
    batches: u64,
}

/// Cheap-to-clone handle; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct LatestResults {
    inner: Arc<RwLock<Inner>>,
}

impl LatestResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace entries for every pair in `results` as one batch.
    pub fn publish(&self, started_at: DateTime<Utc>, results: &[TrendResult]) {
        let mut inner = self.inner.write();
        for result in results {
            inner.results.insert(result.pair(), result.clone());
        }
        inner.published_at = Some(started_at);
        inner.batches += 1;
    }

    pub fn get(&self, pair: &PairKey) -> Option<TrendResult> {
        self.inner.read().results.get(pair).cloned()
    }

    /// All results, sorted by symbol then interval.
    pub fn snapshot(&self) -> Vec<TrendResult> {
        let inner = self.inner.read();
        let mut all: Vec<TrendResult> = inner.results.values().cloned().collect();
        all.sort_by(|a, b| a.pair().cmp(&b.pair()));
        all
    }

    pub fn len(&self) -> usize {
        self.inner.read().results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().results.is_empty()
    }

    /// Start time of the cycle behind the most recent batch.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().published_at
    }

    /// Number of batches published so far.
    pub fn batches(&self) -> u64 {
        self.inner.read().batches
    }
}
