//! Bar provider trait and structured error types.
//!
//! The BarProvider trait abstracts over kline sources so the scheduler can run
//! against the exchange in production and an in-memory mock in tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{BarError, BarSeries, PairKey};

/// Default number of bars requested per pair.
pub const DEFAULT_LIMIT: usize = 499;

/// One acquisition request: the most recent `limit` bars for `pair`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarRequest {
    pub pair: PairKey,
    pub limit: usize,
}

impl BarRequest {
    pub fn new(pair: PairKey, limit: usize) -> Self {
        Self { pair, limit }
    }
}

/// Structured error types for bar acquisition.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("invalid bar series: {0}")]
    InvalidSeries(#[from] BarError),

    #[error("provider setup failed: {0}")]
    Client(String),
}

impl DataError {
    /// Transient failures worth another attempt. Parse and setup errors are final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DataError::Network(_) | DataError::Timeout | DataError::Status { .. }
        )
    }
}

/// Trait for bar providers.
///
/// Implementations handle the specifics of one source. Retries live above this
/// trait in [`crate::data::fetch_with_retry`]; providers make exactly one attempt.
#[async_trait]
pub trait BarProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the most recent bars for one pair, oldest first.
    async fn fetch(&self, request: &BarRequest) -> Result<BarSeries, DataError>;
}
