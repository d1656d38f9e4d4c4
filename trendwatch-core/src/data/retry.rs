//! Bounded retry around a single provider.
//!
//! Fixed delay between attempts; every attempt is capped by its own timeout.
//! Only [`DataError::is_retryable`] failures are retried.

use std::time::Duration;
use tracing::warn;

use super::provider::{BarProvider, BarRequest, DataError};
use crate::domain::BarSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; values below 1 behave as 1.
    pub max_attempts: u32,
    pub delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

/// Fetch through `provider`, retrying transient failures per `policy`.
///
/// Returns the last error once attempts are exhausted.
pub async fn fetch_with_retry(
    provider: &dyn BarProvider,
    request: &BarRequest,
    policy: &RetryPolicy,
) -> Result<BarSeries, DataError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = match tokio::time::timeout(policy.attempt_timeout, provider.fetch(request))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(DataError::Timeout),
        };

        match outcome {
            Ok(series) => return Ok(series),
            Err(e) if e.is_retryable() && attempt < attempts => {
                warn!(
                    provider = provider.name(),
                    pair = %request.pair,
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "fetch failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Interval, PairKey};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays a scripted list of outcomes, then succeeds with an empty series.
    struct Scripted {
        script: Mutex<Vec<DataError>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(mut errors: Vec<DataError>) -> Self {
            errors.reverse();
            Self {
                script: Mutex::new(errors),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl BarProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch(&self, request: &BarRequest) -> Result<BarSeries, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().unwrap().pop() {
                Some(e) => Err(e),
                None => Ok(BarSeries::new(request.pair.clone(), Vec::new()).unwrap()),
            }
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::ZERO,
            attempt_timeout: Duration::from_secs(5),
        }
    }

    fn request() -> BarRequest {
        BarRequest::new(PairKey::new("ETHUSDT", Interval::M15), 100)
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let provider = Scripted::new(vec![DataError::Timeout, DataError::Network("reset".into())]);
        let result = fetch_with_retry(&provider, &request(), &fast_policy()).await;
        assert!(result.is_ok());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let provider = Scripted::new(vec![DataError::Timeout; 5]);
        let result = fetch_with_retry(&provider, &request(), &fast_policy()).await;
        assert_eq!(result.unwrap_err(), DataError::Timeout);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn malformed_is_not_retried() {
        let provider = Scripted::new(vec![DataError::Malformed("bad".into())]);
        let result = fetch_with_retry(&provider, &request(), &fast_policy()).await;
        assert!(matches!(result, Err(DataError::Malformed(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let provider = Scripted::new(vec![DataError::Timeout]);
        let policy = RetryPolicy {
            max_attempts: 0,
            ..fast_policy()
        };
        assert!(fetch_with_retry(&provider, &request(), &policy).await.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    struct Hangs;

    #[async_trait]
    impl BarProvider for Hangs {
        fn name(&self) -> &str {
            "hangs"
        }

        async fn fetch(&self, _request: &BarRequest) -> Result<BarSeries, DataError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn attempt_timeout_maps_to_timeout_error() {
        let policy = RetryPolicy {
            max_attempts: 2,
            delay: Duration::ZERO,
            attempt_timeout: Duration::from_millis(10),
        };
        let result = fetch_with_retry(&Hangs, &request(), &policy).await;
        assert_eq!(result.unwrap_err(), DataError::Timeout);
    }
}
