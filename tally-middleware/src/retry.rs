//! Bounded retry of transient provider failures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tally_core::{Middleware, ProviderClient, RawMetricPoint, TallyError, TrackingLinkId};
use tally_types::RetryConfig;

/// Add up to `jitter_percent` of `base_ms` as random jitter.
pub(crate) fn jitter_wait(base_ms: u64, jitter_percent: u8) -> u64 {
    let jitter_range = if jitter_percent == 0 {
        1
    } else {
        std::cmp::max(1, base_ms.saturating_mul(u64::from(jitter_percent)) / 100)
    };
    let mut rng = rand::rng();
    base_ms.saturating_add(rng.random_range(0..jitter_range))
}

/// Wrapper that retries transient provider failures with exponential backoff.
///
/// - Each attempt is bounded by `attempt_timeout`; an elapsed attempt counts
///   as a `ProviderTimeout` failure.
/// - Only transient errors (see [`TallyError::is_transient`]) are retried.
///   Anything else is returned immediately.
/// - A `RateLimited` hint is honored: the wait before the next attempt is
///   never shorter than the server's `retry_after_ms`.
/// - When attempts run out the last error is wrapped in `RetriesExhausted`
///   (unless only a single attempt was configured).
pub struct RetryingProvider {
    inner: Arc<dyn ProviderClient>,
    config: RetryConfig,
}

impl RetryingProvider {
    /// Wrap `inner` with the given retry policy.
    pub fn new(inner: Arc<dyn ProviderClient>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Access the inner provider.
    pub fn inner(&self) -> &Arc<dyn ProviderClient> {
        &self.inner
    }

    fn delay_after(&self, failures: u32, err: &TallyError) -> Duration {
        let backoff = &self.config.backoff;
        let wait = jitter_wait(backoff.base_delay_ms(failures), backoff.jitter_percent);
        let wait = err.retry_after_ms().map_or(wait, |hint| wait.max(hint));
        Duration::from_millis(wait)
    }

    async fn attempt(&self, link: &TrackingLinkId) -> Result<Vec<RawMetricPoint>, TallyError> {
        match tokio::time::timeout(self.config.attempt_timeout, self.inner.fetch_series(link)).await
        {
            Ok(res) => res,
            Err(_) => Err(TallyError::provider_timeout(link)),
        }
    }
}

#[async_trait]
impl ProviderClient for RetryingProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "tally::middleware::retry::fetch_series",
            skip(self),
            fields(provider = self.inner.name(), max_attempts = self.config.max_attempts),
        )
    )]
    async fn fetch_series(
        &self,
        link: &TrackingLinkId,
    ) -> Result<Vec<RawMetricPoint>, TallyError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match self.attempt(link).await {
                Ok(series) => return Ok(series),
                Err(e) => e,
            };
            if !err.is_transient() {
                return Err(err);
            }
            if attempt >= max_attempts {
                if max_attempts == 1 {
                    return Err(err);
                }
                return Err(TallyError::RetriesExhausted {
                    link: link.clone(),
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            let delay = self.delay_after(attempt, &err);
            #[cfg(feature = "tracing")]
            tracing::debug!(
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient provider failure; retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn invalidate(&self, link: &TrackingLinkId) {
        self.inner.invalidate(link).await;
    }
}

/// Middleware config for constructing a [`RetryingProvider`].
pub struct RetryMiddleware {
    pub config: RetryConfig,
}

impl RetryMiddleware {
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl Middleware for RetryMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn ProviderClient>) -> Arc<dyn ProviderClient> {
        Arc::new(RetryingProvider::new(inner, self.config))
    }

    fn name(&self) -> &'static str {
        "RetryingProvider"
    }

    fn config_json(&self) -> serde_json::Value {
        let b = &self.config.backoff;
        serde_json::json!({
            "max_attempts": self.config.max_attempts,
            "attempt_timeout_ms": self.config.attempt_timeout.as_millis(),
            "min_backoff_ms": b.min_backoff_ms,
            "max_backoff_ms": b.max_backoff_ms,
            "factor": b.factor,
            "jitter_percent": b.jitter_percent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::jitter_wait;

    #[test]
    fn jitter_stays_within_percent() {
        for _ in 0..100 {
            let w = jitter_wait(1_000, 20);
            assert!((1_000..1_200).contains(&w), "{w}");
        }
        assert_eq!(jitter_wait(500, 0), 500);
    }
}
