//! Configuration types shared by the coordinator and provider middleware.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TallyError;
use crate::metrics::MetricSchema;

/// Exponential backoff configuration for retrying provider fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Minimum backoff delay in milliseconds.
    pub min_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,
    /// Exponential factor to increase delay after each failure (>= 1).
    pub factor: u32,
    /// Random jitter percentage [0, 100] added to each delay.
    pub jitter_percent: u8,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_backoff_ms: 200,
            max_backoff_ms: 10_000,
            factor: 2,
            jitter_percent: 20,
        }
    }
}

impl BackoffConfig {
    /// Base delay (before jitter) to wait after the `failures`-th consecutive failure.
    ///
    /// `failures` starts at 1; the first retry waits `min_backoff_ms`.
    #[must_use]
    pub fn base_delay_ms(&self, failures: u32) -> u64 {
        let mut delay = self.min_backoff_ms;
        for _ in 1..failures {
            delay = delay.saturating_mul(u64::from(self.factor));
            if delay >= self.max_backoff_ms {
                break;
            }
        }
        delay.min(self.max_backoff_ms)
    }
}

/// Bounded retry policy applied to provider fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one (>= 1).
    pub max_attempts: u32,
    /// Timeout applied to each individual attempt.
    pub attempt_timeout: Duration,
    /// Delay schedule between attempts.
    pub backoff: BackoffConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(10),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Time-bounded cache for provider series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in milliseconds; 0 disables the cache.
    pub ttl_ms: u64,
    /// Maximum number of links held.
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 60_000,
            max_entries: 1024,
        }
    }
}

/// Global configuration for the `Tally` coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// Days an event keeps claiming clicks after its own date, and days before
    /// the next event's date at which the next window takes over.
    pub margin_days: u32,
    /// Metric and breakdown names reported by the aggregator.
    pub schema: MetricSchema,
    /// Overall deadline for one provider fetch, retries included.
    pub provider_timeout: Duration,
    /// Retry policy for transient provider failures.
    pub retry: RetryConfig,
    /// Optional transient cache in front of the provider.
    pub cache: Option<CacheConfig>,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            margin_days: 2,
            schema: MetricSchema::open(),
            provider_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            cache: None,
        }
    }
}

impl TallyConfig {
    /// Parse a JSON configuration document; absent fields take their defaults.
    ///
    /// # Errors
    /// Returns `InvalidArg` if the document does not parse or fails validation.
    pub fn from_json_str(json: &str) -> Result<Self, TallyError> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| TallyError::InvalidArg(format!("config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check value ranges and schema hygiene.
    ///
    /// # Errors
    /// Returns `InvalidArg` describing the first problem found.
    pub fn validate(&self) -> Result<(), TallyError> {
        if self.retry.max_attempts == 0 {
            return Err(TallyError::InvalidArg(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        let b = &self.retry.backoff;
        if b.factor == 0 {
            return Err(TallyError::InvalidArg(
                "retry.backoff.factor must be at least 1".into(),
            ));
        }
        if b.jitter_percent > 100 {
            return Err(TallyError::InvalidArg(
                "retry.backoff.jitter_percent must be within [0, 100]".into(),
            ));
        }
        if b.min_backoff_ms > b.max_backoff_ms {
            return Err(TallyError::InvalidArg(
                "retry.backoff.min_backoff_ms exceeds max_backoff_ms".into(),
            ));
        }
        if self.provider_timeout.is_zero() {
            return Err(TallyError::InvalidArg(
                "provider_timeout must be non-zero".into(),
            ));
        }
        check_names("schema.metrics", &self.schema.metrics)?;
        check_names("schema.breakdowns", &self.schema.breakdowns)?;
        Ok(())
    }
}

fn check_names(field: &str, names: &[String]) -> Result<(), TallyError> {
    let mut seen = HashSet::new();
    for n in names {
        if n.trim().is_empty() {
            return Err(TallyError::InvalidArg(format!("{field} contains an empty name")));
        }
        if !seen.insert(n.as_str()) {
            return Err(TallyError::InvalidArg(format!(
                "{field} lists '{n}' more than once"
            )));
        }
    }
    Ok(())
}
