//! tally-mock
//!
//! Test doubles for the tally collaborators:
//! - [`MockProvider`]: deterministic series from static fixtures.
//! - [`DynamicMockProvider`]: behavior scripted per link by a controller.
//! - [`MemoryEventStore`]: an event store tests mutate directly.
use async_trait::async_trait;
use chrono::NaiveDate;
use tally_core::{ProviderClient, RawMetricPoint, TallyError, TrackingLinkId};

mod dynamic;
mod event_store;
mod fixtures;

pub use dynamic::{DynamicMockController, DynamicMockProvider, MockBehavior};
pub use event_store::MemoryEventStore;

/// Mock provider for CI-safe examples. Provides deterministic data from static fixtures.
///
/// Known links: `spring-campaign`, `newsletter`, `poster-qr`, `dormant`.
/// The special links `FAIL`, `RATE_LIMITED`, and `TIMEOUT` simulate provider trouble.
pub struct MockProvider;

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    async fn maybe_fail_or_timeout(link: &TrackingLinkId) -> Result<(), TallyError> {
        match link.as_str() {
            "FAIL" => Err(TallyError::provider_unavailable(link, "forced failure")),
            "RATE_LIMITED" => Err(TallyError::rate_limited(link, Some(1_000))),
            "TIMEOUT" => {
                // Keep short to avoid slowing tests excessively
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    fn name(&self) -> &'static str {
        "tally-mock"
    }

    async fn fetch_series(
        &self,
        link: &TrackingLinkId,
    ) -> Result<Vec<RawMetricPoint>, TallyError> {
        Self::maybe_fail_or_timeout(link).await?;
        if link.as_str() == "TIMEOUT" {
            return Ok(Vec::new());
        }
        fixtures::series::by_link(link.as_str())
            .ok_or_else(|| TallyError::not_found(format!("series for link {link}")))
    }
}

/// Deterministic daily series: `days` points from `from`, `clicks` metric around
/// `base_clicks` with a weekly swing, plus `unique_visitors` and a `country` breakdown.
#[must_use]
pub fn daily_series(from: NaiveDate, days: u64, base_clicks: i64) -> Vec<RawMetricPoint> {
    fixtures::series::daily(from, days, base_clicks)
}
