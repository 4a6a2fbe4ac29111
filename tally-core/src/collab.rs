use async_trait::async_trait;

use tally_types::{EventId, EventRef, RawMetricPoint, TallyError, TrackingLinkId};

/// Read-only view of the application's events and their tracking links.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// All events currently attached to `link`, in any order.
    async fn list_events_for_link(
        &self,
        link: &TrackingLinkId,
    ) -> Result<Vec<EventRef>, TallyError>;

    /// All tracking links currently attached to `event`.
    ///
    /// Unknown events yield an empty list rather than an error.
    async fn list_links_for_event(
        &self,
        event: &EventId,
    ) -> Result<Vec<TrackingLinkId>, TallyError>;
}

/// Client for the external analytics provider that reports per-link series.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Stable provider name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Fetch the full per-day series recorded for `link`.
    ///
    /// Implementations report transient conditions as
    /// `TallyError::ProviderUnavailable`, `TallyError::RateLimited`, or
    /// `TallyError::ProviderTimeout` so that retry layers can recognise them.
    async fn fetch_series(&self, link: &TrackingLinkId)
    -> Result<Vec<RawMetricPoint>, TallyError>;

    /// Forget anything remembered about `link` so the next fetch goes to the
    /// provider. Wrappers forward this to the client they wrap.
    async fn invalidate(&self, _link: &TrackingLinkId) {}
}
