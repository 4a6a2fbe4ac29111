use std::sync::Arc;
use std::time::Duration;

use tally_core::{
    AttributionStore, CacheConfig, EventStore, MemoryAttributionStore, MetricSchema,
    ProviderClient, RetryConfig, TallyConfig, TallyError, TrackingLinkId,
};
use tally_middleware::ProviderBuilder;

use crate::locks::LinkLocks;

/// Coordinator that keeps every link's attribution partition and cached metrics current.
pub struct Tally {
    pub(crate) events: Arc<dyn EventStore>,
    pub(crate) provider: Arc<dyn ProviderClient>,
    pub(crate) store: Arc<dyn AttributionStore>,
    pub(crate) cfg: TallyConfig,
    pub(crate) locks: LinkLocks,
}

/// Builder for constructing a `Tally` coordinator with custom configuration.
pub struct TallyBuilder {
    events: Option<Arc<dyn EventStore>>,
    provider: Option<Arc<dyn ProviderClient>>,
    store: Option<Arc<dyn AttributionStore>>,
    cfg: TallyConfig,
    wrap_provider: bool,
}

impl Default for TallyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TallyBuilder {
    /// Create a new builder with sensible defaults.
    ///
    /// Behavior and trade-offs:
    /// - An event store and a provider are required; the attribution store
    ///   defaults to an in-memory [`MemoryAttributionStore`].
    /// - Defaults: 2-day margin, open metric schema, 30s overall fetch deadline,
    ///   3 attempts of 10s each with exponential backoff, no series cache.
    /// - The provider is wrapped with the retry (and optional cache) middleware
    ///   at build time unless [`wrap_provider`](Self::wrap_provider) is disabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: None,
            provider: None,
            store: None,
            cfg: TallyConfig::default(),
            wrap_provider: true,
        }
    }

    /// Register the event store the coordinator reads events and links from.
    #[must_use]
    pub fn with_event_store(mut self, events: Arc<dyn EventStore>) -> Self {
        self.events = Some(events);
        self
    }

    /// Register the raw analytics provider.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn ProviderClient>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use a custom attribution store instead of the in-memory default.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn AttributionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the whole configuration (e.g. one loaded with `TallyConfig::from_json_str`).
    #[must_use]
    pub fn config(mut self, cfg: TallyConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Set the margin, in days, around each event's date.
    ///
    /// Behavior and trade-offs:
    /// - An event keeps clicks for `margin` days after its date and hands over
    ///   to the next event `margin` days before that event's date.
    /// - Larger margins favor the earlier event when events are close together.
    #[must_use]
    pub const fn margin_days(mut self, days: u32) -> Self {
        self.cfg.margin_days = days;
        self
    }

    /// Select the metric and breakdown names to aggregate.
    #[must_use]
    pub fn schema(mut self, schema: MetricSchema) -> Self {
        self.cfg.schema = schema;
        self
    }

    /// Set the overall deadline for one provider fetch, retries included.
    #[must_use]
    pub const fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.provider_timeout = timeout;
        self
    }

    /// Set the retry policy for transient provider failures.
    #[must_use]
    pub const fn retry(mut self, retry: RetryConfig) -> Self {
        self.cfg.retry = retry;
        self
    }

    /// Enable a short-lived series cache in front of the provider.
    ///
    /// Behavior and trade-offs:
    /// - Collapses repeated fetches when several events on the same link change
    ///   in quick succession.
    /// - Metrics from event triggers and periodic refreshes may lag the provider
    ///   by up to the TTL. [`Tally::recalc_link`] always drops the link's cached
    ///   series and fetches again.
    #[must_use]
    pub const fn cache(mut self, cache: CacheConfig) -> Self {
        self.cfg.cache = Some(cache);
        self
    }

    /// Whether to wrap the provider with retry and cache middleware (default true).
    ///
    /// Disable when the provider passed in is already composed.
    #[must_use]
    pub const fn wrap_provider(mut self, yes: bool) -> Self {
        self.wrap_provider = yes;
        self
    }

    /// Validate the configuration and assemble the coordinator.
    ///
    /// # Errors
    /// Returns `InvalidArg` if the configuration is invalid or a required
    /// collaborator is missing.
    pub fn build(self) -> Result<Tally, TallyError> {
        self.cfg.validate()?;
        let events = self.events.ok_or_else(|| {
            TallyError::InvalidArg(
                "no event store registered; add one via with_event_store(...)".to_string(),
            )
        })?;
        let raw = self.provider.ok_or_else(|| {
            TallyError::InvalidArg(
                "no provider registered; add one via with_provider(...)".to_string(),
            )
        })?;
        let provider = if self.wrap_provider {
            ProviderBuilder::from_config(raw, &self.cfg).build()
        } else {
            raw
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryAttributionStore::new()));

        Ok(Tally {
            events,
            provider,
            store,
            cfg: self.cfg,
            locks: LinkLocks::new(),
        })
    }
}

impl Tally {
    /// Start building a coordinator.
    #[must_use]
    pub fn builder() -> TallyBuilder {
        TallyBuilder::new()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &TallyConfig {
        &self.cfg
    }

    /// Attribution store the coordinator writes to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn AttributionStore> {
        &self.store
    }

    /// Latest accepted trigger generation for `link`.
    ///
    /// Counts only while a recompute holds or awaits the link; 0 once idle.
    #[must_use]
    pub fn link_generation(&self, link: &TrackingLinkId) -> u64 {
        self.locks.generation(link)
    }

    /// Whether a recompute of `link` is currently in flight.
    #[must_use]
    pub fn is_recomputing(&self, link: &TrackingLinkId) -> bool {
        self.locks.is_busy(link)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "tally::core::fetch_with_deadline",
            skip(self),
            fields(
                provider = self.provider.name(),
                timeout_ms = u64::try_from(self.cfg.provider_timeout.as_millis()).unwrap_or(u64::MAX),
            ),
        )
    )]
    pub(crate) async fn fetch_with_deadline(
        &self,
        link: &TrackingLinkId,
    ) -> Result<Vec<tally_core::RawMetricPoint>, TallyError> {
        (tokio::time::timeout(self.cfg.provider_timeout, self.provider.fetch_series(link)).await)
            .unwrap_or_else(|_| Err(TallyError::provider_timeout(link)))
    }
}
