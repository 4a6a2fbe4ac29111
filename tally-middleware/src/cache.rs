//! Short-lived cache of provider series keyed by tracking link.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tally_core::{Middleware, ProviderClient, RawMetricPoint, TallyError, TrackingLinkId};
use tally_types::CacheConfig;

type SeriesCache = Cache<TrackingLinkId, Arc<Vec<RawMetricPoint>>>;

/// Wrapper that serves repeated fetches of the same link from memory.
///
/// Only successful fetches are cached; errors always pass through. A
/// `ttl_ms` of zero disables caching entirely.
pub struct CachingProvider {
    inner: Arc<dyn ProviderClient>,
    cache: Option<SeriesCache>,
}

impl CachingProvider {
    /// Wrap `inner` with a TTL-bounded cache.
    pub fn new(inner: Arc<dyn ProviderClient>, config: CacheConfig) -> Self {
        let cache = (config.ttl_ms > 0).then(|| {
            Cache::builder()
                .max_capacity(config.max_entries.max(1))
                .time_to_live(Duration::from_millis(config.ttl_ms))
                .build()
        });
        Self { inner, cache }
    }

    /// Access the inner provider.
    pub fn inner(&self) -> &Arc<dyn ProviderClient> {
        &self.inner
    }
}

#[async_trait]
impl ProviderClient for CachingProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn fetch_series(
        &self,
        link: &TrackingLinkId,
    ) -> Result<Vec<RawMetricPoint>, TallyError> {
        let Some(cache) = &self.cache else {
            return self.inner.fetch_series(link).await;
        };
        if let Some(hit) = cache.get(link).await {
            #[cfg(feature = "tracing")]
            tracing::trace!(link = %link, "series cache hit");
            return Ok(hit.as_ref().clone());
        }
        let series = self.inner.fetch_series(link).await?;
        cache.insert(link.clone(), Arc::new(series.clone())).await;
        Ok(series)
    }

    async fn invalidate(&self, link: &TrackingLinkId) {
        if let Some(cache) = &self.cache {
            cache.invalidate(link).await;
        }
        self.inner.invalidate(link).await;
    }
}

/// Middleware config for constructing a [`CachingProvider`].
pub struct CacheMiddleware {
    pub config: CacheConfig,
}

impl CacheMiddleware {
    #[must_use]
    pub const fn new(config: CacheConfig) -> Self {
        Self { config }
    }
}

impl Middleware for CacheMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn ProviderClient>) -> Arc<dyn ProviderClient> {
        Arc::new(CachingProvider::new(inner, self.config))
    }

    fn name(&self) -> &'static str {
        "CachingProvider"
    }

    fn config_json(&self) -> serde_json::Value {
        serde_json::json!({
            "ttl_ms": self.config.ttl_ms,
            "max_entries": self.config.max_entries,
        })
    }
}
