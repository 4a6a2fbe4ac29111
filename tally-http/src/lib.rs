//! tally-http
//!
//! `ProviderClient` implementation for an analytics service that reports
//! per-day series for tracking links over HTTP:
//!
//! ```text
//! GET {base}/links/{tracking_link_id}/series
//! 200 {"points": [{"date": "2024-01-10", "metrics": {"clicks": 12}, "breakdowns": {"country": {"NL": 7}}}]}
//! ```
//!
//! Failures are normalized into `TallyError` so that the retry middleware can
//! tell transient conditions (429, 5xx, transport errors, timeouts) from
//! permanent ones (404, other 4xx, undecodable payloads).
#![warn(missing_docs)]

/// Adapter definitions and the production adapter backed by `reqwest`.
pub mod adapter;
mod builder;

use std::sync::Arc;

use adapter::{RealAdapter, SeriesAdapter};
use async_trait::async_trait;
use tally_core::{ProviderClient, RawMetricPoint, TallyError, TrackingLinkId};

pub use builder::HttpProviderBuilder;

/// Public provider that implements `ProviderClient` on top of a [`SeriesAdapter`].
pub struct HttpProvider {
    adapter: Arc<dyn SeriesAdapter>,
}

impl HttpProvider {
    /// Stable provider name used in logs and error messages.
    pub const NAME: &'static str = "tally-http";

    /// Construct an unwrapped provider for `base_url` with a default client.
    ///
    /// # Errors
    /// Returns `InvalidArg` if `base_url` is not an absolute http(s) URL.
    pub fn new_raw(base_url: &str) -> Result<Self, TallyError> {
        Ok(Self::from_real(RealAdapter::new(base_url)?))
    }

    /// Construct a provider from a configured [`RealAdapter`].
    #[must_use]
    pub fn from_real(adapter: RealAdapter) -> Self {
        Self {
            adapter: Arc::new(adapter),
        }
    }

    /// Construct a provider from any adapter (tests, alternative transports).
    #[must_use]
    pub fn from_adapter(adapter: Arc<dyn SeriesAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl ProviderClient for HttpProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "tally::http::fetch_series", skip(self), err)
    )]
    async fn fetch_series(
        &self,
        link: &TrackingLinkId,
    ) -> Result<Vec<RawMetricPoint>, TallyError> {
        let payload = self.adapter.fetch(link).await?;
        let mut points = payload.points;
        points.sort_by_key(|p| p.date);
        if let Some(pair) = points.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(TallyError::Data(format!(
                "series for link {link} reports {} twice",
                pair[0].date
            )));
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(points = points.len(), "fetched series");
        Ok(points)
    }
}
