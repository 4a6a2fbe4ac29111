#[cfg(feature = "test-adapters")]
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use tally_core::{RawMetricPoint, TallyError, TrackingLinkId};
use url::Url;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of `GET {base}/links/{id}/series`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPayload {
    /// Per-day points; order is not significant.
    #[serde(default)]
    pub points: Vec<RawMetricPoint>,
}

/// Series transport abstraction (so we can inject mocks in tests).
#[async_trait]
pub trait SeriesAdapter: Send + Sync {
    /// Fetch the raw payload for one link, with failures already normalized.
    async fn fetch(&self, link: &TrackingLinkId) -> Result<SeriesPayload, TallyError>;
}

/// Real adapter backed by a `reqwest::Client`.
/// `reqwest::Client` is `Clone + Send + Sync`, so no external locking is needed.
#[derive(Clone)]
pub struct RealAdapter {
    client: reqwest::Client,
    base: Url,
    api_key: Option<String>,
}

impl RealAdapter {
    /// Build an adapter with a default client for `base_url`.
    ///
    /// # Errors
    /// Returns `InvalidArg` if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, TallyError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Ok(Self::with_client(client, parse_base(base_url)?))
    }

    /// Wrap an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, base: Url) -> Self {
        Self {
            client,
            base,
            api_key: None,
        }
    }

    /// Send `Authorization: Bearer <key>` with every request.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// URL of the series endpoint for `link`; the id is percent-encoded as one segment.
    ///
    /// # Errors
    /// Returns `InvalidArg` if the base URL cannot carry a path.
    pub fn series_url(&self, link: &TrackingLinkId) -> Result<Url, TallyError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| TallyError::InvalidArg(format!("base url {} cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(["links", link.as_str(), "series"]);
        Ok(url)
    }
}

fn parse_base(base_url: &str) -> Result<Url, TallyError> {
    let url = Url::parse(base_url)
        .map_err(|e| TallyError::InvalidArg(format!("base url '{base_url}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TallyError::InvalidArg(format!(
            "base url '{base_url}' must use http or https"
        )));
    }
    Ok(url)
}

/// Server-suggested delay from a `Retry-After` header given in seconds.
fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| secs.saturating_mul(1_000))
}

pub(crate) fn map_status(
    link: &TrackingLinkId,
    status: StatusCode,
    headers: &HeaderMap,
) -> TallyError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => TallyError::rate_limited(link, retry_after_ms(headers)),
        StatusCode::NOT_FOUND => TallyError::not_found(format!("series for link {link}")),
        StatusCode::REQUEST_TIMEOUT => TallyError::provider_timeout(link),
        s if s.is_server_error() => {
            TallyError::provider_unavailable(link, format!("server error {s}"))
        }
        s => TallyError::Other(format!("provider rejected link {link}: status {s}")),
    }
}

fn map_transport(link: &TrackingLinkId, e: &reqwest::Error) -> TallyError {
    if e.is_timeout() {
        TallyError::provider_timeout(link)
    } else {
        TallyError::provider_unavailable(link, e.to_string())
    }
}

#[async_trait]
impl SeriesAdapter for RealAdapter {
    async fn fetch(&self, link: &TrackingLinkId) -> Result<SeriesPayload, TallyError> {
        let mut req = self.client.get(self.series_url(link)?);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let response = req.send().await.map_err(|e| map_transport(link, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status(link, status, response.headers()));
        }
        let body = response.bytes().await.map_err(|e| map_transport(link, &e))?;
        serde_json::from_slice::<SeriesPayload>(&body)
            .map_err(|e| TallyError::Data(format!("invalid series payload for link {link}: {e}")))
    }
}

/* -------- Test-only lightweight adapter constructors ------- */

#[cfg(feature = "test-adapters")]
impl dyn SeriesAdapter {
    /// Build a `SeriesAdapter` from a closure (tests only).
    pub fn from_fn<F>(f: F) -> Arc<dyn SeriesAdapter>
    where
        F: Send + Sync + 'static + Fn(String) -> Result<SeriesPayload, TallyError>,
    {
        struct FnSeries<F>(F);
        #[async_trait]
        impl<F> SeriesAdapter for FnSeries<F>
        where
            F: Send + Sync + 'static + Fn(String) -> Result<SeriesPayload, TallyError>,
        {
            async fn fetch(&self, link: &TrackingLinkId) -> Result<SeriesPayload, TallyError> {
                (self.0)(link.to_string())
            }
        }
        Arc::new(FnSeries(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn series_url_encodes_link_as_one_segment() {
        let a = RealAdapter::new("http://analytics.local/api/v1/").unwrap();
        let url = a.series_url(&TrackingLinkId::new("spring/24 promo")).unwrap();
        assert_eq!(
            url.as_str(),
            "http://analytics.local/api/v1/links/spring%2F24%20promo/series"
        );
    }

    #[test]
    fn rejects_non_http_base() {
        assert!(matches!(
            RealAdapter::new("ftp://example.org"),
            Err(TallyError::InvalidArg(_))
        ));
        assert!(RealAdapter::new("not a url").is_err());
    }

    #[test]
    fn status_mapping() {
        let link = TrackingLinkId::new("L");
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(
            map_status(&link, StatusCode::TOO_MANY_REQUESTS, &headers).retry_after_ms(),
            Some(7_000)
        );
        let empty = HeaderMap::new();
        assert!(map_status(&link, StatusCode::BAD_GATEWAY, &empty).is_transient());
        assert!(matches!(
            map_status(&link, StatusCode::NOT_FOUND, &empty),
            TallyError::NotFound { .. }
        ));
        assert!(!map_status(&link, StatusCode::FORBIDDEN, &empty).is_transient());
    }
}
