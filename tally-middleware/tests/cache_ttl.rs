use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tally_core::{ProviderClient, RawMetricPoint, TallyError, TrackingLinkId};
use tally_middleware::{CachingProvider, ProviderBuilder, RetryingProvider};
use tally_mock::{DynamicMockProvider, MockBehavior};
use tally_types::{CacheConfig, RetryConfig};

fn cfg(ttl_ms: u64) -> CacheConfig {
    CacheConfig {
        ttl_ms,
        max_entries: 16,
    }
}

fn series(clicks: i64) -> Vec<RawMetricPoint> {
    vec![
        RawMetricPoint::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .with_metric("clicks", clicks),
    ]
}

#[tokio::test]
async fn ttl_expiration_causes_refetch() {
    let (raw, controller) = DynamicMockProvider::new_with_controller("mock");
    controller.set_series("L1", series(1)).await;
    let p = ProviderBuilder::new(raw).with_cache(cfg(50)).build();
    let link = TrackingLinkId::new("L1");

    let _ = p.fetch_series(&link).await.unwrap(); // miss -> fetch
    assert_eq!(controller.fetch_count("L1").await, 1);
    let _ = p.fetch_series(&link).await.unwrap(); // hit
    assert_eq!(controller.fetch_count("L1").await, 1);
    tokio::time::sleep(Duration::from_millis(80)).await;
    let _ = p.fetch_series(&link).await.unwrap(); // expired -> refetch
    assert_eq!(controller.fetch_count("L1").await, 2);
}

#[tokio::test]
async fn ttl_zero_disables_caching() {
    let (raw, controller) = DynamicMockProvider::new_with_controller("mock");
    let p = ProviderBuilder::new(raw).with_cache(cfg(0)).build();
    let link = TrackingLinkId::new("L1");

    let _ = p.fetch_series(&link).await.unwrap();
    let _ = p.fetch_series(&link).await.unwrap();
    assert_eq!(controller.fetch_count("L1").await, 2);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let (raw, controller) = DynamicMockProvider::new_with_controller("mock");
    controller.set_series("L1", series(4)).await;
    controller
        .push_once("L1", MockBehavior::Fail(TallyError::provider_unavailable("L1", "503")))
        .await;
    let p = ProviderBuilder::new(raw).with_cache(cfg(60_000)).build();
    let link = TrackingLinkId::new("L1");

    assert!(p.fetch_series(&link).await.is_err());
    assert_eq!(p.fetch_series(&link).await.unwrap(), series(4));
    assert_eq!(p.fetch_series(&link).await.unwrap(), series(4));
    assert_eq!(controller.fetch_count("L1").await, 2);
}

#[tokio::test]
async fn links_are_cached_independently_and_invalidated() {
    let (raw, controller) = DynamicMockProvider::new_with_controller("mock");
    controller.set_series("L1", series(1)).await;
    controller.set_series("L2", series(2)).await;
    let p = CachingProvider::new(raw, cfg(60_000));
    let (l1, l2) = (TrackingLinkId::new("L1"), TrackingLinkId::new("L2"));

    assert_eq!(p.fetch_series(&l1).await.unwrap(), series(1));
    assert_eq!(p.fetch_series(&l2).await.unwrap(), series(2));
    p.invalidate(&l1).await;
    let _ = p.fetch_series(&l1).await.unwrap();
    let _ = p.fetch_series(&l2).await.unwrap();
    assert_eq!(controller.fetch_count("L1").await, 2);
    assert_eq!(controller.fetch_count("L2").await, 1);
}

#[tokio::test]
async fn invalidation_reaches_a_wrapped_cache() {
    let (raw, controller) = DynamicMockProvider::new_with_controller("mock");
    controller.set_series("L1", series(1)).await;
    let cached = Arc::new(CachingProvider::new(raw, cfg(60_000)));
    let p = RetryingProvider::new(cached, RetryConfig::default());
    let link = TrackingLinkId::new("L1");

    assert_eq!(p.fetch_series(&link).await.unwrap(), series(1));
    controller.set_series("L1", series(5)).await;
    assert_eq!(p.fetch_series(&link).await.unwrap(), series(1));

    p.invalidate(&link).await;
    assert_eq!(p.fetch_series(&link).await.unwrap(), series(5));
    assert_eq!(controller.fetch_count("L1").await, 2);
}
