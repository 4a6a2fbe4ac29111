use std::time::Duration;

use chrono::NaiveDate;
use tally_core::{ProviderClient, RawMetricPoint, TallyError, TrackingLinkId};
use tally_middleware::ProviderBuilder;
use tally_mock::{DynamicMockProvider, MockBehavior};
use tally_types::{BackoffConfig, RetryConfig};

fn cfg(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        attempt_timeout: Duration::from_secs(1),
        backoff: BackoffConfig {
            min_backoff_ms: 100,
            max_backoff_ms: 1_000,
            factor: 2,
            jitter_percent: 0,
        },
    }
}

fn series() -> Vec<RawMetricPoint> {
    vec![RawMetricPoint::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).with_metric("clicks", 9)]
}

fn link() -> TrackingLinkId {
    TrackingLinkId::new("L1")
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_until_success() {
    let (raw, controller) = DynamicMockProvider::new_with_controller("mock");
    controller.set_series("L1", series()).await;
    for _ in 0..2 {
        controller
            .push_once("L1", MockBehavior::Fail(TallyError::provider_unavailable("L1", "503")))
            .await;
    }
    let p = ProviderBuilder::new(raw).with_retry(cfg(3)).build();

    let started = tokio::time::Instant::now();
    assert_eq!(p.fetch_series(&link()).await.unwrap(), series());
    assert_eq!(controller.fetch_count("L1").await, 3);
    // 100ms then 200ms of backoff
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn exhausted_attempts_wrap_last_error() {
    let (raw, controller) = DynamicMockProvider::new_with_controller("mock");
    controller
        .set_series_behavior("L1", MockBehavior::Fail(TallyError::provider_unavailable("L1", "503")))
        .await;
    let p = ProviderBuilder::new(raw).with_retry(cfg(3)).build();

    let err = p.fetch_series(&link()).await.unwrap_err();
    match err {
        TallyError::RetriesExhausted { attempts, last, .. } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, TallyError::ProviderUnavailable { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(controller.fetch_count("L1").await, 3);
}

#[tokio::test(start_paused = true)]
async fn permanent_errors_are_not_retried() {
    let (raw, controller) = DynamicMockProvider::new_with_controller("mock");
    controller
        .set_series_behavior("L1", MockBehavior::Fail(TallyError::Data("bad payload".into())))
        .await;
    let p = ProviderBuilder::new(raw).with_retry(cfg(5)).build();

    assert!(matches!(p.fetch_series(&link()).await, Err(TallyError::Data(_))));
    assert_eq!(controller.fetch_count("L1").await, 1);
}

#[tokio::test(start_paused = true)]
async fn hanging_attempts_time_out() {
    let (raw, controller) = DynamicMockProvider::new_with_controller("mock");
    controller.set_series_behavior("L1", MockBehavior::Hang).await;
    let p = ProviderBuilder::new(raw).with_retry(cfg(2)).build();

    let err = p.fetch_series(&link()).await.unwrap_err();
    let TallyError::RetriesExhausted { last, .. } = err else {
        panic!("expected RetriesExhausted");
    };
    assert!(matches!(*last, TallyError::ProviderTimeout { .. }));
}

#[tokio::test(start_paused = true)]
async fn single_attempt_returns_raw_error() {
    let (raw, controller) = DynamicMockProvider::new_with_controller("mock");
    controller.set_series_behavior("L1", MockBehavior::Hang).await;
    let p = ProviderBuilder::new(raw).with_retry(cfg(1)).build();

    assert!(matches!(
        p.fetch_series(&link()).await,
        Err(TallyError::ProviderTimeout { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn rate_limit_hint_extends_backoff() {
    let (raw, controller) = DynamicMockProvider::new_with_controller("mock");
    controller.set_series("L1", series()).await;
    controller
        .push_once("L1", MockBehavior::Fail(TallyError::rate_limited("L1", Some(5_000))))
        .await;
    let p = ProviderBuilder::new(raw).with_retry(cfg(3)).build();

    let started = tokio::time::Instant::now();
    assert!(p.fetch_series(&link()).await.is_ok());
    assert!(started.elapsed() >= Duration::from_secs(5));
}
