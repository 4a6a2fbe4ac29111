use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tally::{
    BackoffConfig, CacheConfig, EventId, MetricSchema, RawMetricPoint, RetryConfig, Tally,
    TallyConfig, TallyError, TrackingLinkId,
};
use tally_mock::{DynamicMockProvider, MemoryEventStore, MockProvider};

fn assert_invalid(result: Result<Tally, TallyError>, needle: &str) {
    match result {
        Err(TallyError::InvalidArg(msg)) => assert!(msg.contains(needle), "{msg}"),
        Err(other) => panic!("expected InvalidArg, got {other}"),
        Ok(_) => panic!("expected InvalidArg"),
    }
}

#[test]
fn missing_collaborators_are_rejected() {
    assert_invalid(
        Tally::builder()
            .with_provider(Arc::new(MockProvider::new()))
            .build(),
        "event store",
    );
    assert_invalid(
        Tally::builder()
            .with_event_store(Arc::new(MemoryEventStore::new()))
            .build(),
        "provider",
    );
}

#[test]
fn invalid_configuration_is_rejected() {
    let base = || {
        Tally::builder()
            .with_event_store(Arc::new(MemoryEventStore::new()))
            .with_provider(Arc::new(MockProvider::new()))
    };
    assert_invalid(
        base()
            .retry(RetryConfig {
                max_attempts: 0,
                ..RetryConfig::default()
            })
            .build(),
        "max_attempts",
    );
    assert_invalid(base().provider_timeout(Duration::ZERO).build(), "provider_timeout");
    assert_invalid(
        base()
            .schema(MetricSchema {
                metrics: vec!["clicks".into(), "clicks".into()],
                breakdowns: vec![],
            })
            .build(),
        "more than once",
    );
    assert_invalid(
        base()
            .retry(RetryConfig {
                backoff: BackoffConfig {
                    min_backoff_ms: 500,
                    max_backoff_ms: 100,
                    ..BackoffConfig::default()
                },
                ..RetryConfig::default()
            })
            .build(),
        "min_backoff_ms",
    );
}

#[test]
fn json_config_round_trips_into_builder() {
    let cfg = TallyConfig::from_json_str(
        r#"{ "margin_days": 3, "schema": { "metrics": ["clicks"], "breakdowns": ["country"] } }"#,
    )
    .unwrap();
    let tally = Tally::builder()
        .with_event_store(Arc::new(MemoryEventStore::new()))
        .with_provider(Arc::new(MockProvider::new()))
        .config(cfg)
        .build()
        .unwrap();
    assert_eq!(tally.config().margin_days, 3);
    assert_eq!(tally.config().schema.metrics, vec!["clicks".to_string()]);
    assert_eq!(tally.config().retry, RetryConfig::default());
}

async fn clicks(tally: &Tally, link: &TrackingLinkId) -> Decimal {
    let records = tally.attributions_for_link(link).await.unwrap();
    records[0].cached_metrics.total("clicks")
}

#[tokio::test]
async fn cache_collapses_repeated_fetches() {
    let events = Arc::new(MemoryEventStore::new());
    let (provider, controller) = DynamicMockProvider::new_with_controller("scripted");
    let tally = Tally::builder()
        .with_event_store(events.clone())
        .with_provider(provider)
        .cache(CacheConfig {
            ttl_ms: 60_000,
            max_entries: 16,
        })
        .build()
        .unwrap();

    let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
    let created = date.and_hms_opt(9, 0, 0).unwrap().and_utc();
    let series = |clicks: i64| vec![RawMetricPoint::new(date).with_metric("clicks", clicks)];
    controller.set_series("poster-qr", series(3)).await;
    events
        .insert_event(tally::EventRef::new("A", date, created))
        .await;
    events.attach("A", "poster-qr").await.unwrap();

    let link = TrackingLinkId::new("poster-qr");
    tally.recalc_event(&EventId::new("A")).await.unwrap();
    tally.recalc_event(&EventId::new("A")).await.unwrap();
    assert_eq!(controller.fetch_count("poster-qr").await, 1);

    controller.set_series("poster-qr", series(8)).await;
    tally.recalc_event(&EventId::new("A")).await.unwrap();
    assert_eq!(clicks(&tally, &link).await, Decimal::from(3));

    // A manual recompute never serves a cached series.
    tally.recalc_link(&link).await.unwrap();
    assert_eq!(controller.fetch_count("poster-qr").await, 2);
    assert_eq!(clicks(&tally, &link).await, Decimal::from(8));
}

#[tokio::test]
async fn unwrapped_provider_is_called_directly() {
    let events = Arc::new(MemoryEventStore::new());
    let tally = Tally::builder()
        .with_event_store(events.clone())
        .with_provider(Arc::new(MockProvider::new()))
        .wrap_provider(false)
        .build()
        .unwrap();
    let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
    events
        .insert_event(tally::EventRef::new(
            "launch",
            date,
            date.and_hms_opt(8, 0, 0).unwrap().and_utc(),
        ))
        .await;
    events.attach("launch", "FAIL").await.unwrap();

    let err = tally.recalc_link(&"FAIL".into()).await.unwrap_err();
    assert!(matches!(err, TallyError::ProviderUnavailable { .. }));
}
