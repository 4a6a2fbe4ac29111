mod helpers;

use helpers::{Harness, LINK, d, ev, flat_series, range};
use rust_decimal::Decimal;
use tally::{EventId, RecomputeOutcome, TrackingLinkId};

#[tokio::test]
async fn same_day_events_split_by_creation_time() {
    let h = Harness::new(2);
    h.provider
        .set_series(LINK, flat_series(d(2024, 1, 1), d(2024, 1, 20), 1))
        .await;

    h.add(ev("A", d(2024, 1, 10), 9), &[LINK]).await;
    h.tally
        .handle_event_created(&EventId::new("A"))
        .await
        .unwrap();
    assert_eq!(h.record(LINK, "A").await.range, range(None, None));

    h.add(ev("B", d(2024, 1, 10), 10), &[LINK]).await;
    let report = h
        .tally
        .handle_event_created(&EventId::new("B"))
        .await
        .unwrap();
    assert!(report.warnings.is_empty());
    assert!(matches!(
        report.outcome(&TrackingLinkId::new(LINK)),
        Some(RecomputeOutcome::Committed { .. })
    ));

    let a = h.record(LINK, "A").await;
    let b = h.record(LINK, "B").await;
    assert_eq!(a.range, range(None, Some(d(2024, 1, 12))));
    assert_eq!(b.range, range(Some(d(2024, 1, 13)), None));
    assert_eq!(a.cached_metrics.total("clicks"), Decimal::from(12));
    assert_eq!(b.cached_metrics.total("clicks"), Decimal::from(8));
}

#[tokio::test]
async fn later_event_takes_over_before_its_date() {
    let h = Harness::new(2);
    h.provider
        .set_series(LINK, flat_series(d(2024, 1, 1), d(2024, 2, 29), 3))
        .await;
    h.add(ev("A", d(2024, 1, 10), 9), &[LINK]).await;
    h.add(ev("B", d(2024, 1, 10), 10), &[LINK]).await;
    h.tally
        .recalc_link(&TrackingLinkId::new(LINK))
        .await
        .unwrap();

    h.add(ev("C", d(2024, 2, 15), 8), &[LINK]).await;
    h.tally
        .handle_event_created(&EventId::new("C"))
        .await
        .unwrap();

    let records = h.records(LINK).await;
    let ids: Vec<&str> = records.iter().map(|r| r.event_id.as_str()).collect();
    assert_eq!(ids, ["A", "B", "C"]);
    assert_eq!(records[0].range, range(None, Some(d(2024, 1, 12))));
    assert_eq!(records[1].range, range(Some(d(2024, 1, 13)), Some(d(2024, 2, 13))));
    assert_eq!(records[2].range, range(Some(d(2024, 2, 14)), None));

    // Every day of the series is counted exactly once.
    let attributed: Decimal = records
        .iter()
        .map(|r| r.cached_metrics.total("clicks"))
        .sum();
    assert_eq!(attributed, Decimal::from(60 * 3));
}

#[tokio::test]
async fn window_without_points_aggregates_to_zero() {
    let h = Harness::new(2);
    h.provider
        .set_series(LINK, flat_series(d(2024, 3, 1), d(2024, 3, 5), 7))
        .await;
    h.add(ev("A", d(2024, 1, 10), 9), &[LINK]).await;
    h.add(ev("B", d(2024, 2, 20), 9), &[LINK]).await;
    h.tally
        .recalc_link(&TrackingLinkId::new(LINK))
        .await
        .unwrap();

    let a = h.record(LINK, "A").await;
    assert!(a.cached_metrics.is_zero());
    assert!(!a.stale);
    assert!(a.last_recalculated_at.is_some());

    let b = h.record(LINK, "B").await;
    assert_eq!(b.cached_metrics.total("clicks"), Decimal::from(35));
}

#[tokio::test]
async fn link_without_events_is_not_fetched() {
    let h = Harness::new(2);
    let outcome = h
        .tally
        .recalc_link(&TrackingLinkId::new("unused"))
        .await
        .unwrap();
    assert_eq!(outcome, RecomputeOutcome::Committed { records: vec![] });
    assert_eq!(h.provider.total_fetches().await, 0);
}
