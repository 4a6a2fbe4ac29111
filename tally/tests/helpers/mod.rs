// Shared fixtures for coordinator tests; each test file uses a subset.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tally::{
    Attribution, DateRange, EventRef, MemoryAttributionStore, RawMetricPoint, RetryConfig, Tally,
    TrackingLinkId,
};
use tally_mock::{DynamicMockController, DynamicMockProvider, MemoryEventStore};

pub const LINK: &str = "spring-campaign";

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).expect("invalid date")
}

/// Construct a UTC `DateTime` on `date` at `hh:00`.
pub fn at(date: NaiveDate, hh: u32) -> DateTime<Utc> {
    date.and_hms_opt(hh, 0, 0)
        .expect("invalid time components")
        .and_utc()
}

pub fn ev(id: &str, date: NaiveDate, hh: u32) -> EventRef {
    EventRef::new(id, date, at(date, hh))
}

/// One `clicks` point per day in `[from, to]`, each worth `clicks`.
pub fn flat_series(from: NaiveDate, to: NaiveDate, clicks: i64) -> Vec<RawMetricPoint> {
    from.iter_days()
        .take_while(|day| *day <= to)
        .map(|day| RawMetricPoint::new(day).with_metric("clicks", clicks))
        .collect()
}

pub fn range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> DateRange {
    DateRange::new(start, end)
}

pub struct Harness {
    pub tally: Arc<Tally>,
    pub events: Arc<MemoryEventStore>,
    pub store: Arc<MemoryAttributionStore>,
    pub provider: DynamicMockController,
}

impl Harness {
    /// Coordinator over in-memory stores and a scripted provider, with a single
    /// fetch attempt so failures surface immediately.
    pub fn new(margin_days: u32) -> Self {
        Self::with_timeout(margin_days, Duration::from_secs(30))
    }

    pub fn with_timeout(margin_days: u32, provider_timeout: Duration) -> Self {
        let events = Arc::new(MemoryEventStore::new());
        let store = Arc::new(MemoryAttributionStore::new());
        let (provider, controller) = DynamicMockProvider::new_with_controller("scripted");
        let tally = Tally::builder()
            .with_event_store(events.clone())
            .with_provider(provider)
            .with_store(store.clone())
            .margin_days(margin_days)
            .provider_timeout(provider_timeout)
            .retry(RetryConfig {
                max_attempts: 1,
                ..RetryConfig::default()
            })
            .build()
            .expect("valid coordinator");
        Self {
            tally: Arc::new(tally),
            events,
            store,
            provider: controller,
        }
    }

    /// Insert `event` and attach it to each of `links`.
    pub async fn add(&self, event: EventRef, links: &[&str]) {
        let id = event.event_id.clone();
        self.events.insert_event(event).await;
        for link in links {
            self.events
                .attach(id.clone(), *link)
                .await
                .expect("event inserted");
        }
    }

    pub async fn records(&self, link: &str) -> Vec<Attribution> {
        self.tally
            .attributions_for_link(&TrackingLinkId::new(link))
            .await
            .expect("records")
    }

    pub async fn record(&self, link: &str, event: &str) -> Attribution {
        self.records(link)
            .await
            .into_iter()
            .find(|r| r.event_id.as_str() == event)
            .unwrap_or_else(|| panic!("no record for {event} on {link}"))
    }
}
