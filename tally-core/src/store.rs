//! Persistence for attribution records.
//!
//! The store holds no business logic: every invariant on the records of a link
//! is maintained by the coordinator, which serializes writes per link.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tally_types::{Attribution, AttributionUpsert, EventId, TallyError, TrackingLinkId};

/// CRUD over attribution records keyed by `(tracking_link_id, event_id)`.
#[async_trait]
pub trait AttributionStore: Send + Sync {
    /// Insert or update one record atomically and return the stored result.
    ///
    /// See [`AttributionUpsert::apply`] for the field-level semantics.
    async fn upsert(&self, write: AttributionUpsert) -> Result<Attribution, TallyError>;

    /// Remove one record. Returns whether a record existed.
    async fn delete(&self, link: &TrackingLinkId, event: &EventId) -> Result<bool, TallyError>;

    /// All records of a link, ordered by window start (open past first).
    async fn list_by_link(&self, link: &TrackingLinkId) -> Result<Vec<Attribution>, TallyError>;

    /// All records of an event across every link, ordered by link id.
    async fn get(&self, event: &EventId) -> Result<Vec<Attribution>, TallyError>;

    /// Every link that currently has at least one record.
    async fn list_links(&self) -> Result<Vec<TrackingLinkId>, TallyError>;
}

/// In-memory [`AttributionStore`] backed by an ordered map.
#[derive(Default)]
pub struct MemoryAttributionStore {
    records: RwLock<BTreeMap<(TrackingLinkId, EventId), Attribution>>,
}

impl MemoryAttributionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a record verbatim, bypassing upsert semantics.
    ///
    /// Intended for seeding fixtures and simulating partially written state.
    pub async fn insert_raw(&self, record: Attribution) {
        let key = (record.tracking_link_id.clone(), record.event_id.clone());
        self.records.write().await.insert(key, record);
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// True when no records are held.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl AttributionStore for MemoryAttributionStore {
    async fn upsert(&self, write: AttributionUpsert) -> Result<Attribution, TallyError> {
        let key = (write.tracking_link_id.clone(), write.event_id.clone());
        let mut guard = self.records.write().await;
        let record = write.apply(guard.remove(&key));
        guard.insert(key, record.clone());
        Ok(record)
    }

    async fn delete(&self, link: &TrackingLinkId, event: &EventId) -> Result<bool, TallyError> {
        let key = (link.clone(), event.clone());
        Ok(self.records.write().await.remove(&key).is_some())
    }

    async fn list_by_link(&self, link: &TrackingLinkId) -> Result<Vec<Attribution>, TallyError> {
        let guard = self.records.read().await;
        let mut out: Vec<Attribution> = guard
            .iter()
            .filter(|((l, _), _)| l == link)
            .map(|(_, r)| r.clone())
            .collect();
        out.sort_by(|a, b| {
            a.range
                .start
                .cmp(&b.range.start)
                .then_with(|| a.event_id.cmp(&b.event_id))
        });
        Ok(out)
    }

    async fn get(&self, event: &EventId) -> Result<Vec<Attribution>, TallyError> {
        let guard = self.records.read().await;
        Ok(guard
            .iter()
            .filter(|((_, e), _)| e == event)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn list_links(&self) -> Result<Vec<TrackingLinkId>, TallyError> {
        let guard = self.records.read().await;
        let mut links: Vec<TrackingLinkId> = guard.keys().map(|(l, _)| l.clone()).collect();
        links.dedup();
        Ok(links)
    }
}
