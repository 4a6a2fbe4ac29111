use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use tally_core::{EventId, EventRef, EventStore, TallyError, TrackingLinkId};

#[derive(Default)]
struct Inner {
    events: BTreeMap<EventId, EventRef>,
    links: BTreeMap<EventId, BTreeSet<TrackingLinkId>>,
    failure: Option<String>,
}

/// In-memory [`EventStore`] that tests mutate directly.
///
/// Mutations only change what the store reports; notifying the coordinator
/// of a change is up to the caller, as it would be for a real application.
#[derive(Default)]
pub struct MemoryEventStore {
    inner: RwLock<Inner>,
}

impl MemoryEventStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an event; existing link attachments are kept.
    pub async fn insert_event(&self, event: EventRef) {
        let mut guard = self.inner.write().await;
        guard.links.entry(event.event_id.clone()).or_default();
        guard.events.insert(event.event_id.clone(), event);
    }

    /// Attach `link` to an existing event.
    ///
    /// # Errors
    /// Returns `NotFound` if the event is unknown.
    pub async fn attach(
        &self,
        event: impl Into<EventId>,
        link: impl Into<TrackingLinkId>,
    ) -> Result<(), TallyError> {
        let event = event.into();
        let mut guard = self.inner.write().await;
        if !guard.events.contains_key(&event) {
            return Err(TallyError::not_found(format!("event {event}")));
        }
        guard.links.entry(event).or_default().insert(link.into());
        Ok(())
    }

    /// Detach `link` from an event. Returns whether it was attached.
    pub async fn detach(&self, event: impl Into<EventId>, link: impl Into<TrackingLinkId>) -> bool {
        let mut guard = self.inner.write().await;
        guard
            .links
            .get_mut(&event.into())
            .is_some_and(|set| set.remove(&link.into()))
    }

    /// Move an event to a new date.
    ///
    /// # Errors
    /// Returns `NotFound` if the event is unknown.
    pub async fn reschedule(
        &self,
        event: impl Into<EventId>,
        date: NaiveDate,
    ) -> Result<(), TallyError> {
        let event = event.into();
        let mut guard = self.inner.write().await;
        let found = guard
            .events
            .get_mut(&event)
            .ok_or_else(|| TallyError::not_found(format!("event {event}")))?;
        found.scheduled_date = date;
        Ok(())
    }

    /// Delete an event and return the links it was attached to.
    pub async fn remove_event(&self, event: impl Into<EventId>) -> Vec<TrackingLinkId> {
        let event = event.into();
        let mut guard = self.inner.write().await;
        guard.events.remove(&event);
        guard
            .links
            .remove(&event)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default()
    }

    /// Look up one event.
    pub async fn event(&self, event: &EventId) -> Option<EventRef> {
        self.inner.read().await.events.get(event).cloned()
    }

    /// Make every query fail with `EventStore(msg)`; `None` restores normal operation.
    pub async fn set_failure(&self, msg: Option<String>) {
        self.inner.write().await.failure = msg;
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn list_events_for_link(
        &self,
        link: &TrackingLinkId,
    ) -> Result<Vec<EventRef>, TallyError> {
        let guard = self.inner.read().await;
        if let Some(msg) = &guard.failure {
            return Err(TallyError::EventStore(msg.clone()));
        }
        Ok(guard
            .links
            .iter()
            .filter(|(_, set)| set.contains(link))
            .filter_map(|(id, _)| guard.events.get(id).cloned())
            .collect())
    }

    async fn list_links_for_event(
        &self,
        event: &EventId,
    ) -> Result<Vec<TrackingLinkId>, TallyError> {
        let guard = self.inner.read().await;
        if let Some(msg) = &guard.failure {
            return Err(TallyError::EventStore(msg.clone()));
        }
        Ok(guard
            .links
            .get(event)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}
