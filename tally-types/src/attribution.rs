//! Attribution windows and the per-(link, event) records built from them.

use core::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EventId, TrackingLinkId};
use crate::metrics::AggregatedMetrics;

/// A closed date window `[start..=end]`; `None` on either side means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive first day, or `None` for the unbounded past.
    pub start: Option<NaiveDate>,
    /// Inclusive last day, or `None` for the unbounded future.
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// The window covering the whole timeline.
    pub const UNBOUNDED: Self = Self {
        start: None,
        end: None,
    };

    /// Create a window from optional bounds.
    #[must_use]
    pub const fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Create a window bounded on both sides.
    #[must_use]
    pub const fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Whether `date` falls inside the window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }

    /// True when both bounds are set and `start > end`.
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }

    /// Whether the two windows share at least one day.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        if self.is_inverted() || other.is_inverted() {
            return false;
        }
        let starts_before_other_ends = match (self.start, other.end) {
            (Some(s), Some(e)) => s <= e,
            _ => true,
        };
        let ends_after_other_starts = match (self.end, other.start) {
            (Some(e), Some(s)) => e >= s,
            _ => true,
        };
        starts_before_other_ends && ends_after_other_starts
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(s) => write!(f, "[{s}")?,
            None => f.write_str("(-inf")?,
        }
        match self.end {
            Some(e) => write!(f, ", {e}]"),
            None => f.write_str(", +inf)"),
        }
    }
}

/// Read-only view of an event as supplied by the event store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRef {
    /// Event identity.
    pub event_id: EventId,
    /// Day the event is scheduled for.
    pub scheduled_date: NaiveDate,
    /// Creation timestamp; only used to order events scheduled on the same day.
    pub created_at: DateTime<Utc>,
}

impl EventRef {
    /// Construct an event reference.
    pub fn new(
        event_id: impl Into<EventId>,
        scheduled_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            scheduled_date,
            created_at,
        }
    }

    /// Total ordering key used by every partitioning decision.
    ///
    /// `(scheduled_date, created_at)` with the event id as a last resort so
    /// that identical timestamps still sort deterministically.
    #[must_use]
    pub fn ordering_key(&self) -> (NaiveDate, DateTime<Utc>, &EventId) {
        (self.scheduled_date, self.created_at, &self.event_id)
    }
}

/// Persisted attribution of one window of a link's history to one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    /// Link half of the key.
    pub tracking_link_id: TrackingLinkId,
    /// Event half of the key.
    pub event_id: EventId,
    /// Window of the link's timeline assigned to the event.
    pub range: DateRange,
    /// Last successfully aggregated metrics for `range`.
    pub cached_metrics: AggregatedMetrics,
    /// When `cached_metrics` were last computed; `None` if never.
    pub last_recalculated_at: Option<DateTime<Utc>>,
    /// True when the latest recompute could not refresh metrics.
    pub stale: bool,
    /// Why the record is stale, if it is.
    pub stale_reason: Option<String>,
}

impl Attribution {
    /// A record with no metrics yet, as created on first association.
    #[must_use]
    pub fn empty(tracking_link_id: TrackingLinkId, event_id: EventId, range: DateRange) -> Self {
        Self {
            tracking_link_id,
            event_id,
            range,
            cached_metrics: AggregatedMetrics::default(),
            last_recalculated_at: None,
            stale: false,
            stale_reason: None,
        }
    }
}

/// Outcome of a recompute for a single record, as handed to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Freshness {
    /// Metrics were aggregated from a fresh series.
    Fresh {
        /// Newly aggregated metrics.
        metrics: AggregatedMetrics,
        /// Time of aggregation.
        at: DateTime<Utc>,
    },
    /// The series could not be fetched; bounds update only.
    Stale {
        /// Failure reason recorded on the record.
        reason: String,
    },
}

/// Write request for [`Attribution`] records.
///
/// Bounds are always replaced. Metrics and the freshness timestamp are only
/// replaced for [`Freshness::Fresh`]; [`Freshness::Stale`] keeps the last
/// known good values and flags the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionUpsert {
    /// Link half of the key.
    pub tracking_link_id: TrackingLinkId,
    /// Event half of the key.
    pub event_id: EventId,
    /// New window for the record.
    pub range: DateRange,
    /// Whether metrics are being refreshed or the record flagged stale.
    pub freshness: Freshness,
}

impl AttributionUpsert {
    /// Produce the record resulting from applying this write over `existing`.
    #[must_use]
    pub fn apply(self, existing: Option<Attribution>) -> Attribution {
        let mut record = existing.unwrap_or_else(|| {
            Attribution::empty(
                self.tracking_link_id.clone(),
                self.event_id.clone(),
                self.range,
            )
        });
        record.range = self.range;
        match self.freshness {
            Freshness::Fresh { metrics, at } => {
                record.cached_metrics = metrics;
                record.last_recalculated_at = Some(at);
                record.stale = false;
                record.stale_reason = None;
            }
            Freshness::Stale { reason } => {
                record.stale = true;
                record.stale_reason = Some(reason);
            }
        }
        record
    }
}
