use std::collections::{BTreeMap, HashSet};

use chrono::{Days, NaiveDate};
use tally_types::{DateRange, EventId, EventRef};

/// One event's slice of a link's timeline, in timeline order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Event the window is attributed to.
    pub event_id: EventId,
    /// Assigned dates.
    pub range: DateRange,
}

fn plus(date: NaiveDate, days: Days) -> NaiveDate {
    date.checked_add_days(days).unwrap_or(NaiveDate::MAX)
}

fn minus(date: NaiveDate, days: Days) -> NaiveDate {
    date.checked_sub_days(days).unwrap_or(NaiveDate::MIN)
}

/// Split a link's timeline into one contiguous window per event, in timeline order.
///
/// Events are ordered by `(scheduled_date, created_at, event_id)`. The first
/// window is unbounded in the past and the last unbounded in the future. A
/// non-last event hands over to its successor `margin` days before the
/// successor's date, but never sooner than `margin` days after its own date,
/// and never before its own window starts. Each following window starts the
/// day after its predecessor ends, so windows never share a day and never
/// leave a gap.
///
/// Near the end of the calendar, ends are pulled back so that every later
/// window still gets at least one representable day.
///
/// Duplicate event ids are collapsed onto their earliest occurrence.
#[must_use]
pub fn partition_ordered(events: &[EventRef], margin: Days) -> Vec<Window> {
    let mut ordered: Vec<&EventRef> = events.iter().collect();
    ordered.sort_by(|a, b| a.ordering_key().cmp(&b.ordering_key()));
    let mut seen: HashSet<&EventId> = HashSet::with_capacity(ordered.len());
    ordered.retain(|e| seen.insert(&e.event_id));

    let last = ordered.len().saturating_sub(1);
    let mut out = Vec::with_capacity(ordered.len());
    let mut prev_end: Option<NaiveDate> = None;
    for (i, ev) in ordered.iter().enumerate() {
        let start = if i == 0 {
            None
        } else {
            prev_end.map(|e| plus(e, Days::new(1)))
        };
        let end = ordered.get(i + 1).map(|next| {
            let handoff = minus(next.scheduled_date, margin);
            let grace = plus(ev.scheduled_date, margin);
            let candidate = handoff.max(grace);
            let later = u64::try_from(last - i).unwrap_or(u64::MAX);
            let cap = minus(NaiveDate::MAX, Days::new(later));
            start.map_or(candidate, |s| candidate.max(s)).min(cap)
        });
        prev_end = end;
        out.push(Window {
            event_id: ev.event_id.clone(),
            range: DateRange::new(start, end),
        });
    }
    out
}

/// Keyed form of [`partition_ordered`]: event id → window.
#[must_use]
pub fn partition(events: &[EventRef], margin: Days) -> BTreeMap<EventId, DateRange> {
    partition_ordered(events, margin)
        .into_iter()
        .map(|w| (w.event_id, w.range))
        .collect()
}
