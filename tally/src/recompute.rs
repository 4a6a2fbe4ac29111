//! Full recompute of one tracking link.

use std::collections::HashSet;

use chrono::{Days, Utc};
use tally_core::{
    AttributionUpsert, EventId, Freshness, RecomputeOutcome, TallyError, TrackingLinkId, aggregate,
    partition_ordered, verify_partition,
};

use crate::core::Tally;
use crate::locks::LinkGuard;

/// How a trigger competes for a link that is already being recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trigger {
    /// Supersede the in-flight recompute and wait for the slot.
    Manual,
    /// Give up if the slot is busy.
    Periodic,
}

impl Tally {
    /// Acquire the link slot according to `trigger` and run one recompute.
    ///
    /// Provider failures do not surface as `Err`: they produce a
    /// [`RecomputeOutcome::Stale`] after the bounds were written. `Err` is
    /// reserved for event-store and attribution-store failures, in which case
    /// the link may hold a partial commit that the next recompute repairs.
    pub(crate) async fn run_recompute(
        &self,
        link: &TrackingLinkId,
        trigger: Trigger,
        departing: Option<&EventId>,
    ) -> Result<RecomputeOutcome, TallyError> {
        let guard = match trigger {
            Trigger::Manual => self.locks.acquire(link).await,
            Trigger::Periodic => match self.locks.try_acquire(link) {
                Some(g) => g,
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(link = %link, "recompute in flight; periodic refresh skipped");
                    return Ok(RecomputeOutcome::Skipped);
                }
            },
        };
        self.recompute_locked(link, &guard, departing).await
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "tally::recompute",
            skip(self, guard),
            fields(generation = guard.generation()),
            err,
        )
    )]
    async fn recompute_locked(
        &self,
        link: &TrackingLinkId,
        guard: &LinkGuard,
        departing: Option<&EventId>,
    ) -> Result<RecomputeOutcome, TallyError> {
        // The departing record goes first, whatever happens to the rest of the
        // recompute. A failure past this point leaves a gap that the next
        // verified read repairs.
        if let Some(gone) = departing {
            self.store.delete(link, gone).await?;
        }
        let mut events = self.events.list_events_for_link(link).await?;
        if let Some(gone) = departing {
            events.retain(|e| &e.event_id != gone);
        }
        let margin = Days::new(u64::from(self.cfg.margin_days));
        let windows = partition_ordered(&events, margin);

        // A link without events has nothing to aggregate.
        let fetched = if windows.is_empty() {
            Ok(Vec::new())
        } else {
            self.fetch_with_deadline(link).await
        };

        if !guard.is_current() {
            #[cfg(feature = "tracing")]
            tracing::debug!("newer trigger accepted; discarding result");
            return Ok(RecomputeOutcome::Superseded);
        }

        let now = Utc::now();
        let stale_reason = fetched.as_ref().err().map(ToString::to_string);
        for w in &windows {
            let freshness = match &fetched {
                Ok(series) => Freshness::Fresh {
                    metrics: aggregate(&w.range, series, &self.cfg.schema),
                    at: now,
                },
                Err(_) => Freshness::Stale {
                    reason: stale_reason.clone().unwrap_or_default(),
                },
            };
            self.store
                .upsert(AttributionUpsert {
                    tracking_link_id: link.clone(),
                    event_id: w.event_id.clone(),
                    range: w.range,
                    freshness,
                })
                .await?;
        }

        let keep: HashSet<&EventId> = windows.iter().map(|w| &w.event_id).collect();
        for orphan in self.store.list_by_link(link).await? {
            if !keep.contains(&orphan.event_id) {
                self.store.delete(link, &orphan.event_id).await?;
            }
        }

        let records = self.store.list_by_link(link).await?;
        match fetched {
            Ok(_) => {
                #[cfg(feature = "tracing")]
                tracing::info!(records = records.len(), "attributions committed");
                Ok(RecomputeOutcome::Committed { records })
            }
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %error, "provider fetch failed; attributions marked stale");
                Ok(RecomputeOutcome::Stale { records, error })
            }
        }
    }

    /// Verify the stored partition of `link`; on inconsistency, repair it with
    /// a manual recompute.
    pub(crate) async fn ensure_consistent(&self, link: &TrackingLinkId) -> Result<(), TallyError> {
        let records = self.store.list_by_link(link).await?;
        if let Err(inconsistency) = verify_partition(link, &records) {
            #[cfg(feature = "tracing")]
            tracing::warn!(link = %link, error = %inconsistency, "stored partition inconsistent; recomputing");
            #[cfg(not(feature = "tracing"))]
            let _ = inconsistency;
            self.run_recompute(link, Trigger::Manual, None).await?;
        }
        Ok(())
    }
}
