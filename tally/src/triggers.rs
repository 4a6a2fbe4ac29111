//! Public trigger operations of the coordinator.
//!
//! Every operation resolves to one independent recompute per affected link.
//! Fan-outs run those recomputes concurrently and never let one link's
//! failure stop another.

use std::collections::BTreeSet;

use tally_core::{
    Attribution, EventId, RecalcReport, RecomputeOutcome, TallyError, TrackingLinkId,
};

use crate::core::Tally;
use crate::recompute::Trigger;

impl Tally {
    /// Recompute one link now, waiting for any in-flight recompute of it.
    ///
    /// Behavior and trade-offs:
    /// - Supersedes an in-flight recompute of the same link: that one commits
    ///   nothing and reports `Superseded`.
    /// - On provider failure the new bounds are still written and every record
    ///   of the link is flagged stale before the error is returned.
    /// - Drops any cached series for the link first, so the metrics come from a
    ///   fresh fetch.
    ///
    /// # Errors
    /// Returns the provider error after a stale commit, or an event/attribution
    /// store error.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "tally::recalc_link", skip(self), err)
    )]
    pub async fn recalc_link(&self, link: &TrackingLinkId) -> Result<RecomputeOutcome, TallyError> {
        self.provider.invalidate(link).await;
        self.recalc_link_cached(link).await
    }

    async fn recalc_link_cached(
        &self,
        link: &TrackingLinkId,
    ) -> Result<RecomputeOutcome, TallyError> {
        match self.run_recompute(link, Trigger::Manual, None).await? {
            RecomputeOutcome::Stale { error, .. } => Err(error),
            outcome => Ok(outcome),
        }
    }

    /// Recompute every link the event store reports for `event`, concurrently.
    ///
    /// # Errors
    /// Returns an error only if the links of `event` cannot be listed; per-link
    /// failures are collected in the report's `warnings`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "tally::recalc_event", skip(self), err)
    )]
    pub async fn recalc_event(&self, event: &EventId) -> Result<RecalcReport, TallyError> {
        let links = self.events.list_links_for_event(event).await?;
        let mut report = self.fan_out(links, Trigger::Manual, None).await;
        report.event_id = Some(event.clone());
        Ok(report)
    }

    /// A new event was created; recompute each link it is attached to.
    ///
    /// # Errors
    /// See [`recalc_event`](Self::recalc_event).
    pub async fn handle_event_created(&self, event: &EventId) -> Result<RecalcReport, TallyError> {
        self.recalc_event(event).await
    }

    /// An existing event was attached to `link`; recompute that link.
    ///
    /// Unlike [`recalc_link`](Self::recalc_link) this may reuse a cached series.
    ///
    /// # Errors
    /// See [`recalc_link`](Self::recalc_link).
    pub async fn handle_event_attached(
        &self,
        _event: &EventId,
        link: &TrackingLinkId,
    ) -> Result<RecomputeOutcome, TallyError> {
        self.recalc_link_cached(link).await
    }

    /// An event moved to another date; recompute each link it is attached to.
    ///
    /// # Errors
    /// See [`recalc_event`](Self::recalc_event).
    pub async fn handle_event_rescheduled(
        &self,
        event: &EventId,
    ) -> Result<RecalcReport, TallyError> {
        self.recalc_event(event).await
    }

    /// An event was deleted: drop its records and recompute every link it was on.
    ///
    /// The affected links are those holding a record for the event, plus any
    /// the event store still reports. Each link is recomputed without the
    /// event, so its neighbours close the gap it leaves.
    ///
    /// # Errors
    /// Returns an error only if the event's records cannot be listed.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "tally::handle_event_deleted", skip(self), err)
    )]
    pub async fn handle_event_deleted(&self, event: &EventId) -> Result<RecalcReport, TallyError> {
        let mut links: BTreeSet<TrackingLinkId> = self
            .store
            .get(event)
            .await?
            .into_iter()
            .map(|r| r.tracking_link_id)
            .collect();
        let mut warnings = Vec::new();
        match self.events.list_links_for_event(event).await {
            Ok(more) => links.extend(more),
            Err(e) => warnings.push(e),
        }
        let mut report = self
            .fan_out(links.into_iter().collect(), Trigger::Manual, Some(event))
            .await;
        report.event_id = Some(event.clone());
        warnings.append(&mut report.warnings);
        report.warnings = warnings;
        Ok(report)
    }

    /// `event` was detached from `link`: drop its record and recompute the link.
    ///
    /// # Errors
    /// See [`recalc_link`](Self::recalc_link).
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "tally::handle_event_detached", skip(self), err)
    )]
    pub async fn handle_event_detached(
        &self,
        event: &EventId,
        link: &TrackingLinkId,
    ) -> Result<RecomputeOutcome, TallyError> {
        match self.run_recompute(link, Trigger::Manual, Some(event)).await? {
            RecomputeOutcome::Stale { error, .. } => Err(error),
            outcome => Ok(outcome),
        }
    }

    /// Scheduled refresh of one link.
    ///
    /// Behavior and trade-offs:
    /// - Returns `Skipped` without doing anything if a recompute of the link is
    ///   already in flight.
    /// - Provider failures are not errors here: the link is flagged stale and
    ///   the outcome is `Stale`.
    ///
    /// # Errors
    /// Returns an event/attribution store error.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "tally::refresh_link_periodic", skip(self), err)
    )]
    pub async fn refresh_link_periodic(
        &self,
        link: &TrackingLinkId,
    ) -> Result<RecomputeOutcome, TallyError> {
        self.run_recompute(link, Trigger::Periodic, None).await
    }

    /// Scheduled refresh of every link that holds attributions.
    ///
    /// # Errors
    /// Returns an error only if the links cannot be listed.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "tally::refresh_all_periodic", skip(self), err)
    )]
    pub async fn refresh_all_periodic(&self) -> Result<RecalcReport, TallyError> {
        let links = self.store.list_links().await?;
        Ok(self.fan_out(links, Trigger::Periodic, None).await)
    }

    /// Attributions of `event` across all its links.
    ///
    /// Each involved link's stored partition is verified first; an
    /// inconsistent link is recomputed before the records are returned.
    ///
    /// # Errors
    /// Returns a store error, or the error of a failed repair.
    pub async fn get_attribution(&self, event: &EventId) -> Result<Vec<Attribution>, TallyError> {
        let links: BTreeSet<TrackingLinkId> = self
            .store
            .get(event)
            .await?
            .into_iter()
            .map(|r| r.tracking_link_id)
            .collect();
        for link in &links {
            self.ensure_consistent(link).await?;
        }
        self.store.get(event).await
    }

    /// Attributions of `link`, ordered by window, verified like
    /// [`get_attribution`](Self::get_attribution).
    ///
    /// # Errors
    /// Returns a store error, or the error of a failed repair.
    pub async fn attributions_for_link(
        &self,
        link: &TrackingLinkId,
    ) -> Result<Vec<Attribution>, TallyError> {
        self.ensure_consistent(link).await?;
        self.store.list_by_link(link).await
    }

    async fn fan_out(
        &self,
        links: Vec<TrackingLinkId>,
        trigger: Trigger,
        departing: Option<&EventId>,
    ) -> RecalcReport {
        let tasks = links.iter().map(move |link| async move {
            (link, self.run_recompute(link, trigger, departing).await)
        });
        let results = futures::future::join_all(tasks).await;

        let mut report = RecalcReport::default();
        for (link, result) in results {
            match result {
                Ok(RecomputeOutcome::Stale { records, error }) => {
                    report.warnings.push(error.clone());
                    report
                        .outcomes
                        .push((link.clone(), RecomputeOutcome::Stale { records, error }));
                }
                Ok(outcome) => report.outcomes.push((link.clone(), outcome)),
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(link = %link, error = %e, "recompute failed");
                    report.warnings.push(e);
                }
            }
        }
        report
    }
}
