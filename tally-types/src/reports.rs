//! Report envelopes produced by the coordinator.

use serde::{Deserialize, Serialize};

use crate::attribution::Attribution;
use crate::error::TallyError;
use crate::ids::{EventId, TrackingLinkId};

/// Result of one recompute of one tracking link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecomputeOutcome {
    /// Bounds and fresh metrics were written for every event of the link.
    Committed {
        /// Records as stored after the commit, ordered by window.
        records: Vec<Attribution>,
    },
    /// The series could not be fetched; bounds were written and records flagged stale.
    Stale {
        /// Records as stored after the commit, ordered by window.
        records: Vec<Attribution>,
        /// Provider failure that caused the staleness.
        error: TallyError,
    },
    /// A newer trigger for the link started before this one could commit; nothing was written.
    Superseded,
    /// A periodic trigger found a recompute already in flight and did nothing.
    Skipped,
}

impl RecomputeOutcome {
    /// Records written by this recompute, if any.
    #[must_use]
    pub fn records(&self) -> &[Attribution] {
        match self {
            Self::Committed { records } | Self::Stale { records, .. } => records,
            Self::Superseded | Self::Skipped => &[],
        }
    }

    /// True when bounds were written (fresh or stale).
    #[must_use]
    pub const fn is_written(&self) -> bool {
        matches!(self, Self::Committed { .. } | Self::Stale { .. })
    }
}

/// Summary of a fan-out over several links (event cascade or periodic sweep).
///
/// A link whose recompute failed appears only in `warnings`. A link committed
/// as stale appears in `outcomes` and its provider error in `warnings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalcReport {
    /// Event that triggered the fan-out, when there is one.
    pub event_id: Option<EventId>,
    /// Per-link outcomes, in the order links were enumerated.
    pub outcomes: Vec<(TrackingLinkId, RecomputeOutcome)>,
    /// Per-link failures; a failure on one link never prevents the others.
    pub warnings: Vec<TallyError>,
}

impl RecalcReport {
    /// Outcome recorded for `link`, if it succeeded.
    #[must_use]
    pub fn outcome(&self, link: &TrackingLinkId) -> Option<&RecomputeOutcome> {
        self.outcomes
            .iter()
            .find(|(l, _)| l == link)
            .map(|(_, o)| o)
    }

    /// Convert into an error when any link failed.
    ///
    /// # Errors
    /// Returns `LinksFailed` carrying every warning if at least one link failed.
    pub fn into_result(self) -> Result<Self, TallyError> {
        if self.warnings.is_empty() {
            Ok(self)
        } else {
            Err(TallyError::LinksFailed(self.warnings))
        }
    }
}
