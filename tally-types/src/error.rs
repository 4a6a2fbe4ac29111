use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::TrackingLinkId;

/// Unified error type for the tally workspace.
///
/// This wraps provider failures (transient and terminal), collaborator
/// failures, partition corruption, argument validation errors, and an aggregate
/// for multi-link fan-outs.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TallyError {
    /// The analytics provider could not serve the request (network, 5xx, etc.).
    #[error("provider unavailable for link {link}: {msg}")]
    ProviderUnavailable {
        /// Tracking link the fetch was issued for.
        link: TrackingLinkId,
        /// Human-readable error message.
        msg: String,
    },

    /// The analytics provider rejected the request due to rate limiting.
    #[error("provider rate limited link {link} (retry_after_ms={retry_after_ms:?})")]
    RateLimited {
        /// Tracking link the fetch was issued for.
        link: TrackingLinkId,
        /// Server-suggested delay before the next attempt, when provided.
        retry_after_ms: Option<u64>,
    },

    /// A provider call exceeded its configured timeout.
    #[error("provider timed out for link {link}")]
    ProviderTimeout {
        /// Tracking link the fetch was issued for.
        link: TrackingLinkId,
    },

    /// All retry attempts for a transient provider failure were used up.
    #[error("retries exhausted for link {link} after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Tracking link the fetch was issued for.
        link: TrackingLinkId,
        /// Number of attempts made.
        attempts: u32,
        /// The error returned by the final attempt.
        last: Box<TallyError>,
    },

    /// Stored attribution ranges for a link overlap, leave gaps, or break the
    /// unbounded-ends rule.
    #[error("partition inconsistency on link {link}: {detail}")]
    PartitionInconsistency {
        /// Tracking link whose stored partition is corrupt.
        link: TrackingLinkId,
        /// Description of the first violation found.
        detail: String,
    },

    /// A resource could not be found.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing resource, e.g. "series for link spring-24".
        what: String,
    },

    /// Invalid input argument or configuration.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// The event store failed to answer.
    #[error("event store error: {0}")]
    EventStore(String),

    /// The attribution store failed to persist or load records.
    #[error("attribution store error: {0}")]
    Store(String),

    /// Issues with returned data (undecodable payloads, bad dates, etc.).
    #[error("data issue: {0}")]
    Data(String),

    /// Unknown/opaque error.
    #[error("unknown error: {0}")]
    Other(String),

    /// One or more links failed during a fan-out; contains the individual failures.
    #[error("links failed: {0:?}")]
    LinksFailed(Vec<TallyError>),
}

impl TallyError {
    /// Helper: build a `ProviderUnavailable` error.
    pub fn provider_unavailable(link: impl Into<TrackingLinkId>, msg: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            link: link.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `RateLimited` error.
    pub fn rate_limited(link: impl Into<TrackingLinkId>, retry_after_ms: Option<u64>) -> Self {
        Self::RateLimited {
            link: link.into(),
            retry_after_ms,
        }
    }

    /// Helper: build a `ProviderTimeout` error.
    pub fn provider_timeout(link: impl Into<TrackingLinkId>) -> Self {
        Self::ProviderTimeout { link: link.into() }
    }

    /// Helper: build a `PartitionInconsistency` error.
    pub fn partition_inconsistency(
        link: impl Into<TrackingLinkId>,
        detail: impl Into<String>,
    ) -> Self {
        Self::PartitionInconsistency {
            link: link.into(),
            detail: detail.into(),
        }
    }

    /// Helper: build a `NotFound` error for a description of the missing resource.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Returns true for provider failures that may succeed when retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable { .. } | Self::RateLimited { .. } | Self::ProviderTimeout { .. }
        )
    }

    /// Server-suggested retry delay carried by a `RateLimited` error.
    #[must_use]
    pub const fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }

    /// Tracking link this error is scoped to, if any.
    #[must_use]
    pub const fn link(&self) -> Option<&TrackingLinkId> {
        match self {
            Self::ProviderUnavailable { link, .. }
            | Self::RateLimited { link, .. }
            | Self::ProviderTimeout { link }
            | Self::RetriesExhausted { link, .. }
            | Self::PartitionInconsistency { link, .. } => Some(link),
            _ => None,
        }
    }

    /// Flatten nested `LinksFailed` structures into a plain vector.
    ///
    /// This preserves other error variants as-is and unwraps recursively.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::LinksFailed(list) => list.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }
}
