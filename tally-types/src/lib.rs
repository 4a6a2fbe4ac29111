//! Tally-specific data transfer objects, configuration primitives, and the unified error type.
#![warn(missing_docs)]

mod attribution;
mod config;
mod error;
mod ids;
mod metrics;
mod reports;

pub use attribution::{Attribution, AttributionUpsert, DateRange, EventRef, Freshness};
pub use config::{BackoffConfig, CacheConfig, RetryConfig, TallyConfig};
pub use error::TallyError;
pub use ids::{EventId, TrackingLinkId};
pub use metrics::{AggregatedMetrics, Breakdown, MetricSchema, RawMetricPoint};
pub use reports::{RecalcReport, RecomputeOutcome};
