//! Re-export of the shared data model from `tally-types`.
// Consolidated re-exports so downstream crates can depend on `tally-core` only

pub use tally_types::{
    AggregatedMetrics, Attribution, AttributionUpsert, Breakdown, DateRange, EventId, EventRef,
    Freshness, MetricSchema, RawMetricPoint, TrackingLinkId,
};

pub use tally_types::{BackoffConfig, CacheConfig, RetryConfig, TallyConfig};
pub use tally_types::{RecalcReport, RecomputeOutcome, TallyError};

pub use chrono::{DateTime, Days, NaiveDate, Utc};
pub use rust_decimal::Decimal;
