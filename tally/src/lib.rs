//! Tally keeps per-event analytics current for tracking links shared by
//! several events.
//!
//! Overview
//! - Every tracking link's timeline is split into one closed date window per
//!   attached event; together the windows cover the whole timeline with no day
//!   counted twice.
//! - Provider series are summed over each window and cached on the attribution
//!   record, so reads never call the provider.
//! - Any change to a link's events recomputes the whole link. Recomputes of
//!   different links run concurrently; recomputes of one link are serialized.
//!
//! Key behaviors and trade-offs
//! - Margin: an event keeps the clicks of the `margin_days` following its date
//!   and hands over `margin_days` before the next event. Events closer together
//!   than twice the margin favor the earlier one.
//! - Provider failure: new bounds are still committed and the affected records
//!   flagged stale, keeping their last known metrics. The partition is never
//!   left inconsistent because the provider is down.
//! - Supersession: a manual trigger for a link that is already recomputing
//!   invalidates the in-flight run, which then commits nothing. Periodic
//!   refreshes skip busy links instead.
//! - Reads verify the stored partition of each involved link and repair it with
//!   a recompute when it is found overlapping or gapped.
//!
//! Examples
//! ```rust,ignore
//! use std::sync::Arc;
//! use tally::Tally;
//! use tally_mock::{MemoryEventStore, MockProvider};
//!
//! let events = Arc::new(MemoryEventStore::new());
//! let tally = Tally::builder()
//!     .with_event_store(events.clone())
//!     .with_provider(Arc::new(MockProvider::new()))
//!     .margin_days(2)
//!     .build()?;
//!
//! tally.handle_event_created(&"launch".into()).await?;
//! for record in tally.get_attribution(&"launch".into()).await? {
//!     println!("{} {} clicks={}", record.tracking_link_id, record.range,
//!         record.cached_metrics.total("clicks"));
//! }
//! ```
//!
//! Feature flags
//! - `tracing`: emit spans for triggers and recomputes, and log stale commits,
//!   skipped refreshes, and partition repairs.
#![warn(missing_docs)]

pub(crate) mod core;
/// Per-link serialization and trigger generations.
pub mod locks;
mod recompute;
mod triggers;

pub use crate::core::{Tally, TallyBuilder};
pub use crate::locks::{LinkGuard, LinkLocks};

pub use tally_core::*;
pub use tally_middleware::ProviderBuilder;
