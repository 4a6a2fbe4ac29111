//! tally-core
//!
//! Collaborator traits, timeline algorithms, and attribution storage shared
//! across the tally workspace.
//!
//! - `types`: the shared data model re-exported from `tally-types`.
//! - `collab`: the `EventStore` and `ProviderClient` seams to the outside world.
//! - `timeline`: pure partitioning, aggregation, and verification.
//! - `store`: the `AttributionStore` trait and an in-memory implementation.
//!
//! Async runtime (Tokio)
//! ---------------------
//! `MemoryAttributionStore` guards its records with `tokio::sync::RwLock`, so
//! callers must run under a Tokio 1.x runtime. The timeline functions are
//! synchronous and runtime-agnostic.
#![warn(missing_docs)]

/// Traits for the event store and analytics provider collaborators.
pub mod collab;
/// Middleware trait implemented by provider wrappers.
pub mod middleware;
/// Attribution record persistence.
pub mod store;
pub mod timeline;
pub mod types;

pub use collab::{EventStore, ProviderClient};
pub use middleware::Middleware;
pub use store::{AttributionStore, MemoryAttributionStore};
pub use timeline::aggregate::aggregate;
pub use timeline::partition::{Window, partition, partition_ordered};
pub use timeline::verify::{verify_partition, verify_ranges};
pub use types::*;
