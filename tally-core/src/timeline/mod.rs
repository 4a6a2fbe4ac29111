//! Pure timeline utilities shared by the coordinator and tests.
//!
//! Modules include:
//! - `partition`: split a link's timeline into one window per event
//! - `aggregate`: sum a provider series over one window
//! - `verify`: detect overlapping, gapped, or otherwise corrupt stored partitions
/// Metric aggregation over a window.
pub mod aggregate;
/// Window assignment for events sharing a tracking link.
pub mod partition;
/// Partition consistency checks.
pub mod verify;
