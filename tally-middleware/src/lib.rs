//! tally-middleware
//!
//! Wrappers around a `ProviderClient`:
//! - [`RetryingProvider`]: per-attempt timeout and bounded exponential backoff.
//! - [`CachingProvider`]: short-lived series cache keyed by tracking link.
//! - [`ProviderBuilder`]: composes them in a fixed, documented order.

mod builder;
mod cache;
mod retry;

pub use crate::builder::ProviderBuilder;
pub use crate::cache::{CacheMiddleware, CachingProvider};
pub use crate::retry::{RetryMiddleware, RetryingProvider};
