//! Middleware trait for wrapping `ProviderClient` implementations.

use std::sync::Arc;

use crate::collab::ProviderClient;

/// Trait implemented by provider middleware layers.
///
/// A middleware consumes an inner `ProviderClient` and returns a wrapped client
/// that augments its behavior (e.g., retries, caching).
pub trait Middleware: Send + Sync {
    /// Apply this middleware to wrap an inner client and return the wrapped client.
    fn apply(self: Box<Self>, inner: Arc<dyn ProviderClient>) -> Arc<dyn ProviderClient>;

    /// Human-readable middleware name for introspection/logging.
    fn name(&self) -> &'static str;

    /// Opaque configuration snapshot for serialization/inspection.
    fn config_json(&self) -> serde_json::Value;
}
