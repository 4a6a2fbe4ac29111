//! Builder for composing a provider with middleware layers.
//!
//! # Middleware Ordering Convention
//!
//! Middleware layers form an "onion" around the raw provider:
//!
//! ```text
//! Coordinator fetch
//!     ↓
//! Cache  (answers repeated fetches without touching the network)
//!     ↓
//! Retry  (bounds each attempt, backs off between transient failures)
//!     ↓
//! Raw provider (e.g. HTTP)
//! ```
//!
//! The `layers` vector stores middleware in **outermost-first** order and is
//! applied in reverse during `build()`. `with_cache` always inserts at the
//! outermost position and `with_retry` at the innermost one, so the resulting
//! nesting does not depend on call order. `layer` adds custom middleware
//! outermost.

use std::sync::Arc;

use serde_json::json;
use tally_core::{Middleware, ProviderClient};
use tally_types::{CacheConfig, RetryConfig, TallyConfig};

use crate::cache::CacheMiddleware;
use crate::retry::RetryMiddleware;

const RETRY: &str = "RetryingProvider";
const CACHE: &str = "CachingProvider";

/// Generic middleware builder for composing a provider with layered wrappers.
///
/// See [module-level documentation](self) for details on middleware ordering.
pub struct ProviderBuilder {
    raw: Arc<dyn ProviderClient>,
    /// Middleware layers in outermost-first order.
    layers: Vec<Box<dyn Middleware>>,
}

impl ProviderBuilder {
    /// Create a new builder from a raw, unwrapped provider.
    #[must_use]
    pub fn new(raw: Arc<dyn ProviderClient>) -> Self {
        Self {
            raw,
            layers: Vec::new(),
        }
    }

    /// Builder preloaded with the retry policy and optional cache from `config`.
    #[must_use]
    pub fn from_config(raw: Arc<dyn ProviderClient>, config: &TallyConfig) -> Self {
        let builder = Self::new(raw).with_retry(config.retry);
        match config.cache {
            Some(cache) => builder.with_cache(cache),
            None => builder,
        }
    }

    /// Add or replace the retry layer (innermost).
    #[must_use]
    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.layers.retain(|m| m.name() != RETRY);
        self.layers.push(Box::new(RetryMiddleware::new(config)));
        self
    }

    /// Remove retry if present.
    #[must_use]
    pub fn without_retry(mut self) -> Self {
        self.layers.retain(|m| m.name() != RETRY);
        self
    }

    /// Add or replace the series cache (outermost).
    #[must_use]
    pub fn with_cache(mut self, config: CacheConfig) -> Self {
        self.layers.retain(|m| m.name() != CACHE);
        // Insert at position 0 to make this the outermost layer
        self.layers.insert(0, Box::new(CacheMiddleware::new(config)));
        self
    }

    /// Remove cache if present.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.layers.retain(|m| m.name() != CACHE);
        self
    }

    /// Add an arbitrary middleware layer at the outermost position.
    #[must_use]
    pub fn layer(mut self, layer: Box<dyn Middleware>) -> Self {
        self.layers.insert(0, layer);
        self
    }

    /// Describe the configured stack, outermost first, ending with the raw provider.
    #[must_use]
    pub fn describe(&self) -> serde_json::Value {
        let mut out: Vec<serde_json::Value> = self
            .layers
            .iter()
            .map(|l| json!({ "name": l.name(), "config": l.config_json() }))
            .collect();
        out.push(json!({ "name": "RawProvider", "config": { "name": self.raw.name() } }));
        serde_json::Value::Array(out)
    }

    /// Build the wrapped provider according to the captured stack.
    ///
    /// Applies middleware layers in reverse order (innermost to outermost).
    #[must_use]
    pub fn build(self) -> Arc<dyn ProviderClient> {
        let mut acc: Arc<dyn ProviderClient> = Arc::clone(&self.raw);
        for m in self.layers.into_iter().rev() {
            acc = m.apply(acc);
        }
        acc
    }
}
