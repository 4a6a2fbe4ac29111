use std::sync::Arc;

use tally_core::{ProviderClient, TallyError};
use tally_middleware::ProviderBuilder;
use tally_types::RetryConfig;

use crate::HttpProvider;

/// Builder type alias specialized for HTTP providers.
pub type HttpProviderBuilder = ProviderBuilder;

impl HttpProvider {
    /// Returns a builder around the default provider with the default retry policy.
    ///
    /// Customize with the builder methods before calling `.build()`.
    ///
    /// # Errors
    /// Returns `InvalidArg` if `base_url` is not an absolute http(s) URL.
    pub fn builder(base_url: &str) -> Result<HttpProviderBuilder, TallyError> {
        let raw: Arc<dyn ProviderClient> = Arc::new(Self::new_raw(base_url)?);
        Ok(ProviderBuilder::new(raw).with_retry(RetryConfig::default()))
    }
}
