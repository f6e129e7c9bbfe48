//! Feed abstraction for fetching token stats from a remote endpoint

use crate::{error::ProviderError, types::PricePayload};
use async_trait::async_trait;

/// Trait for token stats feeds
///
/// A feed performs exactly one remote request per call and knows nothing
/// about caching; `PriceDataSource` layers the cache and fallback on top.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Fetches the current stats payload
    ///
    /// # Returns
    /// The validated payload, or an error if the request, status check or
    /// body validation fails
    async fn fetch(&self) -> Result<PricePayload, ProviderError>;

    /// Returns the name of this feed
    fn feed_name(&self) -> &'static str;
}
