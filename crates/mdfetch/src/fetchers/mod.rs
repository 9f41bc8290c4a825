//! Raw content fetchers
//!
//! Design: a fetcher performs one direct GET and returns the body as text.
//! No DOM processing and no retries happen at this layer.

mod http;

pub use http::HttpFetcher;

use crate::client::FetchOptions;
use crate::error::FetchError;
use crate::target::FetchTarget;
use async_trait::async_trait;

/// Trait for raw (non-rendering) content fetchers
///
/// The service holds one fetcher behind an `Arc<dyn Fetcher>`, so an
/// implementation must be safe to call from concurrent requests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Unique identifier for this fetcher (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Fetch the target and return its body
    ///
    /// Only 2xx responses succeed. Any other status, and any network
    /// fault, is a terminal [`FetchError`] for the call.
    async fn fetch(&self, target: &FetchTarget, options: &FetchOptions)
        -> Result<String, FetchError>;
}
