//! HTTP fetcher
//!
//! Performs a single GET with a bounded timeout and returns the body
//! unchanged, for JSON, XML, CSV, plain text or HTML sources alike.

use crate::client::FetchOptions;
use crate::error::FetchError;
use crate::fetchers::Fetcher;
use crate::target::FetchTarget;
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use tracing::debug;

/// Default HTTP fetcher
///
/// Handles any validated target with:
/// - one GET request, no retries
/// - the configured User-Agent
/// - a timeout covering connect, headers and body
pub struct HttpFetcher;

impl HttpFetcher {
    /// Create a new HTTP fetcher
    pub fn new() -> Self {
        Self
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(
        &self,
        target: &FetchTarget,
        options: &FetchOptions,
    ) -> Result<String, FetchError> {
        let url = target.as_str();

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(options.effective_user_agent())
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(options.timeout)
            .timeout(options.timeout)
            .build()
            .map_err(FetchError::ClientBuildError)?;

        debug!(fetcher = self.name(), url, "Sending GET");
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body: Bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        debug!(url, size = body.len(), "Fetched body");

        Ok(body_to_text(&body))
    }
}

/// Decode a response body, replacing invalid UTF-8 sequences
fn body_to_text(body: &[u8]) -> String {
    String::from_utf8_lossy(body).into_owned()
}
