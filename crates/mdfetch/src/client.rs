//! Fetch options and one-shot entry points
//!
//! Long-lived callers should build a [`ContentService`](crate::ContentService)
//! once and share it; the helpers here cover the raw fetch, which needs no
//! browser.

use crate::error::FetchError;
use crate::fetchers::{Fetcher, HttpFetcher};
use crate::target::FetchTarget;
use crate::DEFAULT_USER_AGENT;
use std::path::PathBuf;
use std::time::Duration;

/// Per-call timeout for both the HTTP fetch and browser navigation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Fetch options shared by the raw and rendered fetchers
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Custom User-Agent for raw fetches
    pub user_agent: Option<String>,
    /// Timeout applied to each fetch or render call
    pub timeout: Duration,
    /// Chrome/Chromium binary; autodetected when unset
    pub chrome_executable: Option<PathBuf>,
    /// Run the browser without a window
    pub headless: bool,
    /// Extra command line arguments for the browser
    pub browser_args: Vec<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout: DEFAULT_TIMEOUT,
            chrome_executable: None,
            headless: true,
            browser_args: Vec::new(),
        }
    }
}

impl FetchOptions {
    /// User-Agent to send, falling back to the crate default
    pub fn effective_user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

/// Fetch a URL's body as text with default options
pub async fn fetch_raw_text(url: &str) -> Result<String, FetchError> {
    fetch_raw_text_with_options(url, &FetchOptions::default()).await
}

/// Fetch a URL's body as text with custom options
pub async fn fetch_raw_text_with_options(
    url: &str,
    options: &FetchOptions,
) -> Result<String, FetchError> {
    let target = FetchTarget::parse(url)?;
    HttpFetcher::new().fetch(&target, options).await
}
