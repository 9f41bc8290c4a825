//! Error types for mdfetch

use thiserror::Error;

/// Errors surfaced by the public fetch operations
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL is missing or blank
    #[error("Missing required parameter: url")]
    MissingUrl,

    /// URL has invalid scheme
    #[error("Invalid URL: must start with http:// or https://")]
    InvalidUrlScheme,

    /// URL has a valid scheme but does not parse
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Request did not complete within the configured timeout
    #[error("Request timed out fetching URL: {url}")]
    Timeout { url: String },

    /// Failed to connect to server
    #[error("Failed to connect to server for URL: {url}")]
    ConnectError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-2xx status
    #[error("HTTP {status} error fetching URL: {url}")]
    HttpStatus { url: String, status: u16 },

    /// Other request error
    #[error("Request failed for URL {url}: {message}")]
    RequestError { url: String, message: String },

    /// The browser engine could not be initialized at startup
    #[error("Browser engine not initialized. Cannot fetch rendered content.")]
    EngineUnavailable,
}

impl FetchError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_connect() {
            FetchError::ConnectError {
                url: url.to_string(),
                source: err,
            }
        } else {
            FetchError::RequestError {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// True for errors raised while validating the URL, before any I/O
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FetchError::MissingUrl | FetchError::InvalidUrlScheme | FetchError::InvalidUrl(_)
        )
    }

    /// True for errors raised by the raw HTTP retrieval
    pub fn is_retrieval(&self) -> bool {
        matches!(
            self,
            FetchError::ClientBuildError(_)
                | FetchError::Timeout { .. }
                | FetchError::ConnectError { .. }
                | FetchError::HttpStatus { .. }
                | FetchError::RequestError { .. }
        )
    }
}

/// Failures inside a single browser rendering attempt
///
/// These never leave the render boundary as a [`FetchError`]; the service
/// logs them and reports an empty page instead.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// Browser process could not be configured or started
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// Page could not be opened
    #[error("Failed to open page: {0}")]
    Page(String),

    /// Navigation failed (DNS, connection, crash)
    #[error("Failed to navigate to {url}: {message}")]
    Navigation { url: String, message: String },

    /// Navigation and serialization did not finish in time
    #[error("Timed out after {seconds}s rendering {url}")]
    Timeout { url: String, seconds: u64 },

    /// Page HTML could not be serialized
    #[error("Failed to read page content: {0}")]
    Content(String),

    /// Page or browser could not be closed
    #[error("Failed to close browser resource: {0}")]
    Close(String),

    /// Engine teardown failed
    #[error("Failed to shut down browser engine: {0}")]
    Shutdown(String),
}

/// Failure of the generic HTML to Markdown conversion
#[derive(Debug, Error)]
#[error("Markdown conversion failed: {0}")]
pub struct ConversionError(pub String);
