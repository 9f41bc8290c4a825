//! Validated fetch targets

use crate::error::FetchError;
use std::fmt;
use url::Url;

/// An absolute `http`/`https` URL that passed validation
///
/// Every operation builds one of these before touching the network or the
/// browser, so an invalid URL never costs a connection or a browser launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    url: Url,
}

impl FetchTarget {
    /// Validate a raw URL string
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(FetchError::MissingUrl);
        }

        if !raw.starts_with("http://") && !raw.starts_with("https://") {
            return Err(FetchError::InvalidUrlScheme);
        }

        let url = Url::parse(raw).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        Ok(Self { url })
    }

    /// The URL as a string
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// The parsed URL
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}
