//! Core types for mdfetch

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How much of a rendered page is converted to Markdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionMode {
    /// Whole document, minus scripts and styles
    #[default]
    Full,
    /// Navigation chrome stripped, main content region only
    MainContentOnly,
}

impl ConversionMode {
    /// True when header/footer/nav stripping and main-content location run
    pub fn strips_chrome(self) -> bool {
        matches!(self, ConversionMode::MainContentOnly)
    }
}

/// Tool input shared by every operation
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UrlRequest {
    /// URL of the target resource (must start with http:// or https://)
    pub url: String,
}

impl UrlRequest {
    /// Create a new request with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}
