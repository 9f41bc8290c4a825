//! mdfetch - web content fetching for language models
//!
//! Four operations over a single URL:
//!
//! - [`ContentService::raw_text`] - body over plain HTTP, no rendering
//! - [`ContentService::rendered_html`] - DOM serialized by a headless browser
//! - [`ContentService::markdown`] - rendered page converted to Markdown
//! - [`ContentService::markdown_summary`] - main content region only
//!
//! Markdown conversion keeps tables as pipe tables and definition lists as
//! bold-term paragraphs. Rendering goes through the [`RenderEngine`] trait;
//! [`ChromiumEngine`] is the default backend and launches one isolated
//! browser instance per call.
//!
//! ```no_run
//! # async fn run() -> Result<(), mdfetch::FetchError> {
//! let service = mdfetch::ContentService::builder().build();
//! let summary = service.markdown_summary("https://example.com").await?;
//! println!("{summary}");
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
mod convert;
pub mod dom;
mod error;
pub mod fetchers;
pub mod locate;
pub mod render;
mod service;
pub mod structure;
mod target;
mod tool;
mod types;

pub use client::{fetch_raw_text, fetch_raw_text_with_options, FetchOptions, DEFAULT_TIMEOUT};
pub use convert::{convert_html, filter_excessive_newlines, html_to_markdown, Conversion};
pub use error::{ConversionError, FetchError, RenderError};
pub use fetchers::{Fetcher, HttpFetcher};
pub use render::{ChromiumEngine, RenderEngine, RenderOutcome};
pub use service::{ContentService, ServiceBuilder};
pub use target::FetchTarget;
pub use tool::Tool;
pub use types::{ConversionMode, UrlRequest};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; mdfetch/1.0)";
