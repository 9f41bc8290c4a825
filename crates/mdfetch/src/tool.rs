//! Tool catalogue for the four content operations

use crate::error::FetchError;
use crate::service::ContentService;
use crate::types::UrlRequest;
use schemars::schema_for;

/// One of the exposed content tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Raw body over plain HTTP
    RawText,
    /// Browser-rendered HTML
    RenderedHtml,
    /// Whole page as Markdown
    Markdown,
    /// Main content as Markdown
    MarkdownSummary,
}

impl Tool {
    /// Every tool, in listing order
    pub fn all() -> [Tool; 4] {
        [
            Tool::RawText,
            Tool::RenderedHtml,
            Tool::Markdown,
            Tool::MarkdownSummary,
        ]
    }

    /// Look a tool up by its wire name
    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::all().into_iter().find(|tool| tool.name() == name)
    }

    /// Wire name
    pub fn name(self) -> &'static str {
        match self {
            Tool::RawText => "get_raw_text",
            Tool::RenderedHtml => "get_rendered_html",
            Tool::Markdown => "get_markdown",
            Tool::MarkdownSummary => "get_markdown_summary",
        }
    }

    /// Tool description for LLM consumption
    pub fn description(self) -> &'static str {
        match self {
            Tool::RawText => {
                "Retrieves raw text content directly from a URL without browser rendering. \
                 Ideal for structured data formats like JSON, XML, CSV, TSV, or plain text files. \
                 Best used when fast, direct access to the source content is needed without \
                 processing dynamic elements."
            }
            Tool::RenderedHtml => {
                "Fetches fully rendered HTML content using a headless browser, including \
                 JavaScript-generated content. Essential for modern web applications, \
                 single-page applications (SPAs), or any content that requires client-side \
                 rendering to be complete."
            }
            Tool::Markdown => {
                "Converts web page content to well-formatted Markdown, preserving structural \
                 elements like tables and definition lists. Recommended as the default tool \
                 for web content extraction when a clean, readable text format is needed \
                 while maintaining document structure."
            }
            Tool::MarkdownSummary => {
                "Extracts and converts the main content area of a web page to Markdown format, \
                 automatically removing navigation menus, headers, footers, and other peripheral \
                 content. Perfect for capturing the core content of articles, blog posts, \
                 or documentation pages."
            }
        }
    }

    /// Get input schema as JSON
    pub fn input_schema(self) -> serde_json::Value {
        let schema = schema_for!(UrlRequest);
        serde_json::to_value(schema).unwrap_or_default()
    }

    /// Run the tool against `service`
    pub async fn execute(
        self,
        service: &ContentService,
        req: UrlRequest,
    ) -> Result<String, FetchError> {
        match self {
            Tool::RawText => service.raw_text(&req.url).await,
            Tool::RenderedHtml => service.rendered_html(&req.url).await,
            Tool::Markdown => service.markdown(&req.url).await,
            Tool::MarkdownSummary => service.markdown_summary(&req.url).await,
        }
    }

    /// Message reported to the caller when [`execute`](Self::execute) fails
    pub fn error_message(self, err: &FetchError) -> String {
        if err.is_validation() {
            return format!("Invalid parameters: {err}");
        }
        let prefix = match self {
            Tool::RawText => "Failed to fetch raw text content",
            Tool::RenderedHtml => "Failed to fetch rendered HTML content",
            Tool::Markdown => "Failed to convert content to markdown",
            Tool::MarkdownSummary => "Failed to extract and convert main content",
        };
        format!("{prefix}: {err}")
    }
}
