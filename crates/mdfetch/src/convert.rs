//! HTML to Markdown conversion pipeline

use crate::dom::sanitize;
use crate::error::ConversionError;
use crate::locate::main_content_document;
use crate::structure::convert_structures;
use crate::types::ConversionMode;
use htmd::options::{CodeBlockStyle, HeadingStyle, LinkStyle, Options};
use htmd::HtmlToMarkdown;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Result of converting rendered HTML
///
/// Both variants collapse to a plain string at the service boundary; the
/// distinction is kept here so library callers can tell clean Markdown from
/// the raw-HTML fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    /// Converted Markdown (possibly empty)
    Markdown(String),
    /// Conversion failed; carries the original, unconverted HTML
    Fallback { html: String, reason: String },
}

impl Conversion {
    /// True when the converter failed and the HTML was passed through
    pub fn is_fallback(&self) -> bool {
        matches!(self, Conversion::Fallback { .. })
    }

    /// The textual result, whichever variant it is
    pub fn as_str(&self) -> &str {
        match self {
            Conversion::Markdown(markdown) => markdown,
            Conversion::Fallback { html, .. } => html,
        }
    }

    /// Consume into the textual result
    pub fn into_string(self) -> String {
        match self {
            Conversion::Markdown(markdown) => markdown,
            Conversion::Fallback { html, .. } => html,
        }
    }
}

/// Convert rendered HTML to Markdown
///
/// Empty input yields empty Markdown. In [`ConversionMode::MainContentOnly`]
/// navigation chrome is stripped and only the located main content region
/// is converted.
pub fn convert_html(html: &str, mode: ConversionMode) -> Conversion {
    convert_with(html, mode, html_to_markdown)
}

pub(crate) fn convert_with<F>(html: &str, mode: ConversionMode, generic: F) -> Conversion
where
    F: Fn(&str) -> Result<String, ConversionError>,
{
    if html.trim().is_empty() {
        return Conversion::Markdown(String::new());
    }

    let mut doc = sanitize(html, mode);
    if mode.strips_chrome() {
        doc = main_content_document(doc);
    }

    let fragments = convert_structures(&mut doc);

    match generic(&doc.body_html()) {
        Ok(markdown) => {
            let markdown = fragments.restore(&markdown);
            let markdown = filter_excessive_newlines(&markdown).trim().to_string();
            debug!(?mode, size = markdown.len(), "Converted HTML to markdown");
            Conversion::Markdown(markdown)
        }
        Err(err) => {
            warn!(error = %err, "Error converting HTML to Markdown, returning original HTML");
            Conversion::Fallback {
                html: html.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

/// Generic HTML to Markdown transform
///
/// Headings, lists, links and emphasis follow htmd's mapping rules.
pub fn html_to_markdown(html: &str) -> Result<String, ConversionError> {
    converter()
        .convert(html)
        .map_err(|e| ConversionError(e.to_string()))
}

fn converter() -> &'static HtmlToMarkdown {
    static CONVERTER: OnceLock<HtmlToMarkdown> = OnceLock::new();
    CONVERTER.get_or_init(|| {
        let options = Options {
            heading_style: HeadingStyle::Atx,
            code_block_style: CodeBlockStyle::Fenced,
            link_style: LinkStyle::Inlined,
            ..Default::default()
        };
        HtmlToMarkdown::builder()
            .options(options)
            .skip_tags(vec!["script", "style", "noscript"])
            .build()
    })
}

/// Filter excessive newlines: keep at most 2 consecutive newlines
pub fn filter_excessive_newlines(s: &str) -> String {
    let mut result = String::new();
    let mut newline_count = 0;

    for c in s.chars() {
        if c == '\n' {
            newline_count += 1;
            if newline_count <= 2 {
                result.push(c);
            }
        } else {
            newline_count = 0;
            result.push(c);
        }
    }

    result
}
