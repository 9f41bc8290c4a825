//! Main-content location
//!
//! A fixed, ordered list of selectors. No scoring: the first selector whose
//! first match has visible text wins, and the body is the fallback.

use crate::dom::HtmlDocument;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use tracing::debug;

/// Candidate selectors, highest priority first
pub const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=main]",
    "#main",
    "#content",
    ".main",
    ".content",
    ".article",
    ".post",
    ".entry",
];

static CANDIDATES: LazyLock<Vec<(&'static str, Selector)>> = LazyLock::new(|| {
    MAIN_CONTENT_SELECTORS
        .iter()
        .map(|css| (*css, Selector::parse(css).expect("valid selector")))
        .collect()
});

/// Find the element most likely to hold the page's primary content
///
/// Returns `None` only for a document without a body.
pub fn locate_main(doc: &HtmlDocument) -> Option<ElementRef<'_>> {
    for (css, selector) in CANDIDATES.iter() {
        if let Some(element) = doc.as_html().select(selector).next() {
            if has_text(&element) {
                debug!(selector = css, "Located main content");
                return Some(element);
            }
        }
    }

    debug!("No main content candidate, using body");
    doc.body()
}

/// Re-parse the located main content as a standalone document
///
/// The original document is returned untouched when nothing is located.
pub fn main_content_document(doc: HtmlDocument) -> HtmlDocument {
    let fragment = locate_main(&doc).map(|element| element.html());
    match fragment {
        Some(html) => HtmlDocument::parse(&html),
        None => doc,
    }
}

fn has_text(element: &ElementRef<'_>) -> bool {
    element.text().any(|t| !t.trim().is_empty())
}
