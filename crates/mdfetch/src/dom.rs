//! Parsed HTML documents and sanitization
//!
//! [`HtmlDocument`] wraps a `scraper::Html`, whose tree is an ego-tree
//! arena. Nodes are addressed by [`NodeId`], so removing an element or
//! swapping it for a replacement is a re-link at that handle.

use crate::types::ConversionMode;
use ego_tree::NodeId;
use scraper::node::Text;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use tracing::debug;

static NON_CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script, style").expect("valid selector"));

static CHROME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("header, footer, nav").expect("valid selector"));

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

/// A mutable HTML document owned by one conversion call
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    /// Parse a full document; malformed markup never fails
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// Handles of every attached element matching `selector`, in document order
    pub fn select_ids(&self, selector: &Selector) -> Vec<NodeId> {
        self.html.select(selector).map(|el| el.id()).collect()
    }

    /// Element at `id`, if the handle points at an element
    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }

    /// True while the node is still reachable from the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let root = self.html.tree.root().id();
        match self.html.tree.get(id) {
            Some(node) => node.id() == root || node.ancestors().any(|a| a.id() == root),
            None => false,
        }
    }

    /// Detach every element matching `selector`; returns how many were removed
    pub fn remove_all(&mut self, selector: &Selector) -> usize {
        let ids = self.select_ids(selector);
        let mut removed = 0;
        for id in ids {
            if let Some(mut node) = self.html.tree.get_mut(id) {
                node.detach();
                removed += 1;
            }
        }
        removed
    }

    /// Remove the node at `id` from the tree
    pub fn detach(&mut self, id: NodeId) {
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.detach();
        }
    }

    /// Put a text node where `id` was and detach the original subtree
    ///
    /// Returns false when the node is gone or has no parent to hold the
    /// replacement.
    pub fn replace_with_text(&mut self, id: NodeId, text: &str) -> bool {
        let Some(mut node) = self.html.tree.get_mut(id) else {
            return false;
        };
        if node.parent().is_none() {
            return false;
        }
        node.insert_before(Node::Text(Text { text: text.into() }));
        node.detach();
        true
    }

    /// The `body` element (html5ever always synthesizes one)
    pub fn body(&self) -> Option<ElementRef<'_>> {
        self.html.select(&BODY).next()
    }

    /// Serialize the whole document
    pub fn html(&self) -> String {
        self.html.html()
    }

    /// Serialize the body's children, or the whole document without a body
    pub fn body_html(&self) -> String {
        match self.body() {
            Some(body) => body.inner_html(),
            None => self.html(),
        }
    }

    /// Borrow the underlying parsed document
    pub fn as_html(&self) -> &Html {
        &self.html
    }
}

/// Parse `html` and strip non-content nodes
///
/// `script` and `style` always go. In main-content mode `header`, `footer`
/// and `nav` go as well.
pub fn sanitize(html: &str, mode: ConversionMode) -> HtmlDocument {
    let mut doc = HtmlDocument::parse(html);
    let scripts = doc.remove_all(&NON_CONTENT);
    let chrome = if mode.strips_chrome() {
        doc.remove_all(&CHROME)
    } else {
        0
    };
    debug!(scripts, chrome, "Sanitized document");
    doc
}
