//! Structural pre-conversion of tables and definition lists
//!
//! Each `table` and `dl` is rendered to Markdown directly and swapped for a
//! placeholder token in the tree. The generic converter only ever sees the
//! token, and [`Fragments::restore`] puts the prebuilt Markdown back
//! verbatim afterwards.

use crate::dom::HtmlDocument;
use ego_tree::iter::Edge;
use scraper::{ElementRef, Node, Selector};
use std::sync::LazyLock;
use tracing::debug;

static TABLES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid selector"));

static DEFINITION_LISTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dl").expect("valid selector"));

static ROWS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));

const TOKEN_PREFIX: &str = "MDFETCHBLOCK";

/// Markdown fragments standing in for replaced elements
#[derive(Debug)]
pub struct Fragments {
    prefix: String,
    blocks: Vec<String>,
}

impl Default for Fragments {
    fn default() -> Self {
        Self {
            prefix: TOKEN_PREFIX.to_string(),
            blocks: Vec::new(),
        }
    }
}

impl Fragments {
    /// Empty set whose tokens cannot collide with text already in `source`
    pub fn for_source(source: &str) -> Self {
        let mut prefix = TOKEN_PREFIX.to_string();
        let mut attempt = 0;
        while source.contains(&prefix) {
            attempt += 1;
            prefix = format!("MDFETCH{attempt}BLOCK");
        }
        Self {
            prefix,
            blocks: Vec::new(),
        }
    }

    /// Number of stored fragments
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True when nothing was replaced
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Store a fragment and return the token that marks its position
    fn push(&mut self, markdown: String) -> String {
        // Alphanumeric only, so the generic converter has nothing to escape.
        let token = format!("{}{}END", self.prefix, self.blocks.len());
        self.blocks.push(markdown);
        token
    }

    /// Swap every placeholder token in `text` for its fragment
    ///
    /// Single pass, so restored fragments are never scanned again.
    pub fn restore(&self, text: &str) -> String {
        if self.blocks.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(&self.prefix) {
            out.push_str(&rest[..start]);
            let after = &rest[start + self.prefix.len()..];
            let digits = after
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after.len());
            let block = after[..digits]
                .parse::<usize>()
                .ok()
                .filter(|_| after[digits..].starts_with("END"))
                .and_then(|index| self.blocks.get(index));

            match block {
                Some(block) => {
                    out.push_str(block);
                    rest = &after[digits + "END".len()..];
                }
                None => {
                    out.push_str(&self.prefix);
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Replace every table, then every definition list, in document order
pub fn convert_structures(doc: &mut HtmlDocument) -> Fragments {
    let mut fragments = Fragments::for_source(&doc.html());
    let tables = replace_all(doc, &TABLES, &mut fragments, table_to_markdown);
    let lists = replace_all(doc, &DEFINITION_LISTS, &mut fragments, definition_list_to_markdown);
    if tables + lists > 0 {
        debug!(tables, definition_lists = lists, "Converted structural elements");
    }
    fragments
}

fn replace_all(
    doc: &mut HtmlDocument,
    selector: &Selector,
    fragments: &mut Fragments,
    render: fn(ElementRef<'_>) -> String,
) -> usize {
    let mut replaced = 0;
    for id in doc.select_ids(selector) {
        // Nested inside an element replaced earlier in this pass
        if !doc.is_attached(id) {
            continue;
        }
        let Some(markdown) = doc.element(id).map(render) else {
            continue;
        };

        if markdown.is_empty() {
            doc.detach(id);
        } else {
            let token = fragments.push(markdown);
            doc.replace_with_text(id, &token);
        }
        replaced += 1;
    }
    replaced
}

/// Render a table as a Markdown pipe table
///
/// The first row is the header. Each later row keeps its own cell count,
/// and `colspan`/`rowspan` are ignored. Returns an empty string for a table
/// with no rows or an empty header row.
pub fn table_to_markdown(table: ElementRef<'_>) -> String {
    let rows: Vec<Vec<String>> = table.select(&ROWS).map(row_cells).collect();

    let Some((header, body)) = rows.split_first() else {
        return String::new();
    };
    if header.is_empty() {
        return String::new();
    }

    let mut markdown = String::from("\n\n");
    push_row(&mut markdown, header);
    markdown.push('|');
    for _ in header {
        markdown.push_str("---|");
    }
    markdown.push('\n');
    for row in body {
        push_row(&mut markdown, row);
    }
    markdown.push('\n');
    markdown
}

fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "th" | "td"))
        .map(|cell| element_text(&cell))
        .collect()
}

fn push_row(markdown: &mut String, cells: &[String]) {
    markdown.push('|');
    for cell in cells {
        markdown.push(' ');
        markdown.push_str(cell);
        markdown.push_str(" |");
    }
    markdown.push('\n');
}

/// Render a definition list as bolded terms followed by their descriptions
///
/// Every non-empty `dt` starts `**term:** `, every non-empty `dd` adds its
/// text and a line break.
pub fn definition_list_to_markdown(dl: ElementRef<'_>) -> String {
    let mut markdown = String::from("\n\n");

    for child in dl.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "dt" => {
                let term = element_text(&child);
                if !term.is_empty() {
                    markdown.push_str("**");
                    markdown.push_str(&term);
                    markdown.push_str(":** ");
                }
            }
            "dd" => {
                let description = element_text(&child);
                if !description.is_empty() {
                    markdown.push_str(&description);
                    markdown.push('\n');
                }
            }
            _ => {}
        }
    }

    markdown.push('\n');
    markdown
}

/// Text content with whitespace runs collapsed and ends trimmed
///
/// Line breaks and block element boundaries separate words.
fn element_text(element: &ElementRef<'_>) -> String {
    let mut text = String::new();
    for edge in element.traverse() {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Text(t) => text.push_str(t),
                Node::Element(el) if separates_words(el.name()) => text.push(' '),
                _ => {}
            },
            Edge::Close(node) => {
                if let Node::Element(el) = node.value() {
                    if separates_words(el.name()) {
                        text.push(' ');
                    }
                }
            }
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn separates_words(tag: &str) -> bool {
    matches!(
        tag,
        "br" | "p"
            | "div"
            | "li"
            | "ul"
            | "ol"
            | "dl"
            | "dt"
            | "dd"
            | "table"
            | "tr"
            | "td"
            | "th"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "pre"
            | "blockquote"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "nav"
            | "hr"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(doc: &HtmlDocument, selector: &Selector) -> String {
        let id = doc.select_ids(selector)[0];
        let element = doc.element(id).unwrap();
        if element.value().name() == "table" {
            table_to_markdown(element)
        } else {
            definition_list_to_markdown(element)
        }
    }

    #[test]
    fn test_table_with_header_row() {
        let doc = HtmlDocument::parse(
            "<table><tr><th>A</th><th>B</th></tr><tr><td>1</td><td>2</td></tr></table>",
        );
        let md = first(&doc, &TABLES);
        assert_eq!(md, "\n\n| A | B |\n|---|---|\n| 1 | 2 |\n\n");

        let lines: Vec<&str> = md.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(lines, vec!["| A | B |", "|---|---|", "| 1 | 2 |"]);
    }

    #[test]
    fn test_table_ragged_rows_keep_own_cell_count() {
        let doc = HtmlDocument::parse(
            "<table><thead><tr><td>H1</td><td>H2</td><td>H3</td></tr></thead>\
             <tbody><tr><td colspan=\"2\">wide</td></tr><tr><td> a  b </td><td>c</td></tr></tbody></table>",
        );
        let md = first(&doc, &TABLES);
        assert_eq!(
            md,
            "\n\n| H1 | H2 | H3 |\n|---|---|---|\n| wide |\n| a b | c |\n\n"
        );
    }

    #[test]
    fn test_table_without_rows_is_empty() {
        let doc = HtmlDocument::parse("<table><caption>Nothing</caption></table>");
        assert_eq!(first(&doc, &TABLES), "");
    }

    #[test]
    fn test_definition_list() {
        let doc = HtmlDocument::parse("<dl><dt>Term</dt><dd>Desc</dd></dl>");
        assert_eq!(first(&doc, &DEFINITION_LISTS), "\n\n**Term:** Desc\n\n");
    }

    #[test]
    fn test_definition_list_multiple_descriptions_and_empties() {
        let doc = HtmlDocument::parse(
            "<dl><dt>Color</dt><dd>Red</dd><dd>Blue</dd><dt> </dt><dd></dd><dt>Size</dt><dd>Large</dd></dl>",
        );
        assert_eq!(
            first(&doc, &DEFINITION_LISTS),
            "\n\n**Color:** Red\nBlue\n**Size:** Large\n\n"
        );
    }

    #[test]
    fn test_convert_structures_replaces_in_place() {
        let mut doc = HtmlDocument::parse(
            "<p>Before</p><table><tr><td>x</td></tr></table><p>Middle</p>\
             <dl><dt>T</dt><dd>D</dd></dl><p>After</p>",
        );
        let fragments = convert_structures(&mut doc);
        assert_eq!(fragments.len(), 2);

        let body = doc.body_html();
        assert_eq!(
            body,
            "<p>Before</p>MDFETCHBLOCK0END<p>Middle</p>MDFETCHBLOCK1END<p>After</p>"
        );

        let restored = fragments.restore(&body);
        assert!(restored.contains("| x |\n|---|\n"));
        assert!(restored.contains("**T:** D\n"));
        assert!(!restored.contains("<dt>"));
        assert!(!restored.contains("<table>"));
        assert!(restored.find("Before") < restored.find("| x |"));
        assert!(restored.find("| x |") < restored.find("Middle"));
        assert!(restored.find("**T:**") < restored.find("After"));
    }

    #[test]
    fn test_nested_table_folds_into_parent() {
        let mut doc = HtmlDocument::parse(
            "<table><tr><td>outer<table><tr><td>inner</td></tr></table></td></tr></table>",
        );
        let fragments = convert_structures(&mut doc);
        assert_eq!(fragments.len(), 1);
        assert_eq!(doc.body_html(), "MDFETCHBLOCK0END");
    }

    #[test]
    fn test_empty_table_removed() {
        let mut doc = HtmlDocument::parse("<p>a</p><table></table><p>b</p>");
        let fragments = convert_structures(&mut doc);
        assert!(fragments.is_empty());
        assert_eq!(doc.body_html(), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_no_structures_is_noop() {
        let markdown = "# Title\n\n| A | B |\n|---|---|\n| 1 | 2 |\n\n**Term:** Desc\n";
        let mut doc = HtmlDocument::parse(markdown);
        let before = doc.html();

        let fragments = convert_structures(&mut doc);
        assert!(fragments.is_empty());
        assert_eq!(doc.html(), before);
        assert_eq!(fragments.restore(markdown), markdown);
    }

    #[test]
    fn test_cell_and_description_text_keeps_word_breaks() {
        let mut doc = HtmlDocument::parse(
            "<table><tr><th>Name</th></tr><tr><td>foo<br>bar</td></tr></table>\
             <dl><dt>T</dt><dd><p>one</p><p>two</p></dd></dl>",
        );
        let fragments = convert_structures(&mut doc);
        let restored = fragments.restore(&doc.body_html());
        assert!(restored.contains("| foo bar |"));
        assert!(restored.contains("**T:** one two\n"));
    }

    #[test]
    fn test_definition_list_inside_cell_keeps_word_breaks() {
        let doc = HtmlDocument::parse(
            "<table><tr><th>k</th></tr><tr><td><dl><dt>T</dt><dd>D</dd></dl></td></tr></table>",
        );
        assert_eq!(first(&doc, &TABLES), "\n\n| k |\n|---|\n| T D |\n\n");
    }

    #[test]
    fn test_inline_markup_does_not_split_words() {
        let doc = HtmlDocument::parse("<table><tr><td>un<b>break</b>able</td></tr></table>");
        assert_eq!(first(&doc, &TABLES), "\n\n| unbreakable |\n|---|\n\n");
    }

    #[test]
    fn test_token_text_in_page_is_preserved() {
        let mut doc = HtmlDocument::parse(
            "<p>literal MDFETCHBLOCK0END token</p><table><tr><td>x</td></tr></table>",
        );
        let fragments = convert_structures(&mut doc);
        let restored = fragments.restore(&doc.body_html());

        assert!(restored.contains("literal MDFETCHBLOCK0END token"));
        assert_eq!(restored.matches("| x |").count(), 1);
        assert!(restored.find("token") < restored.find("| x |"));
    }

    #[test]
    fn test_restore_skips_unknown_and_malformed_tokens() {
        let mut fragments = Fragments::default();
        let token = fragments.push("[block]".to_string());
        let text = format!("MDFETCHBLOCK7END MDFETCHBLOCKxEND {token} MDFETCHBLOCK0");
        assert_eq!(
            fragments.restore(&text),
            "MDFETCHBLOCK7END MDFETCHBLOCKxEND [block] MDFETCHBLOCK0"
        );
    }

    #[test]
    fn test_placeholder_tokens_are_distinct() {
        let mut fragments = Fragments::default();
        let tokens: Vec<String> = (0..12).map(|i| fragments.push(format!("<{i}>"))).collect();
        assert_eq!(fragments.restore(&tokens[1]), "<1>");
        assert_eq!(fragments.restore(&tokens[10]), "<10>");
        assert_eq!(fragments.restore(&tokens[11]), "<11>");
    }
}
