//! HTML fragment parsing into a [`DomDocument`].
//!
//! Shares the view markup tokenizer. Character references are decoded
//! everywhere except inside raw text elements. Tag names keep their source
//! case; end tags match case-insensitively.
//!
//! The tree follows the browser's implied end tags for paragraphs, list
//! items, definition terms and options, and a block start tag closes an open
//! `<p>`. Table insertion modes and formatting element reconstruction are
//! not modelled.

use html_escape::decode_html_entities;
use weaver_view::markup::{RAW_TEXT_ELEMENTS, Token, VOID_ELEMENTS, tokenize};

use crate::dom::{DomDocument, DomNodeId};

/// Start tags that close an open `<p>` first.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "center", "dd", "details", "dialog", "dir", "div",
    "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hgroup", "hr", "li", "listing", "main", "menu", "nav", "ol", "p", "plaintext",
    "pre", "section", "summary", "table", "ul", "xmp",
];

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Elements bounding a "p in button scope" lookup.
const BUTTON_SCOPE: &[&str] = &[
    "applet", "button", "caption", "html", "marquee", "object", "table", "td", "template", "th",
];

/// Elements that end the search for an open list item, apart from
/// `address`, `div` and `p`.
const LIST_ITEM_BARRIERS: &[&str] = &[
    "applet", "article", "aside", "blockquote", "body", "button", "caption", "center", "col",
    "colgroup", "details", "dialog", "dir", "dl", "fieldset", "figcaption", "figure", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "html", "listing", "main",
    "marquee", "menu", "nav", "object", "ol", "pre", "section", "select", "summary", "table",
    "tbody", "td", "template", "tfoot", "th", "thead", "tr", "ul", "xmp",
];

/// Parse `html` into a new detached fragment and return it.
pub fn parse_fragment(dom: &mut DomDocument, html: &str) -> DomNodeId {
    let root = dom.create_fragment();
    let mut builder = TreeBuilder {
        dom,
        root,
        stack: vec![root],
    };

    for token in tokenize(html) {
        match token {
            Token::Text(raw) => builder.text(raw),
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => builder.start_tag(&name, attributes, self_closing),
            Token::EndTag(name) => builder.end_tag(&name),
            Token::Comment(data) => {
                let comment = builder.dom.create_comment(data);
                let parent = builder.current();
                builder.dom.append_child(parent, comment);
            }
            Token::Doctype(_) => {}
        }
    }

    root
}

struct TreeBuilder<'d> {
    dom: &'d mut DomDocument,
    root: DomNodeId,
    /// Open elements, fragment root first.
    stack: Vec<DomNodeId>,
}

impl TreeBuilder<'_> {
    fn current(&self) -> DomNodeId {
        self.stack.last().copied().unwrap_or(self.root)
    }

    fn current_is(&self, names: &[&str]) -> bool {
        self.dom
            .local_name(self.current())
            .is_some_and(|name| names.contains(&name))
    }

    fn text(&mut self, raw: String) {
        let parent = self.current();
        let data = if self.current_is(RAW_TEXT_ELEMENTS) {
            raw
        } else {
            decode_html_entities(&raw).into_owned()
        };
        let text = self.dom.create_text(data);
        self.dom.append_child(parent, text);
    }

    fn start_tag(&mut self, name: &str, attributes: Vec<(String, Option<String>)>, self_closing: bool) {
        let local = name.to_ascii_lowercase();
        match local.as_str() {
            "li" => self.close_list_item(&["li"]),
            "dd" | "dt" => self.close_list_item(&["dd", "dt"]),
            "option" => self.pop_if_current(&["option"]),
            "optgroup" => {
                self.pop_if_current(&["option"]);
                self.pop_if_current(&["optgroup"]);
            }
            _ => {}
        }
        if CLOSES_PARAGRAPH.contains(&local.as_str()) {
            self.close_paragraph();
        }
        if HEADINGS.contains(&local.as_str()) && self.current_is(HEADINGS) {
            tracing::trace!(tag = %name, "parse_fragment: heading closes an open heading");
            self.stack.pop();
        }

        let element = self.dom.create_element(name);
        for (key, value) in attributes {
            let value = value.unwrap_or_default();
            self.dom.set_attribute(element, &key, &decode_html_entities(&value));
        }
        let parent = self.current();
        self.dom.append_child(parent, element);

        if !self_closing && !VOID_ELEMENTS.contains(&local.as_str()) {
            self.stack.push(element);
        }
    }

    fn end_tag(&mut self, name: &str) {
        let local = name.to_ascii_lowercase();
        if local == "p" && !self.has_paragraph_in_scope() {
            // A lone `</p>` still produces an empty paragraph.
            let p = self.dom.create_element("p");
            let parent = self.current();
            self.dom.append_child(parent, p);
            return;
        }

        let open = self
            .stack
            .iter()
            .rposition(|node| self.dom.local_name(*node) == Some(local.as_str()));
        match open {
            Some(index) => self.stack.truncate(index),
            None => tracing::trace!(tag = %name, "parse_fragment: ignoring stray end tag"),
        }
    }

    fn has_paragraph_in_scope(&self) -> bool {
        for node in self.stack.iter().rev() {
            match self.dom.local_name(*node) {
                Some("p") => return true,
                Some(name) if BUTTON_SCOPE.contains(&name) => return false,
                _ => {}
            }
        }
        false
    }

    fn close_paragraph(&mut self) {
        if !self.has_paragraph_in_scope() {
            return;
        }
        if let Some(index) = self
            .stack
            .iter()
            .rposition(|node| self.dom.local_name(*node) == Some("p"))
        {
            self.stack.truncate(index);
        }
    }

    /// Close the nearest open element named in `items`, unless a barrier
    /// element sits above it.
    fn close_list_item(&mut self, items: &[&str]) {
        let mut close_at = None;
        for (index, node) in self.stack.iter().enumerate().rev() {
            let Some(name) = self.dom.local_name(*node) else {
                break;
            };
            if items.contains(&name) {
                close_at = Some(index);
                break;
            }
            if LIST_ITEM_BARRIERS.contains(&name) {
                break;
            }
        }
        if let Some(index) = close_at {
            self.stack.truncate(index);
        }
    }

    fn pop_if_current(&mut self, names: &[&str]) {
        if self.stack.len() > 1 && self.current_is(names) {
            self.stack.pop();
        }
    }
}
