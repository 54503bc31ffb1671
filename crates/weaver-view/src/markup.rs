//! View markup: a compact text form of view trees for tests and debugging.
//!
//! ```text
//! <container:p>fo{o</container:p><container:p>ba}r</container:p>
//! ```
//!
//! - The element prefix picks the [`ElementKind`]: `container`, `attribute`,
//!   `empty`, `ui`, `raw`, `editable`; no prefix gives a generic element.
//! - `{` and `}` mark range ends inside text, `[` and `]` between nodes.
//!
//! The tokenizer is shared with the DOM-side HTML parser.

use html_escape::{decode_html_entities, encode_double_quoted_attribute};

use crate::node::{ElementKind, NodeData, NodeId, ViewTree};
use crate::position::Position;
use crate::range::Range;

/// Elements without content or end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is text up to the matching end tag.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Doctype(String),
    StartTag {
        name: String,
        attributes: Vec<(String, Option<String>)>,
        self_closing: bool,
    },
    EndTag(String),
    Comment(String),
    /// Raw text; character references are left undecoded.
    Text(String),
}

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b':' | b'_' | b'$' | b'.')
}

fn is_tag_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    bytes
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == b'$')
        && bytes.all(is_name_byte)
}

fn flush_text(tokens: &mut Vec<Token>, text: &mut String) {
    if !text.is_empty() {
        tokens.push(Token::Text(std::mem::take(text)));
    }
}

/// Split markup into tokens. Anything that does not form a tag is text.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut rest = input;

    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            if let Some(after) = rest.strip_prefix("<!--") {
                flush_text(&mut tokens, &mut text);
                let (comment, remaining) = match after.find("-->") {
                    Some(end) => (&after[..end], &after[end + 3..]),
                    None => (after, ""),
                };
                tokens.push(Token::Comment(comment.to_string()));
                rest = remaining;
                continue;
            }

            if (rest.starts_with("<!") || rest.starts_with("<?"))
                && let Some(end) = rest.find('>')
            {
                flush_text(&mut tokens, &mut text);
                let body = rest[2..end].trim();
                let token = match body.get(..7) {
                    Some(keyword) if keyword.eq_ignore_ascii_case("doctype") => {
                        Token::Doctype(body[7..].trim().to_string())
                    }
                    _ => Token::Comment(body.to_string()),
                };
                tokens.push(token);
                rest = &rest[end + 1..];
                continue;
            }

            if let Some(after) = rest.strip_prefix("</") {
                if let Some(end) = after.find('>') {
                    let name = after[..end].trim();
                    if is_tag_name(name) {
                        flush_text(&mut tokens, &mut text);
                        tokens.push(Token::EndTag(name.to_string()));
                        rest = &after[end + 1..];
                        continue;
                    }
                }
            } else if let Some((token, consumed)) = parse_start_tag(rest) {
                flush_text(&mut tokens, &mut text);
                let raw_text_name = match &token {
                    Token::StartTag {
                        name,
                        self_closing: false,
                        ..
                    } if RAW_TEXT_ELEMENTS
                        .iter()
                        .any(|raw| name.eq_ignore_ascii_case(raw)) =>
                    {
                        Some(name.to_ascii_lowercase())
                    }
                    _ => None,
                };
                tokens.push(token);
                rest = &rest[consumed..];

                if let Some(name) = raw_text_name {
                    let end = rest
                        .to_ascii_lowercase()
                        .find(&format!("</{name}"))
                        .unwrap_or(rest.len());
                    if end > 0 {
                        tokens.push(Token::Text(rest[..end].to_string()));
                    }
                    rest = &rest[end..];
                }
                continue;
            }
        }

        text.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    flush_text(&mut tokens, &mut text);
    tokens
}

/// Parse a start tag at the beginning of `input`, returning it and its byte length.
fn parse_start_tag(input: &str) -> Option<(Token, usize)> {
    let bytes = input.as_bytes();
    let mut i = 1;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    let name = &input[1..i];
    if !is_tag_name(name) {
        return None;
    }

    let skip_whitespace = |i: &mut usize| {
        while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
            *i += 1;
        }
    };

    let mut attributes = Vec::new();
    loop {
        skip_whitespace(&mut i);
        match *bytes.get(i)? {
            b'>' => {
                let token = Token::StartTag {
                    name: name.to_string(),
                    attributes,
                    self_closing: false,
                };
                return Some((token, i + 1));
            }
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                let token = Token::StartTag {
                    name: name.to_string(),
                    attributes,
                    self_closing: true,
                };
                return Some((token, i + 2));
            }
            b'/' => {
                i += 1;
                continue;
            }
            _ => {}
        }

        let key_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let key = input[key_start..i].to_string();

        skip_whitespace(&mut i);
        if bytes.get(i) != Some(&b'=') {
            attributes.push((key, None));
            continue;
        }
        i += 1;
        skip_whitespace(&mut i);

        let value = match *bytes.get(i)? {
            quote @ (b'"' | b'\'') => {
                let start = i + 1;
                let end = start + input[start..].find(quote as char)?;
                i = end + 1;
                &input[start..end]
            }
            _ => {
                let start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                &input[start..i]
            }
        };
        attributes.push((key, Some(value.to_string())));
    }
}

/// Result of [`parse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parsed {
    /// Document fragment holding the parsed top-level nodes.
    pub root: NodeId,
    /// Range built from the markers, if any were present.
    pub selection: Option<Range>,
}

#[derive(Clone, Copy)]
struct Marker {
    is_start: bool,
    position: Option<Position>,
}

struct MarkupParser<'t> {
    tree: &'t mut ViewTree,
    stack: Vec<NodeId>,
    buffer: String,
    /// (index into `markers`, character offset in `buffer`)
    buffer_markers: Vec<(usize, usize)>,
    markers: Vec<Marker>,
}

impl MarkupParser<'_> {
    fn current(&self) -> NodeId {
        // The root fragment is never popped.
        self.stack[self.stack.len() - 1]
    }

    fn flush(&mut self) {
        let parent = self.current();
        if self.buffer.is_empty() {
            let position = Position::new(parent, self.tree.child_count(parent));
            for (index, _) in self.buffer_markers.drain(..) {
                self.markers[index].position = Some(position);
            }
            return;
        }

        let text = self.tree.create_text(std::mem::take(&mut self.buffer));
        self.tree.append_child(parent, text);
        for (index, offset) in self.buffer_markers.drain(..) {
            self.markers[index].position = Some(Position::new(text, offset));
        }
    }

    fn text(&mut self, data: &str) {
        for ch in data.chars() {
            match ch {
                '{' | '}' => {
                    self.buffer_markers
                        .push((self.markers.len(), self.buffer.chars().count()));
                    self.markers.push(Marker {
                        is_start: ch == '{',
                        position: None,
                    });
                }
                '[' | ']' => {
                    self.flush();
                    let parent = self.current();
                    self.markers.push(Marker {
                        is_start: ch == '[',
                        position: Some(Position::new(parent, self.tree.child_count(parent))),
                    });
                }
                _ => self.buffer.push(ch),
            }
        }
    }

    fn start_tag(&mut self, name: &str, attributes: Vec<(String, Option<String>)>, self_closing: bool) {
        self.flush();
        let (kind, local_name) = match name.split_once(':') {
            Some((prefix, local)) => match ElementKind::from_markup_prefix(prefix) {
                Some(kind) => (kind, local),
                None => (ElementKind::Generic, name),
            },
            None => (ElementKind::Generic, name),
        };

        let element = self.tree.create_element_with_attributes(
            kind,
            local_name,
            attributes
                .into_iter()
                .map(|(key, value)| {
                    let value = value.map(|v| decode_html_entities(&v).into_owned());
                    (key, value.unwrap_or_default())
                }),
        );
        let parent = self.current();
        self.tree.append_child(parent, element);

        let is_void = self_closing
            || kind == ElementKind::Empty
            || VOID_ELEMENTS.contains(&local_name);
        if !is_void {
            self.stack.push(element);
        }
    }

    fn end_tag(&mut self, name: &str) {
        self.flush();
        let local_name = name.split_once(':').map_or(name, |(_, local)| local);
        let found = self
            .stack
            .iter()
            .skip(1)
            .rposition(|node| self.tree.is_element_named(*node, local_name));
        match found {
            // `skip(1)` shifts indices by one.
            Some(index) => self.stack.truncate(index + 1),
            None => tracing::warn!(name, "markup: ignoring unmatched end tag"),
        }
    }

    fn comment(&mut self, data: &str) {
        self.flush();
        let comment = self.tree.create_element(ElementKind::Ui, "$comment");
        self.tree.set_custom_property(comment, "$rawContent", data);
        let parent = self.current();
        self.tree.append_child(parent, comment);
    }
}

/// Build view nodes from markup into `tree`.
///
/// Unclosed elements are closed at the end of input and unmatched end tags
/// are ignored. With a single range marker the selection is collapsed.
pub fn parse(tree: &mut ViewTree, markup: &str) -> Parsed {
    let root = tree.create_document_fragment();
    let mut parser = MarkupParser {
        tree,
        stack: vec![root],
        buffer: String::new(),
        buffer_markers: Vec::new(),
        markers: Vec::new(),
    };

    for token in tokenize(markup) {
        match token {
            Token::Text(data) => parser.text(&data),
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => parser.start_tag(&name, attributes, self_closing),
            Token::EndTag(name) => parser.end_tag(&name),
            Token::Comment(data) => parser.comment(&data),
            Token::Doctype(_) => {}
        }
    }
    parser.flush();

    let start = parser
        .markers
        .iter()
        .find(|m| m.is_start)
        .and_then(|m| m.position);
    let end = parser
        .markers
        .iter()
        .find(|m| !m.is_start)
        .and_then(|m| m.position);
    let selection = match (start, end) {
        (Some(start), Some(end)) => Some(Range::new(start, end)),
        (Some(position), None) | (None, Some(position)) => Some(Range::collapsed(position)),
        (None, None) => None,
    };

    tracing::trace!(root = ?root, has_selection = selection.is_some(), "parse: done");
    Parsed { root, selection }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StringifyOptions {
    /// Write element kind prefixes (`container:p`).
    pub show_type: bool,
}

/// Render `node` as markup with optional range markers.
pub fn stringify(tree: &ViewTree, node: NodeId, range: Option<&Range>) -> String {
    stringify_with(tree, node, range, StringifyOptions::default())
}

pub fn stringify_with(
    tree: &ViewTree,
    node: NodeId,
    range: Option<&Range>,
    options: StringifyOptions,
) -> String {
    let mut out = String::new();
    let writer = MarkupWriter {
        tree,
        range,
        options,
    };
    if tree.is_document_fragment(node) {
        writer.write_children(node, &mut out);
    } else {
        writer.write_node(node, &mut out);
    }
    out
}

struct MarkupWriter<'a> {
    tree: &'a ViewTree,
    range: Option<&'a Range>,
    options: StringifyOptions,
}

impl MarkupWriter<'_> {
    fn write_markers(&self, position: Position, in_text: bool, out: &mut String) {
        let Some(range) = self.range else {
            return;
        };
        let (open, close) = if in_text { ('{', '}') } else { ('[', ']') };
        if range.start() == position {
            out.push(open);
        }
        if range.end() == position {
            out.push(close);
        }
    }

    fn write_children(&self, node: NodeId, out: &mut String) {
        let children = self.tree.children(node);
        for (index, child) in children.iter().enumerate() {
            self.write_markers(Position::new(node, index), false, out);
            self.write_node(*child, out);
        }
        self.write_markers(Position::new(node, children.len()), false, out);
    }

    fn write_node(&self, node: NodeId, out: &mut String) {
        match self.tree.data(node) {
            NodeData::Text(data) => {
                for (index, ch) in data.chars().enumerate() {
                    self.write_markers(Position::new(node, index), true, out);
                    out.push(ch);
                }
                self.write_markers(Position::new(node, data.chars().count()), true, out);
            }
            NodeData::DocumentFragment(_) => self.write_children(node, out),
            NodeData::Element(element) => {
                if element.kind() == ElementKind::Ui && element.name() == "$comment" {
                    out.push_str("<!--");
                    out.push_str(element.custom_property("$rawContent").unwrap_or_default());
                    out.push_str("-->");
                    return;
                }

                let name = match element.kind().markup_prefix() {
                    Some(prefix) if self.options.show_type => format!("{prefix}:{}", element.name()),
                    _ => element.name().to_string(),
                };
                out.push('<');
                out.push_str(&name);
                for (key, value) in element.attributes() {
                    out.push_str(&format!(
                        " {key}=\"{}\"",
                        encode_double_quoted_attribute(value)
                    ));
                }
                out.push('>');
                self.write_children(node, out);
                out.push_str(&format!("</{name}>"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokenize_tags_and_text() {
        let tokens = tokenize(r#"<p class="a" hidden>x &amp; y<br/></p><!-- c -->"#);
        assert_eq!(
            tokens,
            vec![
                Token::StartTag {
                    name: "p".into(),
                    attributes: vec![("class".into(), Some("a".into())), ("hidden".into(), None)],
                    self_closing: false,
                },
                Token::Text("x &amp; y".into()),
                Token::StartTag {
                    name: "br".into(),
                    attributes: vec![],
                    self_closing: true,
                },
                Token::EndTag("p".into()),
                Token::Comment(" c ".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_raw_text_and_stray_brackets() {
        let tokens = tokenize("<script>if (a < b) {}</script>1 < 2");
        assert_eq!(
            tokens,
            vec![
                Token::StartTag {
                    name: "script".into(),
                    attributes: vec![],
                    self_closing: false,
                },
                Token::Text("if (a < b) {}".into()),
                Token::EndTag("script".into()),
                Token::Text("1 < 2".into()),
            ]
        );
        assert_eq!(
            tokenize("<!DOCTYPE html>"),
            vec![Token::Doctype("html".into())]
        );
    }

    #[test]
    fn test_parse_kinds_and_markers() {
        let mut tree = ViewTree::new();
        let parsed = parse(
            &mut tree,
            "<container:p>fo{o</container:p><container:p><attribute:b>ba}r</attribute:b></container:p>",
        );
        let first = tree.child(parsed.root, 0).unwrap();
        let second = tree.child(parsed.root, 1).unwrap();
        let b = tree.child(second, 0).unwrap();

        assert_eq!(tree.element_kind(first), Some(ElementKind::Container));
        assert_eq!(tree.element_kind(b), Some(ElementKind::Attribute));
        assert_eq!(tree.name(b), Some("b"));

        let foo = tree.child(first, 0).unwrap();
        let bar = tree.child(b, 0).unwrap();
        assert_eq!(tree.text_data(foo), Some("foo"));
        assert_eq!(
            parsed.selection,
            Some(Range::new(Position::new(foo, 2), Position::new(bar, 2)))
        );
    }

    #[test]
    fn test_parse_element_markers_and_collapsed() {
        let mut tree = ViewTree::new();
        let parsed = parse(&mut tree, "<container:p>foo[]<empty:img></empty:img>bar</container:p>");
        let p = tree.child(parsed.root, 0).unwrap();
        assert_eq!(tree.child_count(p), 3);
        assert_eq!(parsed.selection, Some(Range::collapsed(Position::new(p, 1))));

        let parsed = parse(&mut tree, "<container:p>x{</container:p>");
        let p = tree.child(parsed.root, 0).unwrap();
        let x = tree.child(p, 0).unwrap();
        assert_eq!(parsed.selection, Some(Range::collapsed(Position::new(x, 1))));
    }

    #[test]
    fn test_stringify_round_trip() {
        let markup = "<p>fo{o</p><p><b class=\"x\">ba}r</b><img></img></p>";
        let mut tree = ViewTree::new();
        let parsed = parse(&mut tree, markup);
        assert_eq!(
            stringify(&tree, parsed.root, parsed.selection.as_ref()),
            markup
        );
    }

    #[test]
    fn test_attribute_quotes_survive_round_trip() {
        let mut tree = ViewTree::new();
        let root = tree.create_document_fragment();
        let span = tree.create_element_with_attributes(
            ElementKind::Generic,
            "span",
            [("title", "say \"hi\" & go")],
        );
        tree.append_child(root, span);

        let markup = stringify(&tree, root, None);
        assert_eq!(markup, "<span title=\"say &quot;hi&quot; &amp; go\"></span>");

        let mut reparsed = ViewTree::new();
        let parsed = parse(&mut reparsed, &markup);
        let span = reparsed.child(parsed.root, 0).unwrap();
        assert_eq!(reparsed.attribute(span, "title"), Some("say \"hi\" & go"));
    }

    #[test]
    fn test_stringify_with_types() {
        let mut tree = ViewTree::new();
        let parsed = parse(
            &mut tree,
            "<container:p>[<attribute:b>x</attribute:b>]<!--note--></container:p>",
        );
        insta::assert_snapshot!(
            stringify_with(
                &tree,
                parsed.root,
                parsed.selection.as_ref(),
                StringifyOptions { show_type: true },
            ),
            @"<container:p>[<attribute:b>x</attribute:b>]<!--note--></container:p>"
        );
    }
}
