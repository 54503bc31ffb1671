//! In-memory rendering tree modelled on the browser DOM.
//!
//! The converter only needs a small slice of the DOM: elements with ordered
//! attributes, text, comments and fragments, boundary points for ranges and
//! selections, and `innerHTML` in both directions.

use std::cmp::Ordering;

use smol_str::SmolStr;
use weaver_view::markup::{RAW_TEXT_ELEMENTS, VOID_ELEMENTS};
use weaver_view::char_len;

use crate::html;

/// Handle to a node stored in a [`DomDocument`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomNodeId(u32);

impl DomNodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomNodeData {
    /// `tag` keeps the case it was created with; `local_name` is lowercase.
    Element {
        tag: SmolStr,
        local_name: SmolStr,
        attributes: Vec<(SmolStr, String)>,
    },
    Text(String),
    Comment(String),
    Fragment,
}

#[derive(Clone, Debug)]
struct DomEntry {
    parent: Option<DomNodeId>,
    children: Vec<DomNodeId>,
    data: DomNodeData,
}

/// A boundary point: a node and an offset inside it (characters for text,
/// children otherwise).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DomPoint {
    pub node: DomNodeId,
    pub offset: usize,
}

impl DomPoint {
    pub fn new(node: DomNodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DomRange {
    pub start: DomPoint,
    pub end: DomPoint,
}

impl DomRange {
    pub fn new(start: DomPoint, end: DomPoint) -> Self {
        Self { start, end }
    }

    pub fn collapsed(point: DomPoint) -> Self {
        Self::new(point, point)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Browser-like selection: anchor and focus plus the ranges they span.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DomSelection {
    pub anchor: Option<DomPoint>,
    pub focus: Option<DomPoint>,
    pub ranges: Vec<DomRange>,
}

impl DomSelection {
    /// Selection from `anchor` to `focus`; its range is always ordered.
    pub fn new(dom: &DomDocument, anchor: DomPoint, focus: DomPoint) -> Self {
        let range = match dom.compare_points(anchor, focus) {
            Some(Ordering::Greater) => DomRange::new(focus, anchor),
            _ => DomRange::new(anchor, focus),
        };
        Self {
            anchor: Some(anchor),
            focus: Some(focus),
            ranges: vec![range],
        }
    }

    pub fn collapsed(point: DomPoint) -> Self {
        Self {
            anchor: Some(point),
            focus: Some(point),
            ranges: vec![DomRange::collapsed(point)],
        }
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

#[derive(Clone, Debug, Default)]
pub struct DomDocument {
    nodes: Vec<DomEntry>,
}

impl DomDocument {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, data: DomNodeData) -> DomNodeId {
        let id = DomNodeId(self.nodes.len() as u32);
        self.nodes.push(DomEntry {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    fn entry(&self, node: DomNodeId) -> &DomEntry {
        &self.nodes[node.index()]
    }

    fn entry_mut(&mut self, node: DomNodeId) -> &mut DomEntry {
        &mut self.nodes[node.index()]
    }

    // === Construction ===

    pub fn create_element(&mut self, tag: &str) -> DomNodeId {
        self.push(DomNodeData::Element {
            tag: tag.into(),
            local_name: tag.to_ascii_lowercase().into(),
            attributes: Vec::new(),
        })
    }

    pub fn create_element_with_attributes<'a>(
        &mut self,
        tag: &str,
        attributes: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> DomNodeId {
        let element = self.create_element(tag);
        for (key, value) in attributes {
            self.set_attribute(element, key, value);
        }
        element
    }

    pub fn create_text(&mut self, data: impl Into<String>) -> DomNodeId {
        self.push(DomNodeData::Text(data.into()))
    }

    pub fn create_comment(&mut self, data: impl Into<String>) -> DomNodeId {
        self.push(DomNodeData::Comment(data.into()))
    }

    pub fn create_fragment(&mut self) -> DomNodeId {
        self.push(DomNodeData::Fragment)
    }

    // === Inspection ===

    pub fn data(&self, node: DomNodeId) -> &DomNodeData {
        &self.entry(node).data
    }

    pub fn is_element(&self, node: DomNodeId) -> bool {
        matches!(self.entry(node).data, DomNodeData::Element { .. })
    }

    pub fn is_text(&self, node: DomNodeId) -> bool {
        matches!(self.entry(node).data, DomNodeData::Text(_))
    }

    pub fn is_comment(&self, node: DomNodeId) -> bool {
        matches!(self.entry(node).data, DomNodeData::Comment(_))
    }

    pub fn is_fragment(&self, node: DomNodeId) -> bool {
        matches!(self.entry(node).data, DomNodeData::Fragment)
    }

    /// Tag name as created.
    pub fn tag_name(&self, node: DomNodeId) -> Option<&str> {
        match &self.entry(node).data {
            DomNodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Lowercase tag name.
    pub fn local_name(&self, node: DomNodeId) -> Option<&str> {
        match &self.entry(node).data {
            DomNodeData::Element { local_name, .. } => Some(local_name),
            _ => None,
        }
    }

    pub fn is_element_named(&self, node: DomNodeId, name: &str) -> bool {
        self.local_name(node) == Some(name)
    }

    pub fn text_data(&self, node: DomNodeId) -> Option<&str> {
        match &self.entry(node).data {
            DomNodeData::Text(data) => Some(data),
            _ => None,
        }
    }

    pub fn comment_data(&self, node: DomNodeId) -> Option<&str> {
        match &self.entry(node).data {
            DomNodeData::Comment(data) => Some(data),
            _ => None,
        }
    }

    /// Replace the data of a text or comment node.
    pub fn set_text_data(&mut self, node: DomNodeId, value: impl Into<String>) {
        match &mut self.entry_mut(node).data {
            DomNodeData::Text(data) | DomNodeData::Comment(data) => *data = value.into(),
            _ => {}
        }
    }

    pub fn get_attribute(&self, node: DomNodeId, key: &str) -> Option<&str> {
        match &self.entry(node).data {
            DomNodeData::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn has_attribute(&self, node: DomNodeId, key: &str) -> bool {
        self.get_attribute(node, key).is_some()
    }

    pub fn attribute_names(&self, node: DomNodeId) -> Vec<SmolStr> {
        match &self.entry(node).data {
            DomNodeData::Element { attributes, .. } => {
                attributes.iter().map(|(k, _)| k.clone()).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn attributes(&self, node: DomNodeId) -> impl Iterator<Item = (&str, &str)> {
        let attributes: &[(SmolStr, String)] = match &self.entry(node).data {
            DomNodeData::Element { attributes, .. } => attributes,
            _ => &[],
        };
        attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn set_attribute(&mut self, node: DomNodeId, key: &str, value: &str) {
        if let DomNodeData::Element { attributes, .. } = &mut self.entry_mut(node).data {
            match attributes.iter_mut().find(|(k, _)| k == key) {
                Some((_, v)) => *v = value.to_string(),
                None => attributes.push((key.into(), value.to_string())),
            }
        }
    }

    pub fn remove_attribute(&mut self, node: DomNodeId, key: &str) {
        if let DomNodeData::Element { attributes, .. } = &mut self.entry_mut(node).data {
            attributes.retain(|(k, _)| k != key);
        }
    }

    // === Structure ===

    pub fn parent(&self, node: DomNodeId) -> Option<DomNodeId> {
        self.entry(node).parent
    }

    pub fn children(&self, node: DomNodeId) -> &[DomNodeId] {
        &self.entry(node).children
    }

    pub fn child(&self, node: DomNodeId, index: usize) -> Option<DomNodeId> {
        self.entry(node).children.get(index).copied()
    }

    pub fn child_count(&self, node: DomNodeId) -> usize {
        self.entry(node).children.len()
    }

    pub fn first_child(&self, node: DomNodeId) -> Option<DomNodeId> {
        self.entry(node).children.first().copied()
    }

    pub fn last_child(&self, node: DomNodeId) -> Option<DomNodeId> {
        self.entry(node).children.last().copied()
    }

    /// Characters for text and comments, children otherwise.
    pub fn length(&self, node: DomNodeId) -> usize {
        match &self.entry(node).data {
            DomNodeData::Text(data) | DomNodeData::Comment(data) => char_len(data),
            _ => self.child_count(node),
        }
    }

    pub fn index_of(&self, node: DomNodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|c| *c == node)
    }

    pub fn next_sibling(&self, node: DomNodeId) -> Option<DomNodeId> {
        let parent = self.parent(node)?;
        self.child(parent, self.index_of(node)? + 1)
    }

    pub fn previous_sibling(&self, node: DomNodeId) -> Option<DomNodeId> {
        let parent = self.parent(node)?;
        let index = self.index_of(node)?;
        index.checked_sub(1).and_then(|i| self.child(parent, i))
    }

    /// Ancestors of `node`, root first, not including `node`.
    pub fn ancestors(&self, node: DomNodeId) -> Vec<DomNodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(node);
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.parent(parent);
        }
        ancestors.reverse();
        ancestors
    }

    /// Descendants of `node` in document order, not including `node`.
    pub fn descendants(&self, node: DomNodeId) -> Vec<DomNodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<DomNodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    pub fn root(&self, node: DomNodeId) -> DomNodeId {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Inclusive descendant check, like `Node.contains`.
    pub fn contains(&self, ancestor: DomNodeId, node: DomNodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    // === Mutation ===

    /// Insert `child` before `reference` (or at the end). Inserting a
    /// fragment moves its children instead.
    pub fn insert_before(&mut self, parent: DomNodeId, child: DomNodeId, reference: Option<DomNodeId>) {
        if self.is_text(parent) || self.is_comment(parent) {
            tracing::warn!(?parent, "insert_before: character data cannot have children");
            return;
        }
        if self.contains(child, parent) {
            tracing::warn!(?parent, ?child, "insert_before: refusing to create a cycle");
            return;
        }

        let moved = if self.is_fragment(child) {
            std::mem::take(&mut self.entry_mut(child).children)
        } else {
            self.remove(child);
            vec![child]
        };

        let mut at = reference
            .and_then(|r| self.children(parent).iter().position(|c| *c == r))
            .unwrap_or(self.child_count(parent));
        for node in moved {
            self.entry_mut(node).parent = Some(parent);
            self.entry_mut(parent).children.insert(at, node);
            at += 1;
        }
    }

    pub fn append_child(&mut self, parent: DomNodeId, child: DomNodeId) {
        self.insert_before(parent, child, None);
    }

    pub fn remove(&mut self, node: DomNodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        self.entry_mut(parent).children.retain(|c| *c != node);
        self.entry_mut(node).parent = None;
    }

    pub fn remove_children(&mut self, node: DomNodeId) {
        for child in std::mem::take(&mut self.entry_mut(node).children) {
            self.entry_mut(child).parent = None;
        }
    }

    /// Put `replacement` where `node` is and detach `node`.
    pub fn replace_with(&mut self, node: DomNodeId, replacement: DomNodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        self.insert_before(parent, replacement, Some(node));
        self.remove(node);
    }

    // === Comparison ===

    /// Deep structural equality, like `Node.isEqualNode`.
    pub fn is_equal_node(&self, a: DomNodeId, b: DomNodeId) -> bool {
        let (a_entry, b_entry) = (self.entry(a), self.entry(b));
        let same_data = match (&a_entry.data, &b_entry.data) {
            (
                DomNodeData::Element {
                    tag: a_tag,
                    attributes: a_attrs,
                    ..
                },
                DomNodeData::Element {
                    tag: b_tag,
                    attributes: b_attrs,
                    ..
                },
            ) => {
                a_tag == b_tag
                    && a_attrs.len() == b_attrs.len()
                    && a_attrs.iter().all(|attr| b_attrs.contains(attr))
            }
            (a_data, b_data) => a_data == b_data,
        };
        same_data
            && a_entry.children.len() == b_entry.children.len()
            && a_entry
                .children
                .iter()
                .zip(&b_entry.children)
                .all(|(x, y)| self.is_equal_node(*x, *y))
    }

    fn path(&self, point: DomPoint) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = point.node;
        while let Some(index) = self.index_of(current) {
            path.push(index);
            current = match self.parent(current) {
                Some(parent) => parent,
                None => break,
            };
        }
        path.reverse();
        path.push(point.offset);
        path
    }

    /// Tree order of two boundary points; `None` when they are in different trees.
    pub fn compare_points(&self, a: DomPoint, b: DomPoint) -> Option<Ordering> {
        if self.root(a.node) != self.root(b.node) {
            return None;
        }
        Some(self.path(a).cmp(&self.path(b)))
    }

    // === Serialization ===

    pub fn inner_html(&self, node: DomNodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.serialize(*child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, node: DomNodeId) -> String {
        let mut out = String::new();
        self.serialize(node, &mut out);
        out
    }

    /// Replace the children of `node` with parsed `markup`.
    pub fn set_inner_html(&mut self, node: DomNodeId, markup: &str) {
        self.remove_children(node);
        let fragment = html::parse_fragment(self, markup);
        self.append_child(node, fragment);
    }

    fn serialize(&self, node: DomNodeId, out: &mut String) {
        match &self.entry(node).data {
            DomNodeData::Text(data) => {
                let raw_text_parent = self
                    .parent(node)
                    .and_then(|p| self.local_name(p))
                    .is_some_and(|name| RAW_TEXT_ELEMENTS.contains(&name));
                if raw_text_parent {
                    out.push_str(data);
                } else {
                    out.push_str(&escape_text(data));
                }
            }
            DomNodeData::Comment(data) => {
                out.push_str("<!--");
                out.push_str(data);
                out.push_str("-->");
            }
            DomNodeData::Fragment => {
                for child in self.children(node) {
                    self.serialize(*child, out);
                }
            }
            DomNodeData::Element {
                tag,
                local_name,
                attributes,
            } => {
                out.push('<');
                out.push_str(tag);
                for (key, value) in attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&local_name.as_str()) {
                    return;
                }
                for child in self.children(node) {
                    self.serialize(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn escape_text(data: &str) -> String {
    html_escape::encode_text(data).replace('\u{a0}', "&nbsp;")
}

fn escape_attribute(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).replace('\u{a0}', "&nbsp;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_insertion_moves_children() {
        let mut dom = DomDocument::new();
        let p = dom.create_element("p");
        let fragment = dom.create_fragment();
        let a = dom.create_text("a");
        let b = dom.create_element("b");
        dom.append_child(fragment, a);
        dom.append_child(fragment, b);

        dom.append_child(p, fragment);
        assert_eq!(dom.children(p), &[a, b]);
        assert_eq!(dom.child_count(fragment), 0);
        assert_eq!(dom.parent(b), Some(p));
    }

    #[test]
    fn test_replace_with_keeps_position() {
        let mut dom = DomDocument::new();
        let p = dom.create_element("p");
        let a = dom.create_text("a");
        let script = dom.create_element("script");
        let c = dom.create_text("c");
        for child in [a, script, c] {
            dom.append_child(p, child);
        }
        let span = dom.create_element("span");
        dom.replace_with(script, span);
        assert_eq!(dom.children(p), &[a, span, c]);
        assert_eq!(dom.parent(script), None);
    }

    #[test]
    fn test_serialization_escapes() {
        let mut dom = DomDocument::new();
        let p = dom.create_element_with_attributes("p", [("title", "a \"b\" & c")]);
        let text = dom.create_text("x < y\u{a0}z");
        let br = dom.create_element("br");
        dom.append_child(p, text);
        dom.append_child(p, br);
        assert_eq!(
            dom.outer_html(p),
            "<p title=\"a &quot;b&quot; &amp; c\">x &lt; y&nbsp;z<br></p>"
        );
    }

    #[test]
    fn test_compare_points() {
        let mut dom = DomDocument::new();
        let div = dom.create_element("div");
        let p = dom.create_element("p");
        let text = dom.create_text("abc");
        dom.append_child(div, p);
        dom.append_child(p, text);

        assert_eq!(
            dom.compare_points(DomPoint::new(text, 1), DomPoint::new(div, 1)),
            Some(Ordering::Less)
        );
        assert_eq!(
            dom.compare_points(DomPoint::new(p, 0), DomPoint::new(text, 0)),
            Some(Ordering::Less)
        );
        let other = dom.create_element("p");
        assert_eq!(
            dom.compare_points(DomPoint::new(p, 0), DomPoint::new(other, 0)),
            None
        );
    }

    #[test]
    fn test_is_equal_node_ignores_attribute_order() {
        let mut dom = DomDocument::new();
        let a = dom.create_element_with_attributes("span", [("a", "1"), ("b", "2")]);
        let b = dom.create_element_with_attributes("span", [("b", "2"), ("a", "1")]);
        assert!(dom.is_equal_node(a, b));
        let text = dom.create_text("x");
        dom.append_child(a, text);
        assert!(!dom.is_equal_node(a, b));
    }
}
