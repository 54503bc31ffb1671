//! Whitespace handling between view text and rendered text.
//!
//! View text keeps spaces as typed. A browser collapses runs of spaces and
//! drops spaces at block edges, so rendered text carries `&nbsp;` wherever a
//! plain space would be lost. Reading the DOM back undoes that: it collapses
//! whitespace the way a browser displays it and turns the padding `&nbsp;`
//! characters back into spaces.

use std::sync::LazyLock;

use regex::Regex;
use weaver_view::{Direction, ElementKind, Item, NodeId, Position, ViewTree, WalkerOptions};

use super::DomConverter;
use crate::dom::{DomDocument, DomNodeId};
use crate::filler::{INLINE_FILLER, NBSP, get_data_without_filler, starts_with_filler};

static COLLAPSIBLE_WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \n\t\r]+").unwrap());

static TRAILING_DOUBLE_NBSP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[ \u{a0}]\u{a0}$").unwrap());

fn text_node(item: Item) -> NodeId {
    match item {
        Item::Node(node) => node,
        Item::TextProxy(proxy) => proxy.text,
    }
}

impl DomConverter {
    // === View to DOM ===

    fn has_preformatted_view_ancestor(&self, view: &ViewTree, item: Item) -> bool {
        view.ancestors(text_node(item))
            .iter()
            .any(|ancestor| view.name(*ancestor).is_some_and(|name| self.config.is_preformatted_element(name)))
    }

    pub(crate) fn is_inline_object_view_element(&self, view: &ViewTree, element: NodeId) -> bool {
        view.name(element)
            .is_some_and(|name| self.config.is_inline_object_element(name))
            || self.inline_object_matcher.matches(view, element)
    }

    /// Text to render for a view text node or proxy.
    ///
    /// A space at either edge that the browser would drop, and the second
    /// space of every pair, become `&nbsp;`.
    pub(crate) fn process_data_from_view_text(&self, view: &ViewTree, item: Item) -> String {
        let data = item.data(view);
        if self.has_preformatted_view_ancestor(view, item) {
            return data.to_string();
        }

        let mut chars: Vec<char> = data.chars().collect();

        if chars.first() == Some(&' ') {
            let previous = self.touching_inline_view_node(view, item, Direction::Backward);
            let previous_ends_with_space = previous.is_some_and(|previous| {
                previous.is_text_like(view) && self.view_node_ends_with_space(view, previous)
            });
            if previous_ends_with_space || previous.is_none() {
                chars[0] = NBSP;
            }
        }

        if chars.last() == Some(&' ') {
            let next = self.touching_inline_view_node(view, item, Direction::Forward);
            let next_starts_with_space = next.is_some_and(|next| {
                next.is_text_like(view) && next.data(view).starts_with(' ')
            });
            let before_last_is_space = chars.len() >= 2 && chars[chars.len() - 2] == ' ';
            if before_last_is_space || next.is_none() || next_starts_with_space {
                if let Some(last) = chars.last_mut() {
                    *last = NBSP;
                }
            }
        }

        chars.into_iter().collect::<String>().replace("  ", " \u{a0}")
    }

    fn view_node_ends_with_space(&self, view: &ViewTree, item: Item) -> bool {
        if self.has_preformatted_view_ancestor(view, item) {
            return false;
        }
        self.process_data_from_view_text(view, item).ends_with(' ')
    }

    /// Nearest text or inline object next to `item` within the same block.
    ///
    /// Container elements and `<br>` end the search.
    pub(crate) fn touching_inline_view_node(
        &self,
        view: &ViewTree,
        item: Item,
        direction: Direction,
    ) -> Option<Item> {
        let start = match direction {
            Direction::Forward => Position::after(view, item),
            Direction::Backward => Position::before(view, item),
        }
        .ok()?;
        let options = WalkerOptions {
            direction,
            ..Default::default()
        };

        for value in start.get_walker(view, options) {
            match value.item {
                Item::Node(node) if view.is_element(node) => {
                    if self.is_inline_object_view_element(view, node) {
                        return Some(value.item);
                    }
                    if view.element_kind(node).is_some_and(ElementKind::is_container)
                        || view.is_element_named(node, "br")
                    {
                        return None;
                    }
                }
                other if other.is_text_like(view) => return Some(other),
                _ => {}
            }
        }
        None
    }

    // === DOM to view ===

    fn is_preformatted_dom_text(&self, dom: &DomDocument, node: DomNodeId) -> bool {
        dom.ancestors(node).iter().any(|ancestor| {
            dom.local_name(*ancestor)
                .is_some_and(|name| self.config.is_preformatted_element(name))
        })
    }

    pub(crate) fn is_inline_object_dom_element(&self, dom: &DomDocument, node: DomNodeId) -> bool {
        let Some(name) = dom.local_name(node) else {
            return false;
        };
        if self.config.is_inline_object_element(name) {
            return true;
        }
        if self.inline_object_matcher.is_empty() {
            return false;
        }
        // Patterns match view elements, so test a shallow view copy.
        let mut scratch = ViewTree::new();
        let element = scratch.create_element_with_attributes(ElementKind::Generic, name, dom.attributes(node));
        self.inline_object_matcher.matches(&scratch, element)
    }

    /// View text for a DOM text node. Empty when the text only holds
    /// whitespace the browser would not display.
    pub(crate) fn process_data_from_dom_text(&self, dom: &DomDocument, node: DomNodeId) -> String {
        if self.is_preformatted_dom_text(dom, node) {
            return get_data_without_filler(dom, node);
        }

        let raw = dom.text_data(node).unwrap_or_default();
        let mut data = COLLAPSIBLE_WHITESPACE_RE.replace_all(raw, " ").into_owned();

        let previous = self.touching_inline_dom_node(dom, node, Direction::Backward);
        let next = self.touching_inline_dom_node(dom, node, Direction::Forward);

        let left_trim = self.should_left_trim_dom_text(dom, node, previous);
        let right_trim = next.is_none() && !starts_with_filler(dom, node);

        if left_trim && data.starts_with(' ') {
            data.remove(0);
        }
        if right_trim && data.ends_with(' ') {
            data.pop();
        }

        // The filler goes only after trimming so the spaces around it are kept.
        if let Some(stripped) = data.strip_prefix(INLINE_FILLER) {
            data = stripped.to_string();
        }

        let mut data = data.replace(" \u{a0}", "  ");

        let next_is_inline_object = next.is_some_and(|next| dom.is_element(next) && !dom.is_element_named(next, "br"));
        let next_starts_with_space = next.is_some_and(|next| {
            dom.text_data(next)
                .is_some_and(|text| text.starts_with(' '))
        });
        if (TRAILING_DOUBLE_NBSP_RE.is_match(&data)
            || next.is_none()
            || next_is_inline_object
            || next_starts_with_space)
            && data.ends_with(NBSP)
        {
            data.pop();
            data.push(' ');
        }

        let previous_is_inline_object =
            previous.is_some_and(|previous| dom.is_element(previous) && !dom.is_element_named(previous, "br"));
        if (left_trim || previous_is_inline_object) && data.starts_with(NBSP) {
            data.replace_range(..NBSP.len_utf8(), " ");
        }

        data
    }

    fn should_left_trim_dom_text(&self, dom: &DomDocument, node: DomNodeId, previous: Option<DomNodeId>) -> bool {
        let Some(previous) = previous else {
            return true;
        };
        if dom.is_element(previous) {
            return dom.is_element_named(previous, "br");
        }
        if dom
            .previous_sibling(node)
            .is_some_and(|sibling| self.encountered_raw_content.contains(&sibling))
        {
            return false;
        }
        dom.text_data(previous)
            .and_then(|text| text.chars().last())
            .is_some_and(|last| last.is_whitespace() && last != NBSP)
    }

    /// Nearest text, `<br>` or inline object next to `node`, stepping into
    /// and out of inline elements. A block element ends the search.
    pub(crate) fn touching_inline_dom_node(
        &self,
        dom: &DomDocument,
        node: DomNodeId,
        direction: Direction,
    ) -> Option<DomNodeId> {
        dom.parent(node)?;

        let forward = direction == Direction::Forward;
        let mut skip_children = true;
        let mut current = node;

        loop {
            let step_into = if forward {
                dom.first_child(current)
            } else {
                dom.last_child(current)
            };
            let step_over = if forward {
                dom.next_sibling(current)
            } else {
                dom.previous_sibling(current)
            };

            current = match (skip_children, step_into, step_over) {
                (false, Some(child), _) => child,
                (_, _, Some(sibling)) => {
                    skip_children = false;
                    sibling
                }
                _ => {
                    skip_children = true;
                    dom.parent(current)?
                }
            };

            if self.is_block_element(dom, current) {
                return None;
            }
            if dom.is_text(current)
                || dom.is_element_named(current, "br")
                || self.is_inline_object_dom_element(dom, current)
            {
                return Some(current);
            }
        }
    }
}
