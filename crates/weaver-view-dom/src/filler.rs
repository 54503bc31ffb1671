//! Block and inline fillers.
//!
//! An empty block collapses to nothing in a browser, so the converter puts a
//! block filler inside it. The inline filler is a run of invisible
//! characters the renderer keeps in front of a caret placed where the
//! browser would otherwise refuse to put one.

use crate::dom::{DomDocument, DomNodeId};

pub const NBSP: char = '\u{a0}';

/// Seven zero-width word joiners.
pub const INLINE_FILLER: &str = "\u{2060}\u{2060}\u{2060}\u{2060}\u{2060}\u{2060}\u{2060}";

/// Length of [`INLINE_FILLER`] in characters.
pub const INLINE_FILLER_LENGTH: usize = 7;

pub const FILLER_ATTRIBUTE: &str = "data-cke-filler";

/// `<br data-cke-filler="true">`
pub fn br_filler(dom: &mut DomDocument) -> DomNodeId {
    dom.create_element_with_attributes("br", [(FILLER_ATTRIBUTE, "true")])
}

/// A lone non-breaking space.
pub fn nbsp_filler(dom: &mut DomDocument) -> DomNodeId {
    dom.create_text(NBSP.to_string())
}

/// `<span data-cke-filler="true">&nbsp;</span>`
pub fn marked_nbsp_filler(dom: &mut DomDocument) -> DomNodeId {
    let span = dom.create_element_with_attributes("span", [(FILLER_ATTRIBUTE, "true")]);
    let nbsp = nbsp_filler(dom);
    dom.append_child(span, nbsp);
    span
}

/// True for text nodes whose data begins with the inline filler.
pub fn starts_with_filler(dom: &DomDocument, node: DomNodeId) -> bool {
    dom.text_data(node)
        .is_some_and(|data| data.starts_with(INLINE_FILLER))
}

/// True for text nodes holding nothing but the inline filler.
pub fn is_inline_filler(dom: &DomDocument, node: DomNodeId) -> bool {
    dom.text_data(node) == Some(INLINE_FILLER)
}

/// Text data with a leading inline filler removed.
pub fn get_data_without_filler(dom: &DomDocument, node: DomNodeId) -> String {
    let data = dom.text_data(node).unwrap_or_default();
    data.strip_prefix(INLINE_FILLER).unwrap_or(data).to_string()
}

fn has_only_filler_marker(dom: &DomDocument, node: DomNodeId) -> bool {
    dom.attribute_names(node).len() == 1 && dom.get_attribute(node, FILLER_ATTRIBUTE) == Some("true")
}

/// Structurally equal to [`br_filler`].
pub fn is_br_filler(dom: &DomDocument, node: DomNodeId) -> bool {
    dom.is_element_named(node, "br") && has_only_filler_marker(dom, node) && dom.child_count(node) == 0
}

/// Structurally equal to [`marked_nbsp_filler`].
pub fn is_marked_nbsp_filler(dom: &DomDocument, node: DomNodeId) -> bool {
    dom.is_element_named(node, "span")
        && has_only_filler_marker(dom, node)
        && dom.child_count(node) == 1
        && dom.first_child(node).and_then(|c| dom.text_data(c)) == Some("\u{a0}")
}

/// A lone `&nbsp;` text that is the only child of a block element.
pub fn is_nbsp_block_filler(dom: &DomDocument, node: DomNodeId, block_elements: &[String]) -> bool {
    dom.text_data(node) == Some("\u{a0}")
        && dom.previous_sibling(node).is_none()
        && dom.next_sibling(node).is_none()
        && has_block_parent(dom, node, block_elements)
}

pub fn has_block_parent(dom: &DomDocument, node: DomNodeId, block_elements: &[String]) -> bool {
    dom.parent(node)
        .and_then(|parent| dom.local_name(parent))
        .is_some_and(|name| block_elements.iter().any(|block| block == name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_filler_helpers() {
        let mut dom = DomDocument::new();
        let filler = dom.create_text(INLINE_FILLER);
        let prefixed = dom.create_text(format!("{INLINE_FILLER}foo"));
        let plain = dom.create_text("foo");

        assert!(is_inline_filler(&dom, filler));
        assert!(!is_inline_filler(&dom, prefixed));
        assert!(starts_with_filler(&dom, prefixed));
        assert!(!starts_with_filler(&dom, plain));
        assert_eq!(get_data_without_filler(&dom, prefixed), "foo");
        assert_eq!(get_data_without_filler(&dom, filler), "");
        assert_eq!(INLINE_FILLER.chars().count(), INLINE_FILLER_LENGTH);
    }

    #[test]
    fn test_block_filler_shapes() {
        let mut dom = DomDocument::new();
        let br = br_filler(&mut dom);
        let marked = marked_nbsp_filler(&mut dom);
        assert!(is_br_filler(&dom, br));
        assert!(is_marked_nbsp_filler(&dom, marked));
        assert_eq!(dom.outer_html(br), "<br data-cke-filler=\"true\">");
        assert_eq!(
            dom.outer_html(marked),
            "<span data-cke-filler=\"true\">&nbsp;</span>"
        );

        let blocks = vec!["p".to_string()];
        let p = dom.create_element("p");
        let nbsp = nbsp_filler(&mut dom);
        dom.append_child(p, nbsp);
        assert!(is_nbsp_block_filler(&dom, nbsp, &blocks));

        let span = dom.create_element("span");
        let other = nbsp_filler(&mut dom);
        dom.append_child(span, other);
        assert!(!is_nbsp_block_filler(&dom, other, &blocks));
    }
}
