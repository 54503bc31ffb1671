//! Identity maps between view and DOM nodes.

use weaver_view::{NodeId, Selection, ViewTree};

use super::DomConverter;
use crate::dom::{DomDocument, DomNodeId};
use crate::filler::is_inline_filler;

impl DomConverter {
    pub fn bind_elements(&mut self, dom_element: DomNodeId, view_element: NodeId) {
        self.dom_to_view_mapping.insert(dom_element, view_element);
        self.view_to_dom_mapping.insert(view_element, dom_element);
    }

    pub fn bind_document_fragments(&mut self, dom_fragment: DomNodeId, view_fragment: NodeId) {
        self.dom_to_view_mapping.insert(dom_fragment, view_fragment);
        self.view_to_dom_mapping.insert(view_fragment, dom_fragment);
    }

    /// Remove the binding of `dom_element` and of every bound descendant.
    pub fn unbind_dom_element(&mut self, dom: &DomDocument, dom_element: DomNodeId) {
        let Some(view_element) = self.dom_to_view_mapping.remove(&dom_element) else {
            return;
        };
        self.view_to_dom_mapping.remove(&view_element);
        tracing::trace!(?dom_element, ?view_element, "unbind_dom_element");

        for child in dom.children(dom_element) {
            self.unbind_dom_element(dom, *child);
        }
    }

    /// Remember that `dom_element` displays `selection` as a fake selection.
    pub fn bind_fake_selection(&mut self, dom_element: DomNodeId, selection: &Selection) {
        self.fake_selection_mapping
            .insert(dom_element, selection.clone());
    }

    pub fn fake_selection_to_view(&self, dom_element: DomNodeId) -> Option<&Selection> {
        self.fake_selection_mapping.get(&dom_element)
    }

    pub fn map_view_to_dom(&self, view_node: NodeId) -> Option<DomNodeId> {
        self.view_to_dom_mapping.get(&view_node).copied()
    }

    /// The view element or fragment bound to `dom_node`. Anything inside a
    /// UI or raw element maps to that element.
    pub fn map_dom_to_view(&self, view: &ViewTree, dom: &DomDocument, dom_node: DomNodeId) -> Option<NodeId> {
        self.get_host_view_element(view, dom, dom_node)
            .or_else(|| self.dom_to_view_mapping.get(&dom_node).copied())
    }

    /// Nearest bound ancestor of `dom_node` that is a UI or raw element.
    pub fn get_host_view_element(&self, view: &ViewTree, dom: &DomDocument, dom_node: DomNodeId) -> Option<NodeId> {
        dom.ancestors(dom_node)
            .into_iter()
            .rev()
            .filter_map(|ancestor| self.dom_to_view_mapping.get(&ancestor).copied())
            .find(|view_node| view.is_host_element(*view_node))
    }

    /// DOM text rendered for `view_text`, found through its bound previous
    /// sibling or bound parent.
    pub fn find_corresponding_dom_text(
        &self,
        view: &ViewTree,
        dom: &DomDocument,
        view_text: NodeId,
    ) -> Option<DomNodeId> {
        let candidate = match view.previous_sibling(view_text) {
            Some(previous) => dom.next_sibling(self.map_view_to_dom(previous)?),
            None => dom.first_child(self.map_view_to_dom(view.parent(view_text)?)?),
        }?;
        dom.is_text(candidate).then_some(candidate)
    }

    /// View text displayed by `dom_text`. Text inside a UI or raw element
    /// resolves to that element; the inline filler resolves to nothing.
    pub fn find_corresponding_view_text(
        &self,
        view: &ViewTree,
        dom: &DomDocument,
        dom_text: DomNodeId,
    ) -> Option<NodeId> {
        if is_inline_filler(dom, dom_text) {
            return None;
        }

        if let Some(host) = self.get_host_view_element(view, dom, dom_text) {
            return Some(host);
        }

        let candidate = match dom.previous_sibling(dom_text) {
            Some(previous) => {
                // A text or comment before us has no binding to go through.
                if !dom.is_element(previous) {
                    return None;
                }
                view.next_sibling(self.map_dom_to_view(view, dom, previous)?)
            }
            None => view.child(self.map_dom_to_view(view, dom, dom.parent(dom_text)?)?, 0),
        }?;
        view.is_text(candidate).then_some(candidate)
    }
}
