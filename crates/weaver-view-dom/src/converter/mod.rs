//! Conversion between the view tree and the rendering tree.
//!
//! The converter creates nodes in both directions, keeps the identity maps
//! between view and DOM elements, and translates positions and selections.
//! Text nodes are never bound; their counterparts are found through bound
//! siblings or parents.

mod bindings;
mod safety;
mod whitespace;


use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use weaver_view::{
    ElementKind, Item, Matcher, NodeData, NodeId, Pattern, Position, Range, Selection,
    SelectionOptions, ViewTree,
};

use crate::config::{BlockFillerMode, ConverterConfig, RenderingMode};
use crate::dom::{DomDocument, DomNodeId, DomPoint, DomRange, DomSelection};
use crate::filler::{
    self, INLINE_FILLER_LENGTH, br_filler, is_inline_filler, marked_nbsp_filler, nbsp_filler,
    starts_with_filler,
};

pub use safety::{
    UNSAFE_ATTRIBUTE_NAME_PREFIX, UNSAFE_ELEMENT_REPLACEMENT_ATTRIBUTE, is_valid_attribute_name,
};

/// Custom property holding serialized content of raw and comment elements.
pub const RAW_CONTENT_PROPERTY: &str = "$rawContent";

/// Name of the UI element a DOM comment converts to.
pub const COMMENT_ELEMENT_NAME: &str = "$comment";

/// Custom property asking the data pipeline to render only the children.
pub const TRANSPARENT_RENDERING_PROPERTY: &str = "dataPipeline:transparentRendering";

/// Renders a UI element into a new DOM node.
pub type UiRenderer = Rc<dyn Fn(&ViewTree, NodeId, &mut DomDocument, &DomConverter) -> DomNodeId>;

/// Fills the DOM element created for a raw element.
pub type RawRenderer = Rc<dyn Fn(&ViewTree, NodeId, &mut DomDocument, DomNodeId, &DomConverter)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewToDomOptions {
    /// Register every created element in the identity maps.
    pub bind: bool,
    pub with_children: bool,
}

impl Default for ViewToDomOptions {
    fn default() -> Self {
        Self {
            bind: false,
            with_children: true,
        }
    }
}

impl ViewToDomOptions {
    pub fn bound() -> Self {
        Self {
            bind: true,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DomToViewOptions {
    pub bind: bool,
    pub with_children: bool,
    /// Keep the tag name case instead of lowercasing it.
    pub keep_original_case: bool,
    /// Drop comments instead of converting them to `$comment` elements.
    pub skip_comments: bool,
}

impl Default for DomToViewOptions {
    fn default() -> Self {
        Self {
            bind: false,
            with_children: true,
            keep_original_case: false,
            skip_comments: false,
        }
    }
}

impl DomToViewOptions {
    pub fn bound() -> Self {
        Self {
            bind: true,
            ..Default::default()
        }
    }
}

pub struct DomConverter {
    config: ConverterConfig,
    dom_to_view_mapping: HashMap<DomNodeId, NodeId>,
    view_to_dom_mapping: HashMap<NodeId, DomNodeId>,
    fake_selection_mapping: HashMap<DomNodeId, Selection>,
    raw_content_matcher: Matcher,
    inline_object_matcher: Matcher,
    /// DOM elements converted as raw content; text right after them keeps its leading space.
    encountered_raw_content: HashSet<DomNodeId>,
    ui_renderers: HashMap<NodeId, UiRenderer>,
    raw_renderers: HashMap<NodeId, RawRenderer>,
}

impl std::fmt::Debug for DomConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomConverter")
            .field("config", &self.config)
            .field("bound", &self.view_to_dom_mapping.len())
            .field("fake_selections", &self.fake_selection_mapping.len())
            .field("encountered_raw_content", &self.encountered_raw_content.len())
            .finish_non_exhaustive()
    }
}

impl Default for DomConverter {
    fn default() -> Self {
        Self::new(ConverterConfig::default())
    }
}

impl DomConverter {
    pub fn new(config: ConverterConfig) -> Self {
        Self {
            config,
            dom_to_view_mapping: HashMap::new(),
            view_to_dom_mapping: HashMap::new(),
            fake_selection_mapping: HashMap::new(),
            raw_content_matcher: Matcher::new(),
            inline_object_matcher: Matcher::new(),
            encountered_raw_content: HashSet::new(),
            ui_renderers: HashMap::new(),
            raw_renderers: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn rendering_mode(&self) -> RenderingMode {
        self.config.rendering_mode
    }

    pub fn set_rendering_mode(&mut self, mode: RenderingMode) {
        self.config.rendering_mode = mode;
    }

    pub fn block_filler_mode(&self) -> BlockFillerMode {
        self.config.block_filler_mode()
    }

    pub fn set_block_filler_mode(&mut self, mode: BlockFillerMode) {
        self.config.block_filler_mode = Some(mode);
    }

    /// View elements matching `pattern` keep their DOM content verbatim
    /// instead of being converted child by child.
    pub fn register_raw_content_matcher(&mut self, pattern: impl Into<Pattern>) {
        self.raw_content_matcher.add(pattern);
    }

    /// Elements matching `pattern` count as inline objects for whitespace handling.
    pub fn register_inline_object_matcher(&mut self, pattern: impl Into<Pattern>) {
        self.inline_object_matcher.add(pattern);
    }

    pub fn set_ui_renderer(&mut self, element: NodeId, renderer: UiRenderer) {
        self.ui_renderers.insert(element, renderer);
    }

    pub fn set_raw_renderer(&mut self, element: NodeId, renderer: RawRenderer) {
        self.raw_renderers.insert(element, renderer);
    }

    // === View to DOM ===

    /// Create the DOM counterpart of a view node.
    ///
    /// Nodes already bound are returned as they are. UI elements are
    /// rendered by their renderer and never recursed into.
    pub fn view_to_dom(
        &mut self,
        view: &ViewTree,
        dom: &mut DomDocument,
        node: NodeId,
        options: ViewToDomOptions,
    ) -> DomNodeId {
        if let Some(bound) = self.map_view_to_dom(node) {
            return bound;
        }

        let dom_node = match view.data(node) {
            NodeData::Text(_) => {
                let data = self.process_data_from_view_text(view, Item::Node(node));
                return dom.create_text(data);
            }
            NodeData::DocumentFragment(_) => {
                let fragment = dom.create_fragment();
                if options.bind {
                    self.bind_document_fragments(fragment, node);
                }
                fragment
            }
            NodeData::Element(element) if element.kind() == ElementKind::Ui => {
                let dom_node = if element.name() == COMMENT_ELEMENT_NAME {
                    dom.create_comment(element.custom_property(RAW_CONTENT_PROPERTY).unwrap_or_default())
                } else {
                    self.render_ui_element(view, node, dom)
                };
                if options.bind {
                    self.bind_elements(dom_node, node);
                }
                return dom_node;
            }
            NodeData::Element(element) => {
                let dom_element = if self.should_rename_element(element.name()) {
                    tracing::warn!(
                        element = %element.name(),
                        "view_to_dom: unsafe element replaced while editing"
                    );
                    self.create_replacement_dom_element(dom, element.name(), None)
                } else {
                    dom.create_element(element.name())
                };

                if element.kind() == ElementKind::Raw {
                    self.render_raw_element(view, node, dom, dom_element);
                }
                if options.bind {
                    self.bind_elements(dom_element, node);
                }
                for (key, value) in element.attributes() {
                    self.set_dom_element_attribute(dom, dom_element, key, value, Some(element));
                }
                dom_element
            }
        };

        if options.with_children {
            for child in self.view_children_to_dom(view, dom, node, options) {
                dom.append_child(dom_node, child);
            }
        }

        tracing::trace!(?node, ?dom_node, "view_to_dom: converted");
        dom_node
    }

    /// DOM counterparts of the children of `parent`, with the block filler
    /// at its offset.
    pub fn view_children_to_dom(
        &mut self,
        view: &ViewTree,
        dom: &mut DomDocument,
        parent: NodeId,
        options: ViewToDomOptions,
    ) -> Vec<DomNodeId> {
        let filler_offset = view.filler_offset(parent);
        let mut out = Vec::new();

        for (offset, child) in view.children(parent).iter().enumerate() {
            if filler_offset == Some(offset) {
                out.push(self.block_filler(dom));
            }

            let transparent = view.element(*child).is_some_and(|element| {
                element.custom_property(TRANSPARENT_RENDERING_PROPERTY).is_some()
                    && element.attribute_count() == 0
            });
            if transparent && self.config.rendering_mode == RenderingMode::Data {
                out.extend(self.view_children_to_dom(view, dom, *child, options));
                continue;
            }
            if transparent {
                tracing::warn!(
                    element = ?child,
                    "view_children_to_dom: transparent rendering is not supported while editing"
                );
            }
            out.push(self.view_to_dom(view, dom, *child, options));
        }

        if filler_offset == Some(view.child_count(parent)) {
            out.push(self.block_filler(dom));
        }
        out
    }

    fn block_filler(&self, dom: &mut DomDocument) -> DomNodeId {
        match self.config.block_filler_mode() {
            BlockFillerMode::Br => br_filler(dom),
            BlockFillerMode::Nbsp => nbsp_filler(dom),
            BlockFillerMode::MarkedNbsp => marked_nbsp_filler(dom),
        }
    }

    fn render_ui_element(&self, view: &ViewTree, node: NodeId, dom: &mut DomDocument) -> DomNodeId {
        if let Some(renderer) = self.ui_renderers.get(&node).cloned() {
            return renderer(view, node, dom, self);
        }
        let name = view.name(node).unwrap_or("span");
        let dom_element = dom.create_element(name);
        if let Some(element) = view.element(node) {
            for (key, value) in element.attributes() {
                dom.set_attribute(dom_element, key, value);
            }
        }
        dom_element
    }

    fn render_raw_element(
        &self,
        view: &ViewTree,
        node: NodeId,
        dom: &mut DomDocument,
        dom_element: DomNodeId,
    ) {
        if let Some(renderer) = self.raw_renderers.get(&node).cloned() {
            renderer(view, node, dom, dom_element, self);
        } else if let Some(content) = view.custom_property(node, RAW_CONTENT_PROPERTY) {
            self.set_content_of(dom, dom_element, content);
        }
    }

    // === DOM to view ===

    /// Create the view counterpart of a DOM node.
    ///
    /// Returns `None` for block fillers, inline fillers, text that collapses
    /// to nothing and, with `skip_comments`, comments.
    pub fn dom_to_view(
        &mut self,
        view: &mut ViewTree,
        dom: &DomDocument,
        node: DomNodeId,
        options: DomToViewOptions,
    ) -> Option<NodeId> {
        if self.is_block_filler(dom, node) {
            return None;
        }

        if let Some(host) = self.get_host_view_element(view, dom, node) {
            return Some(host);
        }

        if dom.is_comment(node) && options.skip_comments {
            return None;
        }

        if dom.is_text(node) {
            if is_inline_filler(dom, node) {
                return None;
            }
            let data = self.process_data_from_dom_text(dom, node);
            return (!data.is_empty()).then(|| view.create_text(data));
        }

        if let Some(mapped) = self.map_dom_to_view(view, dom, node) {
            return Some(mapped);
        }

        let view_node = if dom.is_fragment(node) {
            let fragment = view.create_document_fragment();
            if options.bind {
                self.bind_document_fragments(node, fragment);
            }
            fragment
        } else {
            let view_element = if dom.is_comment(node) {
                view.create_element(ElementKind::Ui, COMMENT_ELEMENT_NAME)
            } else {
                let tag = dom.tag_name(node).unwrap_or_default();
                let name = if options.keep_original_case {
                    tag.to_string()
                } else {
                    tag.to_ascii_lowercase()
                };
                view.create_element_with_attributes(ElementKind::Generic, name, dom.attributes(node))
            };
            if options.bind {
                self.bind_elements(node, view_element);
            }

            let raw_content = if dom.is_comment(node) {
                dom.comment_data(node).map(str::to_string)
            } else if options.with_children && self.raw_content_matcher.matches(view, view_element) {
                Some(dom.inner_html(node))
            } else {
                None
            };
            if let Some(content) = raw_content {
                view.set_custom_property(view_element, RAW_CONTENT_PROPERTY, content);
                self.encountered_raw_content.insert(node);
                return Some(view_element);
            }
            view_element
        };

        if options.with_children {
            for child in self.dom_children_to_view(view, dom, node, options) {
                view.append_child(view_node, child);
            }
        }

        tracing::trace!(?node, ?view_node, "dom_to_view: converted");
        Some(view_node)
    }

    pub fn dom_children_to_view(
        &mut self,
        view: &mut ViewTree,
        dom: &DomDocument,
        parent: DomNodeId,
        options: DomToViewOptions,
    ) -> Vec<NodeId> {
        dom.children(parent)
            .to_vec()
            .into_iter()
            .filter_map(|child| self.dom_to_view(view, dom, child, options))
            .collect()
    }

    // === Fillers ===

    /// Whether `node` is a block filler under the current filler mode.
    ///
    /// Outside `br` mode a lone `<br>` in a block element also counts, so
    /// `<p><br></p>` reads as an empty paragraph.
    pub fn is_block_filler(&self, dom: &DomDocument, node: DomNodeId) -> bool {
        if self.config.block_filler_mode() == BlockFillerMode::Br {
            return filler::is_br_filler(dom, node);
        }

        if dom.is_element_named(node, "br")
            && filler::has_block_parent(dom, node, &self.config.block_elements)
            && dom.parent(node).is_some_and(|parent| dom.child_count(parent) == 1)
        {
            return true;
        }

        filler::is_marked_nbsp_filler(dom, node)
            || filler::is_nbsp_block_filler(dom, node, &self.config.block_elements)
    }

    pub fn is_block_element(&self, dom: &DomDocument, node: DomNodeId) -> bool {
        dom.local_name(node)
            .is_some_and(|name| self.config.is_block_element(name))
    }

    // === Positions and selections ===

    /// DOM boundary point for a view position. Never resolves to a point
    /// before an inline filler.
    pub fn view_position_to_dom(
        &self,
        view: &ViewTree,
        dom: &DomDocument,
        position: Position,
    ) -> Option<DomPoint> {
        let parent = position.parent();

        if view.is_text(parent) {
            let dom_text = self.find_corresponding_dom_text(view, dom, parent)?;
            let mut offset = position.offset();
            if starts_with_filler(dom, dom_text) {
                offset += INLINE_FILLER_LENGTH;
            }
            return Some(DomPoint::new(dom_text, offset));
        }

        let (dom_parent, dom_before) = if position.offset() == 0 {
            (self.map_view_to_dom(parent)?, None)
        } else {
            let node_before = position.node_before(view)?;
            let dom_before = if view.is_text(node_before) {
                self.find_corresponding_dom_text(view, dom, node_before)
            } else {
                self.map_view_to_dom(node_before)
            }?;
            (dom.parent(dom_before)?, Some(dom_before))
        };

        let dom_after = match dom_before {
            Some(before) => dom.next_sibling(before),
            None => dom.first_child(dom_parent),
        };
        if let Some(after) = dom_after
            && starts_with_filler(dom, after)
        {
            return Some(DomPoint::new(after, INLINE_FILLER_LENGTH));
        }

        let offset = match dom_before {
            Some(before) => dom.index_of(before)? + 1,
            None => 0,
        };
        Some(DomPoint::new(dom_parent, offset))
    }

    pub fn view_range_to_dom(&self, view: &ViewTree, dom: &DomDocument, range: &Range) -> Option<DomRange> {
        let start = self.view_position_to_dom(view, dom, range.start())?;
        let end = self.view_position_to_dom(view, dom, range.end())?;
        Some(DomRange::new(start, end))
    }

    /// View position for a DOM boundary point.
    ///
    /// Points inside UI or raw elements resolve to the position before the
    /// element; points inside fillers resolve to the position of the filler.
    pub fn dom_position_to_view(
        &self,
        view: &ViewTree,
        dom: &DomDocument,
        node: DomNodeId,
        offset: usize,
    ) -> Option<Position> {
        if self.is_block_filler(dom, node) {
            return self.dom_position_to_view(view, dom, dom.parent(node)?, dom.index_of(node)?);
        }

        if let Some(view_element) = self.map_dom_to_view(view, dom, node)
            && view.is_host_element(view_element)
        {
            return Position::before(view, view_element).ok();
        }

        if dom.is_text(node) {
            if is_inline_filler(dom, node) {
                return self.dom_position_to_view(view, dom, dom.parent(node)?, dom.index_of(node)?);
            }
            let view_text = self.find_corresponding_view_text(view, dom, node)?;
            let offset = if starts_with_filler(dom, node) {
                offset.saturating_sub(INLINE_FILLER_LENGTH)
            } else {
                offset
            };
            return Some(Position::new(view_text, offset));
        }

        if offset == 0 {
            return self
                .map_dom_to_view(view, dom, node)
                .map(|parent| Position::new(parent, 0));
        }

        let dom_before = dom.child(node, offset - 1)?;
        if (dom.is_text(dom_before) && is_inline_filler(dom, dom_before))
            || self.is_block_filler(dom, dom_before)
        {
            return self.dom_position_to_view(view, dom, node, offset - 1);
        }

        let view_before = if dom.is_text(dom_before) {
            self.find_corresponding_view_text(view, dom, dom_before)
        } else {
            self.map_dom_to_view(view, dom, dom_before)
        }?;
        let parent = view.parent(view_before)?;
        Some(Position::new(parent, view.index(view_before)? + 1))
    }

    pub fn dom_range_to_view(&self, view: &ViewTree, dom: &DomDocument, range: &DomRange) -> Option<Range> {
        let start = self.dom_position_to_view(view, dom, range.start.node, range.start.offset)?;
        let end = self.dom_position_to_view(view, dom, range.end.node, range.end.offset)?;
        Some(Range::new(start, end))
    }

    /// View selection for a DOM selection. A selection inside a fake
    /// selection container resolves to the selection bound to it.
    pub fn dom_selection_to_view(
        &self,
        view: &ViewTree,
        dom: &DomDocument,
        selection: &DomSelection,
    ) -> Selection {
        if let [range] = selection.ranges.as_slice() {
            let mut container = range.start.node;
            if dom.is_text(container)
                && let Some(parent) = dom.parent(container)
            {
                container = parent;
            }
            if let Some(fake) = self.fake_selection_to_view(container) {
                return fake.clone();
            }
        }

        let backward = self.is_dom_selection_backward(dom, selection);
        let ranges: Vec<Range> = selection
            .ranges
            .iter()
            .filter_map(|range| self.dom_range_to_view(view, dom, range))
            .collect();

        let options = SelectionOptions {
            backward,
            ..Default::default()
        };
        Selection::from_selectable(view, ranges, options).unwrap_or_else(|err| {
            tracing::warn!(%err, "dom_selection_to_view: dropping unconvertible selection");
            Selection::new()
        })
    }

    pub fn is_dom_selection_backward(&self, dom: &DomDocument, selection: &DomSelection) -> bool {
        if selection.is_collapsed() {
            return false;
        }
        match (selection.anchor, selection.focus) {
            (Some(anchor), Some(focus)) => {
                dom.compare_points(anchor, focus) == Some(Ordering::Greater)
            }
            _ => false,
        }
    }

    /// False when an end of the selection sits before or inside an inline
    /// filler, or inside a UI or raw element.
    pub fn is_dom_selection_correct(
        &self,
        view: &ViewTree,
        dom: &DomDocument,
        selection: &DomSelection,
    ) -> bool {
        [selection.anchor, selection.focus]
            .into_iter()
            .flatten()
            .all(|point| self.is_dom_selection_position_correct(view, dom, point))
    }

    fn is_dom_selection_position_correct(&self, view: &ViewTree, dom: &DomDocument, point: DomPoint) -> bool {
        if dom.is_text(point.node)
            && starts_with_filler(dom, point.node)
            && point.offset < INLINE_FILLER_LENGTH
        {
            return false;
        }

        if dom.is_element(point.node)
            && dom
                .child(point.node, point.offset)
                .is_some_and(|child| starts_with_filler(dom, child))
        {
            return false;
        }

        !self
            .map_dom_to_view(view, dom, point.node)
            .is_some_and(|element| view.is_host_element(element))
    }
}
