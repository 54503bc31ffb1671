//! View tree storage: an arena of elements, text nodes and document fragments.
//!
//! Nodes are addressed by [`NodeId`] handles. The arena never frees slots;
//! removing a node only detaches it from its parent, so handles held by
//! bindings or stale positions never dangle.

use std::collections::BTreeMap;

use smol_str::SmolStr;

/// Opaque handle to a node stored in a [`ViewTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Raw arena index of this handle.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The closed set of element flavours the view layer distinguishes.
///
/// `Ui` and `Raw` elements are *host* elements: they render their own DOM
/// and the converter never mirrors their subtree node-for-node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ElementKind {
    /// Plain element as produced by DOM to view conversion.
    #[default]
    Generic,
    /// Block-like element (paragraph, list item, ...).
    Container,
    /// Container the user can type into (editable root or nested editable).
    Editable,
    /// Formatting wrapper such as `<b>` or `<a>`.
    Attribute,
    /// Element that never has children (`<img>`).
    Empty,
    /// Element rendering arbitrary UI, opaque to the converter.
    Ui,
    /// Element rendering raw HTML, opaque to the converter.
    Raw,
}

impl ElementKind {
    /// Container and editable elements both behave as block containers.
    pub fn is_container(self) -> bool {
        matches!(self, ElementKind::Container | ElementKind::Editable)
    }

    /// Elements whose rendered subtree is owned by their own renderer.
    pub fn is_host(self) -> bool {
        matches!(self, ElementKind::Ui | ElementKind::Raw)
    }

    /// Prefix used for this kind in view markup (`container:p`).
    pub fn markup_prefix(self) -> Option<&'static str> {
        match self {
            ElementKind::Generic => None,
            ElementKind::Container => Some("container"),
            ElementKind::Editable => Some("editable"),
            ElementKind::Attribute => Some("attribute"),
            ElementKind::Empty => Some("empty"),
            ElementKind::Ui => Some("ui"),
            ElementKind::Raw => Some("raw"),
        }
    }

    /// Inverse of [`ElementKind::markup_prefix`].
    pub fn from_markup_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "container" => Some(ElementKind::Container),
            "editable" => Some(ElementKind::Editable),
            "attribute" => Some(ElementKind::Attribute),
            "empty" => Some(ElementKind::Empty),
            "ui" => Some(ElementKind::Ui),
            "raw" => Some(ElementKind::Raw),
            _ => None,
        }
    }
}

/// An element node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    name: SmolStr,
    kind: ElementKind,
    attributes: Vec<(SmolStr, String)>,
    children: Vec<NodeId>,
    custom_properties: BTreeMap<SmolStr, String>,
    unsafe_attributes_to_render: Vec<SmolStr>,
}

impl Element {
    fn new(kind: ElementKind, name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            kind,
            attributes: Vec::new(),
            children: Vec::new(),
            custom_properties: BTreeMap::new(),
            unsafe_attributes_to_render: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attribute(key).is_some()
    }

    /// Attributes in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Class names from the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    /// Declarations from the `style` attribute as `(property, value)` pairs.
    pub fn styles(&self) -> Vec<(&str, &str)> {
        self.attribute("style")
            .unwrap_or_default()
            .split(';')
            .filter_map(|decl| {
                let (prop, value) = decl.split_once(':')?;
                let prop = prop.trim();
                (!prop.is_empty()).then(|| (prop, value.trim()))
            })
            .collect()
    }

    pub fn custom_property(&self, key: &str) -> Option<&str> {
        self.custom_properties.get(key).map(String::as_str)
    }

    /// Whether this element opted in to rendering `key` even when it looks unsafe.
    pub fn should_render_unsafe_attribute(&self, key: &str) -> bool {
        self.unsafe_attributes_to_render.iter().any(|k| k == key)
    }
}

/// Payload of a view node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Element(Element),
    Text(String),
    DocumentFragment(Vec<NodeId>),
}

#[derive(Clone, Debug)]
struct NodeEntry {
    parent: Option<NodeId>,
    data: NodeData,
}

/// A virtual, non-owning slice of a text node.
///
/// Produced by the tree walker when a text node is only partially inside the
/// walked range, or when walking character by character. A proxy is never a
/// valid position parent; positions always point into the underlying text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextProxy {
    pub text: NodeId,
    pub offset_in_text: usize,
    pub length: usize,
}

impl TextProxy {
    pub fn new(text: NodeId, offset_in_text: usize, length: usize) -> Self {
        Self {
            text,
            offset_in_text,
            length,
        }
    }

    /// Characters covered by this proxy.
    pub fn data<'t>(&self, tree: &'t ViewTree) -> &'t str {
        char_slice(
            tree.text_data(self.text).unwrap_or_default(),
            self.offset_in_text,
            self.length,
        )
    }

    /// True if the proxy covers only part of its text node.
    pub fn is_partial(&self, tree: &ViewTree) -> bool {
        self.length != tree.max_offset(self.text)
    }
}

/// Anything the tree walker can report: a real node or a text slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Item {
    Node(NodeId),
    TextProxy(TextProxy),
}

impl From<NodeId> for Item {
    fn from(node: NodeId) -> Self {
        Item::Node(node)
    }
}

impl From<TextProxy> for Item {
    fn from(proxy: TextProxy) -> Self {
        Item::TextProxy(proxy)
    }
}

/// Exhaustive classification of an [`Item`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Element(ElementKind),
    Text,
    TextProxy,
    DocumentFragment,
}

impl Item {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Item::Node(node) => Some(*node),
            Item::TextProxy(_) => None,
        }
    }

    pub fn as_text_proxy(&self) -> Option<TextProxy> {
        match self {
            Item::TextProxy(proxy) => Some(*proxy),
            Item::Node(_) => None,
        }
    }

    pub fn kind(&self, tree: &ViewTree) -> ItemKind {
        match self {
            Item::TextProxy(_) => ItemKind::TextProxy,
            Item::Node(node) => match tree.data(*node) {
                NodeData::Element(element) => ItemKind::Element(element.kind()),
                NodeData::Text(_) => ItemKind::Text,
                NodeData::DocumentFragment(_) => ItemKind::DocumentFragment,
            },
        }
    }

    /// The element this item is, if it is one.
    pub fn element(&self, tree: &ViewTree) -> Option<NodeId> {
        self.as_node().filter(|node| tree.is_element(*node))
    }

    /// True for text nodes and text proxies.
    pub fn is_text_like(&self, tree: &ViewTree) -> bool {
        matches!(self.kind(tree), ItemKind::Text | ItemKind::TextProxy)
    }

    /// Parent of the item; for a proxy, the parent of its text node.
    pub fn parent(&self, tree: &ViewTree) -> Option<NodeId> {
        match self {
            Item::Node(node) => tree.parent(*node),
            Item::TextProxy(proxy) => tree.parent(proxy.text),
        }
    }

    /// Text carried by the item (empty for elements and fragments).
    pub fn data<'t>(&self, tree: &'t ViewTree) -> &'t str {
        match self {
            Item::Node(node) => tree.text_data(*node).unwrap_or_default(),
            Item::TextProxy(proxy) => proxy.data(tree),
        }
    }
}

/// Number of characters (Unicode scalar values) in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Slice `s` by character offsets, clamping at the end of the string.
pub fn char_slice(s: &str, start: usize, len: usize) -> &str {
    let byte_at = |chars: usize| {
        s.char_indices()
            .nth(chars)
            .map(|(idx, _)| idx)
            .unwrap_or(s.len())
    };
    let from = byte_at(start);
    let to = byte_at(start + len);
    &s[from..to]
}

/// Arena holding every node of a view document.
#[derive(Clone, Debug, Default)]
pub struct ViewTree {
    nodes: Vec<NodeEntry>,
}

impl ViewTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeEntry { parent: None, data });
        id
    }

    fn entry(&self, node: NodeId) -> &NodeEntry {
        &self.nodes[node.index()]
    }

    fn entry_mut(&mut self, node: NodeId) -> &mut NodeEntry {
        &mut self.nodes[node.index()]
    }

    // === Construction ===

    pub fn create_element(&mut self, kind: ElementKind, name: impl Into<SmolStr>) -> NodeId {
        self.push(NodeData::Element(Element::new(kind, name)))
    }

    pub fn create_element_with_attributes<K, V>(
        &mut self,
        kind: ElementKind,
        name: impl Into<SmolStr>,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> NodeId
    where
        K: Into<SmolStr>,
        V: Into<String>,
    {
        let mut element = Element::new(kind, name);
        element.attributes = attributes
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.push(NodeData::Element(element))
    }

    pub fn create_container_element(&mut self, name: impl Into<SmolStr>) -> NodeId {
        self.create_element(ElementKind::Container, name)
    }

    pub fn create_attribute_element(&mut self, name: impl Into<SmolStr>) -> NodeId {
        self.create_element(ElementKind::Attribute, name)
    }

    pub fn create_text(&mut self, data: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(data.into()))
    }

    pub fn create_document_fragment(&mut self) -> NodeId {
        self.push(NodeData::DocumentFragment(Vec::new()))
    }

    // === Node inspection ===

    pub fn data(&self, node: NodeId) -> &NodeData {
        &self.entry(node).data
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        match &self.entry(node).data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        match &mut self.entry_mut(node).data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn text_data(&self, node: NodeId) -> Option<&str> {
        match &self.entry(node).data {
            NodeData::Text(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.entry(node).data, NodeData::Element(_))
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(self.entry(node).data, NodeData::Text(_))
    }

    pub fn is_document_fragment(&self, node: NodeId) -> bool {
        matches!(self.entry(node).data, NodeData::DocumentFragment(_))
    }

    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(Element::name)
    }

    pub fn element_kind(&self, node: NodeId) -> Option<ElementKind> {
        self.element(node).map(Element::kind)
    }

    /// True if `node` is an element called `name`.
    pub fn is_element_named(&self, node: NodeId, name: &str) -> bool {
        self.name(node) == Some(name)
    }

    pub fn is_attribute_element(&self, node: NodeId) -> bool {
        self.element_kind(node) == Some(ElementKind::Attribute)
    }

    pub fn is_container_element(&self, node: NodeId) -> bool {
        self.element_kind(node).is_some_and(ElementKind::is_container)
    }

    pub fn is_ui_element(&self, node: NodeId) -> bool {
        self.element_kind(node) == Some(ElementKind::Ui)
    }

    pub fn is_raw_element(&self, node: NodeId) -> bool {
        self.element_kind(node) == Some(ElementKind::Raw)
    }

    /// UI and raw elements.
    pub fn is_host_element(&self, node: NodeId) -> bool {
        self.element_kind(node).is_some_and(ElementKind::is_host)
    }

    pub fn attribute(&self, node: NodeId, key: &str) -> Option<&str> {
        self.element(node).and_then(|e| e.attribute(key))
    }

    pub fn custom_property(&self, node: NodeId, key: &str) -> Option<&str> {
        self.element(node).and_then(|e| e.custom_property(key))
    }

    // === Structure ===

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.entry(node).parent
    }

    /// Children of an element or fragment; empty for text.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        match &self.entry(node).data {
            NodeData::Element(element) => &element.children,
            NodeData::DocumentFragment(children) => children,
            NodeData::Text(_) => &[],
        }
    }

    pub fn child(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.children(node).get(index).copied()
    }

    pub fn child_count(&self, node: NodeId) -> usize {
        self.children(node).len()
    }

    /// Largest valid position offset inside `node`.
    pub fn max_offset(&self, node: NodeId) -> usize {
        match &self.entry(node).data {
            NodeData::Text(data) => char_len(data),
            _ => self.child_count(node),
        }
    }

    /// Index of `node` among its parent's children.
    pub fn index(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|c| *c == node)
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let index = self.index(node)?;
        self.child(parent, index + 1)
    }

    pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let index = self.index(node)?;
        index.checked_sub(1).and_then(|i| self.child(parent, i))
    }

    /// Topmost ancestor of `node` (the node itself when detached).
    pub fn root(&self, node: NodeId) -> NodeId {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Ancestors of `node`, root first, not including `node`.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(node);
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.parent(parent);
        }
        ancestors.reverse();
        ancestors
    }

    /// Child indices leading from the root down to `node`.
    pub fn path(&self, node: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = node;
        while let Some(index) = self.index(current) {
            path.push(index);
            // index() returned Some, so a parent exists.
            current = match self.parent(current) {
                Some(parent) => parent,
                None => break,
            };
        }
        path.reverse();
        path
    }

    /// True if `ancestor` is `node` or one of its ancestors.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
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

    /// Insert `nodes` into `parent` at `index`, detaching them from previous parents.
    ///
    /// Returns the number of inserted nodes; nothing is inserted into text nodes.
    pub fn insert_children(
        &mut self,
        parent: NodeId,
        index: usize,
        nodes: impl IntoIterator<Item = NodeId>,
    ) -> usize {
        if self.is_text(parent) {
            tracing::warn!(?parent, "insert_children: text nodes cannot have children");
            return 0;
        }
        let mut at = index.min(self.child_count(parent));
        let mut count = 0;
        for node in nodes {
            if self.contains(node, parent) {
                tracing::warn!(?parent, ?node, "insert_children: refusing to create a cycle");
                continue;
            }
            self.remove(node);
            // Removal may have shifted the target index if `node` was an earlier sibling.
            at = at.min(self.child_count(parent));
            match &mut self.entry_mut(parent).data {
                NodeData::Element(element) => element.children.insert(at, node),
                NodeData::DocumentFragment(children) => children.insert(at, node),
                NodeData::Text(_) => unreachable!("checked above"),
            }
            self.entry_mut(node).parent = Some(parent);
            at += 1;
            count += 1;
        }
        count
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> usize {
        let at = self.child_count(parent);
        self.insert_children(parent, at, [child])
    }

    /// Detach `node` from its parent. No-op for detached nodes.
    pub fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        match &mut self.entry_mut(parent).data {
            NodeData::Element(element) => element.children.retain(|c| *c != node),
            NodeData::DocumentFragment(children) => children.retain(|c| *c != node),
            NodeData::Text(_) => {}
        }
        self.entry_mut(node).parent = None;
    }

    /// Detach `count` children of `parent` starting at `index`.
    pub fn remove_children(&mut self, parent: NodeId, index: usize, count: usize) -> Vec<NodeId> {
        let removed: Vec<NodeId> = self
            .children(parent)
            .iter()
            .skip(index)
            .take(count)
            .copied()
            .collect();
        for node in &removed {
            self.remove(*node);
        }
        removed
    }

    pub fn set_text_data(&mut self, node: NodeId, data: impl Into<String>) {
        if let NodeData::Text(text) = &mut self.entry_mut(node).data {
            *text = data.into();
        }
    }

    pub fn set_attribute(&mut self, node: NodeId, key: impl Into<SmolStr>, value: impl Into<String>) {
        let Some(element) = self.element_mut(node) else {
            return;
        };
        let key = key.into();
        let value = value.into();
        match element.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => element.attributes.push((key, value)),
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, key: &str) -> bool {
        let Some(element) = self.element_mut(node) else {
            return false;
        };
        let before = element.attributes.len();
        element.attributes.retain(|(k, _)| k != key);
        element.attributes.len() != before
    }

    pub fn set_custom_property(&mut self, node: NodeId, key: impl Into<SmolStr>, value: impl Into<String>) {
        if let Some(element) = self.element_mut(node) {
            element.custom_properties.insert(key.into(), value.into());
        }
    }

    pub fn remove_custom_property(&mut self, node: NodeId, key: &str) -> bool {
        self.element_mut(node)
            .is_some_and(|element| element.custom_properties.remove(key).is_some())
    }

    /// Allow `keys` to be rendered on this element even when they look unsafe.
    pub fn set_unsafe_attributes_to_render<K: Into<SmolStr>>(
        &mut self,
        node: NodeId,
        keys: impl IntoIterator<Item = K>,
    ) {
        if let Some(element) = self.element_mut(node) {
            element.unsafe_attributes_to_render = keys.into_iter().map(Into::into).collect();
        }
    }

    // === Fillers ===

    /// Offset at which a block filler must be rendered inside `node`, if any.
    ///
    /// Containers need a filler when they hold nothing but UI elements, or
    /// when their last child is a `<br>`. Attribute elements need one when
    /// they are empty and the only content of their nearest non-attribute
    /// ancestor. Other kinds never take fillers.
    pub fn filler_offset(&self, node: NodeId) -> Option<usize> {
        let element = self.element(node)?;
        match element.kind() {
            ElementKind::Container | ElementKind::Editable => {
                let children = element.children();
                if children
                    .last()
                    .is_some_and(|last| self.is_element_named(*last, "br"))
                {
                    return Some(children.len());
                }
                children
                    .iter()
                    .all(|child| self.is_ui_element(*child))
                    .then_some(children.len())
            }
            ElementKind::Attribute => {
                if self.non_ui_children_count(node) > 0 {
                    return None;
                }
                let mut current = self.parent(node);
                while let Some(ancestor) = current {
                    if !self.is_attribute_element(ancestor) {
                        break;
                    }
                    if self.non_ui_children_count(ancestor) > 1 {
                        return None;
                    }
                    current = self.parent(ancestor);
                }
                match current {
                    Some(ancestor) if self.non_ui_children_count(ancestor) <= 1 => {
                        Some(element.children().len())
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn non_ui_children_count(&self, node: NodeId) -> usize {
        self.children(node)
            .iter()
            .filter(|child| !self.is_ui_element(**child))
            .count()
    }
}
